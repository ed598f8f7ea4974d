use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the backend accepts changes to a resource's achieved count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Only relative +1/-1 calls are available.
    Stepped,
    /// A direct assignment endpoint is preferred.
    Absolute,
}

/// A daily counter tracked by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterResource {
    Hydration,
    Steps,
}

impl CounterResource {
    /// Path segment under `/api/` for this resource.
    pub fn path(&self) -> &'static str {
        match self {
            CounterResource::Hydration => "hydration",
            CounterResource::Steps => "steps",
        }
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        match self {
            CounterResource::Hydration => DispatchMode::Stepped,
            CounterResource::Steps => DispatchMode::Absolute,
        }
    }

    /// Unit label used when printing counts.
    pub fn unit(&self, count: u32) -> &'static str {
        match (self, count) {
            (CounterResource::Hydration, 1) => "glass",
            (CounterResource::Hydration, _) => "glasses",
            (CounterResource::Steps, 1) => "step",
            (CounterResource::Steps, _) => "steps",
        }
    }
}

impl fmt::Display for CounterResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterResource::Hydration => write!(f, "hydration"),
            CounterResource::Steps => write!(f, "steps"),
        }
    }
}

impl FromStr for CounterResource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hydration" | "water" => Ok(CounterResource::Hydration),
            "steps" => Ok(CounterResource::Steps),
            _ => Err(format!(
                "Invalid resource '{}'. Valid options: hydration, steps",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_dispatch_mode() {
        assert_eq!(
            CounterResource::Hydration.dispatch_mode(),
            DispatchMode::Stepped
        );
        assert_eq!(CounterResource::Steps.dispatch_mode(), DispatchMode::Absolute);
    }

    #[test]
    fn test_resource_from_str() {
        assert_eq!(
            CounterResource::from_str("water").unwrap(),
            CounterResource::Hydration
        );
        assert_eq!(
            CounterResource::from_str("STEPS").unwrap(),
            CounterResource::Steps
        );
        assert!(CounterResource::from_str("calories").is_err());
    }

    #[test]
    fn test_resource_unit() {
        assert_eq!(CounterResource::Hydration.unit(1), "glass");
        assert_eq!(CounterResource::Hydration.unit(0), "glasses");
        assert_eq!(CounterResource::Steps.unit(4200), "steps");
    }
}
