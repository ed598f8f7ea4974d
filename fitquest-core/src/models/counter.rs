use serde::{Deserialize, Serialize};
use std::fmt;

/// Locally displayed counter for one resource and day.
///
/// `current` and `target` are independent axes: the display may exceed the
/// goal and no upper bound is enforced locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub current: u32,
    pub target: u32,
}

impl CounterState {
    pub fn new(current: u32, target: u32) -> Self {
        Self { current, target }
    }

    /// Progress towards the goal as a whole percentage, capped at 100.
    pub fn percent(&self) -> u32 {
        if self.target == 0 {
            return if self.current > 0 { 100 } else { 0 };
        }
        let pct = (u64::from(self.current) * 100) / u64::from(self.target);
        pct.min(100) as u32
    }

    pub fn goal_reached(&self) -> bool {
        self.target > 0 && self.current >= self.target
    }
}

impl fmt::Display for CounterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} ({}%)", self.current, self.target, self.percent())
    }
}
