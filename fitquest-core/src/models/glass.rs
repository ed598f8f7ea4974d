//! Per-slot presentation lifecycle for the hydration glass row.
//!
//! A glass follows the boolean "is this slot filled" signal through an
//! intermediate state so a single toggle animates only the slot that changed:
//!
//! ```text
//!            filled            after delay
//!   Empty ───────────▶ Filling ───────────▶ Full
//!     ▲                  │  ▲                 │
//!     │ after delay      │  │ filled          │ !filled
//!     │          !filled ▼  │                 ▼
//!     └──────────────── Emptying ◀────────────┘
//! ```
//!
//! Time is passed in explicitly so callers (and tests) own the clock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Default delay before an in-motion glass settles.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlassStatus {
    Empty,
    Filling,
    Full,
    Emptying,
}

impl GlassStatus {
    /// Settled status for a given fill signal.
    pub fn settled(filled: bool) -> Self {
        if filled {
            GlassStatus::Full
        } else {
            GlassStatus::Empty
        }
    }

    /// Three-character cell used by the text renderer.
    pub fn glyph(&self) -> &'static str {
        match self {
            GlassStatus::Empty => "[ ]",
            GlassStatus::Filling => "[+]",
            GlassStatus::Full => "[#]",
            GlassStatus::Emptying => "[-]",
        }
    }
}

impl fmt::Display for GlassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlassStatus::Empty => write!(f, "empty"),
            GlassStatus::Filling => write!(f, "filling"),
            GlassStatus::Full => write!(f, "full"),
            GlassStatus::Emptying => write!(f, "emptying"),
        }
    }
}

/// One display slot.
#[derive(Debug, Clone)]
pub struct GlassUnit {
    index: u32,
    filled: bool,
    status: GlassStatus,
    /// Pending timed transition. At most one is armed; arming replaces it.
    deadline: Option<Instant>,
    delay: Duration,
}

impl GlassUnit {
    pub fn new(index: u32, filled: bool, delay: Duration) -> Self {
        Self {
            index,
            filled,
            status: GlassStatus::settled(filled),
            deadline: None,
            delay,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn filled(&self) -> bool {
        self.filled
    }

    pub fn status(&self) -> GlassStatus {
        self.status
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Feeds a new fill signal observed at `now`.
    ///
    /// A flip while the glass is in motion cancels the pending transition and
    /// starts the opposite one from the intermediate state.
    pub fn set_filled(&mut self, filled: bool, now: Instant) {
        if filled == self.filled {
            return;
        }
        self.filled = filled;

        let next = match (self.status, filled) {
            (GlassStatus::Empty | GlassStatus::Emptying, true) => GlassStatus::Filling,
            (GlassStatus::Full | GlassStatus::Filling, false) => GlassStatus::Emptying,
            // Already heading the right way; the armed timer keeps running.
            (status, _) => status,
        };

        if next != self.status {
            self.status = next;
            self.deadline = Some(now + self.delay);
        }
    }

    /// Applies the timed follow-up transition if its deadline has passed.
    ///
    /// Returns true when the status changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                let settled = GlassStatus::settled(self.filled);
                let changed = settled != self.status;
                self.status = settled;
                changed
            }
            _ => false,
        }
    }

    /// Drops any pending transition, leaving the current status in place.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Desired achieved count after clicking slot `index`.
///
/// Clicking a filled slot empties it and every slot after it; clicking an
/// empty slot fills it and every slot before it.
pub fn toggle_target(index: u32, current: u32) -> u32 {
    if index < current {
        index
    } else {
        index.saturating_add(1)
    }
}
