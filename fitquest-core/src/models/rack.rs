use std::time::Duration;
use tokio::time::Instant;

use super::counter::CounterState;
use super::glass::{GlassStatus, GlassUnit};

/// Default upper bound on displayed slots.
pub const DEFAULT_MAX_SLOTS: u32 = 12;

/// The ordered row of glasses projected from a [`CounterState`].
#[derive(Debug, Clone)]
pub struct GlassRack {
    units: Vec<GlassUnit>,
    max_slots: u32,
    delay: Duration,
}

impl GlassRack {
    pub fn new(state: &CounterState, max_slots: u32, delay: Duration) -> Self {
        let mut rack = Self {
            units: Vec::new(),
            max_slots,
            delay,
        };
        rack.rebuild(state);
        rack
    }

    /// Number of slots shown for a state: `min(max(target, current), max_slots)`.
    pub fn slot_count(state: &CounterState, max_slots: u32) -> u32 {
        state.target.max(state.current).min(max_slots)
    }

    pub fn units(&self) -> &[GlassUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn statuses(&self) -> Vec<GlassStatus> {
        self.units.iter().map(GlassUnit::status).collect()
    }

    /// Projects a new counter state onto the row.
    ///
    /// A change in slot count recreates every unit in its settled status;
    /// otherwise each unit receives its new fill signal.
    pub fn update(&mut self, state: &CounterState, now: Instant) {
        let slots = Self::slot_count(state, self.max_slots) as usize;
        if slots != self.units.len() {
            tracing::debug!(
                from = self.units.len(),
                to = slots,
                "glass slot count changed, recreating row"
            );
            self.rebuild(state);
            return;
        }

        for unit in &mut self.units {
            unit.set_filled(unit.index() < state.current, now);
        }
    }

    /// Settles every unit whose deadline has passed. Returns true if any changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        for unit in &mut self.units {
            changed |= unit.poll(now);
        }
        changed
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.units.iter().filter_map(GlassUnit::deadline).min()
    }

    pub fn is_settled(&self) -> bool {
        self.next_deadline().is_none()
    }

    /// Sleeps until every pending transition has fired.
    ///
    /// Dropping the returned future cancels the remaining transitions'
    /// application; units keep their intermediate status until polled again.
    pub async fn settle(&mut self) {
        while let Some(deadline) = self.next_deadline() {
            tokio::time::sleep_until(deadline).await;
            self.poll(Instant::now());
        }
    }

    /// Cancels every pending transition.
    pub fn cancel_all(&mut self) {
        for unit in &mut self.units {
            unit.cancel();
        }
    }

    /// Single-line text rendering, e.g. `[#][#][+][ ]`.
    pub fn render(&self) -> String {
        self.units.iter().map(|u| u.status().glyph()).collect()
    }

    fn rebuild(&mut self, state: &CounterState) {
        let slots = Self::slot_count(state, self.max_slots);
        self.units = (0..slots)
            .map(|index| GlassUnit::new(index, index < state.current, self.delay))
            .collect();
    }
}
