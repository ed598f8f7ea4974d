mod counter;
mod glass;
mod rack;
mod resource;

pub use counter::CounterState;
pub use glass::{toggle_target, GlassStatus, GlassUnit, DEFAULT_SETTLE_DELAY};
pub use rack::{GlassRack, DEFAULT_MAX_SLOTS};
pub use resource::{CounterResource, DispatchMode};
