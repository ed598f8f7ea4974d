//! FitQuest Core Library
//!
//! Counter models, the glass lifecycle state machine and optimistic
//! synchronization shared by FitQuest front ends.

pub mod models;
pub mod sync;

pub use models::{
    toggle_target, CounterResource, CounterState, DispatchMode, GlassRack, GlassStatus,
    GlassUnit, DEFAULT_MAX_SLOTS, DEFAULT_SETTLE_DELAY,
};
pub use sync::{
    check_server, CounterRemote, CounterSync, HttpRemote, MockRemote, RemoteCall, RemoteError,
    SyncError, SyncEvent, SyncOutcome,
};
