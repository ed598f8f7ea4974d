//! Counter synchronization against the FitQuest backend.
//!
//! ## Protocol
//!
//! The backend exposes each daily counter as a small REST resource:
//! 1. `GET /api/{resource}` returns `{current, target}`
//! 2. `POST .../increment` and `POST .../decrement` move the count by one
//! 3. `PUT .../target` assigns the goal
//! 4. `PUT .../count` assigns the count, where the backend supports it
//!
//! [`CounterSync`] applies changes locally first and reconciles them through
//! these calls, reverting on failure.

mod client;
mod engine;
mod error;
mod mock;
mod remote;

pub use client::{build_http_url, check_server, HttpRemote};
pub use engine::{CounterSync, SyncEvent, SyncOutcome};
pub use error::{RemoteError, SyncError};
pub use mock::{MockRemote, RemoteCall};
pub use remote::CounterRemote;
