//! Remote seam for counter resources.
//!
//! The engine only ever talks to the backend through this trait. The HTTP
//! implementation lives in [`super::client`]; [`super::MockRemote`] backs
//! tests and offline runs.

use async_trait::async_trait;

use super::error::RemoteError;
use crate::models::{CounterResource, CounterState};

/// Operations a backend exposes for one daily counter.
#[async_trait]
pub trait CounterRemote: Send + Sync {
    /// Fetches the authoritative `{current, target}` pair.
    async fn fetch(&self, resource: CounterResource) -> Result<CounterState, RemoteError>;

    /// Advances the remote count by exactly one.
    async fn increment(&self, resource: CounterResource) -> Result<(), RemoteError>;

    /// Lowers the remote count by exactly one. The server floors at zero.
    async fn decrement(&self, resource: CounterResource) -> Result<(), RemoteError>;

    /// Assigns the daily goal.
    async fn set_target(&self, resource: CounterResource, target: u32)
        -> Result<(), RemoteError>;

    /// Assigns the achieved count directly.
    ///
    /// Backends without this endpoint return [`RemoteError::Unsupported`].
    async fn set_count(&self, resource: CounterResource, count: u32) -> Result<(), RemoteError> {
        let _ = count;
        Err(RemoteError::Unsupported(format!("set {} count", resource)))
    }
}
