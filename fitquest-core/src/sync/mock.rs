//! In-memory backend for testing.
//!
//! Keeps per-resource counters, records every call in order and allows
//! scripting failures for specific upcoming mutations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::error::RemoteError;
use super::remote::CounterRemote;
use crate::models::{CounterResource, CounterState};

/// A call observed by [`MockRemote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    Fetch(CounterResource),
    Increment(CounterResource),
    Decrement(CounterResource),
    SetTarget(CounterResource, u32),
    SetCount(CounterResource, u32),
}

impl RemoteCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, RemoteCall::Fetch(_))
    }
}

/// Mock backend.
///
/// Clones share state, so a test can keep a handle while the engine owns
/// another.
#[derive(Debug, Default, Clone)]
pub struct MockRemote {
    inner: Arc<Mutex<MockRemoteInner>>,
}

#[derive(Debug, Default)]
struct MockRemoteInner {
    states: HashMap<CounterResource, CounterState>,
    calls: Vec<RemoteCall>,
    mutations: usize,
    /// Absolute mutation number (1-based) -> error to return instead.
    scripted_failures: HashMap<usize, RemoteError>,
    fail_next_fetch: Option<RemoteError>,
    set_count_unsupported: bool,
    latency: Option<Duration>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the server-side state of a resource.
    pub fn with_state(self, resource: CounterResource, state: CounterState) -> Self {
        self.lock().states.insert(resource, state);
        self
    }

    /// Makes every call wait `latency` before answering.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = Some(latency);
        self
    }

    /// Makes `set_count` behave like a backend without that endpoint.
    pub fn without_set_count(self) -> Self {
        self.lock().set_count_unsupported = true;
        self
    }

    /// Fails the `k`-th mutating call from now (1-based). Calls before it succeed.
    pub fn fail_nth_mutation(&self, k: usize, error: RemoteError) {
        let mut inner = self.lock();
        let at = inner.mutations + k;
        inner.scripted_failures.insert(at, error);
    }

    /// Fails the next `fetch` call.
    pub fn fail_next_fetch(&self, error: RemoteError) {
        self.lock().fail_next_fetch = Some(error);
    }

    /// Server-side state of a resource.
    pub fn state(&self, resource: CounterResource) -> CounterState {
        self.lock().states.get(&resource).copied().unwrap_or_default()
    }

    /// All calls in the order they were received.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Mutating calls only, in order.
    pub fn mutations(&self) -> Vec<RemoteCall> {
        self.lock()
            .calls
            .iter()
            .copied()
            .filter(RemoteCall::is_mutation)
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockRemoteInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn wait(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn mutate(
        &self,
        call: RemoteCall,
        apply: impl FnOnce(&mut CounterState),
    ) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        inner.calls.push(call);
        inner.mutations += 1;

        let number = inner.mutations;
        if let Some(error) = inner.scripted_failures.remove(&number) {
            return Err(error);
        }

        let resource = match call {
            RemoteCall::Fetch(r)
            | RemoteCall::Increment(r)
            | RemoteCall::Decrement(r)
            | RemoteCall::SetTarget(r, _)
            | RemoteCall::SetCount(r, _) => r,
        };
        apply(inner.states.entry(resource).or_default());
        Ok(())
    }
}

#[async_trait]
impl CounterRemote for MockRemote {
    async fn fetch(&self, resource: CounterResource) -> Result<CounterState, RemoteError> {
        self.wait().await;
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Fetch(resource));
        if let Some(error) = inner.fail_next_fetch.take() {
            return Err(error);
        }
        Ok(inner.states.get(&resource).copied().unwrap_or_default())
    }

    async fn increment(&self, resource: CounterResource) -> Result<(), RemoteError> {
        self.wait().await;
        self.mutate(RemoteCall::Increment(resource), |s| {
            s.current = s.current.saturating_add(1)
        })
    }

    async fn decrement(&self, resource: CounterResource) -> Result<(), RemoteError> {
        self.wait().await;
        self.mutate(RemoteCall::Decrement(resource), |s| {
            s.current = s.current.saturating_sub(1)
        })
    }

    async fn set_target(
        &self,
        resource: CounterResource,
        target: u32,
    ) -> Result<(), RemoteError> {
        self.wait().await;
        self.mutate(RemoteCall::SetTarget(resource, target), |s| s.target = target)
    }

    async fn set_count(&self, resource: CounterResource, count: u32) -> Result<(), RemoteError> {
        self.wait().await;
        {
            let mut inner = self.lock();
            if inner.set_count_unsupported {
                inner.calls.push(RemoteCall::SetCount(resource, count));
                return Err(RemoteError::Unsupported(format!("set {} count", resource)));
            }
        }
        self.mutate(RemoteCall::SetCount(resource, count), |s| s.current = count)
    }
}
