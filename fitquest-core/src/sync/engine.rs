//! Optimistic counter synchronization.
//!
//! [`CounterSync`] keeps a local [`CounterState`] responsive while the backend
//! catches up. Every change is applied locally first, then pushed to the
//! remote; a failure restores the value held before the change.
//!
//! ## Ordering
//!
//! Mutations and refreshes are serialized through a FIFO gate. A request that
//! arrives while another batch is in flight waits for it to finish (or fail
//! and revert) and then computes its own delta from the state at that moment.
//! Within a stepped batch, step N+1 is only issued once step N has answered.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

use super::error::{RemoteError, SyncError};
use super::remote::CounterRemote;
use crate::models::{toggle_target, CounterResource, CounterState, DispatchMode};

/// Capacity of the notification channel. Slow subscribers lag, never block.
const EVENT_CAPACITY: usize = 64;

/// Result of a mutation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Requested value equals the current one; nothing was sent.
    Unchanged,
    /// Remote acknowledged the change.
    Committed { from: u32, to: u32, calls: u32 },
    /// The backend lacks the endpoint; the value is kept locally only.
    LocalOnly { from: u32, to: u32 },
}

/// Notifications published on the side channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Optimistic value written locally; the remote has not answered yet.
    Applied {
        resource: CounterResource,
        state: CounterState,
    },
    Refreshed {
        resource: CounterResource,
        state: CounterState,
    },
    Committed {
        resource: CounterResource,
        from: u32,
        to: u32,
    },
    TargetCommitted {
        resource: CounterResource,
        from: u32,
        to: u32,
    },
    LocalOnly {
        resource: CounterResource,
        from: u32,
        to: u32,
    },
    StepFailed {
        resource: CounterResource,
        applied: u32,
        attempted: u32,
        reverted_to: u32,
    },
    SetFailed {
        resource: CounterResource,
        reverted_to: u32,
    },
}

/// Local counter reconciled against a [`CounterRemote`].
pub struct CounterSync<R> {
    resource: CounterResource,
    remote: R,
    state: Mutex<CounterState>,
    gate: tokio::sync::Mutex<()>,
    events: broadcast::Sender<SyncEvent>,
}

impl<R: CounterRemote> CounterSync<R> {
    pub fn new(resource: CounterResource, remote: R) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            resource,
            remote,
            state: Mutex::new(CounterState::default()),
            gate: tokio::sync::Mutex::new(()),
            events,
        }
    }

    /// Seeds the local state without contacting the remote.
    pub fn with_state(self, state: CounterState) -> Self {
        *self.lock_state() = state;
        self
    }

    /// Snapshot of the locally displayed state, including optimistic values.
    pub fn state(&self) -> CounterState {
        *self.lock_state()
    }

    /// Subscribes to the notification side channel.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Replaces local state with the authoritative remote state.
    ///
    /// No merging: the last fetch wins. On failure local state is untouched.
    pub async fn refresh(&self) -> Result<CounterState, SyncError> {
        let _batch = self.gate.lock().await;

        match self.remote.fetch(self.resource).await {
            Ok(fetched) => {
                *self.lock_state() = fetched;
                tracing::info!(resource = %self.resource, state = %fetched, "refreshed");
                self.emit(SyncEvent::Refreshed {
                    resource: self.resource,
                    state: fetched,
                });
                Ok(fetched)
            }
            Err(source) => {
                tracing::warn!(resource = %self.resource, "refresh failed: {}", source);
                Err(SyncError::RefreshFailed {
                    resource: self.resource,
                    source,
                })
            }
        }
    }

    /// Sets the achieved count, optimistically.
    ///
    /// Negative or oversized values are rejected before any side effect.
    pub async fn request_set_count(&self, value: i64) -> Result<SyncOutcome, SyncError> {
        let new_value = validate(value)?;
        self.set_count_from(|_| Ok(new_value)).await
    }

    /// Moves the achieved count by `delta` from the value current when the
    /// request reaches the front of the queue.
    pub async fn adjust_count(&self, delta: i64) -> Result<SyncOutcome, SyncError> {
        self.set_count_from(|current| validate(i64::from(current).saturating_add(delta)))
            .await
    }

    /// Handles a click on glass slot `index`.
    pub async fn toggle_slot(&self, index: u32) -> Result<SyncOutcome, SyncError> {
        self.set_count_from(|current| Ok(toggle_target(index, current)))
            .await
    }

    async fn set_count_from<F>(&self, desired: F) -> Result<SyncOutcome, SyncError>
    where
        F: FnOnce(u32) -> Result<u32, SyncError>,
    {
        let _batch = self.gate.lock().await;

        let previous = self.state().current;
        let new_value = desired(previous)?;
        if new_value == previous {
            return Ok(SyncOutcome::Unchanged);
        }

        self.lock_state().current = new_value;
        self.emit_applied();

        match self.resource.dispatch_mode() {
            DispatchMode::Stepped => self.dispatch_steps(previous, new_value).await,
            DispatchMode::Absolute => self.dispatch_absolute(previous, new_value).await,
        }
    }

    /// Sets the daily goal with a single absolute call.
    pub async fn request_set_target(&self, value: i64) -> Result<SyncOutcome, SyncError> {
        let new_target = validate(value)?;
        let _batch = self.gate.lock().await;

        let previous = self.state().target;
        if new_target == previous {
            return Ok(SyncOutcome::Unchanged);
        }

        self.lock_state().target = new_target;
        self.emit_applied();

        match self.remote.set_target(self.resource, new_target).await {
            Ok(()) => {
                tracing::info!(
                    resource = %self.resource,
                    from = previous,
                    to = new_target,
                    "target updated"
                );
                self.emit(SyncEvent::TargetCommitted {
                    resource: self.resource,
                    from: previous,
                    to: new_target,
                });
                Ok(SyncOutcome::Committed {
                    from: previous,
                    to: new_target,
                    calls: 1,
                })
            }
            Err(source) => {
                self.lock_state().target = previous;
                tracing::warn!(
                    resource = %self.resource,
                    "target update failed, reverted to {}: {}",
                    previous,
                    source
                );
                self.emit(SyncEvent::SetFailed {
                    resource: self.resource,
                    reverted_to: previous,
                });
                Err(SyncError::SetFailed {
                    resource: self.resource,
                    reverted_to: previous,
                    source,
                })
            }
        }
    }

    async fn dispatch_steps(&self, previous: u32, new_value: u32) -> Result<SyncOutcome, SyncError> {
        let upward = new_value > previous;
        let attempted = previous.abs_diff(new_value);
        let direction = if upward { "increment" } else { "decrement" };

        for step in 1..=attempted {
            tracing::debug!(
                resource = %self.resource,
                step,
                attempted,
                direction,
                "dispatching step"
            );

            let result = if upward {
                self.remote.increment(self.resource).await
            } else {
                self.remote.decrement(self.resource).await
            };

            if let Err(source) = result {
                return Err(self.revert_steps(previous, step, attempted, source));
            }
        }

        tracing::info!(
            resource = %self.resource,
            from = previous,
            to = new_value,
            "count committed"
        );
        self.emit(SyncEvent::Committed {
            resource: self.resource,
            from: previous,
            to: new_value,
        });
        Ok(SyncOutcome::Committed {
            from: previous,
            to: new_value,
            calls: attempted,
        })
    }

    /// Restores the pre-batch count after step `failed_step` failed.
    ///
    /// Steps the server already acknowledged are not undone remotely; local
    /// and remote disagree until the next refresh.
    fn revert_steps(
        &self,
        previous: u32,
        failed_step: u32,
        attempted: u32,
        source: RemoteError,
    ) -> SyncError {
        let applied = failed_step - 1;
        self.lock_state().current = previous;

        tracing::warn!(
            resource = %self.resource,
            applied,
            attempted,
            "step {} failed, reverted to {}: {}",
            failed_step,
            previous,
            source
        );
        self.emit(SyncEvent::StepFailed {
            resource: self.resource,
            applied,
            attempted,
            reverted_to: previous,
        });

        SyncError::StepFailed {
            resource: self.resource,
            applied,
            attempted,
            failed_step,
            reverted_to: previous,
            source,
        }
    }

    async fn dispatch_absolute(
        &self,
        previous: u32,
        new_value: u32,
    ) -> Result<SyncOutcome, SyncError> {
        match self.remote.set_count(self.resource, new_value).await {
            Ok(()) => {
                tracing::info!(
                    resource = %self.resource,
                    from = previous,
                    to = new_value,
                    "count committed"
                );
                self.emit(SyncEvent::Committed {
                    resource: self.resource,
                    from: previous,
                    to: new_value,
                });
                Ok(SyncOutcome::Committed {
                    from: previous,
                    to: new_value,
                    calls: 1,
                })
            }
            Err(source) if source.is_unsupported() => {
                tracing::warn!(
                    resource = %self.resource,
                    "{}; keeping {} locally only",
                    source,
                    new_value
                );
                self.emit(SyncEvent::LocalOnly {
                    resource: self.resource,
                    from: previous,
                    to: new_value,
                });
                Ok(SyncOutcome::LocalOnly {
                    from: previous,
                    to: new_value,
                })
            }
            Err(source) => {
                self.lock_state().current = previous;
                tracing::warn!(
                    resource = %self.resource,
                    "count update failed, reverted to {}: {}",
                    previous,
                    source
                );
                self.emit(SyncEvent::SetFailed {
                    resource: self.resource,
                    reverted_to: previous,
                });
                Err(SyncError::SetFailed {
                    resource: self.resource,
                    reverted_to: previous,
                    source,
                })
            }
        }
    }

    fn emit_applied(&self) {
        self.emit(SyncEvent::Applied {
            resource: self.resource,
            state: self.state(),
        });
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, CounterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn validate(value: i64) -> Result<u32, SyncError> {
    u32::try_from(value).map_err(|_| SyncError::InvalidInput(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GlassRack, GlassStatus};
    use crate::sync::mock::{MockRemote, RemoteCall};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    const WATER: CounterResource = CounterResource::Hydration;
    const STEPS: CounterResource = CounterResource::Steps;

    fn water(current: u32, target: u32) -> (MockRemote, CounterSync<MockRemote>) {
        let state = CounterState::new(current, target);
        let remote = MockRemote::new().with_state(WATER, state);
        let engine = CounterSync::new(WATER, remote.clone()).with_state(state);
        (remote, engine)
    }

    #[tokio::test]
    async fn test_refresh_replaces_local_state() {
        let remote = MockRemote::new().with_state(WATER, CounterState::new(4, 10));
        let engine = CounterSync::new(WATER, remote).with_state(CounterState::new(1, 1));

        let state = engine.refresh().await.unwrap();

        assert_eq!(state, CounterState::new(4, 10));
        assert_eq!(engine.state(), CounterState::new(4, 10));
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_state() {
        let (remote, engine) = water(2, 8);
        remote.fail_next_fetch(RemoteError::Http("connection refused".into()));

        let err = engine.refresh().await.unwrap_err();

        assert!(matches!(err, SyncError::RefreshFailed { .. }));
        assert_eq!(engine.state(), CounterState::new(2, 8));
    }

    #[tokio::test]
    async fn test_increase_issues_one_increment_per_unit() {
        let (remote, engine) = water(2, 8);

        let outcome = engine.request_set_count(5).await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Committed {
                from: 2,
                to: 5,
                calls: 3
            }
        );
        assert_eq!(engine.state().current, 5);
        assert_eq!(remote.mutations(), vec![RemoteCall::Increment(WATER); 3]);
        assert_eq!(remote.state(WATER).current, 5);
    }

    #[tokio::test]
    async fn test_decrease_issues_one_decrement_per_unit() {
        let (remote, engine) = water(6, 8);

        engine.request_set_count(2).await.unwrap();

        assert_eq!(engine.state().current, 2);
        assert_eq!(remote.mutations(), vec![RemoteCall::Decrement(WATER); 4]);
    }

    #[tokio::test]
    async fn test_same_value_is_noop() {
        let (remote, engine) = water(3, 8);

        let outcome = engine.request_set_count(3).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_negative_value_rejected() {
        let (remote, engine) = water(3, 8);

        let err = engine.request_set_count(-1).await.unwrap_err();

        assert_eq!(err, SyncError::InvalidInput(-1));
        assert_eq!(engine.state(), CounterState::new(3, 8));
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_value_rejected() {
        let (remote, engine) = water(3, 8);
        let too_big = i64::from(u32::MAX) + 1;

        assert_eq!(
            engine.request_set_count(too_big).await,
            Err(SyncError::InvalidInput(too_big))
        );
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_step_stops_batch_and_reverts() {
        let (remote, engine) = water(1, 8);
        remote.fail_nth_mutation(2, RemoteError::Status(500));

        let err = engine.request_set_count(6).await.unwrap_err();

        match err {
            SyncError::StepFailed {
                applied,
                attempted,
                failed_step,
                reverted_to,
                ..
            } => {
                assert_eq!(applied, 1);
                assert_eq!(attempted, 5);
                assert_eq!(failed_step, 2);
                assert_eq!(reverted_to, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(engine.state().current, 1);
        // Steps 3..5 were never dispatched.
        assert_eq!(remote.mutations().len(), 2);
    }

    #[tokio::test]
    async fn test_first_step_failure_reverts() {
        let (remote, engine) = water(4, 8);
        remote.fail_nth_mutation(1, RemoteError::Http("timeout".into()));

        assert!(engine.request_set_count(0).await.is_err());
        assert_eq!(engine.state().current, 4);
        assert_eq!(remote.mutations(), vec![RemoteCall::Decrement(WATER)]);
    }

    #[tokio::test]
    async fn test_click_empty_slot_end_to_end() {
        let (remote, engine) = water(3, 8);
        let t0 = Instant::now();
        let mut rack = GlassRack::new(&engine.state(), 12, Duration::from_millis(1500));

        engine.toggle_slot(5).await.unwrap();
        rack.update(&engine.state(), t0);
        rack.poll(t0 + Duration::from_millis(1500));

        assert_eq!(engine.state(), CounterState::new(6, 8));
        assert_eq!(remote.mutations(), vec![RemoteCall::Increment(WATER); 3]);
        let filled: Vec<bool> = rack.units().iter().map(|u| u.filled()).collect();
        assert_eq!(
            filled,
            vec![true, true, true, true, true, true, false, false]
        );
    }

    #[tokio::test]
    async fn test_click_filled_slot_empties_from_there() {
        let (remote, engine) = water(5, 8);

        engine.toggle_slot(2).await.unwrap();

        assert_eq!(engine.state().current, 2);
        assert_eq!(remote.mutations(), vec![RemoteCall::Decrement(WATER); 3]);
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_remote_diverged() {
        let (remote, engine) = water(3, 8);
        remote.fail_nth_mutation(3, RemoteError::Status(502));

        let err = engine.request_set_count(6).await.unwrap_err();

        assert!(matches!(err, SyncError::StepFailed { applied: 2, .. }));
        assert_eq!(engine.state().current, 3);
        // Two increments already landed server-side and stay there.
        assert_eq!(remote.state(WATER).current, 5);

        // A refresh brings local state back in line.
        engine.refresh().await.unwrap();
        assert_eq!(engine.state().current, 5);
    }

    #[tokio::test]
    async fn test_failed_batch_snaps_glasses_back() {
        let (remote, engine) = water(3, 8);
        remote.fail_nth_mutation(1, RemoteError::Status(500));
        let t0 = Instant::now();
        let mut rack = GlassRack::new(&engine.state(), 12, Duration::from_millis(1500));

        let _ = engine.request_set_count(4).await;
        rack.update(&engine.state(), t0);

        assert_eq!(rack.statuses()[3], GlassStatus::Empty);
        assert!(rack.is_settled());
    }

    #[tokio::test]
    async fn test_events_published() {
        let (remote, engine) = water(0, 8);
        let mut events = engine.subscribe();

        engine.request_set_count(1).await.unwrap();
        remote.fail_nth_mutation(1, RemoteError::Status(500));
        let _ = engine.request_set_count(2).await;

        assert_eq!(
            events.try_recv().unwrap(),
            SyncEvent::Applied {
                resource: WATER,
                state: CounterState::new(1, 8)
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SyncEvent::Committed {
                resource: WATER,
                from: 0,
                to: 1
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SyncEvent::Applied {
                resource: WATER,
                state: CounterState::new(2, 8)
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SyncEvent::StepFailed {
                resource: WATER,
                applied: 0,
                attempted: 1,
                reverted_to: 1
            }
        );
    }

    #[tokio::test]
    async fn test_adjust_count() {
        let (_, engine) = water(3, 8);

        engine.adjust_count(2).await.unwrap();
        assert_eq!(engine.state().current, 5);

        engine.adjust_count(-5).await.unwrap();
        assert_eq!(engine.state().current, 0);

        assert_eq!(
            engine.adjust_count(-1).await,
            Err(SyncError::InvalidInput(-1))
        );
    }

    #[tokio::test]
    async fn test_set_target_single_call() {
        let (remote, engine) = water(3, 8);

        let outcome = engine.request_set_target(10).await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Committed {
                from: 8,
                to: 10,
                calls: 1
            }
        );
        assert_eq!(remote.mutations(), vec![RemoteCall::SetTarget(WATER, 10)]);
        assert_eq!(engine.state(), CounterState::new(3, 10));
    }

    #[tokio::test]
    async fn test_set_target_failure_reverts() {
        let (remote, engine) = water(3, 8);
        remote.fail_nth_mutation(1, RemoteError::Status(500));

        let err = engine.request_set_target(12).await.unwrap_err();

        assert!(matches!(err, SyncError::SetFailed { reverted_to: 8, .. }));
        assert_eq!(engine.state().target, 8);
    }

    #[tokio::test]
    async fn test_set_target_rejects_negative() {
        let (remote, engine) = water(3, 8);
        assert!(engine.request_set_target(-4).await.is_err());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_steps_use_absolute_set() {
        let remote = MockRemote::new().with_state(STEPS, CounterState::new(1000, 8000));
        let engine =
            CounterSync::new(STEPS, remote.clone()).with_state(CounterState::new(1000, 8000));

        let outcome = engine.request_set_count(4500).await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Committed {
                from: 1000,
                to: 4500,
                calls: 1
            }
        );
        assert_eq!(remote.mutations(), vec![RemoteCall::SetCount(STEPS, 4500)]);
    }

    #[tokio::test]
    async fn test_steps_fall_back_to_local_only() {
        let remote = MockRemote::new().without_set_count();
        let engine = CounterSync::new(STEPS, remote.clone()).with_state(CounterState::new(0, 8000));

        let outcome = engine.request_set_count(3000).await.unwrap();

        assert_eq!(outcome, SyncOutcome::LocalOnly { from: 0, to: 3000 });
        assert_eq!(engine.state().current, 3000);
        assert_eq!(remote.state(STEPS).current, 0);
    }

    #[tokio::test]
    async fn test_steps_set_failure_reverts() {
        let remote = MockRemote::new();
        remote.fail_nth_mutation(1, RemoteError::Status(503));
        let engine = CounterSync::new(STEPS, remote).with_state(CounterState::new(200, 8000));

        let err = engine.request_set_count(900).await.unwrap_err();

        assert!(matches!(err, SyncError::SetFailed { reverted_to: 200, .. }));
        assert_eq!(engine.state().current, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_optimistic_value_visible_mid_batch() {
        let remote = MockRemote::new().with_latency(Duration::from_millis(100));
        let engine = Arc::new(CounterSync::new(WATER, remote).with_state(CounterState::new(0, 8)));

        let task = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.request_set_count(3).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.state().current, 3);

        task.await.unwrap().unwrap();
        assert_eq!(engine.state().current, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_queues_behind_batch() {
        let remote = MockRemote::new().with_latency(Duration::from_millis(100));
        let engine = Arc::new(
            CounterSync::new(WATER, remote.clone()).with_state(CounterState::new(0, 8)),
        );

        let first = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.request_set_count(3).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.request_set_count(1).await }
        });

        assert_eq!(
            first.await.unwrap().unwrap(),
            SyncOutcome::Committed {
                from: 0,
                to: 3,
                calls: 3
            }
        );
        assert_eq!(
            second.await.unwrap().unwrap(),
            SyncOutcome::Committed {
                from: 3,
                to: 1,
                calls: 2
            }
        );

        let mut expected = vec![RemoteCall::Increment(WATER); 3];
        expected.extend([RemoteCall::Decrement(WATER); 2]);
        assert_eq!(remote.mutations(), expected);
        assert_eq!(remote.state(WATER).current, 1);
    }
}
