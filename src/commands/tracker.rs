//! Shared plumbing for counter commands: opening a synced counter, reporting
//! outcomes and turning notifications into cues.

use chrono::NaiveDate;
use fitquest_core::{
    CounterRemote, CounterResource, CounterState, CounterSync, HttpRemote, RemoteError,
    SyncError, SyncEvent, SyncOutcome,
};
use tokio::sync::broadcast;

use crate::config::Config;
use crate::cues::{CueKind, CuePlayer};

/// Everything a counter command needs besides its own arguments.
pub struct CommandContext<'a> {
    pub config: &'a Config,
    pub date: NaiveDate,
    pub cues: &'a dyn CuePlayer,
}

/// One user-requested change to a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Adjust(i64),
    SetCount(i64),
    Toggle(u32),
    SetTarget(i64),
}

/// A counter loaded from the backend for the duration of one command.
pub struct CounterSession<'a, R> {
    pub engine: CounterSync<R>,
    events: broadcast::Receiver<SyncEvent>,
    cues: &'a dyn CuePlayer,
}

impl<'a> CounterSession<'a, HttpRemote> {
    /// Connects to the configured backend and loads the day's counter.
    pub async fn open(
        resource: CounterResource,
        ctx: &CommandContext<'a>,
    ) -> Result<Self, CommandError> {
        let remote = HttpRemote::new(
            ctx.config.server_url.value.as_str(),
            ctx.config.api_key.clone(),
        )
        .with_timeout(ctx.config.request_timeout())?
        .with_date(ctx.date);

        Self::load(CounterSync::new(resource, remote), ctx.cues).await
    }
}

impl<'a, R: CounterRemote> CounterSession<'a, R> {
    /// Refreshes `engine` and starts listening to its notifications.
    pub async fn load(engine: CounterSync<R>, cues: &'a dyn CuePlayer) -> Result<Self, CommandError> {
        let events = engine.subscribe();
        engine.refresh().await?;
        Ok(Self {
            engine,
            events,
            cues,
        })
    }

    pub fn state(&self) -> CounterState {
        self.engine.state()
    }

    /// Runs `change` against the engine, handling notifications as they arrive.
    ///
    /// `on_applied` sees the optimistic state before the remote answers. Every
    /// event is handled in publish order, so the optimistic value is always
    /// reported before a failure snaps it back.
    pub async fn apply<F>(
        &mut self,
        change: Change,
        mut on_applied: F,
    ) -> Result<SyncOutcome, SyncError>
    where
        F: FnMut(CounterState),
    {
        let engine = &self.engine;
        let events = &mut self.events;
        let cues = self.cues;

        let request = async {
            match change {
                Change::Adjust(delta) => engine.adjust_count(delta).await,
                Change::SetCount(value) => engine.request_set_count(value).await,
                Change::Toggle(index) => engine.toggle_slot(index).await,
                Change::SetTarget(value) => engine.request_set_target(value).await,
            }
        };
        tokio::pin!(request);

        let result = loop {
            tokio::select! {
                biased;
                received = events.recv() => match received {
                    Ok(event) => handle_event(&event, cues, &mut on_applied),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "sync events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break (&mut request).await,
                },
                result = &mut request => break result,
            }
        };

        while let Ok(event) = events.try_recv() {
            handle_event(&event, cues, &mut on_applied);
        }
        result
    }

    /// Reports the result of one mutation.
    ///
    /// Step and set failures were already reverted by the engine; they are
    /// shown as a notification and do not fail the command.
    pub fn finish(
        &mut self,
        before: CounterState,
        result: Result<SyncOutcome, SyncError>,
    ) -> Result<(), CommandError> {
        self.drain_events();

        match result {
            Ok(SyncOutcome::Unchanged) => println!("No change."),
            Ok(SyncOutcome::Committed { .. }) | Ok(SyncOutcome::LocalOnly { .. }) => {}
            Err(e @ (SyncError::StepFailed { .. } | SyncError::SetFailed { .. })) => {
                eprintln!("✗ {}", e);
            }
            Err(e) => return Err(e.into()),
        }

        let after = self.state();
        if !before.goal_reached() && after.goal_reached() {
            self.cues.play_cue(CueKind::Goal);
            println!("Daily goal reached!");
        }
        Ok(())
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            handle_event(&event, self.cues, &mut |_: CounterState| {});
        }
    }
}

fn handle_event(event: &SyncEvent, cues: &dyn CuePlayer, on_applied: &mut dyn FnMut(CounterState)) {
    tracing::debug!(?event, "sync event");
    if let SyncEvent::Applied { state, .. } = event {
        on_applied(*state);
    }
    if let Some(kind) = CueKind::for_event(event) {
        cues.play_cue(kind);
    }
}

/// `Hydration 2025-03-14: 6 glasses of 8 (75%)`
///
/// The unit agrees with the achieved count, not the goal.
pub fn summary_line(resource: CounterResource, date: NaiveDate, state: &CounterState) -> String {
    let label = match resource {
        CounterResource::Hydration => "Hydration",
        CounterResource::Steps => "Steps",
    };
    format!(
        "{} {}: {} {} of {} ({}%)",
        label,
        date.format("%Y-%m-%d"),
        state.current,
        resource.unit(state.current),
        state.target,
        state.percent()
    )
}

/// Fixed-width progress bar, e.g. `[#####...............]`.
pub fn progress_bar(state: &CounterState, width: usize) -> String {
    let filled = (state.percent() as usize * width) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

/// Errors from counter commands
#[derive(Debug)]
pub enum CommandError {
    Sync(SyncError),
    Remote(RemoteError),
    InvalidSlot(u32),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Sync(e) => write!(f, "{}", e),
            CommandError::Remote(e) => write!(f, "{}", e),
            CommandError::InvalidSlot(slot) => {
                write!(f, "Invalid glass {}: pick one of the glasses shown", slot)
            }
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Sync(e) => Some(e),
            CommandError::Remote(e) => Some(e),
            CommandError::InvalidSlot(_) => None,
        }
    }
}

impl From<SyncError> for CommandError {
    fn from(e: SyncError) -> Self {
        CommandError::Sync(e)
    }
}

impl From<RemoteError> for CommandError {
    fn from(e: RemoteError) -> Self {
        CommandError::Remote(e)
    }
}
