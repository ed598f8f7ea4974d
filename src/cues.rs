//! Audio cues.
//!
//! One player is created at startup and handed to the commands that need it.
//! `init` is idempotent: the first call probes the terminal, later calls
//! reuse that answer.

use std::io::{IsTerminal, Write};
use std::sync::OnceLock;

use fitquest_core::SyncEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    Fill,
    Empty,
    Goal,
    Error,
}

impl CueKind {
    /// Cue for a sync notification, if any.
    pub fn for_event(event: &SyncEvent) -> Option<Self> {
        match event {
            SyncEvent::Committed { from, to, .. } | SyncEvent::LocalOnly { from, to, .. } => {
                if to > from {
                    Some(CueKind::Fill)
                } else {
                    Some(CueKind::Empty)
                }
            }
            SyncEvent::StepFailed { .. } | SyncEvent::SetFailed { .. } => Some(CueKind::Error),
            SyncEvent::Applied { .. }
            | SyncEvent::Refreshed { .. }
            | SyncEvent::TargetCommitted { .. } => None,
        }
    }

    fn bells(&self) -> usize {
        match self {
            CueKind::Fill | CueKind::Error => 1,
            CueKind::Empty => 0,
            CueKind::Goal => 2,
        }
    }
}

pub trait CuePlayer {
    /// Prepares the output. Safe to call more than once.
    fn init(&self);

    fn play_cue(&self, kind: CueKind);
}

/// Rings the terminal bell on stderr.
#[derive(Debug)]
pub struct TerminalCues {
    enabled: bool,
    ready: OnceLock<bool>,
}

impl TerminalCues {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ready: OnceLock::new(),
        }
    }

    fn ready(&self) -> bool {
        *self
            .ready
            .get_or_init(|| self.enabled && std::io::stderr().is_terminal())
    }
}

impl CuePlayer for TerminalCues {
    fn init(&self) {
        let ready = self.ready();
        tracing::debug!(ready, "audio cues initialized");
    }

    fn play_cue(&self, kind: CueKind) {
        if !self.ready() {
            return;
        }
        tracing::debug!(?kind, "playing cue");
        let mut stderr = std::io::stderr();
        for _ in 0..kind.bells() {
            let _ = stderr.write_all(b"\x07");
        }
        let _ = stderr.flush();
    }
}

/// Plays nothing.
#[derive(Debug, Default)]
pub struct SilentCues;

impl CuePlayer for SilentCues {
    fn init(&self) {}

    fn play_cue(&self, _kind: CueKind) {}
}
