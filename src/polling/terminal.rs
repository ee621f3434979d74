//! Terminal-state polling for allocation requests

use super::{Deadline, PollSettings, whole_millis};
use crate::clock::Clock;
use crate::control_plane::{ResourceClient, ResourceSnapshot};
use crate::errors::Result;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Final classification of an allocation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalOutcome {
    Allocated,
    UnAllocated,
    /// The configured deadline elapsed before a terminal state was observed
    TimedOut,
}

impl TerminalOutcome {
    /// Classify an allocation state string; `None` means keep polling
    pub fn from_state(state: &str) -> Option<Self> {
        match state {
            "Allocated" => Some(Self::Allocated),
            "UnAllocated" => Some(Self::UnAllocated),
            _ => None,
        }
    }

    /// Label of the measured event that reports this outcome
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allocated => "GameServerAllocated",
            Self::UnAllocated => "GameServerUnAllocated",
            Self::TimedOut => "GameServerAllocationTimedOut",
        }
    }
}

impl fmt::Display for TerminalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Allocated => "Allocated",
            Self::UnAllocated => "UnAllocated",
            Self::TimedOut => "TimedOut",
        };
        f.write_str(name)
    }
}

/// Result of one polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub outcome: TerminalOutcome,
    /// Time from the allocation POST to the terminal observation
    pub duration_ms: u64,
    /// Follow-up fetches issued after the initial response
    pub fetches: u64,
}

/// Polls an allocation until its status settles on a terminal state
#[derive(Debug, Clone)]
pub struct TerminalPoller {
    client: Arc<dyn ResourceClient>,
    clock: Arc<dyn Clock>,
    settings: PollSettings,
}

impl TerminalPoller {
    pub fn new(
        client: Arc<dyn ResourceClient>,
        clock: Arc<dyn Clock>,
        settings: PollSettings,
    ) -> Self {
        Self {
            client,
            clock,
            settings,
        }
    }

    /// Poll from the response to the allocation POST until a terminal state.
    ///
    /// `posted_at` is when the POST was issued. A snapshot without `status`
    /// is re-fetched through its self-link; a status whose state is neither
    /// `Allocated` nor `UnAllocated` is re-fetched as well. Polling stops at
    /// the first terminal snapshot, or reports [`TerminalOutcome::TimedOut`]
    /// once the deadline has passed. Transport and parse failures propagate.
    pub async fn poll_until_terminal(
        &self,
        initial: ResourceSnapshot,
        posted_at: Instant,
    ) -> Result<Measurement> {
        let deadline = Deadline::new(posted_at, self.settings.deadline);
        let mut snapshot = initial;
        let mut fetches = 0u64;

        loop {
            if let Some(outcome) = snapshot.state().and_then(TerminalOutcome::from_state) {
                let duration_ms = whole_millis(deadline.elapsed(self.clock.as_ref()));
                debug!(
                    "Allocation reached {} after {}ms ({} polls)",
                    outcome, duration_ms, fetches
                );
                return Ok(Measurement {
                    outcome,
                    duration_ms,
                    fetches,
                });
            }

            if deadline.expired(self.clock.as_ref()) {
                let duration_ms = whole_millis(deadline.elapsed(self.clock.as_ref()));
                debug!(
                    "Allocation still pending after {}ms ({} polls), giving up",
                    duration_ms, fetches
                );
                return Ok(Measurement {
                    outcome: TerminalOutcome::TimedOut,
                    duration_ms,
                    fetches,
                });
            }

            trace!("Allocation not terminal yet (state {:?})", snapshot.state());
            if fetches > 0 {
                self.settings.pace().await;
            }
            let self_link = snapshot.self_link()?.to_string();
            snapshot = self.client.get(&self_link).await?;
            fetches += 1;
        }
    }
}
