//! Report viewing session
//!
//! A [`Session`] owns everything that belongs to one report id: the two
//! accumulated log collections and the [`ReportState`] folded from the agent
//! log. Switching to another report builds a new session and replaces the old
//! one in a single assignment, so nothing from the previous report survives.
//!
//! ```rust,ignore
//! let mut session = Session::new("report_1", OutlinePolicy::default());
//! // ... later, on a report switch
//! session = session.switch_to("report_2");
//! ```
//!
//! Batches coming from the poller are tagged with the report id and the
//! session generation. [`Session::ingest`] drops anything whose tag does not
//! match, which covers requests that were in flight while a switch happened.

mod state;

pub use state::{ReportState, SectionStatus, SessionEffect};

use crate::config::OutlinePolicy;
use crate::console::ConsoleLine;
use crate::feed::{Batch, FeedUpdate};
use crate::types::LogEntry;

/// All state for one report id
#[derive(Debug, Clone)]
pub struct Session {
    report_id: String,
    generation: u64,
    outline_policy: OutlinePolicy,
    agent_logs: Vec<LogEntry>,
    console_logs: Vec<ConsoleLine>,
    state: ReportState,
}

impl Session {
    /// Fresh session at generation 0
    pub fn new(report_id: &str, outline_policy: OutlinePolicy) -> Self {
        Self::with_generation(report_id, 0, outline_policy)
    }

    pub fn with_generation(report_id: &str, generation: u64, outline_policy: OutlinePolicy) -> Self {
        Self {
            report_id: report_id.trim().to_string(),
            generation,
            outline_policy,
            agent_logs: Vec::new(),
            console_logs: Vec::new(),
            state: ReportState::default(),
        }
    }

    /// Build the session that replaces this one.
    ///
    /// The new session starts empty with the next generation, even when the
    /// report id is unchanged.
    pub fn switch_to(&self, report_id: &str) -> Self {
        tracing::info!(
            from = %self.report_id,
            to = %report_id.trim(),
            generation = self.generation + 1,
            "Switching report session"
        );
        Self::with_generation(report_id, self.generation + 1, self.outline_policy)
    }

    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn outline_policy(&self) -> OutlinePolicy {
        self.outline_policy
    }

    pub fn agent_logs(&self) -> &[LogEntry] {
        &self.agent_logs
    }

    pub fn console_logs(&self) -> &[ConsoleLine] {
        &self.console_logs
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ReportState {
        &mut self.state
    }

    /// Whether an update was fetched for this session
    pub fn accepts(&self, update: &FeedUpdate) -> bool {
        update.generation == self.generation && update.report_id == self.report_id
    }

    /// Apply a tagged batch from the poller.
    ///
    /// Stale batches are dropped without touching any state.
    pub fn ingest(&mut self, update: FeedUpdate) -> Vec<SessionEffect> {
        if !self.accepts(&update) {
            tracing::debug!(
                report_id = %update.report_id,
                generation = update.generation,
                current_generation = self.generation,
                "Dropping stale batch"
            );
            return Vec::new();
        }

        match update.batch {
            Batch::Agent(entries) => self.apply_entries(entries),
            Batch::Console(lines) => {
                self.console_logs.extend(lines);
                Vec::new()
            }
        }
    }

    /// Append agent entries in order and fold each into the state
    pub fn apply_entries(&mut self, entries: impl IntoIterator<Item = LogEntry>) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        for entry in entries {
            if let Some(effect) = self.state.apply(&entry, self.outline_policy) {
                effects.push(effect);
            }
            self.agent_logs.push(entry);
        }
        effects
    }

    /// Index of the most recent `tool_result` entry, if any
    pub fn last_tool_result(&self) -> Option<usize> {
        self.agent_logs
            .iter()
            .rposition(|entry| entry.tool_result().is_some())
    }
}
