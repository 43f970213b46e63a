//! Derived report state and the reducer that folds agent log entries into it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::OutlinePolicy;
use crate::types::{ActionKind, LogEntry, ReportOutline};

/// Side effect requested by the reducer.
///
/// The reducer never performs I/O itself; the owner of the session acts on
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    /// The report finished: publish `status = completed` and stop both streams
    StatusCompleted,
}

/// Progress of one outline section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Pending,
    InProgress,
    Completed,
}

impl SectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionStatus::Pending => "pending",
            SectionStatus::InProgress => "in_progress",
            SectionStatus::Completed => "completed",
        }
    }
}

/// State derived from the agent log of one report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportState {
    pub outline: Option<ReportOutline>,
    /// 1-based section index to final content
    pub generated_sections: BTreeMap<u32, String>,
    /// Sections whose body is shown expanded
    pub expanded: BTreeSet<u32>,
    pub current_section: Option<u32>,
    pub completed: bool,
    /// `report_start` timestamp in epoch milliseconds
    pub started_at: Option<i64>,
    /// Most recent `elapsed_seconds` reported by the workflow
    pub last_elapsed_seconds: Option<f64>,
}

impl ReportState {
    /// Fold one entry into the state.
    ///
    /// Rules are evaluated independently; an entry can trigger more than one.
    /// Entries missing the payload a rule needs are ignored by that rule.
    pub fn apply(&mut self, entry: &LogEntry, policy: OutlinePolicy) -> Option<SessionEffect> {
        if let Some(elapsed) = entry.elapsed_seconds {
            self.last_elapsed_seconds = Some(elapsed);
        }

        match &entry.action {
            ActionKind::ReportStart => {
                self.started_at = Some(entry.timestamp);
                None
            }
            ActionKind::PlanningComplete => {
                if let Some(outline) = entry.outline() {
                    self.set_outline(outline, policy);
                }
                None
            }
            ActionKind::SectionStart => {
                if entry.section_index.is_some() {
                    self.current_section = entry.section_index;
                }
                None
            }
            ActionKind::SectionComplete => {
                if let (Some(index), Some(content)) = (entry.section_index, entry.content()) {
                    self.generated_sections.insert(index, content.to_string());
                    self.expanded.insert(index);
                }
                self.current_section = None;
                None
            }
            ActionKind::ReportComplete => {
                if self.completed {
                    return None;
                }
                self.completed = true;
                self.current_section = None;
                Some(SessionEffect::StatusCompleted)
            }
            // Drafts, tool traffic and model responses only feed the timeline.
            ActionKind::PlanningStart
            | ActionKind::SectionContent
            | ActionKind::SubsectionContent
            | ActionKind::ToolCall
            | ActionKind::ToolResult
            | ActionKind::LlmResponse
            | ActionKind::Unknown(_) => None,
        }
    }

    fn set_outline(&mut self, outline: &ReportOutline, policy: OutlinePolicy) {
        match (policy, &self.outline) {
            (OutlinePolicy::FirstWriteWins, Some(_)) => {
                tracing::debug!("Ignoring repeated outline");
            }
            _ => self.outline = Some(outline.clone()),
        }
    }

    pub fn total_sections(&self) -> usize {
        self.outline
            .as_ref()
            .map(|outline| outline.sections.len())
            .unwrap_or(0)
    }

    pub fn completed_sections(&self) -> usize {
        self.generated_sections.len()
    }

    /// Completed share of the outline, rounded to a whole percent.
    ///
    /// 0 when there is no outline. Capped at 100 when more sections were
    /// generated than planned.
    pub fn completion_percent(&self) -> u8 {
        let total = self.total_sections();
        if total == 0 {
            return 0;
        }
        let percent = (self.completed_sections() as f64 / total as f64 * 100.0).round();
        percent.min(100.0) as u8
    }

    /// Status of a section by 1-based index
    pub fn section_status(&self, index: u32) -> SectionStatus {
        if self.generated_sections.contains_key(&index) {
            SectionStatus::Completed
        } else if self.current_section == Some(index) {
            SectionStatus::InProgress
        } else {
            SectionStatus::Pending
        }
    }

    pub fn section_content(&self, index: u32) -> Option<&str> {
        self.generated_sections.get(&index).map(String::as_str)
    }

    pub fn is_expanded(&self, index: u32) -> bool {
        self.expanded.contains(&index)
    }

    /// Flip the expanded flag of a section; returns the new value
    pub fn toggle_section(&mut self, index: u32) -> bool {
        if self.expanded.remove(&index) {
            false
        } else {
            self.expanded.insert(index);
            true
        }
    }

    /// Time spent on the report so far.
    ///
    /// Once complete, the workflow's own `elapsed_seconds` is preferred. While
    /// running, the wall clock since `report_start` is used.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        if self.completed {
            if let Some(seconds) = self.last_elapsed_seconds {
                return Some(chrono::Duration::milliseconds((seconds * 1000.0) as i64));
            }
        }
        let started = DateTime::from_timestamp_millis(self.started_at?)?;
        let elapsed = now.signed_duration_since(started);
        Some(elapsed.max(chrono::Duration::zero()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryDetails, OutlineSection};

    fn outline(titles: &[&str]) -> ReportOutline {
        ReportOutline {
            title: "Forecast".to_string(),
            summary: String::new(),
            sections: titles
                .iter()
                .map(|title| OutlineSection {
                    title: title.to_string(),
                    description: String::new(),
                })
                .collect(),
        }
    }

    fn planning_complete(titles: &[&str]) -> LogEntry {
        LogEntry::new(ActionKind::PlanningComplete, 1).with_details(EntryDetails {
            outline: Some(outline(titles)),
            ..Default::default()
        })
    }

    fn section_complete(index: u32, content: &str) -> LogEntry {
        LogEntry::new(ActionKind::SectionComplete, 3)
            .with_section(index, format!("Section {}", index))
            .with_details(EntryDetails {
                content: Some(content.to_string()),
                ..Default::default()
            })
    }

    #[test]
    fn test_section_start_then_complete() {
        let mut state = ReportState::default();
        state.apply(&planning_complete(&["A", "B", "C", "D"]), OutlinePolicy::default());

        state.apply(
            &LogEntry::new(ActionKind::SectionStart, 2).with_section(1, "A"),
            OutlinePolicy::default(),
        );
        assert_eq!(state.current_section, Some(1));
        assert_eq!(state.section_status(1), SectionStatus::InProgress);

        state.apply(&section_complete(1, "Body"), OutlinePolicy::default());
        assert_eq!(state.current_section, None);
        assert_eq!(state.section_content(1), Some("Body"));
        assert!(state.is_expanded(1));
        assert_eq!(state.section_status(1), SectionStatus::Completed);
        assert_eq!(state.completed_sections(), 1);
        assert_eq!(state.completion_percent(), 25);
    }

    #[test]
    fn test_drafts_do_not_touch_generated_sections() {
        let mut state = ReportState::default();
        let draft = LogEntry::new(ActionKind::SectionContent, 2)
            .with_section(1, "A")
            .with_details(EntryDetails {
                content: Some("partial".to_string()),
                ..Default::default()
            });
        let mut sub = draft.clone();
        sub.action = ActionKind::SubsectionContent;

        assert_eq!(state.apply(&draft, OutlinePolicy::default()), None);
        assert_eq!(state.apply(&sub, OutlinePolicy::default()), None);
        assert!(state.generated_sections.is_empty());
    }

    #[test]
    fn test_section_complete_without_content_only_clears_current() {
        let mut state = ReportState {
            current_section: Some(2),
            ..Default::default()
        };
        state.apply(
            &LogEntry::new(ActionKind::SectionComplete, 1).with_section(2, "B"),
            OutlinePolicy::default(),
        );
        assert_eq!(state.current_section, None);
        assert!(state.generated_sections.is_empty());
    }

    #[test]
    fn test_outline_first_write_wins() {
        let mut state = ReportState::default();
        state.apply(&planning_complete(&["A"]), OutlinePolicy::FirstWriteWins);
        state.apply(&planning_complete(&["X", "Y"]), OutlinePolicy::FirstWriteWins);
        assert_eq!(state.total_sections(), 1);
    }

    #[test]
    fn test_outline_last_write_wins() {
        let mut state = ReportState::default();
        state.apply(&planning_complete(&["A"]), OutlinePolicy::LastWriteWins);
        state.apply(&planning_complete(&["X", "Y"]), OutlinePolicy::LastWriteWins);
        assert_eq!(state.total_sections(), 2);
    }

    #[test]
    fn test_planning_complete_without_outline_is_ignored() {
        let mut state = ReportState::default();
        state.apply(
            &LogEntry::new(ActionKind::PlanningComplete, 1),
            OutlinePolicy::default(),
        );
        assert!(state.outline.is_none());
        assert_eq!(state.completion_percent(), 0);
    }

    #[test]
    fn test_completion_is_monotonic_and_clamped() {
        let mut state = ReportState::default();
        state.apply(&planning_complete(&["A", "B"]), OutlinePolicy::default());

        let mut last = 0;
        for index in [1, 1, 2, 3] {
            state.apply(&section_complete(index, "x"), OutlinePolicy::default());
            assert!(state.completed_sections() >= last);
            last = state.completed_sections();
        }
        assert_eq!(state.completed_sections(), 3);
        assert_eq!(state.completion_percent(), 100);
    }

    #[test]
    fn test_completion_rounds() {
        let mut state = ReportState::default();
        state.apply(&planning_complete(&["A", "B", "C"]), OutlinePolicy::default());
        state.apply(&section_complete(1, "x"), OutlinePolicy::default());
        assert_eq!(state.completion_percent(), 33);
        state.apply(&section_complete(2, "x"), OutlinePolicy::default());
        assert_eq!(state.completion_percent(), 67);
    }

    #[test]
    fn test_report_complete_emits_once() {
        let mut state = ReportState::default();
        let done = LogEntry::new(ActionKind::ReportComplete, 9);
        assert_eq!(
            state.apply(&done, OutlinePolicy::default()),
            Some(SessionEffect::StatusCompleted)
        );
        assert!(state.completed);
        assert_eq!(state.apply(&done, OutlinePolicy::default()), None);
    }

    #[test]
    fn test_unknown_action_is_ignored() {
        let mut state = ReportState::default();
        let entry = LogEntry::new(ActionKind::Unknown("reflection".to_string()), 1);
        assert_eq!(state.apply(&entry, OutlinePolicy::default()), None);
        assert_eq!(state, ReportState::default());
    }

    #[test]
    fn test_toggle_section() {
        let mut state = ReportState::default();
        assert!(state.toggle_section(3));
        assert!(state.is_expanded(3));
        assert!(!state.toggle_section(3));
        assert!(!state.is_expanded(3));
    }

    #[test]
    fn test_elapsed() {
        let mut state = ReportState::default();
        let now = DateTime::from_timestamp_millis(70_000).unwrap();
        assert!(state.elapsed(now).is_none());

        state.apply(&LogEntry::new(ActionKind::ReportStart, 10_000), OutlinePolicy::default());
        assert_eq!(state.elapsed(now), Some(chrono::Duration::seconds(60)));

        let mut done = LogEntry::new(ActionKind::ReportComplete, 80_000);
        done.elapsed_seconds = Some(42.5);
        state.apply(&done, OutlinePolicy::default());
        assert_eq!(state.elapsed(now), Some(chrono::Duration::milliseconds(42_500)));
    }
}
