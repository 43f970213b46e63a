//! Core domain types for reportwatch
//!
//! These types model what the report backend writes to its agent log and how
//! the monitor refers to the two log streams.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Report** | One run of the report-generation workflow, identified by a report id |
//! | **Agent log** | Append-only stream of workflow lifecycle events ([`LogEntry`]) |
//! | **Console log** | Append-only stream of plain-text operational lines |
//! | **Outline** | The planned report structure ([`ReportOutline`]) |
//! | **Section** | One titled unit of the report, addressed by a 1-based index |
//! | **Tool result** | Free-text payload returned by a research tool the workflow invoked |
//!
//! Log payloads are loosely typed on the wire. Every optional field here is
//! decoded leniently: a field with an unexpected shape is treated as absent
//! rather than failing the whole entry.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================
// Streams
// ============================================

/// The two log streams exposed by the report backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Agent,
    Console,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Agent => "agent",
            StreamKind::Console => "console",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Action Kinds
// ============================================

/// What happened in a single agent log entry.
///
/// The set is closed on the backend side, but values this build does not know
/// about are kept verbatim in [`ActionKind::Unknown`] so they can still be shown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    ReportStart,
    PlanningStart,
    PlanningComplete,
    SectionStart,
    SectionContent,
    SubsectionContent,
    SectionComplete,
    ToolCall,
    ToolResult,
    LlmResponse,
    ReportComplete,
    Unknown(String),
}

impl ActionKind {
    /// Returns the wire identifier for this action
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::ReportStart => "report_start",
            ActionKind::PlanningStart => "planning_start",
            ActionKind::PlanningComplete => "planning_complete",
            ActionKind::SectionStart => "section_start",
            ActionKind::SectionContent => "section_content",
            ActionKind::SubsectionContent => "subsection_content",
            ActionKind::SectionComplete => "section_complete",
            ActionKind::ToolCall => "tool_call",
            ActionKind::ToolResult => "tool_result",
            ActionKind::LlmResponse => "llm_response",
            ActionKind::ReportComplete => "report_complete",
            ActionKind::Unknown(raw) => raw,
        }
    }

    /// Returns the timeline label for this action.
    ///
    /// Unknown actions fall back to their raw identifier.
    pub fn label(&self) -> &str {
        match self {
            ActionKind::ReportStart => "Report started",
            ActionKind::PlanningStart => "Planning",
            ActionKind::PlanningComplete => "Outline ready",
            ActionKind::SectionStart => "Section started",
            ActionKind::SectionContent => "Section draft",
            ActionKind::SubsectionContent => "Subsection draft",
            ActionKind::SectionComplete => "Section complete",
            ActionKind::ToolCall => "Tool call",
            ActionKind::ToolResult => "Tool result",
            ActionKind::LlmResponse => "Model response",
            ActionKind::ReportComplete => "Report complete",
            ActionKind::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ActionKind::Unknown(_))
    }
}

impl From<&str> for ActionKind {
    fn from(s: &str) -> Self {
        match s {
            "report_start" => ActionKind::ReportStart,
            "planning_start" => ActionKind::PlanningStart,
            "planning_complete" => ActionKind::PlanningComplete,
            "section_start" => ActionKind::SectionStart,
            "section_content" => ActionKind::SectionContent,
            "subsection_content" => ActionKind::SubsectionContent,
            "section_complete" => ActionKind::SectionComplete,
            "tool_call" => ActionKind::ToolCall,
            "tool_result" => ActionKind::ToolResult,
            "llm_response" => ActionKind::LlmResponse,
            "report_complete" => ActionKind::ReportComplete,
            other => ActionKind::Unknown(other.to_string()),
        }
    }
}

impl From<String> for ActionKind {
    fn from(s: String) -> Self {
        ActionKind::from(s.as_str())
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Outline
// ============================================

/// Planned structure of the report, published once planning completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportOutline {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_sections")]
    pub sections: Vec<OutlineSection>,
}

/// One planned section of the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

// ============================================
// Log Entries
// ============================================

/// One entry of the agent log.
///
/// Entries are immutable once received. Their position in the stream is their
/// identity; timestamps may repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch (0 when absent or unparseable)
    #[serde(default, deserialize_with = "timestamp_millis")]
    pub timestamp: i64,
    pub action: ActionKind,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub section_index: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub details: Option<EntryDetails>,
}

impl LogEntry {
    /// Create an entry with only an action and timestamp set
    pub fn new(action: ActionKind, timestamp: i64) -> Self {
        Self {
            timestamp,
            action,
            section_index: None,
            section_title: None,
            elapsed_seconds: None,
            details: None,
        }
    }

    pub fn with_section(mut self, index: u32, title: impl Into<String>) -> Self {
        self.section_index = Some(index);
        self.section_title = Some(title.into());
        self
    }

    pub fn with_details(mut self, details: EntryDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// Timestamp as a UTC datetime, if it is representable
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Tool name for `tool_call` / `tool_result` entries
    pub fn tool_name(&self) -> Option<&str> {
        self.details.as_ref()?.tool_name.as_deref()
    }

    /// Outline carried by a `planning_complete` entry
    pub fn outline(&self) -> Option<&ReportOutline> {
        self.details.as_ref()?.outline.as_ref()
    }

    /// Full section content carried by `section_complete` (and draft) entries
    pub fn content(&self) -> Option<&str> {
        self.details.as_ref()?.content.as_deref()
    }

    /// Raw tool output carried by a `tool_result` entry
    pub fn tool_result(&self) -> Option<&str> {
        self.details.as_ref()?.result.as_deref()
    }
}

/// Optional payload of a log entry.
///
/// Which fields are present depends on the action. Keys this type does not
/// model are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryDetails {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub outline: Option<ReportOutline>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub result_length: Option<u64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub has_tool_calls: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub has_final_answer: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub is_subsection: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub parent_section_index: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ============================================
// Lenient decoding helpers
// ============================================

/// Decode an optional field, treating a wrongly shaped value as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::<D, String>(deserializer)?.unwrap_or_default())
}

/// Sections may arrive as objects or bare titles; anything else is skipped.
fn lenient_sections<'de, D>(deserializer: D) -> Result<Vec<OutlineSection>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::String(title) => Some(OutlineSection {
                title,
                description: String::new(),
            }),
            other => serde_json::from_value(other).ok(),
        })
        .collect())
}

/// Accept epoch milliseconds (integer or float) or an ISO-8601 string.
fn timestamp_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => parse_timestamp_str(&s).unwrap_or(0),
        _ => 0,
    })
}

/// Parse a textual timestamp into epoch milliseconds.
///
/// Naive ISO timestamps (no offset) are taken as UTC.
pub fn parse_timestamp_str(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<f64>() {
        return Some(ms.round() as i64);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_kind_roundtrips_known_values() {
        let entry: LogEntry =
            serde_json::from_value(json!({"timestamp": 1, "action": "tool_result"})).unwrap();
        assert_eq!(entry.action, ActionKind::ToolResult);
        assert_eq!(serde_json::to_value(&entry.action).unwrap(), json!("tool_result"));
    }

    #[test]
    fn test_unknown_action_is_preserved() {
        let entry: LogEntry =
            serde_json::from_value(json!({"timestamp": 1, "action": "reflection_start"})).unwrap();
        assert_eq!(
            entry.action,
            ActionKind::Unknown("reflection_start".to_string())
        );
        assert_eq!(entry.action.label(), "reflection_start");
        assert!(!entry.action.is_known());
    }

    #[test]
    fn test_timestamp_accepts_numbers_and_strings() {
        let a: LogEntry =
            serde_json::from_value(json!({"timestamp": 1700000000123_i64, "action": "report_start"}))
                .unwrap();
        assert_eq!(a.timestamp, 1_700_000_000_123);

        let b: LogEntry = serde_json::from_value(
            json!({"timestamp": "2024-05-01T10:00:00.500Z", "action": "report_start"}),
        )
        .unwrap();
        assert_eq!(b.timestamp, 1_714_557_600_500);

        let c: LogEntry = serde_json::from_value(
            json!({"timestamp": "2024-05-01T10:00:00", "action": "report_start"}),
        )
        .unwrap();
        assert_eq!(c.timestamp, 1_714_557_600_000);

        let d: LogEntry =
            serde_json::from_value(json!({"timestamp": "yesterday", "action": "report_start"}))
                .unwrap();
        assert_eq!(d.timestamp, 0);
    }

    #[test]
    fn test_malformed_fields_are_treated_as_absent() {
        let entry: LogEntry = serde_json::from_value(json!({
            "timestamp": 5,
            "action": "planning_complete",
            "section_index": "first",
            "details": {
                "outline": "not an object",
                "message": "planned",
                "trace_id": "abc"
            }
        }))
        .unwrap();

        assert_eq!(entry.section_index, None);
        let details = entry.details.unwrap();
        assert_eq!(details.outline, None);
        assert_eq!(details.message.as_deref(), Some("planned"));
        assert_eq!(details.extra.get("trace_id"), Some(&json!("abc")));
    }

    #[test]
    fn test_outline_sections_accept_titles_and_objects() {
        let outline: ReportOutline = serde_json::from_value(json!({
            "title": "Forecast",
            "summary": "What happens next",
            "sections": [{"title": "Background", "description": "setup"}, "Outlook", 42]
        }))
        .unwrap();

        assert_eq!(outline.sections.len(), 2);
        assert_eq!(outline.sections[0].description, "setup");
        assert_eq!(outline.sections[1].title, "Outlook");
    }

    #[test]
    fn test_entry_accessors() {
        let entry = LogEntry::new(ActionKind::ToolResult, 10).with_details(EntryDetails {
            tool_name: Some("quick_search".to_string()),
            result: Some("搜索查询: x".to_string()),
            ..Default::default()
        });
        assert_eq!(entry.tool_name(), Some("quick_search"));
        assert_eq!(entry.tool_result(), Some("搜索查询: x"));
        assert!(entry.outline().is_none());
    }
}
