//! Structured views of research tool results
//!
//! Tool results arrive as free text in a fixed, labelled template per tool.
//! Each extractor turns one result into a typed record:
//!
//! | Tool | Extractor | Record |
//! |------|-----------|--------|
//! | `insight_forge` | [`extract_insight_forge`] | [`InsightForgeResult`] |
//! | `panorama_search` | [`extract_panorama`] | [`PanoramaResult`] |
//! | `interview_agents` | [`extract_interview`] | [`InterviewResult`] |
//! | `quick_search` | [`extract_quick_search`] | [`QuickSearchResult`] |
//!
//! Extraction never fails. Fields whose anchor is missing keep their default
//! value, list fields are capped, and an internal error anywhere yields the
//! all-default record.

pub(crate) mod common;
pub mod insight;
pub mod interview;
pub mod panorama;
pub mod quick_search;

pub use common::clean_item;
pub use insight::{extract_insight_forge, InsightForgeResult, InsightStats, Relation};
pub use interview::{extract_interview, split_answer, InterviewRecord, InterviewResult};
pub use panorama::{extract_panorama, PanoramaResult, PanoramaStats};
pub use quick_search::{extract_quick_search, QuickSearchResult};

use serde::Serialize;

use crate::types::{ActionKind, LogEntry};

/// Named entity with its type label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

impl EntityRef {
    pub fn new(name: &str, entity_type: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            entity_type: entity_type.trim().to_string(),
        }
    }
}

/// Tools that have a structured view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    InsightForge,
    PanoramaSearch,
    InterviewAgents,
    QuickSearch,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::InsightForge,
        ToolKind::PanoramaSearch,
        ToolKind::InterviewAgents,
        ToolKind::QuickSearch,
    ];

    /// Look up a tool by the name the workflow logs
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "insight_forge" => Some(ToolKind::InsightForge),
            "panorama_search" => Some(ToolKind::PanoramaSearch),
            "interview_agents" => Some(ToolKind::InterviewAgents),
            "quick_search" => Some(ToolKind::QuickSearch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::InsightForge => "insight_forge",
            ToolKind::PanoramaSearch => "panorama_search",
            ToolKind::InterviewAgents => "interview_agents",
            ToolKind::QuickSearch => "quick_search",
        }
    }

    /// Human-readable name for headers
    pub fn display_name(&self) -> &'static str {
        match self {
            ToolKind::InsightForge => "Deep Insight",
            ToolKind::PanoramaSearch => "Panorama Search",
            ToolKind::InterviewAgents => "Agent Interviews",
            ToolKind::QuickSearch => "Quick Search",
        }
    }

    /// Run this tool's extractor over `text`
    pub fn extract(&self, text: &str) -> ToolResult {
        match self {
            ToolKind::InsightForge => ToolResult::InsightForge(extract_insight_forge(text)),
            ToolKind::PanoramaSearch => ToolResult::Panorama(extract_panorama(text)),
            ToolKind::InterviewAgents => ToolResult::Interview(extract_interview(text)),
            ToolKind::QuickSearch => ToolResult::QuickSearch(extract_quick_search(text)),
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One extracted tool result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolResult {
    InsightForge(InsightForgeResult),
    Panorama(PanoramaResult),
    Interview(InterviewResult),
    QuickSearch(QuickSearchResult),
}

impl ToolResult {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolResult::InsightForge(_) => ToolKind::InsightForge,
            ToolResult::Panorama(_) => ToolKind::PanoramaSearch,
            ToolResult::Interview(_) => ToolKind::InterviewAgents,
            ToolResult::QuickSearch(_) => ToolKind::QuickSearch,
        }
    }
}

/// Extract `text` as the result of the tool called `tool_name`.
///
/// Returns `None` for tools without a structured view.
pub fn extract(tool_name: &str, text: &str) -> Option<ToolResult> {
    ToolKind::from_name(tool_name).map(|kind| kind.extract(text))
}

/// Structured view of a `tool_result` log entry, if it has one
pub fn extract_entry(entry: &LogEntry) -> Option<ToolResult> {
    if entry.action != ActionKind::ToolResult {
        return None;
    }
    extract(entry.tool_name()?, entry.tool_result()?)
}
