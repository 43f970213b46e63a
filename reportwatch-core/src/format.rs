//! Formatting helpers shared by the TUI and the CLI.

use chrono::{DateTime, Local, Utc};

use crate::types::{ActionKind, LogEntry};

/// Format a timestamp as relative time (e.g., "2m ago").
pub fn format_relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else {
        ts.format("%b %d").to_string()
    }
}

/// How long ago the newest timestamped entry was logged, if any entry has one.
pub fn last_activity(entries: &[LogEntry], now: DateTime<Utc>) -> Option<String> {
    entries
        .iter()
        .rev()
        .filter(|entry| entry.timestamp > 0)
        .find_map(LogEntry::time)
        .map(|ts| format_relative_time(ts, now))
}

/// Wall-clock time of an entry in the local timezone, `--:--:--` if unknown.
pub fn format_clock(timestamp_ms: i64) -> String {
    if timestamp_ms <= 0 {
        return "--:--:--".to_string();
    }
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|ts| ts.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

/// Format an elapsed duration compactly: `42s`, `3m 05s`, `1h 02m`.
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Elapsed seconds as reported by the workflow
pub fn format_elapsed_seconds(seconds: f64) -> String {
    format_elapsed(chrono::Duration::milliseconds((seconds * 1000.0) as i64))
}

/// Truncate to `max_chars` characters on one line, with an ellipsis.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

/// Human-readable size of a tool result
pub fn format_chars(count: u64) -> String {
    if count >= 10_000 {
        format!("{:.1}k chars", count as f64 / 1000.0)
    } else {
        format!("{} chars", count)
    }
}

const PREVIEW_CHARS: usize = 80;

/// One-line description of an agent log entry for the timeline.
pub fn entry_summary(entry: &LogEntry) -> String {
    let details = entry.details.as_ref();
    let section = || match (entry.section_index, entry.section_title.as_deref()) {
        (Some(index), Some(title)) => format!("§{} {}", index, title),
        (Some(index), None) => format!("§{}", index),
        (None, Some(title)) => title.to_string(),
        (None, None) => String::new(),
    };

    match &entry.action {
        ActionKind::ReportStart | ActionKind::PlanningStart => details
            .and_then(|d| d.message.as_deref())
            .map(|m| truncate_preview(m, PREVIEW_CHARS))
            .unwrap_or_default(),
        ActionKind::PlanningComplete => match entry.outline() {
            Some(outline) => format!("{} ({} sections)", outline.title, outline.sections.len()),
            None => String::new(),
        },
        ActionKind::SectionStart | ActionKind::SectionComplete => section(),
        ActionKind::SectionContent | ActionKind::SubsectionContent => {
            let length = entry.content().map(|c| c.chars().count()).unwrap_or(0);
            let label = section();
            if length > 0 {
                format!("{} · {}", label, format_chars(length as u64))
            } else {
                label
            }
        }
        ActionKind::ToolCall => {
            let tool = entry.tool_name().unwrap_or("?");
            match details.and_then(|d| d.parameters.as_ref()) {
                Some(params) => format!(
                    "{}({})",
                    tool,
                    truncate_preview(&params.to_string(), PREVIEW_CHARS)
                ),
                None => tool.to_string(),
            }
        }
        ActionKind::ToolResult => {
            let tool = entry.tool_name().unwrap_or("?");
            let length = details
                .and_then(|d| d.result_length)
                .or_else(|| entry.tool_result().map(|r| r.chars().count() as u64));
            match length {
                Some(length) => format!("{} → {}", tool, format_chars(length)),
                None => tool.to_string(),
            }
        }
        ActionKind::LlmResponse => {
            let mut parts = Vec::new();
            if let Some(iteration) = details.and_then(|d| d.iteration) {
                parts.push(format!("#{}", iteration));
            }
            if details.and_then(|d| d.has_tool_calls) == Some(true) {
                parts.push("tool calls".to_string());
            }
            if details.and_then(|d| d.has_final_answer) == Some(true) {
                parts.push("final answer".to_string());
            }
            if let Some(response) = details.and_then(|d| d.response.as_deref()) {
                parts.push(truncate_preview(response, PREVIEW_CHARS));
            }
            parts.join(" · ")
        }
        ActionKind::ReportComplete => entry
            .elapsed_seconds
            .map(|s| format!("finished in {}", format_elapsed_seconds(s)))
            .unwrap_or_default(),
        ActionKind::Unknown(_) => details
            .and_then(|d| d.message.as_deref())
            .map(|m| truncate_preview(m, PREVIEW_CHARS))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryDetails;
    use serde_json::json;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_elapsed(chrono::Duration::seconds(185)), "3m 05s");
        assert_eq!(format_elapsed(chrono::Duration::seconds(3720)), "1h 02m");
        assert_eq!(format_elapsed(chrono::Duration::seconds(-5)), "0s");
        assert_eq!(format_elapsed_seconds(61.9), "1m 01s");
    }

    #[test]
    fn test_relative_time() {
        let now = DateTime::from_timestamp(1_000_000, 0).unwrap();
        let ts = DateTime::from_timestamp(1_000_000 - 125, 0).unwrap();
        assert_eq!(format_relative_time(ts, now), "2m ago");
        assert_eq!(format_relative_time(now, ts), "just now");
    }

    #[test]
    fn test_last_activity_uses_newest_timestamp() {
        let now = DateTime::from_timestamp(1_000_000, 0).unwrap();
        let entries = vec![
            LogEntry::new(ActionKind::ReportStart, (1_000_000 - 600) * 1000),
            LogEntry::new(ActionKind::ToolCall, (1_000_000 - 30) * 1000),
            LogEntry::new(ActionKind::LlmResponse, 0),
        ];
        assert_eq!(last_activity(&entries, now).as_deref(), Some("30s ago"));
        assert_eq!(last_activity(&entries[..1], now).as_deref(), Some("10m ago"));
        assert_eq!(last_activity(&[], now), None);
    }

    #[test]
    fn test_clock_unknown() {
        assert_eq!(format_clock(0), "--:--:--");
    }

    #[test]
    fn test_truncate_preview() {
        assert_eq!(truncate_preview("short\ntext", 20), "short text");
        assert_eq!(truncate_preview("一二三四五六", 4), "一二三…");
    }

    #[test]
    fn test_tool_call_summary() {
        let entry = LogEntry::new(ActionKind::ToolCall, 1).with_details(EntryDetails {
            tool_name: Some("quick_search".to_string()),
            parameters: Some(json!({"query": "熵"})),
            ..Default::default()
        });
        assert_eq!(entry_summary(&entry), r#"quick_search({"query":"熵"})"#);
    }

    #[test]
    fn test_tool_result_summary() {
        let entry = LogEntry::new(ActionKind::ToolResult, 1).with_details(EntryDetails {
            tool_name: Some("insight_forge".to_string()),
            result: Some("abc".to_string()),
            ..Default::default()
        });
        assert_eq!(entry_summary(&entry), "insight_forge → 3 chars");
    }

    #[test]
    fn test_section_summary() {
        let entry = LogEntry::new(ActionKind::SectionStart, 1).with_section(2, "Outlook");
        assert_eq!(entry_summary(&entry), "§2 Outlook");
    }

    #[test]
    fn test_llm_response_summary() {
        let entry = LogEntry::new(ActionKind::LlmResponse, 1).with_details(EntryDetails {
            iteration: Some(3),
            has_tool_calls: Some(true),
            response: Some("Calling search".to_string()),
            ..Default::default()
        });
        assert_eq!(entry_summary(&entry), "#3 · tool calls · Calling search");
    }
}
