//! Shared formatting helpers for TUI rendering.

use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use reportwatch_core::extract::{
    InsightForgeResult, InterviewRecord, InterviewResult, PanoramaResult, QuickSearchResult,
};
use reportwatch_core::{ActionKind, ConsoleLevel, SectionStatus, ToolResult};

/// Markdown header color
const MD_HEADER: Color = Color::Rgb(255, 180, 100);
/// Markdown code block color
const MD_CODE: Color = Color::Rgb(150, 150, 150);
/// Heading color for structured views
const HEADING: Color = Color::Rgb(100, 180, 180);
/// Bullet color
const BULLET: Color = Color::Rgb(180, 100, 180);

/// Label and style for an agent action in the timeline.
pub fn action_label(action: &ActionKind) -> (String, Style) {
    let style = match action {
        ActionKind::ReportStart | ActionKind::ReportComplete => {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        }
        ActionKind::PlanningStart | ActionKind::PlanningComplete => Style::default().fg(Color::Cyan),
        ActionKind::SectionStart | ActionKind::SectionComplete => Style::default().fg(Color::Blue),
        ActionKind::SectionContent | ActionKind::SubsectionContent => {
            Style::default().fg(Color::LightBlue)
        }
        ActionKind::ToolCall => Style::default().fg(Color::Yellow),
        ActionKind::ToolResult => Style::default().fg(Color::Magenta),
        ActionKind::LlmResponse => Style::default().fg(Color::White),
        // Unrecognized actions are shown with their raw name.
        ActionKind::Unknown(_) => Style::default().fg(Color::DarkGray),
    };
    (action.label().to_string(), style)
}

/// Badge and style for a section's progress.
pub fn section_badge(status: SectionStatus) -> (&'static str, Style) {
    match status {
        SectionStatus::Completed => ("✓", Style::default().fg(Color::Green)),
        SectionStatus::InProgress => ("●", Style::default().fg(Color::Yellow).bold()),
        SectionStatus::Pending => ("○", Style::default().fg(Color::DarkGray)),
    }
}

/// Style for one console line.
pub fn console_style(level: ConsoleLevel) -> Style {
    match level {
        ConsoleLevel::Error => Style::default().fg(Color::Red),
        ConsoleLevel::Warning => Style::default().fg(Color::Yellow),
        ConsoleLevel::Info => Style::default().fg(Color::Gray),
    }
}

/// Style a markdown body line by line for the terminal.
pub fn markdown_lines(content: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut in_code_block = false;

    for line in content.lines() {
        let styled = if line.starts_with("```") {
            in_code_block = !in_code_block;
            Line::from(Span::styled(line.to_string(), Style::default().fg(MD_CODE)))
        } else if in_code_block {
            Line::from(Span::styled(line.to_string(), Style::default().fg(MD_CODE)))
        } else if line.starts_with("# ") || line.starts_with("## ") {
            Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(MD_HEADER).bold(),
            ))
        } else if line.starts_with("### ") || line.starts_with("#### ") {
            Line::from(Span::styled(line.to_string(), Style::default().fg(MD_HEADER)))
        } else if let Some(quote) = line.strip_prefix("> ") {
            Line::from(vec![
                Span::styled("│ ", Style::default().fg(BULLET)),
                Span::styled(quote.to_string(), Style::default().italic()),
            ])
        } else if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            bullet(item)
        } else {
            Line::raw(line.to_string())
        };
        lines.push(styled);
    }

    lines
}

/// Lines for the structured view of one tool result.
pub fn tool_result_lines(result: &ToolResult) -> Vec<Line<'static>> {
    match result {
        ToolResult::InsightForge(insight) => insight_lines(insight),
        ToolResult::Panorama(panorama) => panorama_lines(panorama),
        ToolResult::Interview(interview) => interview_lines(interview),
        ToolResult::QuickSearch(search) => quick_search_lines(search),
    }
}

fn insight_lines(result: &InsightForgeResult) -> Vec<Line<'static>> {
    let mut lines = vec![
        field("Query", &result.query),
        Line::from(format!(
            "{} facts · {} entities · {} relationships",
            result.stats.facts, result.stats.entities, result.stats.relationships
        )),
    ];

    list(&mut lines, "Sub-queries", &result.sub_queries);
    list(&mut lines, "Key facts", &result.facts);

    if !result.entities.is_empty() {
        heading(&mut lines, "Entities");
        for entity in &result.entities {
            lines.push(entity_line(&entity.name, &entity.entity_type));
        }
    }

    if !result.relations.is_empty() {
        heading(&mut lines, "Relations");
        for relation in &result.relations {
            lines.push(bullet(&format!(
                "{} ─[{}]→ {}",
                relation.source, relation.relation, relation.target
            )));
        }
    }

    lines
}

fn panorama_lines(result: &PanoramaResult) -> Vec<Line<'static>> {
    let stats = &result.stats;
    let mut lines = vec![
        field("Query", &result.query),
        Line::from(format!(
            "{} nodes · {} edges · {} active · {} historical",
            stats.nodes, stats.edges, stats.active_facts, stats.historical_facts
        )),
    ];

    list(&mut lines, "Active facts", &result.active_facts);
    list(&mut lines, "Historical facts", &result.historical_facts);

    if !result.entities.is_empty() {
        heading(&mut lines, "Entities");
        for entity in &result.entities {
            lines.push(entity_line(&entity.name, &entity.entity_type));
        }
    }

    lines
}

fn quick_search_lines(result: &QuickSearchResult) -> Vec<Line<'static>> {
    let mut lines = vec![
        field("Query", &result.query),
        Line::from(format!("{} results", result.count)),
    ];
    list(&mut lines, "Facts", &result.facts);
    lines
}

fn interview_lines(result: &InterviewResult) -> Vec<Line<'static>> {
    let mut lines = vec![
        field("Topic", &result.topic),
        Line::from(format!(
            "{} of {} agents interviewed",
            result.success_count, result.total_count
        )),
    ];

    if !result.selection_reason.is_empty() {
        heading(&mut lines, "Selection");
        lines.extend(result.selection_reason.lines().map(|l| Line::raw(l.to_string())));
    }

    for record in &result.interviews {
        interview_record_lines(&mut lines, record);
    }

    if !result.summary.is_empty() {
        heading(&mut lines, "Summary");
        lines.extend(result.summary.lines().map(|l| Line::raw(l.to_string())));
    }

    lines
}

fn interview_record_lines(lines: &mut Vec<Line<'static>>, record: &InterviewRecord) {
    lines.push(Line::raw(""));
    let mut header = vec![Span::styled(
        format!("#{} {}", record.num, record.name),
        Style::default().fg(HEADING).bold(),
    )];
    if !record.role.is_empty() {
        header.push(Span::styled(
            format!("  {}", record.role),
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines.push(Line::from(header));
    if !record.title.is_empty() {
        lines.push(Line::styled(record.title.clone(), Style::default().italic()));
    }
    if !record.bio.is_empty() {
        lines.push(Line::styled(record.bio.clone(), Style::default().fg(Color::DarkGray)));
    }

    let platforms: Vec<(&str, &str)> = if record.is_dual_platform() {
        vec![
            ("Twitter", record.twitter_answer.as_str()),
            ("Reddit", record.reddit_answer.as_str()),
        ]
    } else {
        vec![("Answer", record.twitter_answer.as_str())]
    };

    for (index, question) in record.questions.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("Q{} ", index + 1), Style::default().fg(Color::Yellow)),
            Span::raw(question.clone()),
        ]));
        for (platform, answer) in &platforms {
            let parts = record.split_answers(answer);
            let part = parts.get(index).map(String::as_str).unwrap_or_default();
            if part.is_empty() {
                continue;
            }
            lines.push(Line::from(vec![
                Span::styled(format!("  {}: ", platform), Style::default().fg(Color::Cyan)),
                Span::raw(part.to_string()),
            ]));
        }
    }

    for quote in &record.quotes {
        lines.push(Line::from(vec![
            Span::styled("│ ", Style::default().fg(BULLET)),
            Span::styled(quote.clone(), Style::default().italic()),
        ]));
    }
}

fn field(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(HEADING)),
        Span::styled(value.to_string(), Style::default().bold()),
    ])
}

fn heading(lines: &mut Vec<Line<'static>>, title: &str) {
    lines.push(Line::raw(""));
    lines.push(Line::styled(title.to_string(), Style::default().fg(HEADING).bold()));
}

fn list(lines: &mut Vec<Line<'static>>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    heading(lines, title);
    lines.extend(items.iter().map(|item| bullet(item)));
}

fn bullet(text: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled("• ", Style::default().fg(BULLET)),
        Span::raw(text.to_string()),
    ])
}

fn entity_line(name: &str, entity_type: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled("• ", Style::default().fg(BULLET)),
        Span::raw(name.to_string()),
        Span::styled(format!(" ({})", entity_type), Style::default().fg(Color::DarkGray)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_unknown_action_label_is_verbatim() {
        let (label, _) = action_label(&ActionKind::Unknown("reflection_start".to_string()));
        assert_eq!(label, "reflection_start");
    }

    #[test]
    fn test_markdown_lines_mark_bullets_and_quotes() {
        let lines = text(&markdown_lines("## Head\n- item\n> said\nplain"));
        assert_eq!(lines, vec!["## Head", "• item", "│ said", "plain"]);
    }

    #[test]
    fn test_quick_search_lines() {
        let result = ToolResult::QuickSearch(QuickSearchResult {
            query: "熵".to_string(),
            count: 1,
            facts: vec!["熵是无序度".to_string()],
        });
        let lines = text(&tool_result_lines(&result));
        assert_eq!(lines[0], "Query: 熵");
        assert_eq!(lines[1], "1 results");
        assert_eq!(lines.last().map(String::as_str), Some("• 熵是无序度"));
    }

    #[test]
    fn test_empty_lists_are_omitted() {
        let result = ToolResult::Panorama(PanoramaResult::default());
        let lines = text(&tool_result_lines(&result));
        assert_eq!(lines.len(), 2);
    }
}
