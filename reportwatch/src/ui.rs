//! UI rendering for the TUI.

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Cell, Gauge, Paragraph, Row, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Table, Wrap,
    },
    Frame,
};
use reportwatch_core::format::{entry_summary, format_clock, format_elapsed, last_activity};
use reportwatch_core::SectionStatus;

use crate::app::{App, DetailView, View};
use crate::message_format::{action_label, console_style, markdown_lines, section_badge};

/// Separator line color
const SEPARATOR_COLOR: Color = Color::Rgb(60, 60, 60);
/// Border color for the timeline block
const BORDER_TIMELINE: Color = Color::Rgb(80, 160, 80);
/// Border color for the outline blocks
const BORDER_OUTLINE: Color = Color::Rgb(0, 150, 150);
/// Border color for section bodies and entry details
const BORDER_CONTENT: Color = Color::Rgb(180, 100, 180);
/// Label color for header attributes
const LABEL_COLOR: Color = Color::Rgb(100, 180, 180);

/// Render the application UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Layout: tab header, status, body, footer
    let chunks = Layout::vertical([
        Constraint::Length(2), // Tab header
        Constraint::Length(1), // Report status
        Constraint::Min(5),    // Body
        Constraint::Length(1), // Footer
    ])
    .split(area);

    render_tab_header(frame, app.view, chunks[0]);
    render_status_line(frame, app, chunks[1]);

    if let Some(detail) = app.detail.as_mut() {
        render_detail(frame, detail, chunks[2]);
    } else {
        match app.view {
            View::Timeline => render_timeline(frame, app, chunks[2]),
            View::Outline => render_outline(frame, app, chunks[2]),
            View::Console => render_console(frame, app, chunks[2]),
        }
    }

    render_footer(frame, app, chunks[3]);
}

/// Render the tab bar header.
fn render_tab_header(frame: &mut Frame, active: View, area: Rect) {
    let chunks = Layout::horizontal([
        Constraint::Length(14), // App name
        Constraint::Min(1),     // Tabs
    ])
    .split(area);

    let app_name = Paragraph::new(" reportwatch").style(Style::default().fg(Color::Cyan).bold());
    frame.render_widget(app_name, chunks[0]);

    let active_style = Style::default()
        .fg(Color::Cyan)
        .bold()
        .add_modifier(Modifier::UNDERLINED);
    let inactive_style = Style::default().fg(Color::DarkGray);

    let mut spans = Vec::new();
    for (i, view) in View::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        let style = if *view == active {
            active_style
        } else {
            inactive_style
        };
        spans.push(Span::styled(format!(" {} ", view.title()), style));
    }

    let tabs = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(tabs, chunks[1]);
}

/// Render report id, progress, elapsed time and polling state.
fn render_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.session();
    let state = session.state();

    if session.report_id().is_empty() {
        let hint = Line::from(vec![
            Span::raw(" No report. Press "),
            Span::styled("r", Style::default().fg(Color::Yellow)),
            Span::raw(" to watch one."),
        ]);
        frame.render_widget(Paragraph::new(hint), area);
        return;
    }

    let mut spans = vec![
        Span::styled(" Report ", Style::default().fg(LABEL_COLOR)),
        Span::styled(session.report_id().to_string(), Style::default().bold()),
    ];

    if let Some(outline) = &state.outline {
        spans.push(Span::raw("  │ "));
        spans.push(Span::raw(outline.title.clone()));
        spans.push(Span::styled(
            format!(
                "  {}/{} sections ({}%)",
                state.completed_sections(),
                state.total_sections(),
                state.completion_percent()
            ),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if let Some(elapsed) = state.elapsed(Utc::now()) {
        spans.push(Span::raw("  │ "));
        spans.push(Span::raw(format_elapsed(elapsed)));
    }

    spans.push(Span::raw("  │ "));
    if state.completed {
        spans.push(Span::styled(
            "✓ COMPLETE",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
    } else if app.is_polling() {
        spans.push(Span::styled(
            "● LIVE",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
        if let Some(ago) = last_activity(session.agent_logs(), Utc::now()) {
            spans.push(Span::styled(
                format!("  last event {}", ago),
                Style::default().fg(Color::DarkGray),
            ));
        }
    } else {
        spans.push(Span::styled("■ stopped", Style::default().fg(Color::DarkGray)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the agent log as a table.
fn render_timeline(frame: &mut Frame, app: &mut App, area: Rect) {
    let header = Row::new(
        ["Time", "Action", "Details"]
            .into_iter()
            .map(|h| Cell::from(h).style(Style::default().fg(Color::Yellow).bold())),
    )
    .height(1);

    let rows = app.session().agent_logs().iter().map(|entry| {
        let (label, style) = action_label(&entry.action);
        Row::new([
            Cell::from(format_clock(entry.timestamp)).style(Style::default().fg(Color::DarkGray)),
            Cell::from(label).style(style),
            Cell::from(entry_summary(entry)),
        ])
    });

    let widths = [
        Constraint::Length(9),  // Time
        Constraint::Length(20), // Action
        Constraint::Fill(1),    // Details
    ];

    let title = format!(" Agent log ({}) ", app.session().agent_logs().len());
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_TIMELINE))
                .title(title)
                .title_style(Style::default().fg(BORDER_TIMELINE).bold()),
        )
        .row_highlight_style(
            Style::default()
                .add_modifier(Modifier::REVERSED)
                .fg(Color::Cyan),
        )
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(table, area, &mut app.timeline_state);
}

/// Render progress, the section table and the selected section's body.
fn render_outline(frame: &mut Frame, app: &mut App, area: Rect) {
    if app.session().state().outline.is_none() {
        let waiting = Paragraph::new("Waiting for the report outline...")
            .style(Style::default().fg(Color::DarkGray))
            .block(outline_block(" Outline "));
        frame.render_widget(waiting, area);
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(3),      // Progress
        Constraint::Percentage(35), // Sections
        Constraint::Min(3),         // Body
    ])
    .split(area);

    render_progress(frame, app, chunks[0]);
    render_section_table(frame, app, chunks[1]);
    render_section_body(frame, app, chunks[2]);
}

fn outline_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_OUTLINE))
        .title(title)
        .title_style(Style::default().fg(BORDER_OUTLINE).bold())
}

fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.session().state();
    let percent = state.completion_percent();
    let color = if state.completed {
        Color::Green
    } else {
        Color::Cyan
    };

    let gauge = Gauge::default()
        .block(outline_block(" Progress "))
        .gauge_style(Style::default().fg(color).bg(Color::Rgb(40, 40, 40)))
        .percent(u16::from(percent))
        .label(Span::styled(
            format!(
                "{}% · {} of {} sections",
                percent,
                state.completed_sections(),
                state.total_sections()
            ),
            Style::default().fg(Color::White).bold(),
        ));
    frame.render_widget(gauge, area);
}

fn render_section_table(frame: &mut Frame, app: &mut App, area: Rect) {
    let state = app.session().state();
    let sections = state
        .outline
        .as_ref()
        .map(|outline| outline.sections.as_slice())
        .unwrap_or_default();

    let rows: Vec<Row> = sections
        .iter()
        .enumerate()
        .map(|(i, section)| {
            let index = i as u32 + 1;
            let status = state.section_status(index);
            let (badge, badge_style) = section_badge(status);
            let size = state
                .section_content(index)
                .map(|content| format!("{} chars", content.chars().count()))
                .unwrap_or_default();
            let expand = if state.is_expanded(index) { "▾" } else { "▸" };

            Row::new([
                Cell::from(format!("{} {}", expand, index)),
                Cell::from(Line::from(vec![
                    Span::styled(format!("{} ", badge), badge_style),
                    Span::styled(status.as_str(), badge_style),
                ])),
                Cell::from(section.title.clone()),
                Cell::from(size).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(5),  // Index
        Constraint::Length(14), // Status
        Constraint::Fill(1),    // Title
        Constraint::Length(12), // Size
    ];

    let table = Table::new(rows, widths)
        .block(outline_block(" Sections "))
        .row_highlight_style(
            Style::default()
                .add_modifier(Modifier::REVERSED)
                .fg(Color::Cyan),
        )
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(table, area, &mut app.outline_state);
}

fn render_section_body(frame: &mut Frame, app: &mut App, area: Rect) {
    let state = app.session().state();
    let selected = app.selected_section();
    let section = selected.and_then(|index| {
        state
            .outline
            .as_ref()
            .and_then(|outline| outline.sections.get(index as usize - 1))
    });

    let (title, lines) = match (selected, section) {
        (Some(index), Some(section)) => {
            let lines = match state.section_content(index) {
                Some(content) if state.is_expanded(index) => markdown_lines(content),
                Some(_) => vec![
                    Line::raw(section.description.clone()),
                    Line::raw(""),
                    Line::styled("Press Enter to expand.", Style::default().fg(Color::DarkGray)),
                ],
                None => {
                    let note = if state.section_status(index) == SectionStatus::InProgress {
                        "Generating..."
                    } else {
                        "Not written yet."
                    };
                    vec![
                        Line::raw(section.description.clone()),
                        Line::raw(""),
                        Line::styled(note, Style::default().fg(Color::DarkGray)),
                    ]
                }
            };
            (format!(" {} ", section.title), lines)
        }
        _ => {
            let summary = state
                .outline
                .as_ref()
                .map(|outline| outline.summary.clone())
                .unwrap_or_default();
            (" Summary ".to_string(), vec![Line::raw(summary)])
        }
    };

    let max_scroll = lines.len().saturating_sub(area.height.saturating_sub(2) as usize);
    app.body_scroll_offset = app.body_scroll_offset.min(max_scroll);

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_CONTENT))
                .title(title)
                .title_style(Style::default().fg(BORDER_CONTENT).bold()),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll_row(app.body_scroll_offset), 0));
    frame.render_widget(paragraph, area);
}

/// Render console output, colored by severity.
fn render_console(frame: &mut Frame, app: &mut App, area: Rect) {
    let total = app.session().console_logs().len();
    let visible = area.height.saturating_sub(2) as usize;
    let window = visible_window(total, visible, app.console_scroll_offset);
    app.console_scroll_offset = window.start;

    // Lines are not wrapped, so only the visible slice is handed to the widget.
    let lines: Vec<Line> = app.session().console_logs()[window]
        .iter()
        .map(|line| Line::styled(line.text.clone(), console_style(line.level)))
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(SEPARATOR_COLOR))
                .title(format!(" Console ({}) ", total))
                .title_style(Style::default().fg(Color::Gray).bold()),
        );
    frame.render_widget(paragraph, area);

    render_scrollbar(frame, area, total, app.console_scroll_offset);
}

/// Render one entry's full view.
fn render_detail(frame: &mut Frame, detail: &mut DetailView, area: Rect) {
    let max_scroll = detail
        .lines
        .len()
        .saturating_sub(area.height.saturating_sub(2) as usize);
    detail.scroll_offset = detail.scroll_offset.min(max_scroll);

    let paragraph = Paragraph::new(detail.lines.clone())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_CONTENT))
                .title(format!(" {} ", detail.title))
                .title_style(Style::default().fg(BORDER_CONTENT).bold()),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll_row(detail.scroll_offset), 0));
    frame.render_widget(paragraph, area);

    render_scrollbar(frame, area, detail.lines.len(), detail.scroll_offset);
}

/// Paragraph scroll offsets are `u16`; larger offsets pin to the last row.
fn scroll_row(offset: usize) -> u16 {
    u16::try_from(offset).unwrap_or(u16::MAX)
}

/// Lines shown when `visible` rows start at `offset`, clamped so the last
/// page is always full.
fn visible_window(total: usize, visible: usize, offset: usize) -> std::ops::Range<usize> {
    let start = offset.min(total.saturating_sub(visible));
    start..total.min(start.saturating_add(visible))
}

fn render_scrollbar(frame: &mut Frame, area: Rect, content_length: usize, position: usize) {
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("↑"))
        .end_symbol(Some("↓"));
    let mut scrollbar_state = ScrollbarState::new(content_length).position(position);

    frame.render_stateful_widget(
        scrollbar,
        area.inner(Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut scrollbar_state,
    );
}

/// Render key help, or the report id prompt while it is open.
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(input) = &app.input {
        let prompt = Line::from(vec![
            Span::styled(" Report id: ", Style::default().fg(Color::Yellow)),
            Span::raw(input.clone()),
            Span::styled("▏", Style::default().fg(Color::Cyan)),
            Span::styled("  Enter watch  Esc cancel", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(prompt), area);
        return;
    }

    let keys: &[(&str, &str)] = if app.detail.is_some() {
        &[("Esc", "back"), ("j/k", "scroll"), ("g/G", "top/bottom")]
    } else {
        match app.view {
            View::Timeline => &[
                ("Tab", "view"),
                ("Enter", "open"),
                ("t", "last result"),
                ("j/k", "navigate"),
                ("f", "follow"),
                ("r", "report"),
                ("q", "quit"),
            ],
            View::Outline => &[
                ("Tab", "view"),
                ("Enter", "expand"),
                ("j/k", "navigate"),
                ("d/u", "scroll body"),
                ("r", "report"),
                ("q", "quit"),
            ],
            View::Console => &[
                ("Tab", "view"),
                ("j/k", "scroll"),
                ("G", "follow"),
                ("r", "report"),
                ("q", "quit"),
            ],
        }
    };

    let mut spans = vec![Span::raw(" ")];
    for (key, action) in keys {
        spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(" {}  ", action)));
    }

    if let Some(status) = &app.status {
        spans.push(Span::raw("│ "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::DarkGray)));
    }
    if app.follow {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled("following", Style::default().fg(Color::Green)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
