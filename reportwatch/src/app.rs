//! Application state for the TUI.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::text::Line;
use ratatui::widgets::TableState;
use reportwatch_core::config::PollingConfig;
use reportwatch_core::{
    extract_entry, ActionKind, FeedUpdate, LogEntry, LogSource, OutlinePolicy, Poller, Session,
    SessionEffect,
};
use tokio::sync::mpsc;

use crate::message_format;

/// Lines moved by PageUp/PageDown
const PAGE: usize = 10;

/// Top-level tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    /// Agent log, one row per entry (default)
    #[default]
    Timeline,
    /// Outline with section progress and bodies
    Outline,
    /// Raw console output
    Console,
}

impl View {
    pub const ALL: [View; 3] = [View::Timeline, View::Outline, View::Console];

    pub fn title(&self) -> &'static str {
        match self {
            View::Timeline => "Timeline",
            View::Outline => "Outline",
            View::Console => "Console",
        }
    }

    fn next(self) -> Self {
        match self {
            View::Timeline => View::Outline,
            View::Outline => View::Console,
            View::Console => View::Timeline,
        }
    }

    fn previous(self) -> Self {
        match self {
            View::Timeline => View::Console,
            View::Outline => View::Timeline,
            View::Console => View::Outline,
        }
    }
}

/// Full-screen view of one timeline entry.
pub struct DetailView {
    pub title: String,
    pub lines: Vec<Line<'static>>,
    /// Scroll offset, clamped during rendering
    pub scroll_offset: usize,
}

/// Main application state.
pub struct App {
    /// Where the poller fetches logs from
    source: Arc<dyn LogSource>,
    polling: PollingConfig,
    /// Every poller sends here; the session drops batches that are not its own
    updates_tx: mpsc::UnboundedSender<FeedUpdate>,
    updates_rx: mpsc::UnboundedReceiver<FeedUpdate>,
    session: Session,
    poller: Option<Poller>,
    /// Active tab
    pub view: View,
    /// Timeline selection state
    pub timeline_state: TableState,
    /// Outline selection state
    pub outline_state: TableState,
    /// Scroll offset for the selected section body
    pub body_scroll_offset: usize,
    /// Scroll offset for the console view
    pub console_scroll_offset: usize,
    /// Keep the newest timeline entry and console line in view
    pub follow: bool,
    /// Open entry detail, if any
    pub detail: Option<DetailView>,
    /// Report id being typed, if the prompt is open
    pub input: Option<String>,
    /// One-line status message for the header
    pub status: Option<String>,
    /// Whether the app should quit
    pub should_quit: bool,
}

impl App {
    pub fn new(
        source: Arc<dyn LogSource>,
        polling: PollingConfig,
        outline_policy: OutlinePolicy,
    ) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            source,
            polling,
            updates_tx,
            updates_rx,
            session: Session::new("", outline_policy),
            poller: None,
            view: View::default(),
            timeline_state: TableState::default(),
            outline_state: TableState::default(),
            body_scroll_offset: 0,
            console_scroll_offset: 0,
            follow: true,
            detail: None,
            input: None,
            status: None,
            should_quit: false,
        }
    }

    /// State of the report being watched
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether a poller is still fetching
    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|poller| !poller.is_stopped())
    }

    /// Start watching `report_id`, replacing the current session.
    ///
    /// The old poller is dropped in the same assignment that installs the new
    /// session, so no batch for the previous report can be applied afterwards.
    /// Must be called from within a tokio runtime.
    pub fn watch(&mut self, report_id: &str) {
        let report_id = report_id.trim();
        if report_id.is_empty() {
            self.status = Some("Enter a report id to watch".to_string());
            return;
        }

        let session = self.session.switch_to(report_id);
        let poller = Poller::start(
            self.source.clone(),
            session.report_id(),
            session.generation(),
            &self.polling,
            self.updates_tx.clone(),
        );
        (self.session, self.poller) = (session, poller);

        tracing::info!(
            report_id = %report_id,
            generation = self.session.generation(),
            "Watching report"
        );

        self.timeline_state = TableState::default();
        self.outline_state = TableState::default();
        self.body_scroll_offset = 0;
        self.console_scroll_offset = 0;
        self.follow = true;
        self.detail = None;
        self.status = Some(format!("Watching {}", report_id));
    }

    /// Apply every update that has arrived since the last call.
    ///
    /// Returns the number of updates applied to the current session.
    pub fn drain_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates_rx.try_recv() {
            if !self.session.accepts(&update) {
                continue;
            }
            applied += 1;
            for effect in self.session.ingest(update) {
                self.handle_effect(effect);
            }
        }

        if applied > 0 && self.follow {
            self.follow_tail();
        }
        applied
    }

    fn handle_effect(&mut self, effect: SessionEffect) {
        match effect {
            SessionEffect::StatusCompleted => {
                if let Some(poller) = &self.poller {
                    poller.stop();
                }
                tracing::info!(report_id = %self.session.report_id(), "Report complete");
                self.status = Some("Report complete".to_string());
            }
        }
    }

    fn follow_tail(&mut self) {
        let entries = self.session.agent_logs().len();
        if entries > 0 {
            self.timeline_state.select(Some(entries - 1));
        }
        // Clamped to the last page during rendering.
        self.console_scroll_offset = usize::MAX;
    }

    /// Timeline entry under the cursor
    pub fn selected_entry(&self) -> Option<&LogEntry> {
        self.timeline_state
            .selected()
            .and_then(|i| self.session.agent_logs().get(i))
    }

    /// 1-based index of the outline section under the cursor
    pub fn selected_section(&self) -> Option<u32> {
        let total = self.session.state().total_sections();
        self.outline_state
            .selected()
            .filter(|i| *i < total)
            .map(|i| i as u32 + 1)
    }

    /// Handle a key event.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.input.is_some() {
            self.handle_input_key(key);
        } else if self.detail.is_some() {
            self.handle_detail_key(key);
        } else {
            self.handle_view_key(key);
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let Some(input) = self.input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.input = None;
            }
            KeyCode::Enter => {
                let report_id = std::mem::take(input);
                self.input = None;
                self.watch(&report_id);
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => {
                input.push(c);
            }
            _ => {}
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        let Some(detail) = self.detail.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => {
                self.detail = None;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                detail.scroll_offset = detail.scroll_offset.saturating_add(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                detail.scroll_offset = detail.scroll_offset.saturating_sub(1);
            }
            KeyCode::PageDown | KeyCode::Char('d') | KeyCode::Char(' ') => {
                detail.scroll_offset = detail.scroll_offset.saturating_add(PAGE);
            }
            KeyCode::PageUp | KeyCode::Char('u') => {
                detail.scroll_offset = detail.scroll_offset.saturating_sub(PAGE);
            }
            KeyCode::Home | KeyCode::Char('g') => {
                detail.scroll_offset = 0;
            }
            KeyCode::End | KeyCode::Char('G') => {
                detail.scroll_offset = detail.lines.len();
            }
            _ => {}
        }
    }

    fn handle_view_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.view = self.view.next();
            }
            KeyCode::BackTab => {
                self.view = self.view.previous();
            }
            KeyCode::Char('1') => self.view = View::Timeline,
            KeyCode::Char('2') => self.view = View::Outline,
            KeyCode::Char('3') => self.view = View::Console,
            KeyCode::Char('r') => {
                self.input = Some(String::new());
            }
            KeyCode::Char('f') => {
                self.follow = !self.follow;
                if self.follow {
                    self.follow_tail();
                }
            }
            _ => match self.view {
                View::Timeline => self.handle_timeline_key(key),
                View::Outline => self.handle_outline_key(key),
                View::Console => self.handle_console_key(key),
            },
        }
    }

    fn handle_timeline_key(&mut self, key: KeyEvent) {
        let len = self.session.agent_logs().len();
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                select_next(&mut self.timeline_state, len);
                self.follow = self.timeline_state.selected() == len.checked_sub(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                select_previous(&mut self.timeline_state, len);
                self.follow = false;
            }
            KeyCode::Home | KeyCode::Char('g') => {
                select_first(&mut self.timeline_state, len);
                self.follow = false;
            }
            KeyCode::End | KeyCode::Char('G') => {
                select_last(&mut self.timeline_state, len);
                self.follow = true;
            }
            KeyCode::Char('t') => {
                if let Some(index) = self.session.last_tool_result() {
                    self.timeline_state.select(Some(index));
                    self.follow = false;
                }
            }
            KeyCode::Enter => {
                self.open_entry_detail();
            }
            _ => {}
        }
    }

    fn handle_outline_key(&mut self, key: KeyEvent) {
        let len = self.session.state().total_sections();
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                select_next(&mut self.outline_state, len);
                self.body_scroll_offset = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                select_previous(&mut self.outline_state, len);
                self.body_scroll_offset = 0;
            }
            KeyCode::Home | KeyCode::Char('g') => {
                select_first(&mut self.outline_state, len);
                self.body_scroll_offset = 0;
            }
            KeyCode::End | KeyCode::Char('G') => {
                select_last(&mut self.outline_state, len);
                self.body_scroll_offset = 0;
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(index) = self.selected_section() {
                    self.session.state_mut().toggle_section(index);
                    self.body_scroll_offset = 0;
                }
            }
            KeyCode::PageDown | KeyCode::Char('d') | KeyCode::Char(' ') => {
                self.body_scroll_offset = self.body_scroll_offset.saturating_add(PAGE);
            }
            KeyCode::PageUp | KeyCode::Char('u') => {
                self.body_scroll_offset = self.body_scroll_offset.saturating_sub(PAGE);
            }
            _ => {}
        }
    }

    fn handle_console_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                self.console_scroll_offset = self.console_scroll_offset.saturating_add(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.follow = false;
                self.console_scroll_offset = self.console_scroll_offset.saturating_sub(1);
            }
            KeyCode::PageDown | KeyCode::Char('d') | KeyCode::Char(' ') => {
                self.console_scroll_offset = self.console_scroll_offset.saturating_add(PAGE);
            }
            KeyCode::PageUp | KeyCode::Char('u') => {
                self.follow = false;
                self.console_scroll_offset = self.console_scroll_offset.saturating_sub(PAGE);
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.follow = false;
                self.console_scroll_offset = 0;
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.follow = true;
                self.console_scroll_offset = usize::MAX;
            }
            _ => {}
        }
    }

    /// Open the selected timeline entry.
    ///
    /// Tool results with a structured view are extracted here, on demand.
    fn open_entry_detail(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };

        let detail = match extract_entry(entry) {
            Some(result) => DetailView {
                title: result.kind().display_name().to_string(),
                lines: message_format::tool_result_lines(&result),
                scroll_offset: 0,
            },
            None if entry.action == ActionKind::ToolResult => DetailView {
                title: entry.tool_name().unwrap_or("tool result").to_string(),
                lines: entry
                    .tool_result()
                    .unwrap_or_default()
                    .lines()
                    .map(|line| Line::raw(line.to_string()))
                    .collect(),
                scroll_offset: 0,
            },
            None => {
                let json = serde_json::to_string_pretty(entry)
                    .unwrap_or_else(|_| "[unprintable entry]".to_string());
                DetailView {
                    title: entry.action.label().to_string(),
                    lines: json.lines().map(|line| Line::raw(line.to_string())).collect(),
                    scroll_offset: 0,
                }
            }
        };

        tracing::debug!(title = %detail.title, lines = detail.lines.len(), "Opening entry detail");
        self.detail = Some(detail);
    }
}

fn select_next(state: &mut TableState, len: usize) {
    if len == 0 {
        return;
    }
    let i = match state.selected() {
        Some(i) if i + 1 < len => i + 1,
        Some(i) => i,
        None => 0,
    };
    state.select(Some(i));
}

fn select_previous(state: &mut TableState, len: usize) {
    if len == 0 {
        return;
    }
    let i = state.selected().map_or(0, |i| i.saturating_sub(1));
    state.select(Some(i));
}

fn select_first(state: &mut TableState, len: usize) {
    if len > 0 {
        state.select(Some(0));
    }
}

fn select_last(state: &mut TableState, len: usize) {
    if len > 0 {
        state.select(Some(len - 1));
    }
}
