//! Integration tests for the reportwatch pipeline
//!
//! These tests use the fixture files in `tests/fixtures/` (a complete agent
//! log of a three-section report, its console log, and one result per
//! research tool) to exercise fetching, folding, extraction and rendering
//! together.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reportwatch_core::config::PollingConfig;
use reportwatch_core::extract::{extract_entry, ToolResult};
use reportwatch_core::feed::{LogPage, LogSource, Poller};
use reportwatch_core::{
    ActionKind, ConsoleLevel, ConsoleLine, LogEntry, OutlinePolicy, SectionStatus, Session,
    SessionEffect,
};

const REPORT_START_MS: i64 = 1_714_557_600_000;

/// Get the path to a fixture file
fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn raw_agent_lines() -> Vec<serde_json::Value> {
    let content = std::fs::read_to_string(fixture_path("agent-log.jsonl")).unwrap();
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn agent_entries() -> Vec<LogEntry> {
    raw_agent_lines()
        .into_iter()
        .filter_map(|raw| serde_json::from_value(raw).ok())
        .collect()
}

fn console_lines() -> Vec<String> {
    std::fs::read_to_string(fixture_path("console-log.txt"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Serves the fixture logs a few lines at a time
struct FixtureSource {
    agent: Vec<serde_json::Value>,
    console: Vec<String>,
    page_size: usize,
    agent_calls: AtomicUsize,
    console_calls: AtomicUsize,
}

impl FixtureSource {
    fn new(page_size: usize) -> Self {
        Self {
            agent: raw_agent_lines(),
            console: console_lines(),
            page_size,
            agent_calls: AtomicUsize::new(0),
            console_calls: AtomicUsize::new(0),
        }
    }

    fn page<T: Clone>(&self, lines: &[T], from_line: u64) -> Vec<T> {
        let start = (from_line as usize).min(lines.len());
        let end = (start + self.page_size).min(lines.len());
        lines[start..end].to_vec()
    }
}

#[async_trait]
impl LogSource for FixtureSource {
    async fn agent_log(
        &self,
        _report_id: &str,
        from_line: u64,
    ) -> reportwatch_core::Result<LogPage<LogEntry>> {
        self.agent_calls.fetch_add(1, Ordering::SeqCst);
        let raw = self.page(&self.agent, from_line);
        let line_count = raw.len() as u64;
        let items = raw
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        Ok(LogPage {
            from_line,
            items,
            line_count,
        })
    }

    async fn console_log(
        &self,
        _report_id: &str,
        from_line: u64,
    ) -> reportwatch_core::Result<LogPage<String>> {
        self.console_calls.fetch_add(1, Ordering::SeqCst);
        Ok(LogPage::new(from_line, self.page(&self.console, from_line)))
    }
}

// ============================================
// Folding
// ============================================

#[test]
fn test_fixture_lines_decode() {
    assert_eq!(raw_agent_lines().len(), 23);
    // One line is not an entry at all.
    assert_eq!(agent_entries().len(), 22);
}

#[test]
fn test_fold_complete_report() {
    reportwatch_core::logging::init_test();
    let mut session = Session::new("report_fixture", OutlinePolicy::default());
    let effects = session.apply_entries(agent_entries());

    assert_eq!(effects, vec![SessionEffect::StatusCompleted]);

    let state = session.state();
    let outline = state.outline.as_ref().expect("outline should be set");
    assert_eq!(outline.title, "宿舍新规舆论预测报告");
    assert_eq!(outline.sections.len(), 3);
    assert_eq!(outline.sections[1].description, "一周内的讨论走向");

    assert!(state.completed);
    assert_eq!(state.current_section, None);
    assert_eq!(state.started_at, Some(REPORT_START_MS));
    assert_eq!(state.completed_sections(), 3);
    assert_eq!(state.completion_percent(), 100);
    for index in 1..=3 {
        assert_eq!(state.section_status(index), SectionStatus::Completed);
        assert!(state.is_expanded(index));
    }
    assert_eq!(
        state.section_content(2),
        Some("讨论在第三天达到高峰，随后回落。")
    );
    assert_eq!(
        state.elapsed(chrono::Utc::now()),
        Some(chrono::Duration::seconds(50))
    );
}

#[test]
fn test_fold_partial_report() {
    let mut session = Session::new("report_fixture", OutlinePolicy::default());
    let entries: Vec<LogEntry> = agent_entries().into_iter().take(10).collect();
    assert!(session.apply_entries(entries).is_empty());

    let state = session.state();
    assert!(!state.completed);
    assert_eq!(state.current_section, Some(2));
    assert_eq!(state.section_status(1), SectionStatus::Completed);
    assert_eq!(state.section_status(2), SectionStatus::InProgress);
    assert_eq!(state.section_status(3), SectionStatus::Pending);
    assert_eq!(state.completion_percent(), 33);
}

#[test]
fn test_unknown_action_survives_folding() {
    let entries = agent_entries();
    let unknown = entries
        .iter()
        .find(|entry| !entry.action.is_known())
        .expect("fixture has an unknown action");
    assert_eq!(unknown.action.label(), "reflection_start");
}

// ============================================
// Extraction
// ============================================

#[test]
fn test_every_tool_result_in_log_extracts() {
    let results: Vec<ToolResult> = agent_entries().iter().filter_map(extract_entry).collect();
    assert_eq!(results.len(), 4);

    match &results[0] {
        ToolResult::InsightForge(insight) => {
            assert_eq!(insight.query, "新校规发布后一周内舆论会如何演变？");
            assert_eq!(insight.stats.facts, 14);
            assert_eq!(insight.stats.entities, 6);
            assert_eq!(insight.stats.relationships, 3);
            assert_eq!(insight.sub_queries.len(), 3);
            assert_eq!(insight.facts[1], "超过六成受访学生表示反对夜间门禁");
            assert_eq!(insight.entities.len(), 3);
            assert_eq!(insight.entities[2].entity_type, "Media");
            assert_eq!(insight.relations[0].relation, "发起问卷");
        }
        other => panic!("expected insight_forge, got {:?}", other.kind()),
    }

    match &results[1] {
        ToolResult::Panorama(panorama) => {
            assert_eq!(panorama.stats.nodes, 38);
            assert_eq!(panorama.active_facts.len(), 3);
            assert_eq!(panorama.historical_facts.len(), 2);
            assert_eq!(panorama.entities.len(), 3);
        }
        other => panic!("expected panorama_search, got {:?}", other.kind()),
    }

    match &results[2] {
        ToolResult::QuickSearch(search) => {
            assert_eq!(search.query, "门禁时间调整");
            assert_eq!(search.count, 2);
            assert_eq!(search.facts.len(), 2);
        }
        other => panic!("expected quick_search, got {:?}", other.kind()),
    }

    match &results[3] {
        ToolResult::Interview(interview) => {
            assert_eq!(interview.topic, "宿舍新规对学生生活的影响");
            assert_eq!((interview.success_count, interview.total_count), (2, 6));
            assert_eq!(interview.interviews.len(), 2);

            let student = &interview.interviews[0];
            assert_eq!(student.name, "王小明");
            assert_eq!(student.role, "本科生");
            assert_eq!(student.questions.len(), 2);
            assert!(student.is_dual_platform());
            assert_eq!(
                student.split_answers(&student.reddit_answer),
                vec!["我觉得规定本身可以理解，但执行方式有问题。", "可以设置一个过渡期。"]
            );
            assert_eq!(
                student.quotes,
                vec!["第一印象是太突然了，没有任何征求意见的过程"]
            );

            let supervisor = &interview.interviews[1];
            assert_eq!(supervisor.num, 2);
            assert_eq!(supervisor.title, "宿管老师");
            assert!(!supervisor.is_dual_platform());
            assert_eq!(supervisor.reddit_answer, "");
            assert_eq!(supervisor.quotes.len(), 1);
        }
        other => panic!("expected interview_agents, got {:?}", other.kind()),
    }
}

// ============================================
// Rendering
// ============================================

#[test]
fn test_section_bodies_render() {
    let mut session = Session::new("report_fixture", OutlinePolicy::default());
    session.apply_entries(agent_entries());

    let first = reportwatch_core::render(session.state().section_content(1).unwrap());
    assert!(first.starts_with(r#"<h3 class="md-h3">事件背景</h3>"#));
    assert!(first.contains("<strong>宿舍管理新规</strong>"));
    assert!(first.contains(
        r#"<ul class="md-ul"><li class="md-li">夜间门禁</li><li class="md-li">访客登记</li></ul>"#
    ));
    assert!(!first.contains(r#"<p class="md-p"><h3"#));

    let third = reportwatch_core::render(session.state().section_content(3).unwrap());
    assert_eq!(
        third,
        r#"<blockquote class="md-quote">第一印象是太突然了</blockquote><p class="md-p">教职工认为秩序有所改善。</p>"#
    );
}

// ============================================
// Console
// ============================================

#[test]
fn test_console_fixture_levels() {
    let lines: Vec<ConsoleLine> = console_lines().into_iter().map(ConsoleLine::new).collect();
    let count = |level: ConsoleLevel| lines.iter().filter(|line| line.level == level).count();

    assert_eq!(count(ConsoleLevel::Error), 2);
    assert_eq!(count(ConsoleLevel::Warning), 2);
    assert_eq!(count(ConsoleLevel::Info), 3);
}

// ============================================
// End-to-end polling
// ============================================

#[tokio::test(start_paused = true)]
async fn test_poll_fixture_until_complete() {
    reportwatch_core::logging::init_test();
    let source = Arc::new(FixtureSource::new(5));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session = Session::new("report_fixture", OutlinePolicy::default());

    let poller = Poller::start(
        source.clone(),
        session.report_id(),
        session.generation(),
        &PollingConfig::default(),
        tx,
    )
    .expect("poller should start");

    let mut effects = Vec::new();
    while !session.state().completed {
        let update = tokio::time::timeout(Duration::from_secs(120), rx.recv())
            .await
            .expect("report should complete")
            .expect("channel open");
        effects.extend(session.ingest(update));
    }

    assert_eq!(effects, vec![SessionEffect::StatusCompleted]);
    assert_eq!(session.agent_logs().len(), 22);
    assert_eq!(
        session.agent_logs().last().map(|entry| &entry.action),
        Some(&ActionKind::ReportComplete)
    );
    assert!(poller.is_stopped());

    let agent_calls = source.agent_calls.load(Ordering::SeqCst);
    let console_calls = source.console_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.agent_calls.load(Ordering::SeqCst), agent_calls);
    assert_eq!(source.console_calls.load(Ordering::SeqCst), console_calls);

    // Console lines that arrived before the stop are kept in order.
    while let Ok(update) = rx.try_recv() {
        session.ingest(update);
    }
    let console = session.console_logs();
    assert!(!console.is_empty());
    assert_eq!(console[0].text, "[10:00:00] INFO 报告生成任务已启动");
}
