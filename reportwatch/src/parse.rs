//! reportwatch-parse - offline tools for report logs
//!
//! Runs the same extraction, folding and rendering the TUI uses, without a
//! terminal UI:
//! - `extract`: structured view of one tool result, as JSON
//! - `render`: markdown to HTML
//! - `fold`: replay an agent log file and summarize the report state
//! - `export`: write the generated report as a standalone HTML page
//! - `tail`: follow a running report on stdout

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use reportwatch_core::format::{entry_summary, format_clock, format_elapsed};
use reportwatch_core::{
    escape_html, Batch, Config, LogCursor, LogEntry, OutlinePolicy, Poller, ReportClient,
    ReportState, SectionStatus, Session, SessionEffect, StreamKind, ToolKind,
};

#[derive(Parser)]
#[command(name = "reportwatch-parse")]
#[command(about = "Extract, fold and render report logs offline")]
#[command(version)]
struct Args {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides `server.base_url` from the config file
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the structured view of a tool result as JSON
    Extract {
        /// Tool that produced the text (insight_forge, panorama_search, interview_agents, quick_search)
        #[arg(long)]
        tool: String,

        /// File with the raw result text (stdin if omitted)
        file: Option<PathBuf>,
    },

    /// Render markdown to HTML
    Render {
        /// Markdown file (stdin if omitted)
        file: Option<PathBuf>,
    },

    /// Replay an agent log file (JSON array or JSON lines) and print the resulting state
    Fold {
        file: PathBuf,

        /// Print the state as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Let a later outline replace an earlier one
        #[arg(long)]
        last_outline_wins: bool,
    },

    /// Write the generated sections as one HTML page
    Export {
        /// Fetch the agent log of this report from the backend
        #[arg(long, required_unless_present = "log", conflicts_with = "log")]
        report_id: Option<String>,

        /// Read the agent log from a file instead
        #[arg(long)]
        log: Option<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Follow a report until it completes or Ctrl+C
    Tail {
        report_id: String,

        /// Also print console lines
        #[arg(long)]
        console: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;
    if let Some(server) = &args.server {
        config.server.base_url = server.clone();
    }

    let _log_guard = reportwatch_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    match args.command {
        Command::Extract { tool, file } => run_extract(&tool, file.as_deref()),
        Command::Render { file } => run_render(file.as_deref()),
        Command::Fold {
            file,
            json,
            last_outline_wins,
        } => {
            let policy = if last_outline_wins {
                OutlinePolicy::LastWriteWins
            } else {
                config.session.outline_policy
            };
            run_fold(&file, json, policy)
        }
        Command::Export {
            report_id,
            log,
            output,
        } => run_export(&config, report_id.as_deref(), log.as_deref(), &output),
        Command::Tail { report_id, console } => run_tail(&config, &report_id, console),
    }
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn run_extract(tool: &str, file: Option<&Path>) -> Result<()> {
    let Some(kind) = ToolKind::from_name(tool) else {
        let known: Vec<&str> = ToolKind::ALL.iter().map(|k| k.as_str()).collect();
        bail!(
            "no structured view for tool {:?} (known: {})",
            tool,
            known.join(", ")
        );
    };

    let text = read_input(file)?;
    let result = kind.extract(&text);
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("failed to serialize result")?
    );
    Ok(())
}

fn run_render(file: Option<&Path>) -> Result<()> {
    let text = read_input(file)?;
    println!("{}", reportwatch_core::render(&text));
    Ok(())
}

/// Agent log entries from a file, and the number of lines that were not entries.
fn read_log_file(path: &Path) -> Result<(Vec<LogEntry>, usize)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let values: Vec<serde_json::Value> = if content.trim_start().starts_with('[') {
        serde_json::from_str(&content)
            .with_context(|| format!("{} is not a JSON array", path.display()))?
    } else {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap_or(serde_json::Value::Null))
            .collect()
    };

    let total = values.len();
    let entries: Vec<LogEntry> = values
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    let skipped = total - entries.len();
    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "Skipped malformed log lines");
    }
    Ok((entries, skipped))
}

fn run_fold(file: &Path, json: bool, policy: OutlinePolicy) -> Result<()> {
    let (entries, skipped) = read_log_file(file)?;
    let count = entries.len();

    let mut session = Session::new("offline", policy);
    session.apply_entries(entries);
    let state = session.state();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(state).context("failed to serialize state")?
        );
        return Ok(());
    }

    print_state_summary(state);
    println!();
    println!("Entries: {} ({} skipped)", count, skipped);
    Ok(())
}

fn print_state_summary(state: &ReportState) {
    match &state.outline {
        Some(outline) => println!("Report: {}", outline.title),
        None => println!("Report: (no outline yet)"),
    }
    println!(
        "Sections: {}/{} ({}%)",
        state.completed_sections(),
        state.total_sections(),
        state.completion_percent()
    );

    if let Some(outline) = &state.outline {
        for (i, section) in outline.sections.iter().enumerate() {
            let index = i as u32 + 1;
            let badge = match state.section_status(index) {
                SectionStatus::Completed => "✓",
                SectionStatus::InProgress => "●",
                SectionStatus::Pending => "○",
            };
            println!("  {} {} {}", badge, index, section.title);
        }
    }

    let status = if state.completed {
        "complete"
    } else {
        "in progress"
    };
    println!("Status: {}", status);
    if let Some(elapsed) = state.elapsed(chrono::Utc::now()) {
        println!("Elapsed: {}", format_elapsed(elapsed));
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

/// Fetch the whole agent log of a report, page by page.
fn fetch_agent_log(config: &Config, report_id: &str) -> Result<Vec<LogEntry>> {
    let client = ReportClient::new(&config.server).context("invalid server configuration")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("invalid progress template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!(
        "Fetching {}",
        client.stream_url(StreamKind::Agent, report_id, 0)
    ));

    let entries = runtime()?.block_on(async {
        let mut entries = Vec::new();
        let mut cursor = LogCursor::new();
        loop {
            let page = client
                .fetch_agent_log(report_id, cursor.position())
                .await
                .with_context(|| format!("failed to fetch agent log of {}", report_id))?;
            if page.line_count == 0 {
                break;
            }
            cursor = page.next_cursor();
            entries.extend(page.items);
            pb.set_message(format!("Fetched {} entries", entries.len()));
        }
        Ok::<_, anyhow::Error>(entries)
    })?;

    pb.finish_and_clear();
    tracing::info!(report_id = %report_id, entries = entries.len(), "Fetched agent log");
    Ok(entries)
}

fn run_export(
    config: &Config,
    report_id: Option<&str>,
    log: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let entries = match (report_id, log) {
        (_, Some(path)) => read_log_file(path)?.0,
        (Some(report_id), None) => fetch_agent_log(config, report_id)?,
        (None, None) => bail!("either --report-id or --log is required"),
    };

    let mut session = Session::new(report_id.unwrap_or("offline"), config.session.outline_policy);
    session.apply_entries(entries);
    let state = session.state();

    if state.outline.is_none() {
        bail!("the log has no outline yet, nothing to export");
    }

    let html = export_html(state);
    std::fs::write(output, html)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Wrote {} ({} of {} sections)",
        output.display(),
        state.completed_sections(),
        state.total_sections()
    );
    Ok(())
}

/// A standalone HTML page with every generated section.
fn export_html(state: &ReportState) -> String {
    let (title, summary, sections) = match &state.outline {
        Some(outline) => (
            outline.title.as_str(),
            outline.summary.as_str(),
            outline.sections.as_slice(),
        ),
        None => ("", "", &[][..]),
    };

    let mut body = String::new();
    body.push_str(&format!("<h1>{}</h1>\n", escape_html(title)));
    if !summary.is_empty() {
        body.push_str(&format!("<p class=\"summary\">{}</p>\n", escape_html(summary)));
    }
    for (i, section) in sections.iter().enumerate() {
        let index = i as u32 + 1;
        let content = match state.section_content(index) {
            Some(content) => reportwatch_core::render(content),
            None => "<p class=\"pending\">Not generated.</p>".to_string(),
        };
        body.push_str(&format!(
            "<section id=\"section-{}\">\n<h2>{}. {}</h2>\n{}\n</section>\n",
            index,
            index,
            escape_html(&section.title),
            content
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        body
    )
}

fn run_tail(config: &Config, report_id: &str, console: bool) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let client = ReportClient::new(&config.server).context("invalid server configuration")?;
    let mut session = Session::new(report_id, config.session.outline_policy);

    println!("Following {} on {}. Press Ctrl+C to stop.", report_id, client.base_url());

    runtime()?.block_on(async {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let Some(_poller) = Poller::start(
            Arc::new(client),
            session.report_id(),
            session.generation(),
            &config.polling,
            tx,
        ) else {
            bail!("report id must not be empty");
        };

        while running.load(Ordering::SeqCst) {
            let update = match tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
                Ok(Some(update)) => update,
                Ok(None) => break,
                Err(_) => continue,
            };

            match &update.batch {
                Batch::Agent(entries) => {
                    for entry in entries {
                        println!(
                            "{}  {:<20} {}",
                            format_clock(entry.timestamp),
                            entry.action.label(),
                            entry_summary(entry)
                        );
                    }
                }
                Batch::Console(lines) if console => {
                    for line in lines {
                        println!("          [{}] {}", line.level.as_str(), line.text);
                    }
                }
                Batch::Console(_) => {}
            }

            if session
                .ingest(update)
                .contains(&SessionEffect::StatusCompleted)
            {
                println!();
                print_state_summary(session.state());
                break;
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportwatch_core::{ActionKind, EntryDetails, ReportOutline};

    #[test]
    fn test_export_html_escapes_titles() {
        let outline: ReportOutline = serde_json::from_value(serde_json::json!({
            "title": "A <b> & C",
            "summary": "the \"plan\"",
            "sections": [{"title": "One"}, {"title": "Two"}]
        }))
        .unwrap();

        let mut state = ReportState::default();
        state.apply(
            &LogEntry::new(ActionKind::PlanningComplete, 1).with_details(EntryDetails {
                outline: Some(outline),
                ..Default::default()
            }),
            OutlinePolicy::default(),
        );
        state.apply(
            &LogEntry::new(ActionKind::SectionComplete, 2)
                .with_section(1, "One")
                .with_details(EntryDetails {
                    content: Some("**done**".to_string()),
                    ..Default::default()
                }),
            OutlinePolicy::default(),
        );

        let html = export_html(&state);
        assert!(html.contains("<title>A &lt;b&gt; &amp; C</title>"));
        assert!(html.contains("<p class=\"summary\">the &quot;plan&quot;</p>"));
        assert!(html.contains("<strong>done</strong>"));
        assert!(html.contains("<h2>2. Two</h2>\n<p class=\"pending\">Not generated.</p>"));
    }
}
