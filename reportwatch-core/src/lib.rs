//! # reportwatch-core
//!
//! Core library for reportwatch, a live monitor for report generation runs.
//!
//! This library provides:
//! - Domain types for agent log entries and report outlines
//! - Incremental fetching of the agent and console log streams
//! - The session reducer that folds the agent log into report state
//! - Structured extractors for research tool results
//! - A small markdown renderer for generated sections
//! - Configuration and logging infrastructure
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  FeedUpdate  ┌─────────────┐  apply  ┌──────────────┐
//! │    Poller    │ ───────────► │   Session   │ ──────► │ ReportState  │
//! │ agent/console│   (mpsc)     │ (one report)│         │              │
//! └──────────────┘              └─────────────┘         └──────────────┘
//!                                      │ on demand
//!                                      ▼
//!                        extract::extract_entry / markdown::render
//! ```
//!
//! The poller only fetches. All state lives in the [`Session`], which is
//! owned by a single consumer and replaced wholesale when the report changes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reportwatch_core::{Config, Poller, ReportClient, Session};
//!
//! # async fn run() -> reportwatch_core::Result<()> {
//! let config = Config::load()?;
//! let client = Arc::new(ReportClient::new(&config.server)?);
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!
//! let mut session = Session::new("report_1", config.session.outline_policy);
//! let _poller = Poller::start(client, session.report_id(), session.generation(), &config.polling, tx);
//!
//! while let Some(update) = rx.recv().await {
//!     session.ingest(update);
//!     println!("{}% complete", session.state().completion_percent());
//! }
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::{Config, OutlinePolicy};
pub use console::{ConsoleLevel, ConsoleLine};
pub use error::{Error, Result};
pub use extract::{extract, extract_entry, ToolKind, ToolResult};
pub use feed::{Batch, FeedUpdate, LogCursor, LogSource, Poller, ReportClient};
pub use markdown::{escape_html, render};
pub use session::{ReportState, SectionStatus, Session, SessionEffect};
pub use types::*;

// Public modules
pub mod config;
pub mod console;
pub mod error;
pub mod extract;
pub mod feed;
pub mod format;
pub mod logging;
pub mod markdown;
pub mod session;
pub mod types;
