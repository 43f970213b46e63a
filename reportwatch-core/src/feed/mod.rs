//! Incremental fetching of the agent and console log streams.
//!
//! - [`cursor`]: per-stream read offset
//! - [`source`]: the [`LogSource`] seam and the single-step [`poll`]
//! - [`client`]: HTTP implementation against the report backend
//! - [`poller`]: fixed-interval background polling of both streams

pub mod client;
pub mod cursor;
pub mod poller;
pub mod source;

pub use client::ReportClient;
pub use cursor::LogCursor;
pub use poller::{FeedUpdate, Poller};
pub use source::{poll, Batch, LogPage, LogSource};
