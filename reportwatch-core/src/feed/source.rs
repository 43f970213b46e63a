//! Log source abstraction and the single-step poll operation.
//!
//! [`LogSource`] is the seam between the monitor and the report backend. The
//! HTTP implementation is [`ReportClient`](super::ReportClient); tests plug in
//! in-memory sources.

use async_trait::async_trait;

use crate::console::ConsoleLine;
use crate::error::Result;
use crate::types::{ActionKind, LogEntry, StreamKind};

use super::cursor::LogCursor;

/// One page returned by a log endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LogPage<T> {
    /// Offset the returned lines start at
    pub from_line: u64,
    /// Decoded lines (malformed lines are dropped)
    pub items: Vec<T>,
    /// Number of raw lines the endpoint returned, including dropped ones
    pub line_count: u64,
}

impl<T> LogPage<T> {
    /// Page where every raw line decoded successfully
    pub fn new(from_line: u64, items: Vec<T>) -> Self {
        let line_count = items.len() as u64;
        Self {
            from_line,
            items,
            line_count,
        }
    }

    /// Cursor for the request after this page: the offset the endpoint
    /// answered from plus the raw lines it returned
    pub fn next_cursor(&self) -> LogCursor {
        LogCursor::at(self.from_line).advanced(self.line_count)
    }
}

/// Trait implemented by anything that can serve the two report log streams.
///
/// ## Error Handling
///
/// Implementations return `Err` for transport failures, `success: false`
/// replies and undecodable bodies. Callers treat every error as
/// "no new data this tick".
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Agent log entries at index >= `from_line`
    async fn agent_log(&self, report_id: &str, from_line: u64) -> Result<LogPage<LogEntry>>;

    /// Console log lines at index >= `from_line`
    async fn console_log(&self, report_id: &str, from_line: u64) -> Result<LogPage<String>>;
}

/// New lines produced by one poll of one stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Agent(Vec<LogEntry>),
    Console(Vec<ConsoleLine>),
}

impl Batch {
    pub fn empty(stream: StreamKind) -> Self {
        match stream {
            StreamKind::Agent => Batch::Agent(Vec::new()),
            StreamKind::Console => Batch::Console(Vec::new()),
        }
    }

    pub fn stream(&self) -> StreamKind {
        match self {
            Batch::Agent(_) => StreamKind::Agent,
            Batch::Console(_) => StreamKind::Console,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Batch::Agent(entries) => entries.len(),
            Batch::Console(lines) => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this batch carries the end-of-report marker
    pub fn completes_report(&self) -> bool {
        match self {
            Batch::Agent(entries) => entries
                .iter()
                .any(|entry| entry.action == ActionKind::ReportComplete),
            Batch::Console(_) => false,
        }
    }
}

/// Poll one stream once.
///
/// Returns the new lines and the cursor to use next time, which is the
/// `from_line` the endpoint answered with plus the number of lines it
/// returned. An empty report id is a no-op. Failures are logged and
/// swallowed: the cursor comes back unchanged so the next tick retries the
/// same offset.
pub async fn poll(
    source: &dyn LogSource,
    stream: StreamKind,
    report_id: &str,
    cursor: LogCursor,
) -> (Batch, LogCursor) {
    if report_id.trim().is_empty() {
        return (Batch::empty(stream), cursor);
    }

    let from_line = cursor.position();
    let fetched = match stream {
        StreamKind::Agent => source
            .agent_log(report_id, from_line)
            .await
            .map(|page| (page.from_line, page.next_cursor(), Batch::Agent(page.items))),
        StreamKind::Console => source.console_log(report_id, from_line).await.map(|page| {
            let next = page.next_cursor();
            let lines = page.items.into_iter().map(ConsoleLine::new).collect();
            (page.from_line, next, Batch::Console(lines))
        }),
    };

    match fetched {
        Ok((page_from, next, batch)) => {
            let line_count = next.position().saturating_sub(page_from);
            if page_from != from_line {
                tracing::debug!(
                    stream = %stream,
                    report_id = %report_id,
                    requested = from_line,
                    returned = page_from,
                    "Endpoint answered from a different offset"
                );
            }
            if line_count > 0 {
                tracing::trace!(
                    stream = %stream,
                    report_id = %report_id,
                    from_line = page_from,
                    count = line_count,
                    "Fetched new log lines"
                );
            }
            (batch, next)
        }
        Err(e) => {
            tracing::warn!(
                stream = %stream,
                report_id = %report_id,
                from_line,
                error = %e,
                "Log poll failed, will retry next tick"
            );
            (Batch::empty(stream), cursor)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedSource;
    use super::*;

    #[tokio::test]
    async fn test_cursor_is_sum_of_successful_counts() {
        let source = ScriptedSource::with_agent_replies(vec![Some(3), Some(0), Some(2), Some(5)]);
        let mut cursor = LogCursor::new();
        let mut expected = 0;

        for count in [3, 0, 2, 5] {
            let (batch, next) = poll(&source, StreamKind::Agent, "r1", cursor).await;
            expected += count;
            assert_eq!(batch.len(), count as usize);
            assert_eq!(next.position(), expected);
            cursor = next;
        }
    }

    #[tokio::test]
    async fn test_failed_poll_leaves_cursor_unchanged() {
        let source = ScriptedSource::with_agent_replies(vec![Some(4), None, Some(1)]);

        let (_, cursor) = poll(&source, StreamKind::Agent, "r1", LogCursor::new()).await;
        assert_eq!(cursor.position(), 4);

        let (batch, after_failure) = poll(&source, StreamKind::Agent, "r1", cursor).await;
        assert!(batch.is_empty());
        assert_eq!(after_failure, cursor);

        let (_, retried) = poll(&source, StreamKind::Agent, "r1", after_failure).await;
        assert_eq!(retried.position(), 5);

        let offsets = source.requested_offsets.lock().unwrap().clone();
        assert_eq!(
            offsets,
            vec![
                (StreamKind::Agent, 0),
                (StreamKind::Agent, 4),
                (StreamKind::Agent, 4)
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_report_id_is_noop() {
        let source = ScriptedSource::with_agent_replies(vec![Some(3)]);
        let (batch, cursor) = poll(&source, StreamKind::Agent, "  ", LogCursor::at(2)).await;
        assert!(batch.is_empty());
        assert_eq!(cursor.position(), 2);
        assert_eq!(
            source
                .agent_calls
                .load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn test_console_lines_are_classified() {
        let source = ScriptedSource::default();
        source.push_console_replies(vec![Some(2)]);

        let (batch, cursor) = poll(&source, StreamKind::Console, "r1", LogCursor::new()).await;
        assert_eq!(cursor.position(), 2);
        match batch {
            Batch::Console(lines) => {
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[0].text, "[line 0] INFO");
            }
            other => panic!("expected console batch, got {:?}", other),
        }
    }

    /// Endpoint that always answers from a fixed offset, whatever was asked
    struct ShiftedSource {
        answer_from: u64,
        count: usize,
    }

    #[async_trait]
    impl LogSource for ShiftedSource {
        async fn agent_log(&self, _report_id: &str, _from_line: u64) -> Result<LogPage<LogEntry>> {
            let entries = (0..self.count)
                .map(|i| LogEntry::new(ActionKind::LlmResponse, i as i64))
                .collect();
            Ok(LogPage::new(self.answer_from, entries))
        }

        async fn console_log(&self, _report_id: &str, _from_line: u64) -> Result<LogPage<String>> {
            Ok(LogPage::new(self.answer_from, Vec::new()))
        }
    }

    #[tokio::test]
    async fn test_next_cursor_follows_returned_offset() {
        let source = ShiftedSource {
            answer_from: 5,
            count: 2,
        };

        let (batch, cursor) = poll(&source, StreamKind::Agent, "r1", LogCursor::new()).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(cursor.position(), 7);

        let (batch, cursor) = poll(&source, StreamKind::Console, "r1", LogCursor::at(9)).await;
        assert!(batch.is_empty());
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn test_batch_completes_report() {
        let batch = Batch::Agent(vec![
            LogEntry::new(ActionKind::SectionComplete, 1),
            LogEntry::new(ActionKind::ReportComplete, 2),
        ]);
        assert!(batch.completes_report());
        assert!(!Batch::empty(StreamKind::Agent).completes_report());
    }
}
