//! Per-stream read position.

/// "Next line to request" for one log stream.
///
/// After a successful fetch the cursor sits at the offset the endpoint
/// answered from plus the number of lines it returned. Failed fetches leave
/// it where it was.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCursor {
    next_line: u64,
}

impl LogCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor positioned at a specific line
    pub fn at(next_line: u64) -> Self {
        Self { next_line }
    }

    /// Line offset to send as `from_line` on the next request
    pub fn position(&self) -> u64 {
        self.next_line
    }

    /// Cursor after consuming `count` more lines
    pub fn advanced(self, count: u64) -> Self {
        Self {
            next_line: self.next_line.saturating_add(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_starts_at_zero() {
        assert_eq!(LogCursor::new().position(), 0);
    }

    #[test]
    fn test_cursor_advances_by_count() {
        let cursor = LogCursor::new().advanced(3).advanced(0).advanced(4);
        assert_eq!(cursor.position(), 7);
    }

    #[test]
    fn test_cursor_saturates() {
        assert_eq!(LogCursor::at(u64::MAX).advanced(5).position(), u64::MAX);
    }
}
