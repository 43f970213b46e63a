//! Console log lines and their derived severity.
//!
//! The backend's console log is plain text. Severity is not transmitted, so it
//! is recovered by looking for the level tokens the backend's logger prints
//! (in English or Chinese).

use serde::{Deserialize, Serialize};

/// Severity derived from a console line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleLevel {
    Error,
    Warning,
    #[default]
    Info,
}

impl ConsoleLevel {
    /// Classify a raw console line.
    ///
    /// Error tokens win over warning tokens when both are present.
    pub fn classify(line: &str) -> Self {
        if line.contains("ERROR") || line.contains("错误") {
            ConsoleLevel::Error
        } else if line.contains("WARNING") || line.contains("警告") {
            ConsoleLevel::Warning
        } else {
            ConsoleLevel::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleLevel::Error => "error",
            ConsoleLevel::Warning => "warning",
            ConsoleLevel::Info => "info",
        }
    }
}

/// One console log line with its classified level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLine {
    pub text: String,
    pub level: ConsoleLevel,
}

impl ConsoleLine {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let level = ConsoleLevel::classify(&text);
        Self { text, level }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_levels() {
        assert_eq!(
            ConsoleLevel::classify("[10:00:01] ERROR: connection refused"),
            ConsoleLevel::Error
        );
        assert_eq!(
            ConsoleLevel::classify("[10:00:01] 发生错误，重试中"),
            ConsoleLevel::Error
        );
        assert_eq!(
            ConsoleLevel::classify("[10:00:02] WARNING slow response"),
            ConsoleLevel::Warning
        );
        assert_eq!(ConsoleLevel::classify("警告: 配额不足"), ConsoleLevel::Warning);
        assert_eq!(
            ConsoleLevel::classify("[10:00:03] INFO section 2 started"),
            ConsoleLevel::Info
        );
    }

    #[test]
    fn test_error_wins_over_warning() {
        assert_eq!(
            ConsoleLevel::classify("WARNING: retry failed with ERROR"),
            ConsoleLevel::Error
        );
    }

    #[test]
    fn test_level_tokens_are_case_sensitive() {
        assert_eq!(ConsoleLevel::classify("no errors so far"), ConsoleLevel::Info);
    }

    #[test]
    fn test_console_line_new() {
        let line = ConsoleLine::new("ERROR boom");
        assert_eq!(line.level, ConsoleLevel::Error);
        assert_eq!(line.text, "ERROR boom");
    }
}
