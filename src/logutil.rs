//! Helpers for putting player input into log lines.
//!
//! Answers and terminal commands are free text; they are escaped so one log
//! record stays on one line, and clipped so a pasted wall of text cannot flood
//! the log file.

use std::fmt::Write;

/// Longest player string kept in a log record, in characters.
pub const MAX_LOG_PREVIEW: usize = 120;

/// Escape control characters and clip to [`MAX_LOG_PREVIEW`] characters
/// (marked with a trailing `…`).
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_LOG_PREVIEW) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count == MAX_LOG_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_records_single_line() {
        assert_eq!(escape_log("4721\nSOLVE 1"), "4721\\nSOLVE 1");
        assert_eq!(escape_log("a\tb\\c"), "a\\tb\\\\c");
        assert_eq!(escape_log("bell\u{7}"), "bell\\u{7}");
    }

    #[test]
    fn clips_long_input() {
        let long = "x".repeat(MAX_LOG_PREVIEW + 50);
        let escaped = escape_log(&long);
        assert_eq!(escaped.chars().count(), MAX_LOG_PREVIEW + 1);
        assert!(escaped.ends_with('…'));
        assert_eq!(escape_log(&"y".repeat(MAX_LOG_PREVIEW)).chars().count(), MAX_LOG_PREVIEW);
    }
}
