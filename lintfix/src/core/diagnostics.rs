//! Extraction of typed findings from free-form analysis tool output.
//!
//! The tool prints one finding per line in the shape
//! `<path>:<line>:<column>: <LETTER><4 digits>: <message>`. Everything else
//! (module headers, score summaries, blank lines) is context and is skipped.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

static FINDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(\d+):(\d+): ([A-Z]\d{4}): (.*)").unwrap());

/// Severity bucket derived from the first letter of a finding's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
}

impl Severity {
    /// Classify a code by its category letter.
    ///
    /// `F` (fatal) and `E` map to errors, `I` to information, and every other
    /// letter falls back to a warning.
    pub fn from_code(code: &str) -> Self {
        match code.chars().next() {
            Some('F' | 'E') => Severity::Error,
            Some('I') => Severity::Information,
            _ => Severity::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
        }
    }
}

/// One finding parsed from exactly one line of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// 1-based source line.
    pub line: u32,
    /// Column as reported by the tool.
    pub column: u32,
    /// Classifier token, e.g. `W0102`.
    pub code: String,
    pub message: String,
}

impl DiagnosticRecord {
    pub fn severity(&self) -> Severity {
        Severity::from_code(&self.code)
    }

    /// Parse a single output line. Returns `None` for lines that are not findings.
    pub fn from_line(line: &str) -> Option<Self> {
        let caps = FINDING_RE.captures(line)?;
        Some(Self {
            line: saturating_number(&caps[1]),
            column: saturating_number(&caps[2]),
            code: caps[3].to_string(),
            message: caps[4].trim().to_string(),
        })
    }
}

/// Digits from a matched line; values beyond `u32::MAX` are clamped.
fn saturating_number(digits: &str) -> u32 {
    digits.parse().unwrap_or_else(|_| {
        debug!(digits, "position out of range, clamping");
        u32::MAX
    })
}

/// Parse raw tool output into records, preserving output order.
///
/// Never fails: unmatched lines are dropped and empty output yields no records.
pub fn parse(raw_output: &str) -> Vec<DiagnosticRecord> {
    if raw_output.trim().is_empty() {
        return Vec::new();
    }
    raw_output
        .lines()
        .filter_map(DiagnosticRecord::from_line)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../tests/fixtures/pylint_sample.txt");

    #[test]
    fn parses_single_finding() {
        let records = parse("sample.py:12:4: W0102: Dangerous default value [] as argument  ");
        assert_eq!(
            records,
            vec![DiagnosticRecord {
                line: 12,
                column: 4,
                code: "W0102".to_string(),
                message: "Dangerous default value [] as argument".to_string(),
            }]
        );
        assert_eq!(records[0].severity(), Severity::Warning);
    }

    #[test]
    fn severity_follows_category_letter() {
        let cases = [
            ("E0602", Severity::Error),
            ("F0001", Severity::Error),
            ("I1101", Severity::Information),
            ("W0122", Severity::Warning),
            ("C0114", Severity::Warning),
            ("R1721", Severity::Warning),
        ];
        for (code, expected) in cases {
            let line = format!("a.py:1:0: {code}: msg");
            let records = parse(&line);
            assert_eq!(records.len(), 1, "{code}");
            assert_eq!(records[0].code, code);
            assert_eq!(records[0].severity(), expected, "{code}");
        }
    }

    #[test]
    fn lines_without_findings_yield_nothing() {
        assert!(parse("random\nlines\n").is_empty());
        assert!(parse("").is_empty());
        assert!(parse("   \n\t\n").is_empty());
        assert!(parse("a.py:1:0: w0102: lowercase code").is_empty());
        assert!(parse("a.py:1: W0102: missing column").is_empty());
        assert!(parse("a.py:1:0: W010: short code").is_empty());
    }

    #[test]
    fn drive_letter_paths_do_not_confuse_the_pattern() {
        let records = parse(r"C:\work\sample.py:7:0: E0602: Undefined variable 'z'");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line, 7);
        assert_eq!(records[0].column, 0);
        assert_eq!(records[0].message, "Undefined variable 'z'");
    }

    #[test]
    fn oversized_positions_are_clamped_not_dropped() {
        let records = parse("a.py:99999999999:4294967296: E0001: huge\na.py:2:0: C0114: doc");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, u32::MAX);
        assert_eq!(records[0].column, u32::MAX);
        assert_eq!(records[0].message, "huge");
        assert_eq!(records[1].line, 2);
    }

    #[test]
    fn message_keeps_inner_colons() {
        let records = parse("a.py:3:8: W0613: Unused argument: 'arg' (unused-argument)");
        assert_eq!(records[0].message, "Unused argument: 'arg' (unused-argument)");
    }

    #[test]
    fn crlf_output_is_handled() {
        let records = parse("a.py:1:0: C0114: Missing module docstring\r\na.py:2:0: E0102: dup\r\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "Missing module docstring");
        assert_eq!(records[1].severity(), Severity::Error);
    }

    #[test]
    fn parses_tool_report_in_order() {
        let records = parse(SAMPLE);
        let codes: Vec<&str> = records.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                "E0108", "W0102", "W0122", "W0123", "E0601", "C0123", "W0120", "W0104",
                "E0104", "E0105", "W0150", "E0116",
            ]
        );
        assert_eq!(records[1].line, 4);
        assert_eq!(records[1].column, 0);
        assert!(records.iter().all(|r| !r.message.ends_with(' ')));
    }
}
