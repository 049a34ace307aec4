//! Errors and warnings pulled out of an engine log.
//!
//! This is a line scanner, not a log parser: it recognizes the three shapes
//! that matter when reporting a failed build and ignores everything else.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogDiagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl fmt::Display for LogDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{file}:{line}: {label}: {}", self.message),
            (None, Some(line)) => write!(f, "line {line}: {label}: {}", self.message),
            _ => write!(f, "{label}: {}", self.message),
        }
    }
}

// `./main.tex:12: Undefined control sequence.`
static FILE_LINE_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<file>[^\s:][^:]*\.[A-Za-z]+):(?P<line>\d+): (?P<msg>.+)$").unwrap());
static BANG_ERROR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^! (?P<msg>.+)$").unwrap());
static ERROR_LINE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^l\.(?P<line>\d+)").unwrap());
static WARNING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:LaTeX|Package \S+|Class \S+) Warning: (?P<msg>.+)$").unwrap()
});
static INPUT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"on input line (?P<line>\d+)").unwrap());

/// Scans `log` for errors and warnings, in log order.
pub fn parse_log(log: &str) -> Vec<LogDiagnostic> {
    let lines: Vec<&str> = log.lines().collect();
    let mut diagnostics = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if let Some(caps) = FILE_LINE_ERROR.captures(line) {
            diagnostics.push(LogDiagnostic {
                severity: Severity::Error,
                message: caps["msg"].trim().to_string(),
                file: Some(caps["file"].to_string()),
                line: caps["line"].parse().ok(),
            });
        } else if let Some(caps) = BANG_ERROR.captures(line) {
            // The `l.<n>` reference follows within the next few lines.
            let line_ref = lines[i + 1..]
                .iter()
                .take(8)
                .find_map(|l| ERROR_LINE_REF.captures(l))
                .and_then(|c| c["line"].parse().ok());
            diagnostics.push(LogDiagnostic {
                severity: Severity::Error,
                message: caps["msg"].trim().to_string(),
                file: None,
                line: line_ref,
            });
        } else if let Some(caps) = WARNING.captures(line) {
            let mut message = caps["msg"].trim().to_string();
            while let Some(next) = lines.get(i + 1) {
                let continued = next.trim_start();
                let is_continuation = !continued.is_empty()
                    && (next.starts_with(' ') || next.starts_with('('));
                if !is_continuation {
                    break;
                }
                let text = if continued.starts_with('(') {
                    continued
                        .split_once(')')
                        .map_or(continued, |(_, rest)| rest)
                        .trim()
                } else {
                    continued
                };
                message.push(' ');
                message.push_str(text);
                i += 1;
            }
            let line = INPUT_LINE
                .captures(&message)
                .and_then(|c| c["line"].parse().ok());
            diagnostics.push(LogDiagnostic {
                severity: Severity::Warning,
                message,
                file: None,
                line,
            });
        }
        i += 1;
    }
    diagnostics
}
