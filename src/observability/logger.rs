//! Structured JSON logger
//!
//! Each event becomes one JSON line on stderr: `event`, then `severity`, then
//! the caller's fields in key order. Stdout is left to command output.
//! Events below the process-wide threshold are dropped.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use serde_json::{Map, Value};

/// Log severity levels, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-document detail
    Trace = 0,
    /// Construction and startup
    Info = 1,
    Warn = 2,
    Error = 3,
    /// Broken declarations; the process exits
    Fatal = 4,
}

impl Severity {
    const ALL: [Severity; 5] = [
        Severity::Trace,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parses a configured level name, case-insensitively. `warning` is
    /// accepted for `warn`.
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("warning") {
            return Some(Severity::Warn);
        }
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static THRESHOLD: AtomicU8 = AtomicU8::new(Severity::Info as u8);

/// Process-wide event sink
pub struct Logger;

impl Logger {
    /// Sets the minimum severity that is written.
    pub fn set_threshold(severity: Severity) {
        THRESHOLD.store(severity as u8, Ordering::Relaxed);
    }

    pub fn threshold() -> Severity {
        let level = THRESHOLD.load(Ordering::Relaxed) as usize;
        Severity::ALL.get(level).copied().unwrap_or(Severity::Fatal)
    }

    /// Writes one line to stderr if `severity` passes the threshold.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if severity < Self::threshold() {
            return;
        }
        let line = render(severity, event, fields);
        // Single write so lines from concurrent validators never interleave
        let _ = io::stderr().lock().write_all(line.as_bytes());
    }
}

/// Renders one newline-terminated log line.
fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut sorted = fields.to_vec();
    sorted.sort_by_key(|(key, _)| *key);

    let mut line = Map::new();
    line.insert("event".into(), Value::from(event));
    line.insert("severity".into(), Value::from(severity.as_str()));
    for (key, value) in sorted {
        line.insert(key.to_string(), Value::from(value));
    }

    let mut out = Value::Object(line).to_string();
    out.push('\n');
    out
}
