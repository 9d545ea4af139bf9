//! Observability subsystem
//!
//! Structured JSON logging of lifecycle events.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on validation outcomes
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use balancer_schema::observability::{log_event, Event, Logger, Severity};
//!
//! Logger::set_threshold(Severity::Trace);
//! log_event(Event::DocumentValidated, &[("entity", "targets")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Logs a lifecycle event at its own severity.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
