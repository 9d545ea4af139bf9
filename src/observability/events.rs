//! Observable events
//!
//! Events are explicit and typed. Each one carries the severity it is
//! logged at.

use std::fmt;

use super::logger::Severity;

/// Observable events in the schema engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Construction
    /// Entity schema declared and registered
    SchemaBuilt,
    /// All built-in schemas registered
    CatalogReady,
    /// A schema declaration was rejected (FATAL)
    SchemaConstructionFailed,

    // Configuration
    /// Configuration file loaded
    ConfigLoaded,

    // Validation
    /// Candidate accepted
    DocumentValidated,
    /// Candidate rejected
    DocumentRejected,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaBuilt => "SCHEMA_BUILT",
            Event::CatalogReady => "CATALOG_READY",
            Event::SchemaConstructionFailed => "SCHEMA_CONSTRUCTION_FAILED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::DocumentValidated => "DOCUMENT_VALIDATED",
            Event::DocumentRejected => "DOCUMENT_REJECTED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::SchemaConstructionFailed)
    }

    /// Validation runs per document and logs at TRACE so it stays quiet by
    /// default.
    pub fn severity(&self) -> Severity {
        match self {
            Event::SchemaConstructionFailed => Severity::Fatal,
            Event::DocumentValidated | Event::DocumentRejected => Severity::Trace,
            Event::SchemaBuilt | Event::CatalogReady | Event::ConfigLoaded => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Event; 6] = [
        Event::SchemaBuilt,
        Event::CatalogReady,
        Event::SchemaConstructionFailed,
        Event::ConfigLoaded,
        Event::DocumentValidated,
        Event::DocumentRejected,
    ];

    #[test]
    fn test_all_events_have_string_representation() {
        for event in ALL {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        for event in ALL {
            assert_eq!(event.is_fatal(), event.severity() == Severity::Fatal);
        }
        assert!(Event::SchemaConstructionFailed.is_fatal());
        assert!(!Event::DocumentRejected.is_fatal());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::CatalogReady), "CATALOG_READY");
        assert_eq!(Event::DocumentValidated.severity(), Severity::Trace);
    }
}
