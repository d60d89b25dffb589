//! Observability
//!
//! Structured JSON logging for registry, pipeline and request lifecycle
//! events. Logging is synchronous and never affects the operation being
//! observed.
//!
//! ```ignore
//! use itemgate::observability::{log_event, Event};
//!
//! log_event(Event::BulkComplete, &[("total", "3"), ("failed", "1")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log an event at its default severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
