//! Event emission for observability.

mod console;
mod sink;

pub use console::ConsoleReporter;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
