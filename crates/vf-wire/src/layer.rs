//! Forward `tracing` events onto the wire.
//!
//! In worker mode the subscriber stack is `registry + EnvFilter + WireLayer`,
//! so `tracing::info!` inside a stage becomes an `["info", "..."]` line on
//! the same stdout stream that carries progress. An event recorded with a
//! `success = true` field is emitted as a success message.

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::events::{LogEvent, LogKind};
use crate::reporter::Reporter;

/// A [`Layer`] that renders each event as a wire message through a
/// [`Reporter`].
#[derive(Debug, Clone)]
pub struct WireLayer {
    reporter: Reporter,
}

impl WireLayer {
    pub fn new(reporter: Reporter) -> Self {
        Self { reporter }
    }
}

impl<S: Subscriber> Layer<S> for WireLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let level = *event.metadata().level();
        let kind = if level == Level::ERROR {
            LogKind::Error
        } else if level > Level::INFO {
            LogKind::Debug
        } else if visitor.success {
            LogKind::Success
        } else {
            LogKind::Info
        };
        self.reporter.emit(&LogEvent::message(kind, visitor.finish()));
    }
}

/// Collects the `message` field plus any structured fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
    success: bool,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for MessageVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "success" {
            self.success = value;
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}
