use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Shared ring of formatted log lines, newest last.
pub type LogBuffer = Arc<Mutex<VecDeque<String>>>;

pub const DEFAULT_LOG_CAPACITY: usize = 500;

pub fn new_log_buffer() -> LogBuffer {
    Arc::new(Mutex::new(VecDeque::with_capacity(DEFAULT_LOG_CAPACITY)))
}

/// A tracing layer that formats events into a bounded [`LogBuffer`] for the
/// dialog's log panel.
pub struct TuiLogLayer {
    buffer: LogBuffer,
    capacity: usize,
}

impl TuiLogLayer {
    pub fn new(buffer: LogBuffer, capacity: usize) -> Self {
        Self {
            buffer,
            capacity: capacity.max(1),
        }
    }
}

/// Collects the message plus structured fields as `key=value`.
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        let _ = write!(self.fields, " {}={}", name, value);
    }
}

impl Visit for LineVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.push_field(field.name(), format_args!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for TuiLogLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let line = format!(
            "[{}] {}: {}{}",
            metadata.level(),
            metadata.target(),
            visitor.message,
            visitor.fields
        );

        if let Ok(mut buf) = self.buffer.lock() {
            while buf.len() >= self.capacity {
                buf.pop_front();
            }
            buf.push_back(line);
        }
    }
}
