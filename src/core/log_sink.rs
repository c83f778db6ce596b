//! Progress reporting seam between the conversation core and whatever
//! displays activity to the user.

/// Receives one human-readable progress line at a time. The core only ever
/// writes to a sink; it never owns one.
pub trait LogSink {
    fn write_line(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str),
{
    fn write_line(&self, line: &str) {
        self(line)
    }
}

/// Discards every line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn write_line(&self, _line: &str) {}
}
