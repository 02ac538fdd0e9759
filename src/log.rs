use colored::Colorize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Info,
    Success,
    Warning,
    Failure,
    /// Horizontal separator between cases.
    Rule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub kind: EventKind,
    pub message: String,
}

impl LogEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rule(ch: char) -> Self {
        Self::new(EventKind::Rule, ch.to_string().repeat(80))
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Append-only line stream the run reports into.
pub trait LogSink {
    fn append(&mut self, event: &LogEvent);
    fn clear(&mut self);
}

/// Prints every event to stdout as it arrives.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn append(&mut self, event: &LogEvent) {
        let line = match event.kind {
            EventKind::Info => event.message.normal(),
            EventKind::Success => event.message.green(),
            EventKind::Warning => event.message.yellow(),
            EventKind::Failure => event.message.red().bold(),
            EventKind::Rule => event.message.dimmed(),
        };
        println!("{line}");
    }

    // Terminal scrollback is left alone.
    fn clear(&mut self) {}
}

/// Keeps events in memory, for tooling and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Vec<LogEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn lines(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.message.as_str()).collect()
    }
}

impl LogSink for MemorySink {
    fn append(&mut self, event: &LogEvent) {
        self.events.push(event.clone());
    }

    fn clear(&mut self) {
        self.events.clear();
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn append(&mut self, event: &LogEvent) {
        (**self).append(event);
    }

    fn clear(&mut self) {
        (**self).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_clear_drops_history() {
        let mut sink = MemorySink::new();
        sink.append(&LogEvent::new(EventKind::Info, "first"));
        sink.append(&LogEvent::rule('~'));
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.lines()[1], "~".repeat(80));

        sink.clear();
        sink.append(&LogEvent::new(EventKind::Success, "second"));
        assert_eq!(sink.lines(), vec!["second"]);
    }

    #[test]
    fn borrowed_sink_forwards() {
        fn warn_into<S: LogSink>(mut sink: S) {
            sink.append(&LogEvent::new(EventKind::Warning, "careful"));
        }

        let mut sink = MemorySink::new();
        warn_into(&mut sink);
        assert_eq!(sink.events()[0].kind, EventKind::Warning);
    }
}
