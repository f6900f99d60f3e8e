//! Leveled status sink injected into every component.

use serde::Serialize;
use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Advisory,
    Error,
}

pub trait Reporter {
    fn report(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    fn success(&self, message: &str) {
        self.report(Level::Success, message);
    }

    fn advisory(&self, message: &str) {
        self.report(Level::Advisory, message);
    }

    fn error(&self, message: &str) {
        self.report(Level::Error, message);
    }
}

/// Collects messages in memory; used by tests and `--json` output.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: RefCell<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.borrow().clone()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages
            .borrow()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn count(&self, level: Level) -> usize {
        self.messages
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, level: Level, message: &str) {
        tracing::debug!("{level:?}: {message}");
        self.messages.borrow_mut().push((level, message.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_reporter_records_levels() {
        let reporter = MemoryReporter::new();
        reporter.info("probing");
        reporter.advisory("toolkit missing");
        assert!(reporter.contains(Level::Advisory, "toolkit"));
        assert!(!reporter.contains(Level::Error, "toolkit"));
        assert_eq!(reporter.count(Level::Info), 1);
        assert_eq!(reporter.messages().len(), 2);
    }
}
