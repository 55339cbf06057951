//! Run reporting. The engine logs through a [`Reporter`] it is handed and
//! never touches the global subscriber itself.

use std::sync::Mutex;

/// Sink for run-level records.
pub trait Reporter {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards records to `tracing` under the `pricecheck::run` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!(target: "pricecheck::run", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "pricecheck::run", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "pricecheck::run", "{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Collects records in memory. Used by tests and by callers that want to
/// inspect what a run reported.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push((level, message.to_string()));
        }
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_reporter_keeps_order_and_levels() {
        let r = MemoryReporter::new();
        r.info("start");
        r.warn("degraded");
        r.info("done");
        assert_eq!(r.records().len(), 3);
        assert_eq!(r.messages(Level::Info), vec!["start", "done"]);
        assert_eq!(r.messages(Level::Warn), vec!["degraded"]);
        assert!(r.messages(Level::Error).is_empty());
    }
}
