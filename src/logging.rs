// 📜 Logging - Injected sink instead of a process-wide stream
//
// Every engine component takes a `&dyn LogSink`. The binary wires a
// `TracingSink`; tests (and any caller that wants to show a processing
// log) wire a `MemorySink`.

use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// SINK TRAIT
// ============================================================================

pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

// ============================================================================
// TRACING SINK
// ============================================================================

/// Forwards every message to `tracing` under the crate's target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "funcoes_mdl", "{}", message),
            Level::WARN => tracing::warn!(target: "funcoes_mdl", "{}", message),
            Level::INFO => tracing::info!(target: "funcoes_mdl", "{}", message),
            Level::DEBUG => tracing::debug!(target: "funcoes_mdl", "{}", message),
            _ => tracing::trace!(target: "funcoes_mdl", "{}", message),
        }
    }
}

// ============================================================================
// MEMORY SINK
// ============================================================================

/// Captures messages in order
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<(Level, String)> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages logged at exactly `level`
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|(_, m)| m.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((level, message.to_string()));
    }
}

// ============================================================================
// SUBSCRIBER SETUP
// ============================================================================

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_logging(default_filter: &str, verbose: bool) {
    let fallback = if verbose { "debug" } else { default_filter };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // A second init (tests, embedding callers) is not an error worth surfacing
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order_and_levels() {
        let sink = MemorySink::new();
        sink.info("first");
        sink.warn("second");
        sink.debug("third");

        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], (Level::INFO, "first".to_string()));
        assert_eq!(sink.messages_at(Level::WARN), vec!["second".to_string()]);
        assert!(sink.contains("thi"));
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        let sink = TracingSink;
        sink.error("nobody listening");
    }
}
