//! Progress and log events crossing from the build worker to the caller.
//!
//! The worker owns an [`EventSink`]; the caller owns the matching receiver.
//! Every log line is kept for the final [`BuildResult`], sent over the
//! channel and mirrored to the `log` facade.

use serde::Serialize;
use std::{fmt, path::PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// Severity of a build log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One line of the build log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            LogLevel::Info => write!(f, "{}", self.message),
            LogLevel::Warning => write!(f, "warning: {}", self.message),
            LogLevel::Error => write!(f, "error: {}", self.message),
        }
    }
}

/// Terminal state of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BuildStatus {
    Succeeded,
    Failed(String),
    Cancelled,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// A file produced by the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildArtifact {
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Hex-encoded SHA-256.
    pub checksum: String,
}

/// Everything a finished build reports.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    /// Log lines in emission order.
    pub log: Vec<LogLine>,
    pub artifacts: Vec<BuildArtifact>,
    pub status: BuildStatus,
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        self.status == BuildStatus::Succeeded
    }

    pub fn artifact_paths(&self) -> impl Iterator<Item = &std::path::Path> {
        self.artifacts.iter().map(|a| a.path.as_path())
    }

    /// Log lines at `level`.
    pub fn lines_at(&self, level: LogLevel) -> impl Iterator<Item = &LogLine> {
        self.log.iter().filter(move |l| l.level == level)
    }
}

/// Typed events delivered in order to the caller.
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// A top-level build step started.
    Task {
        name: String,
        step: usize,
        total: usize,
    },
    /// Progress inside the current step.
    Subtask {
        name: String,
        current: usize,
        total: usize,
    },
    Log(LogLine),
    /// Always the last event of a build.
    Finished(BuildStatus),
}

/// Worker-side end of the event channel.
#[derive(Debug, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<BuildEvent>>,
    log: Vec<LogLine>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<BuildEvent>) -> Self {
        Self {
            tx: Some(tx),
            log: Vec::new(),
        }
    }

    /// A sink that only records lines.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let line = LogLine {
            level,
            message: message.into(),
        };
        match level {
            LogLevel::Info => log::info!("{}", line.message),
            LogLevel::Warning => log::warn!("{}", line.message),
            LogLevel::Error => log::error!("{}", line.message),
        }
        self.send(BuildEvent::Log(line.clone()));
        self.log.push(line);
    }

    pub fn task(&mut self, name: impl Into<String>, step: usize, total: usize) {
        let name = name.into();
        log::debug!("[{step}/{total}] {name}");
        self.send(BuildEvent::Task { name, step, total });
    }

    pub fn subtask(&mut self, name: impl Into<String>, current: usize, total: usize) {
        self.send(BuildEvent::Subtask {
            name: name.into(),
            current,
            total,
        });
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.log
    }

    /// Sends [`BuildEvent::Finished`] and returns the collected log.
    pub fn finish(mut self, status: &BuildStatus) -> Vec<LogLine> {
        self.send(BuildEvent::Finished(status.clone()));
        std::mem::take(&mut self.log)
    }

    fn send(&mut self, event: BuildEvent) {
        if let Some(tx) = &self.tx {
            // A caller that stopped listening must not fail the build.
            if tx.send(event).is_err() {
                self.tx = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_recorded_and_sent_in_order() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut sink = EventSink::new(tx);
        sink.task("Packaging media", 1, 2);
        sink.info("first");
        sink.warn("second");
        let log = sink.finish(&BuildStatus::Succeeded);

        assert_eq!(log.len(), 2);
        assert_eq!(log[1].level, LogLevel::Warning);

        assert!(matches!(rx.try_recv(), Ok(BuildEvent::Task { step: 1, .. })));
        assert!(matches!(rx.try_recv(), Ok(BuildEvent::Log(ref l)) if l.message == "first"));
        assert!(matches!(rx.try_recv(), Ok(BuildEvent::Log(ref l)) if l.message == "second"));
        assert!(matches!(rx.try_recv(), Ok(BuildEvent::Finished(BuildStatus::Succeeded))));
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let mut sink = EventSink::new(tx);
        sink.error("nobody listens");
        assert_eq!(sink.lines().len(), 1);
    }
}
