//! Script compilation.
//!
//! The compiler itself is an external collaborator behind [`ScriptCompiler`].
//! [`CompilationAdapter`] wraps it: it runs one compile, classifies the
//! diagnostics by severity against the build's [`ScriptSettings`] and only
//! hands out byte-code when nothing fatal was reported. Diagnostics never
//! become [`Error`](crate::bundler::Error)s.

mod adapter;
mod compiler;

pub use adapter::{CompilationAdapter, CompiledScript};
pub use compiler::{
    CompileRequest, CompilerOutput, DEFAULT_COMPILER, ExternalCompiler, ScriptCompiler,
    parse_diagnostics,
};

use crate::bundler::settings::ScriptSettings;
use serde::Serialize;
use std::fmt;

/// Diagnostic severity reported by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Message,
    Warning,
    Error,
    FatalError,
}

impl Severity {
    /// Parses the severity word used in compiler output.
    pub fn parse(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "message" | "info" | "note" => Some(Self::Message),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "fatal error" | "fatal" => Some(Self::FatalError),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Message => "message",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::FatalError => "fatal error",
        })
    }
}

/// One compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileError {
    pub message: String,
    pub severity: Severity,
    /// Source line, when the compiler reports one.
    pub line: Option<u32>,
}

impl CompileError {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            line: None,
        }
    }
}

impl CompileError {
    /// Formats the diagnostic the way compilers print it, `file(line): severity: message`.
    pub fn describe(&self, file: &str) -> String {
        match self.line {
            Some(line) => format!("{file}({line}): {self}"),
            None => format!("{file}: {self}"),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Whether `error` prevents the file from being embedded.
pub fn is_fatal(error: &CompileError, settings: &ScriptSettings) -> bool {
    match error.severity {
        Severity::Error | Severity::FatalError => true,
        Severity::Warning => settings.treat_warnings_as_errors,
        Severity::Message => settings.treat_messages_as_errors,
    }
}

/// Whether `error` is left out of the build log.
///
/// Messages are only logged in debug mode or when they count as errors.
pub fn is_suppressed(error: &CompileError, settings: &ScriptSettings) -> bool {
    error.severity == Severity::Message
        && !settings.debug_mode
        && !settings.treat_messages_as_errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(warnings: bool, messages: bool) -> ScriptSettings {
        ScriptSettings {
            treat_warnings_as_errors: warnings,
            treat_messages_as_errors: messages,
            ..Default::default()
        }
    }

    #[test]
    fn fatality_follows_settings() {
        let warning = CompileError::new(Severity::Warning, "unused variable");
        let message = CompileError::new(Severity::Message, "note");
        let error = CompileError::new(Severity::Error, "syntax");
        let fatal = CompileError::new(Severity::FatalError, "out of memory");

        let lenient = settings(false, false);
        assert!(!is_fatal(&warning, &lenient));
        assert!(!is_fatal(&message, &lenient));
        assert!(is_fatal(&error, &lenient));
        assert!(is_fatal(&fatal, &lenient));

        let strict = settings(true, true);
        assert!(is_fatal(&warning, &strict));
        assert!(is_fatal(&message, &strict));
    }

    #[test]
    fn messages_are_suppressed_outside_debug() {
        let message = CompileError::new(Severity::Message, "note");
        assert!(is_suppressed(&message, &ScriptSettings::default()));
        let debug = ScriptSettings {
            debug_mode: true,
            ..Default::default()
        };
        assert!(!is_suppressed(&message, &debug));
        assert!(!is_suppressed(
            &CompileError::new(Severity::Warning, "w"),
            &ScriptSettings::default()
        ));
    }

    #[test]
    fn severity_words() {
        assert_eq!(Severity::parse("Fatal Error"), Some(Severity::FatalError));
        assert_eq!(Severity::parse("warning"), Some(Severity::Warning));
        assert_eq!(Severity::parse("bogus"), None);
    }
}
