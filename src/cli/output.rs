//! Terminal output.
//!
//! Colors are only used when the stream supports them.

use owo_colors::{OwoColorize, Stream};
use std::io::{self, Write};

pub mod symbols {
    pub const SUCCESS: &str = "✓";
    pub const ERROR: &str = "✗";
    pub const WARNING: &str = "⚠";
    pub const INFO: &str = "•";
    pub const ARROW: &str = "→";
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// First twelve characters of a hex digest.
pub fn truncate_hash(hash: &str) -> &str {
    &hash[..hash.len().min(12)]
}

/// Verbosity-aware printer.
#[derive(Debug, Clone, Copy)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
}

impl OutputManager {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Only printed with `--verbose`.
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        writeln!(
            io::stdout(),
            "  {}",
            message.if_supports_color(Stream::Stdout, |s| s.dimmed())
        )
    }

    pub fn progress(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(
            io::stdout(),
            "{} {}",
            symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.cyan()),
            message
        )
    }

    pub fn info(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(
            io::stdout(),
            "{} {}",
            symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
            message
        )
    }

    pub fn success(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(
            io::stdout(),
            "{} {}",
            symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
            message
        )
    }

    /// Warnings are printed even when quiet.
    pub fn warn(&self, message: &str) -> io::Result<()> {
        writeln!(
            io::stderr(),
            "{} {}",
            symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
            message.if_supports_color(Stream::Stderr, |s| s.yellow())
        )
    }

    pub fn error(&self, message: &str) -> io::Result<()> {
        writeln!(
            io::stderr(),
            "{} {}",
            symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
            message.if_supports_color(Stream::Stderr, |s| s.red())
        )
    }

    pub fn section(&self, title: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(
            io::stdout(),
            "\n{}",
            title.if_supports_color(Stream::Stdout, |s| s.bold())
        )
    }

    pub fn indent(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(io::stdout(), "    {}", message)
    }

    /// Pretty JSON on stdout, regardless of verbosity.
    pub fn json<T: serde::Serialize>(&self, value: &T) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{}", json)?;
        Ok(())
    }
}
