//! The script compiler contract and its command-line implementation.

use super::{CompileError, Severity};
use crate::bundler::{Error, Result, settings::ScriptSettings};
use regex::Regex;
use std::{
    fmt,
    path::{Path, PathBuf},
    process::Command,
    sync::LazyLock,
};

/// Program name looked up on `PATH` when no compiler is configured.
pub const DEFAULT_COMPILER: &str = "fsc";

/// Inputs for one compile.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub source: PathBuf,
    pub debug: bool,
    pub defines: Vec<String>,
    pub include_paths: Vec<PathBuf>,
}

impl CompileRequest {
    pub fn new(source: impl Into<PathBuf>, settings: &ScriptSettings) -> Self {
        Self {
            source: source.into(),
            debug: settings.debug_mode,
            defines: settings.defines.clone(),
            include_paths: settings.include_paths.clone(),
        }
    }
}

/// What the compiler reported.
#[derive(Debug, Clone, Default)]
pub struct CompilerOutput {
    pub diagnostics: Vec<CompileError>,
    /// Emitted byte-code; absent when the compiler produced nothing.
    pub bytecode: Option<Vec<u8>>,
}

/// A script compiler.
///
/// Implementations are called from a blocking thread, one file at a time.
/// Identical requests over identical sources must produce identical
/// byte-code.
pub trait ScriptCompiler: Send + Sync + fmt::Debug {
    /// Compiles one source file.
    ///
    /// # Errors
    ///
    /// Only for failures to run the compiler at all. Problems in the script
    /// are reported through [`CompilerOutput::diagnostics`].
    fn compile(&self, request: &CompileRequest) -> Result<CompilerOutput>;
}

static DIAGNOSTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?P<file>.*?)(?:\((?P<line>\d+)(?:,\d+)?\))?:\s*)?(?P<severity>fatal error|error|warning|message|note):\s*(?P<message>.*)$",
    )
    .expect("diagnostic pattern is valid")
});

/// Parses `[file[(line)]:] severity: message` lines; other lines are ignored.
pub fn parse_diagnostics(output: &str) -> Vec<CompileError> {
    output
        .lines()
        .filter_map(|line| {
            let caps = DIAGNOSTIC.captures(line.trim_end())?;
            let severity = Severity::parse(&caps["severity"])?;
            Some(CompileError {
                message: caps["message"].trim().to_string(),
                severity,
                line: caps.name("line").and_then(|m| m.as_str().parse().ok()),
            })
        })
        .collect()
}

/// Runs a command-line compiler:
/// `<program> [-g] [-D NAME]... [-I DIR]... -o <out> <source>`.
#[derive(Debug, Clone)]
pub struct ExternalCompiler {
    program: PathBuf,
}

impl ExternalCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolves the configured compiler, or the default one on `PATH`.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when no usable program is found.
    pub fn resolve(settings: &ScriptSettings) -> Result<Self> {
        match &settings.compiler {
            Some(program) if program.components().count() > 1 => {
                if program.is_file() {
                    Ok(Self::new(program))
                } else {
                    Err(Error::Configuration(format!(
                        "script compiler not found: {}",
                        program.display()
                    )))
                }
            }
            Some(program) => which::which(program).map(Self::new).map_err(|e| {
                Error::Configuration(format!(
                    "script compiler `{}` not found on PATH: {e}",
                    program.display()
                ))
            }),
            None => crate::bundler::builder::DEFAULT_COMPILER_PATH
                .clone()
                .map(Self::new)
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "compile_scripts is set but `{DEFAULT_COMPILER}` is not on PATH"
                    ))
                }),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl ScriptCompiler for ExternalCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<CompilerOutput> {
        let scratch = tempfile::tempdir()?;
        let out_path = scratch.path().join("out.fso");

        let mut command = Command::new(&self.program);
        if request.debug {
            command.arg("-g");
        }
        for define in &request.defines {
            command.arg("-D").arg(define);
        }
        for include in &request.include_paths {
            command.arg("-I").arg(include);
        }
        command.arg("-o").arg(&out_path).arg(&request.source);

        log::debug!("Running {:?}", command);
        let output = command.output().map_err(|source| Error::CompilerFailed {
            program: self.program.display().to_string(),
            source,
        })?;

        let mut diagnostics = parse_diagnostics(&String::from_utf8_lossy(&output.stderr));
        diagnostics.extend(parse_diagnostics(&String::from_utf8_lossy(&output.stdout)));

        let reported_fatal = diagnostics
            .iter()
            .any(|d| matches!(d.severity, Severity::Error | Severity::FatalError));
        if !output.status.success() && !reported_fatal {
            diagnostics.push(CompileError::new(
                Severity::FatalError,
                format!("compiler exited with {}", output.status),
            ));
        }

        let bytecode = if output.status.success() && out_path.is_file() {
            Some(std::fs::read(&out_path)?)
        } else {
            None
        };

        Ok(CompilerOutput {
            diagnostics,
            bytecode,
        })
    }
}
