//! Compile one script and decide whether it can be embedded.

use super::{
    CompileError, CompileRequest, ScriptCompiler, Severity, is_fatal, is_suppressed,
};
use crate::bundler::{
    Error, Result,
    builder::{EventSink, LogLevel},
    settings::ScriptSettings,
};
use bytes::Bytes;
use std::{path::Path, sync::Arc};

/// Outcome of one compile.
#[derive(Debug, Clone)]
pub struct CompiledScript {
    errors: Vec<CompileError>,
    fatal: bool,
    bytecode: Option<Bytes>,
}

impl CompiledScript {
    /// Number of diagnostics of any severity.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    /// Whether any diagnostic was fatal under the build's settings.
    pub fn has_fatal(&self) -> bool {
        self.fatal
    }

    /// Compiled output, withheld when a fatal diagnostic was reported.
    pub fn dump_bytecode(&self) -> Option<&Bytes> {
        if self.fatal {
            None
        } else {
            self.bytecode.as_ref()
        }
    }
}

/// Wraps a [`ScriptCompiler`] with the build's script settings.
#[derive(Debug, Clone)]
pub struct CompilationAdapter {
    compiler: Arc<dyn ScriptCompiler>,
    settings: ScriptSettings,
}

impl CompilationAdapter {
    pub fn new(compiler: Arc<dyn ScriptCompiler>, settings: ScriptSettings) -> Self {
        Self { compiler, settings }
    }

    pub fn settings(&self) -> &ScriptSettings {
        &self.settings
    }

    pub fn is_fatal(&self, error: &CompileError) -> bool {
        is_fatal(error, &self.settings)
    }

    /// Compiles `source`, logging every non-suppressed diagnostic under `label`.
    ///
    /// # Errors
    ///
    /// Only when the compiler cannot be run. Script problems are returned in
    /// the [`CompiledScript`].
    pub async fn compile(
        &self,
        source: &Path,
        label: &str,
        sink: &mut EventSink,
    ) -> Result<CompiledScript> {
        let request = CompileRequest::new(source, &self.settings);
        let compiler = Arc::clone(&self.compiler);
        let output = tokio::task::spawn_blocking(move || compiler.compile(&request))
            .await
            .map_err(|e| Error::TaskFailed(format!("script compiler task: {e}")))??;

        let mut errors = output.diagnostics;
        let mut fatal = errors.iter().any(|e| self.is_fatal(e));
        if !fatal && output.bytecode.is_none() {
            errors.push(CompileError::new(
                Severity::FatalError,
                "compiler produced no byte-code",
            ));
            fatal = true;
        }

        for error in &errors {
            if is_suppressed(error, &self.settings) {
                continue;
            }
            let level = if self.is_fatal(error) {
                LogLevel::Error
            } else {
                LogLevel::Warning
            };
            sink.log(level, error.describe(label));
        }

        Ok(CompiledScript {
            errors,
            fatal,
            bytecode: output.bytecode.map(Bytes::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::script::CompilerOutput;

    #[derive(Debug)]
    struct Canned(Vec<CompileError>, Option<Vec<u8>>);

    impl ScriptCompiler for Canned {
        fn compile(&self, _request: &CompileRequest) -> Result<CompilerOutput> {
            Ok(CompilerOutput {
                diagnostics: self.0.clone(),
                bytecode: self.1.clone(),
            })
        }
    }

    fn adapter(canned: Canned, settings: ScriptSettings) -> CompilationAdapter {
        CompilationAdapter::new(Arc::new(canned), settings)
    }

    #[tokio::test]
    async fn warning_is_logged_but_not_fatal_by_default() {
        let adapter = adapter(
            Canned(
                vec![CompileError::new(Severity::Warning, "shadowed")],
                Some(b"bc".to_vec()),
            ),
            ScriptSettings::default(),
        );
        let mut sink = EventSink::detached();
        let script = adapter.compile(Path::new("a.fs"), "a.fs", &mut sink).await.unwrap();

        assert!(!script.has_fatal());
        assert_eq!(script.error_count(), 1);
        assert_eq!(script.dump_bytecode().map(|b| &b[..]), Some(&b"bc"[..]));
        assert_eq!(sink.lines().len(), 1);
        assert_eq!(sink.lines()[0].level, LogLevel::Warning);
    }

    #[tokio::test]
    async fn warning_as_error_withholds_bytecode() {
        let adapter = adapter(
            Canned(
                vec![CompileError::new(Severity::Warning, "shadowed")],
                Some(b"bc".to_vec()),
            ),
            ScriptSettings {
                treat_warnings_as_errors: true,
                ..Default::default()
            },
        );
        let mut sink = EventSink::detached();
        let script = adapter.compile(Path::new("a.fs"), "a.fs", &mut sink).await.unwrap();

        assert!(script.has_fatal());
        assert!(script.dump_bytecode().is_none());
        assert_eq!(sink.lines()[0].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn missing_bytecode_is_fatal() {
        let adapter = adapter(Canned(Vec::new(), None), ScriptSettings::default());
        let mut sink = EventSink::detached();
        let script = adapter.compile(Path::new("a.fs"), "a.fs", &mut sink).await.unwrap();
        assert!(script.has_fatal());
        assert_eq!(script.errors()[0].severity, Severity::FatalError);
    }

    #[tokio::test]
    async fn suppressed_messages_are_not_logged() {
        let adapter = adapter(
            Canned(
                vec![CompileError::new(Severity::Message, "3 functions")],
                Some(Vec::new()),
            ),
            ScriptSettings::default(),
        );
        let mut sink = EventSink::detached();
        let script = adapter.compile(Path::new("a.fs"), "a.fs", &mut sink).await.unwrap();
        assert!(!script.has_fatal());
        assert!(sink.lines().is_empty());
    }
}
