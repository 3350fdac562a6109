//! Depth-first directory packaging.

use super::{AssetKind, EmbedSink};
use crate::bundler::{
    Error, Result,
    builder::EventSink,
    script::CompilationAdapter,
};
use std::path::{Component, Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// A regular file found under a packaging root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// `/`-separated path relative to the root, with any prefix applied.
    pub locator: String,
    pub length: u64,
}

/// What one walk did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Files embedded, counting kept sources and compiled output separately.
    pub embedded: usize,
    pub compiled: usize,
    /// Scripts left out because of a fatal diagnostic.
    pub skipped: Vec<String>,
}

impl WalkStats {
    pub fn merge(&mut self, other: WalkStats) {
        self.embedded += other.embedded;
        self.compiled += other.compiled;
        self.skipped.extend(other.skipped);
    }
}

/// Builds the locator of `path` relative to `root`.
///
/// Components are joined with `/`; `prefix`, when given, becomes the first
/// component.
pub fn locator_for(root: &Path, path: &Path, prefix: Option<&str>) -> Result<String> {
    let relative = path.strip_prefix(root)?;
    let mut parts: Vec<String> = prefix
        .filter(|p| !p.is_empty())
        .map(|p| p.trim_matches('/').to_string())
        .into_iter()
        .collect();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            other => {
                return Err(Error::GenericError(format!(
                    "unexpected path component {other:?} in {}",
                    path.display()
                )));
            }
        }
    }
    Ok(parts.join("/"))
}

/// Lists every regular file under `root`, depth-first with entries of each
/// directory in file-name order.
///
/// # Errors
///
/// Any unreadable entry fails the whole listing.
pub async fn collect_files(root: &Path, prefix: Option<&str>) -> Result<Vec<SourceFile>> {
    let root = root.to_path_buf();
    let prefix = prefix.map(String::from);

    tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&root)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            let metadata = entry.metadata()?;
            files.push(SourceFile {
                locator: locator_for(&root, entry.path(), prefix.as_deref())?,
                path: entry.into_path(),
                length: metadata.len(),
            });
        }
        Ok(files)
    })
    .await
    .map_err(|e| Error::TaskFailed(format!("directory walk task: {e}")))?
}

/// Walks source trees and embeds their files.
#[derive(Debug, Clone)]
pub struct PackagingDriver {
    adapter: Option<CompilationAdapter>,
    keep_source: bool,
    passthrough: bool,
    cancel: CancellationToken,
}

impl PackagingDriver {
    /// `adapter` is `None` when script compilation is off.
    pub fn new(
        adapter: Option<CompilationAdapter>,
        keep_source: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            adapter,
            keep_source,
            passthrough: false,
            cancel,
        }
    }

    /// A driver that embeds every file as-is, used to repack built output.
    pub fn passthrough(cancel: CancellationToken) -> Self {
        Self {
            adapter: None,
            keep_source: true,
            passthrough: true,
            cancel,
        }
    }

    /// Packages everything under `root` into `sink`.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] when cancellation is observed between files; any
    /// I/O or duplicate-locator failure. Script diagnostics are not errors.
    pub async fn package(
        &self,
        root: &Path,
        prefix: Option<&str>,
        sink: &mut EmbedSink,
        events: &mut EventSink,
    ) -> Result<WalkStats> {
        self.check_cancelled()?;
        let files = collect_files(root, prefix).await?;
        let total = files.len();
        let mut stats = WalkStats::default();

        for (i, file) in files.iter().enumerate() {
            self.check_cancelled()?;
            events.subtask(&file.locator, i + 1, total);
            self.embed(file, sink, events, &mut stats).await?;
        }
        Ok(stats)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    fn classify(&self, path: &Path) -> AssetKind {
        if self.passthrough {
            AssetKind::PlainAsset
        } else {
            AssetKind::classify(path)
        }
    }

    async fn embed(
        &self,
        file: &SourceFile,
        sink: &mut EmbedSink,
        events: &mut EventSink,
        stats: &mut WalkStats,
    ) -> Result<()> {
        let locator = file.locator.as_str();
        match (self.classify(&file.path), &self.adapter) {
            (AssetKind::ScriptSource, Some(adapter)) => {
                let script = adapter.compile(&file.path, locator, events).await?;
                let Some(bytecode) = script.dump_bytecode().cloned() else {
                    events.error(format!(
                        "Skipped {locator}: {} diagnostic(s), not embedded",
                        script.error_count()
                    ));
                    stats.skipped.push(locator.to_string());
                    return Ok(());
                };
                sink.embed_bytes(locator, bytecode, events).await?;
                events.info(format!("Compiled {locator}"));
                stats.compiled += 1;
                stats.embedded += 1;

                if self.keep_source {
                    let source_locator = format!("{locator}.source");
                    sink.embed_file(&source_locator, &file.path, file.length, events)
                        .await?;
                    events.info(format!("Added {source_locator}"));
                    stats.embedded += 1;
                }
            }
            (AssetKind::ScriptLibrary, _) if !self.keep_source => {
                events.info(format!("Skipped library {locator}"));
            }
            _ => {
                sink.embed_file(locator, &file.path, file.length, events)
                    .await?;
                events.info(format!("Added {locator}"));
                stats.embedded += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{
        archive::{ArchiveNaming, ArchiveReader, ArchiveSplitter},
        script::{CompileError, CompileRequest, CompilerOutput, ScriptCompiler, Severity},
        settings::ScriptSettings,
    };
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Upper-cases the source; sources containing `BAD` fail.
    #[derive(Debug)]
    struct Upper;

    impl ScriptCompiler for Upper {
        fn compile(&self, request: &CompileRequest) -> Result<CompilerOutput> {
            let text = std::fs::read_to_string(&request.source)?;
            if text.contains("BAD") {
                return Ok(CompilerOutput {
                    diagnostics: vec![CompileError::new(Severity::Error, "bad token")],
                    bytecode: None,
                });
            }
            Ok(CompilerOutput {
                diagnostics: Vec::new(),
                bytecode: Some(text.to_uppercase().into_bytes()),
            })
        }
    }

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("media");
        std::fs::create_dir_all(media.join("scripts/lib")).unwrap();
        std::fs::create_dir_all(media.join("textures")).unwrap();
        std::fs::write(media.join("textures/wall.png"), b"png").unwrap();
        std::fs::write(media.join("scripts/main.fs"), b"print 1").unwrap();
        std::fs::write(media.join("scripts/broken.fs"), b"BAD").unwrap();
        std::fs::write(media.join("scripts/lib/util.fsl"), b"fn util").unwrap();
        std::fs::write(media.join("readme.txt"), b"hi").unwrap();
        dir
    }

    fn driver(keep_source: bool) -> PackagingDriver {
        let adapter = CompilationAdapter::new(Arc::new(Upper), ScriptSettings::default());
        PackagingDriver::new(Some(adapter), keep_source, CancellationToken::new())
    }

    #[test]
    fn locators_use_forward_slashes_and_prefix() {
        let root = Path::new("/game/lang");
        let path = root.join("en").join("menu.txt");
        assert_eq!(locator_for(root, &path, None).unwrap(), "en/menu.txt");
        assert_eq!(
            locator_for(root, &path, Some("lang")).unwrap(),
            "lang/en/menu.txt"
        );
    }

    #[tokio::test]
    async fn collects_in_sorted_depth_first_order() {
        let dir = tree();
        let files = collect_files(&dir.path().join("media"), None).await.unwrap();
        let locators: Vec<_> = files.iter().map(|f| f.locator.as_str()).collect();
        assert_eq!(
            locators,
            [
                "readme.txt",
                "scripts/broken.fs",
                "scripts/lib/util.fsl",
                "scripts/main.fs",
                "textures/wall.png",
            ]
        );
    }

    #[tokio::test]
    async fn compiles_scripts_and_skips_failures() {
        let dir = tree();
        let out = dir.path().join("build");
        std::fs::create_dir_all(&out).unwrap();
        let mut sink = EmbedSink::Archive(ArchiveSplitter::new(
            0,
            ArchiveNaming::new(&out, "data#"),
            false,
        ));
        let mut events = EventSink::detached();

        let stats = driver(false)
            .package(&dir.path().join("media"), None, &mut sink, &mut events)
            .await
            .unwrap();
        assert_eq!(stats.compiled, 1);
        assert_eq!(stats.skipped, ["scripts/broken.fs"]);

        let EmbedSink::Archive(splitter) = sink else {
            unreachable!()
        };
        let written = splitter.finish().await.unwrap();
        let mut reader = ArchiveReader::open(&written[0]).await.unwrap();
        let locators: Vec<_> = reader.locators().map(String::from).collect();
        assert_eq!(locators, ["readme.txt", "scripts/main.fs", "textures/wall.png"]);
        assert_eq!(
            reader.read("scripts/main.fs").await.unwrap().unwrap(),
            &b"PRINT 1"[..]
        );

        assert!(events
            .lines()
            .iter()
            .any(|l| l.message.contains("scripts/broken.fs") && l.message.contains("bad token")));
    }

    #[tokio::test]
    async fn keep_source_adds_sources_and_libraries() {
        let dir = tree();
        let out = dir.path().join("loose");
        let mut sink = EmbedSink::Directory(out.clone());
        let mut events = EventSink::detached();

        driver(true)
            .package(&dir.path().join("media"), None, &mut sink, &mut events)
            .await
            .unwrap();

        assert_eq!(std::fs::read(out.join("scripts/main.fs")).unwrap(), b"PRINT 1");
        assert_eq!(
            std::fs::read(out.join("scripts/main.fs.source")).unwrap(),
            b"print 1"
        );
        assert!(out.join("scripts/lib/util.fsl").is_file());
        assert!(!out.join("scripts/broken.fs").exists());
    }

    #[tokio::test]
    async fn without_compiler_scripts_are_copied_raw() {
        let dir = tree();
        let out = dir.path().join("raw");
        let mut sink = EmbedSink::Directory(out.clone());
        let mut events = EventSink::detached();

        let stats = PackagingDriver::new(None, false, CancellationToken::new())
            .package(&dir.path().join("media"), None, &mut sink, &mut events)
            .await
            .unwrap();

        assert_eq!(stats.compiled, 0);
        assert_eq!(std::fs::read(out.join("scripts/broken.fs")).unwrap(), b"BAD");
        assert!(!out.join("scripts/lib/util.fsl").exists());
    }

    #[tokio::test]
    async fn cancelled_walk_stops() {
        let dir = tree();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut sink = EmbedSink::Directory(dir.path().join("never"));
        let mut events = EventSink::detached();

        let err = PackagingDriver::passthrough(cancel)
            .package(&dir.path().join("media"), None, &mut sink, &mut events)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!dir.path().join("never").exists());
    }
}
