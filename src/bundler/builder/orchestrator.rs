//! Main build orchestration.
//!
//! A [`Bundler`] owns one [`BuildConfiguration`] snapshot and runs the whole
//! build on a single tokio task. The build is a fixed plan of [`Step`]s chosen
//! from the configuration's [`BuildMode`]; each step reports a task event,
//! checks for cancellation and may fail the build. Every failure is caught at
//! the top and turned into a terminal [`BuildStatus`].

use super::{
    checksum::{artifact_size, calculate_sha256},
    events::{BuildArtifact, BuildEvent, BuildResult, BuildStatus, EventSink},
    game_config::GameConfigPatch,
};
use crate::bundler::{
    Error, Result,
    archive::{Archive, ArchiveNaming, ArchiveSplitter, format::EXTENSION},
    packaging::{EmbedSink, PackagingDriver, WalkStats},
    script::{CompilationAdapter, ExternalCompiler, ScriptCompiler},
    settings::{BuildConfiguration, BuildMode, ProjectPaths},
    standalone::{
        BuildRecord, DATA_RECORD, ENGINE_CONFIG_RECORD, GAME_CONFIG_RECORD, StandaloneBundler,
        executable_name, game_identifier, resolve_plugins,
    },
    utils::fs,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

/// Build orchestrator.
///
/// # Examples
///
/// ```no_run
/// use pakforge::bundler::{BuildConfigurationBuilder, Bundler, ProjectPaths};
///
/// # async fn example() -> pakforge::bundler::Result<()> {
/// let config = BuildConfigurationBuilder::new()
///     .game_title("Hero")
///     .build_directory("build")
///     .project_paths(ProjectPaths {
///         media: "media".into(),
///         config: "config".into(),
///         ..Default::default()
///     })
///     .compile_to_archives(true)
///     .build()?;
///
/// let mut handle = Bundler::new(config).spawn();
/// while let Some(event) = handle.next_event().await {
///     println!("{event:?}");
/// }
/// let result = handle.wait().await;
/// println!("{}", result.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Bundler {
    config: BuildConfiguration,
    compiler: Option<Arc<dyn ScriptCompiler>>,
}

impl Bundler {
    pub fn new(config: BuildConfiguration) -> Self {
        Self {
            config,
            compiler: None,
        }
    }

    /// Uses `compiler` instead of resolving a command-line compiler.
    pub fn with_compiler(mut self, compiler: Arc<dyn ScriptCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn config(&self) -> &BuildConfiguration {
        &self.config
    }

    /// Starts the build on its own task.
    pub fn spawn(self) -> BuildHandle {
        let (tx, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token, EventSink::new(tx)).await });
        BuildHandle {
            events,
            cancel,
            task,
        }
    }

    /// Runs the build to completion on the current task.
    ///
    /// Never fails: errors end up in [`BuildResult::status`].
    pub async fn run(self, cancel: CancellationToken, events: EventSink) -> BuildResult {
        let mut worker = Worker {
            config: self.config,
            compiler: self.compiler,
            cancel,
            events,
            artifacts: Vec::new(),
        };

        let status = match worker.execute().await {
            Ok(()) => {
                worker.events.info("Build succeeded");
                BuildStatus::Succeeded
            }
            Err(Error::Cancelled) => {
                worker.events.warn("Build cancelled");
                BuildStatus::Cancelled
            }
            Err(e) => {
                let reason = e.to_string();
                worker.events.error(format!("Build failed: {reason}"));
                BuildStatus::Failed(reason)
            }
        };

        let artifacts = if status == BuildStatus::Succeeded {
            match describe_artifacts(&worker.artifacts).await {
                Ok(artifacts) => artifacts,
                Err(e) => {
                    log::warn!("Could not checksum artifacts: {e}");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let log = worker.events.finish(&status);
        BuildResult {
            log,
            artifacts,
            status,
        }
    }
}

/// Caller-side view of a running build.
#[derive(Debug)]
pub struct BuildHandle {
    events: UnboundedReceiver<BuildEvent>,
    cancel: CancellationToken,
    task: JoinHandle<BuildResult>,
}

impl BuildHandle {
    /// Next event, in emission order. `None` once the build has finished and
    /// every event was delivered.
    pub async fn next_event(&mut self) -> Option<BuildEvent> {
        self.events.recv().await
    }

    /// Asks the build to stop at the next step, file or record boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the build to end.
    pub async fn wait(self) -> BuildResult {
        self.task.await.unwrap_or_else(|e| BuildResult {
            log: Vec::new(),
            artifacts: Vec::new(),
            status: BuildStatus::Failed(format!("build task panicked: {e}")),
        })
    }
}

async fn describe_artifacts(paths: &[PathBuf]) -> Result<Vec<BuildArtifact>> {
    let mut artifacts = Vec::with_capacity(paths.len());
    for path in paths {
        artifacts.push(BuildArtifact {
            path: path.clone(),
            size: artifact_size(path).await?,
            checksum: calculate_sha256(path).await?,
        });
    }
    Ok(artifacts)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Prepare,
    PackageMedia,
    PackageLanguage(PathBuf),
    WriteArchives,
    CopyConfig,
    Repack,
    WriteExecutable,
    CopySaves(PathBuf),
}

impl Step {
    fn title(&self) -> &'static str {
        match self {
            Self::Prepare => "Preparing build",
            Self::PackageMedia => "Packaging media",
            Self::PackageLanguage(_) => "Packaging language files",
            Self::WriteArchives => "Writing archives",
            Self::CopyConfig => "Copying configuration",
            Self::Repack => "Packing distributable archive",
            Self::WriteExecutable => "Writing standalone executable",
            Self::CopySaves(_) => "Copying saves",
        }
    }
}

/// Steps for `config`, in execution order.
fn plan(config: &BuildConfiguration) -> Vec<Step> {
    let mode = config.mode();
    let mut steps = vec![Step::Prepare, Step::PackageMedia];
    if let Some(language) = &config.paths().language {
        steps.push(Step::PackageLanguage(language.clone()));
    }
    match mode {
        BuildMode::Loose => steps.push(Step::CopyConfig),
        BuildMode::Archives => steps.extend([Step::WriteArchives, Step::CopyConfig]),
        BuildMode::Distributable => steps.extend([Step::CopyConfig, Step::Repack]),
        BuildMode::Standalone => steps.push(Step::WriteExecutable),
    }
    if config.flags().copy_saves && mode != BuildMode::Standalone {
        if let Some(saves) = &config.paths().saves {
            steps.push(Step::CopySaves(saves.clone()));
        }
    }
    steps
}

/// A directory written by a loose build, with the locator prefix it gets
/// when repacked.
#[derive(Debug)]
struct Mirror {
    path: PathBuf,
    prefix: Option<String>,
}

#[derive(Debug, Default)]
struct BuildState {
    driver: Option<PackagingDriver>,
    splitter: Option<ArchiveSplitter>,
    mirrors: Vec<Mirror>,
    plugins: Vec<PathBuf>,
    staging: Option<tempfile::TempDir>,
    stats: WalkStats,
}

struct Worker {
    config: BuildConfiguration,
    compiler: Option<Arc<dyn ScriptCompiler>>,
    cancel: CancellationToken,
    events: EventSink,
    artifacts: Vec<PathBuf>,
}

impl Worker {
    async fn execute(&mut self) -> Result<()> {
        self.config.validate()?;

        let mode = self.config.mode();
        self.events.info(format!(
            "Building {} ({mode}) into {}",
            display_title(self.config.game_title()),
            self.config.build_directory().display()
        ));
        if self.config.flags().copy_saves && mode == BuildMode::Standalone {
            self.events
                .info("Saves are not copied for standalone builds");
        }

        let steps = plan(&self.config);
        let total = steps.len();
        let mut state = BuildState::default();
        for (i, step) in steps.iter().enumerate() {
            self.check_cancelled()?;
            self.events.task(step.title(), i + 1, total);
            self.run_step(step, &mut state).await?;
        }
        if mode == BuildMode::Loose {
            self.artifacts
                .extend(state.mirrors.iter().map(|m| m.path.clone()));
        }

        if !state.stats.skipped.is_empty() {
            self.events.warn(format!(
                "{} script(s) were not embedded because of errors",
                state.stats.skipped.len()
            ));
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn run_step(&mut self, step: &Step, state: &mut BuildState) -> Result<()> {
        match step {
            Step::Prepare => self.prepare(state).await,
            Step::PackageMedia => {
                let media = self.config.paths().media.clone();
                self.package_tree(&media, false, state).await
            }
            Step::PackageLanguage(language) => self.package_tree(language, true, state).await,
            Step::WriteArchives => self.write_archives(state).await,
            Step::CopyConfig => self.copy_config(state).await,
            Step::Repack => self.repack(state).await,
            Step::WriteExecutable => self.write_executable(state).await,
            Step::CopySaves(saves) => self.copy_saves(saves).await,
        }
    }

    /// Resolves the compiler and plugins, then creates the build directory
    /// and the archive writer. Nothing is written before inputs resolve.
    async fn prepare(&mut self, state: &mut BuildState) -> Result<()> {
        let scripts = self.config.scripts();
        let adapter = if scripts.compile_scripts {
            let compiler: Arc<dyn ScriptCompiler> = match &self.compiler {
                Some(compiler) => Arc::clone(compiler),
                None => {
                    let external = ExternalCompiler::resolve(scripts)?;
                    self.events
                        .info(format!("Using script compiler {}", external.program().display()));
                    Arc::new(external)
                }
            };
            Some(CompilationAdapter::new(compiler, scripts.clone()))
        } else {
            None
        };
        state.driver = Some(PackagingDriver::new(
            adapter,
            scripts.keep_source,
            self.cancel.clone(),
        ));

        let mode = self.config.mode();
        if mode == BuildMode::Standalone {
            state.plugins = resolve_plugins(self.config.standalone())?;
        }

        let build_dir = self.config.build_directory().to_path_buf();
        fs::create_dir_all(&build_dir, false).await?;

        let compress = self.config.flags().compress_archives;
        match mode {
            BuildMode::Archives => {
                state.splitter = Some(ArchiveSplitter::new(
                    self.config.effective_max_archive_size(),
                    ArchiveNaming::new(&build_dir, &self.config.archive().name_prefix_pattern),
                    compress,
                ));
            }
            BuildMode::Standalone => {
                let staging = tempfile::Builder::new()
                    .prefix(".pakforge-")
                    .tempdir_in(&build_dir)?;
                state.splitter = Some(ArchiveSplitter::new(
                    0,
                    ArchiveNaming::fixed(staging.path(), "data"),
                    compress,
                ));
                state.staging = Some(staging);
            }
            BuildMode::Loose | BuildMode::Distributable => {}
        }
        Ok(())
    }

    /// Walks `root` into the archive writer, or into a fresh mirror of it
    /// inside the build directory.
    async fn package_tree(
        &mut self,
        root: &Path,
        prefixed: bool,
        state: &mut BuildState,
    ) -> Result<()> {
        let name = ProjectPaths::dir_name(root);
        let mut sink = match state.splitter.take() {
            Some(splitter) => EmbedSink::Archive(splitter),
            None => {
                let mirror = self.config.build_directory().join(&name);
                fs::create_dir_all(&mirror, true).await?;
                state.mirrors.push(Mirror {
                    path: mirror.clone(),
                    prefix: prefixed.then(|| name.clone()),
                });
                EmbedSink::Directory(mirror)
            }
        };
        let prefix = (prefixed && sink.is_archive()).then_some(name.as_str());

        let driver = state
            .driver
            .clone()
            .ok_or_else(|| Error::GenericError("packaging driver not prepared".into()))?;
        let result = driver.package(root, prefix, &mut sink, &mut self.events).await;
        if let EmbedSink::Archive(splitter) = sink {
            state.splitter = Some(splitter);
        }

        let stats = result?;
        self.events.info(format!(
            "Packaged {}: {} file(s), {} compiled, {} skipped",
            root.display(),
            stats.embedded,
            stats.compiled,
            stats.skipped.len()
        ));
        state.stats.merge(stats);
        Ok(())
    }

    async fn write_archives(&mut self, state: &mut BuildState) -> Result<()> {
        let Some(splitter) = state.splitter.take() else {
            return Ok(());
        };
        let written = splitter.finish().await?;
        if let Some(last) = written.last() {
            self.events
                .info(format!("Wrote archive {}", last.display()));
        }
        self.events
            .info(format!("{} archive(s) written", written.len()));
        self.artifacts.extend(written);
        Ok(())
    }

    /// Copies the configuration directory and rewrites the game configuration.
    async fn copy_config(&mut self, state: &mut BuildState) -> Result<()> {
        let paths = self.config.paths();
        let name = ProjectPaths::dir_name(&paths.config);
        let target = self.config.build_directory().join(&name);

        fs::remove_dir_all(&target).await?;
        let copied = fs::copy_dir(&paths.config, &target).await?;

        let game_config = paths
            .game_config_path()
            .strip_prefix(&paths.config)
            .map(|rel| target.join(rel))?;
        let use_archives = self.config.mode().uses_archives();
        GameConfigPatch {
            use_archives,
            standalone_build: None,
        }
        .rewrite(&game_config)
        .await?;
        self.events.info(format!(
            "Copied {copied} configuration file(s), use_archives = {use_archives}"
        ));

        match self.config.mode() {
            BuildMode::Archives => self.artifacts.push(game_config),
            _ => state.mirrors.push(Mirror {
                path: target,
                prefix: Some(name),
            }),
        }
        Ok(())
    }

    /// Packs the loose mirrors into one archive named after the game, then
    /// removes them.
    async fn repack(&mut self, state: &mut BuildState) -> Result<()> {
        let build_dir = self.config.build_directory().to_path_buf();
        let stem = fs::sanitize_file_name(self.config.game_title());
        let mut sink = EmbedSink::Archive(ArchiveSplitter::new(
            0,
            ArchiveNaming::fixed(&build_dir, stem),
            self.config.flags().compress_archives,
        ));

        let driver = PackagingDriver::passthrough(self.cancel.clone());
        for mirror in &state.mirrors {
            driver
                .package(
                    &mirror.path,
                    mirror.prefix.as_deref(),
                    &mut sink,
                    &mut self.events,
                )
                .await?;
        }

        let EmbedSink::Archive(splitter) = sink else {
            return Err(Error::GenericError("distributable sink is not an archive".into()));
        };
        let written = splitter.finish().await?;
        for path in &written {
            self.events.info(format!("Wrote archive {}", path.display()));
        }

        for mirror in state.mirrors.drain(..) {
            fs::remove_dir_all(&mirror.path).await?;
            self.events
                .info(format!("Removed {}", mirror.path.display()));
        }
        self.artifacts.extend(written);
        Ok(())
    }

    async fn write_executable(&mut self, state: &mut BuildState) -> Result<()> {
        let splitter = state
            .splitter
            .take()
            .ok_or_else(|| Error::GenericError("standalone archive not prepared".into()))?;
        let staging = state
            .staging
            .take()
            .ok_or_else(|| Error::GenericError("standalone staging not prepared".into()))?;

        let data = match splitter.finish().await?.pop() {
            Some(path) => path,
            None => {
                let path = staging.path().join(format!("data.{EXTENSION}"));
                let mut empty = Archive::new(self.config.flags().compress_archives);
                empty.flush(&path).await?
            }
        };

        let title = self.config.game_title();
        let identifier = game_identifier(title, chrono::Utc::now());
        self.events
            .info(format!("Build identifier {identifier:016x}"));

        let standalone = self.config.standalone();
        let stub = standalone
            .stub
            .clone()
            .ok_or_else(|| Error::Configuration("standalone build requires a stub executable".into()))?;

        let mut bundler = StandaloneBundler::new(stub, identifier);
        for binary in &standalone.engine_binaries {
            bundler.push(BuildRecord::named_after(binary));
        }
        for plugin in &state.plugins {
            bundler.push(BuildRecord::named_after(plugin));
        }
        bundler.push(match &standalone.engine_config {
            Some(path) => BuildRecord::from_file(ENGINE_CONFIG_RECORD, path),
            None => BuildRecord::from_bytes(ENGINE_CONFIG_RECORD, bytes::Bytes::new()),
        });
        let game_config = GameConfigPatch {
            use_archives: true,
            standalone_build: Some(identifier),
        }
        .render(&self.config.paths().game_config_path())
        .await?;
        bundler.push(BuildRecord::from_bytes(GAME_CONFIG_RECORD, game_config));
        bundler.push(BuildRecord::from_file(DATA_RECORD, &data));

        let output = self
            .config
            .build_directory()
            .join(executable_name(title));
        bundler.write(&output, &self.cancel, &mut self.events).await?;
        self.events.info(format!(
            "Wrote {} with {} record(s)",
            output.display(),
            bundler.records().len()
        ));

        staging.close()?;
        self.artifacts.push(output);
        Ok(())
    }

    async fn copy_saves(&mut self, saves: &Path) -> Result<()> {
        let target = self
            .config
            .build_directory()
            .join(ProjectPaths::dir_name(saves));
        fs::remove_dir_all(&target).await?;
        let copied = fs::copy_dir(saves, &target).await?;
        self.events
            .info(format!("Copied {copied} save file(s) to {}", target.display()));
        Ok(())
    }
}

fn display_title(title: &str) -> &str {
    if title.trim().is_empty() { "untitled game" } else { title }
}
