//! Core BuildConfiguration struct and implementations.

use super::{ArchiveSettings, BuildMode, ProjectPaths, ScriptSettings, StandaloneSettings};
use crate::bundler::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Build switches chosen by the caller.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BuildFlags {
    /// Copy the save-game directory into the build directory.
    pub copy_saves: bool,
    /// Produce a single executable.
    pub build_standalone: bool,
    /// Produce a single `.pk` named after the game.
    pub build_distributable: bool,
    /// Deflate resources inside archives.
    pub compress_archives: bool,
    /// Embed assets into `.pk` archives instead of mirroring them.
    pub compile_to_archives: bool,
}

/// Immutable snapshot of everything a build needs.
///
/// Constructed via [`BuildConfigurationBuilder`](super::BuildConfigurationBuilder).
///
/// # Examples
///
/// ```no_run
/// use pakforge::bundler::{BuildConfigurationBuilder, ProjectPaths};
///
/// # fn example() -> pakforge::bundler::Result<()> {
/// let config = BuildConfigurationBuilder::new()
///     .game_title("Space Miner")
///     .build_directory("build")
///     .project_paths(ProjectPaths {
///         media: "media".into(),
///         config: "config".into(),
///         ..Default::default()
///     })
///     .compile_to_archives(true)
///     .max_archive_megabytes(25)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Serialize)]
pub struct BuildConfiguration {
    /// Human readable game title.
    game_title: String,

    /// Output directory for every artifact.
    build_directory: PathBuf,

    flags: BuildFlags,

    archive: ArchiveSettings,

    scripts: ScriptSettings,

    paths: ProjectPaths,

    standalone: StandaloneSettings,
}

impl BuildConfiguration {
    /// Returns the game title.
    pub fn game_title(&self) -> &str {
        &self.game_title
    }

    /// Returns the build directory.
    pub fn build_directory(&self) -> &Path {
        &self.build_directory
    }

    /// Returns the build switches.
    pub fn flags(&self) -> BuildFlags {
        self.flags
    }

    /// Returns archive settings.
    pub fn archive(&self) -> &ArchiveSettings {
        &self.archive
    }

    /// Returns script settings.
    pub fn scripts(&self) -> &ScriptSettings {
        &self.scripts
    }

    /// Returns the source tree locations.
    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Returns the standalone engine inputs.
    pub fn standalone(&self) -> &StandaloneSettings {
        &self.standalone
    }

    /// Output mode derived from the flags.
    ///
    /// Standalone wins over distributable, which wins over archives.
    pub fn mode(&self) -> BuildMode {
        if self.flags.build_standalone {
            BuildMode::Standalone
        } else if self.flags.build_distributable {
            BuildMode::Distributable
        } else if self.flags.compile_to_archives {
            BuildMode::Archives
        } else {
            BuildMode::Loose
        }
    }

    /// Split limit for the current mode. Single-archive modes never split.
    pub fn effective_max_archive_size(&self) -> u64 {
        match self.mode() {
            BuildMode::Archives => self.archive.max_archive_size_bytes,
            _ => 0,
        }
    }

    /// Checks that every configured input exists before any work starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        require_dir("media directory", &self.paths.media)?;
        require_dir("config directory", &self.paths.config)?;

        let game_config = self.paths.game_config_path();
        if !game_config.is_file() {
            return Err(Error::Configuration(format!(
                "game configuration not found: {}",
                game_config.display()
            )));
        }

        if let Some(language) = &self.paths.language {
            require_dir("language directory", language)?;
        }

        if self.flags.copy_saves {
            match &self.paths.saves {
                Some(saves) => require_dir("saves directory", saves)?,
                None => {
                    return Err(Error::Configuration(
                        "copy_saves is set but no saves directory is configured".into(),
                    ));
                }
            }
        }

        if self.build_directory.as_os_str().is_empty() {
            return Err(Error::Configuration("build directory is empty".into()));
        }
        if self.build_directory.exists() && !self.build_directory.is_dir() {
            return Err(Error::Configuration(format!(
                "build directory is not a directory: {}",
                self.build_directory.display()
            )));
        }
        self.check_output_overlap()?;

        if self.archive.name_prefix_pattern.trim().is_empty() {
            return Err(Error::Configuration(
                "archive name pattern is empty".into(),
            ));
        }

        match self.mode() {
            BuildMode::Standalone => {
                self.require_title()?;
                let stub = self.standalone.stub.as_ref().ok_or_else(|| {
                    Error::Configuration("standalone build requires a stub executable".into())
                })?;
                if !stub.is_file() {
                    return Err(Error::Configuration(format!(
                        "stub executable not found: {}",
                        stub.display()
                    )));
                }
                if let Some(plugin_dir) = &self.standalone.plugin_dir {
                    require_dir("plugin directory", plugin_dir)?;
                }
            }
            BuildMode::Distributable => self.require_title()?,
            BuildMode::Archives | BuildMode::Loose => {}
        }

        Ok(())
    }

    /// Rejects build directories whose output would overwrite or recurse
    /// into a source directory.
    ///
    /// Walked trees must not contain the build directory, and every folder
    /// mirrored to `<build>/<name>` must be disjoint from its source.
    fn check_output_overlap(&self) -> Result<()> {
        let build = resolve_path(&self.build_directory);

        let mut walked = vec![("media", &self.paths.media)];
        if let Some(language) = &self.paths.language {
            walked.push(("language", language));
        }
        for (what, source) in &walked {
            if build.starts_with(resolve_path(source)) {
                return Err(Error::Configuration(format!(
                    "build directory {} lies inside the {what} directory",
                    self.build_directory.display()
                )));
            }
        }

        let mode = self.mode();
        let mut mirrored = Vec::new();
        if matches!(mode, BuildMode::Loose | BuildMode::Distributable) {
            mirrored.extend(walked.iter().copied());
        }
        if mode != BuildMode::Standalone {
            mirrored.push(("config", &self.paths.config));
            if self.flags.copy_saves {
                if let Some(saves) = &self.paths.saves {
                    mirrored.push(("saves", saves));
                }
            }
        }
        for (what, source) in mirrored {
            let source = resolve_path(source);
            let target = build.join(ProjectPaths::dir_name(&source));
            if target.starts_with(&source) || source.starts_with(&target) {
                return Err(Error::Configuration(format!(
                    "build directory {} would overwrite the {what} directory {}",
                    self.build_directory.display(),
                    source.display()
                )));
            }
        }
        Ok(())
    }

    fn require_title(&self) -> Result<()> {
        if self.game_title.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "{} build requires a game title",
                self.mode()
            )));
        }
        Ok(())
    }

    /// Creates a new BuildConfiguration (used by the builder).
    pub(super) fn new(
        game_title: String,
        build_directory: PathBuf,
        flags: BuildFlags,
        archive: ArchiveSettings,
        scripts: ScriptSettings,
        paths: ProjectPaths,
        standalone: StandaloneSettings,
    ) -> Self {
        Self {
            game_title,
            build_directory,
            flags,
            archive,
            scripts,
            paths,
            standalone,
        }
    }
}

fn require_dir(what: &str, path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "{what} not found or not a directory: {}",
            path.display()
        )))
    }
}

/// Canonical form of `path`; a missing tail is appended to its deepest
/// existing ancestor.
fn resolve_path(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
            }
            _ => return path.to_path_buf(),
        }
    }
}
