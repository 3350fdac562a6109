//! Builder for constructing BuildConfiguration.

use super::{
    ArchiveSettings, BuildConfiguration, BuildFlags, MEGABYTE, ProjectPaths, ScriptSettings,
    StandaloneSettings,
};
use std::path::{Path, PathBuf};

/// Builder for constructing [`BuildConfiguration`].
///
/// Provides a fluent API; required fields are checked by [`build`](Self::build).
///
/// # Examples
///
/// ```no_run
/// use pakforge::bundler::{BuildConfigurationBuilder, ProjectPaths, ScriptSettings};
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
///     .script_settings(ScriptSettings {
///         compile_scripts: true,
///         defines: vec!["RELEASE".into()],
///         ..Default::default()
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct BuildConfigurationBuilder {
    game_title: Option<String>,
    build_directory: Option<PathBuf>,
    flags: BuildFlags,
    archive: ArchiveSettings,
    scripts: ScriptSettings,
    paths: Option<ProjectPaths>,
    standalone: StandaloneSettings,
}

impl BuildConfigurationBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the game title.
    pub fn game_title(mut self, title: impl Into<String>) -> Self {
        self.game_title = Some(title.into());
        self
    }

    /// Sets the build directory.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn build_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.build_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the source tree locations.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn project_paths(mut self, paths: ProjectPaths) -> Self {
        self.paths = Some(paths);
        self
    }

    /// Replaces all build switches at once.
    pub fn flags(mut self, flags: BuildFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn copy_saves(mut self, enabled: bool) -> Self {
        self.flags.copy_saves = enabled;
        self
    }

    pub fn build_standalone(mut self, enabled: bool) -> Self {
        self.flags.build_standalone = enabled;
        self
    }

    pub fn build_distributable(mut self, enabled: bool) -> Self {
        self.flags.build_distributable = enabled;
        self
    }

    pub fn compress_archives(mut self, enabled: bool) -> Self {
        self.flags.compress_archives = enabled;
        self
    }

    pub fn compile_to_archives(mut self, enabled: bool) -> Self {
        self.flags.compile_to_archives = enabled;
        self
    }

    /// Sets archive settings.
    ///
    /// Default: no splitting, pattern `data#`
    pub fn archive_settings(mut self, settings: ArchiveSettings) -> Self {
        self.archive = settings;
        self
    }

    /// Sets the split limit in bytes. Zero disables splitting.
    pub fn max_archive_size(mut self, bytes: u64) -> Self {
        self.archive.max_archive_size_bytes = bytes;
        self
    }

    /// Sets the split limit in megabytes.
    pub fn max_archive_megabytes(mut self, megabytes: u64) -> Self {
        self.archive.max_archive_size_bytes = megabytes.saturating_mul(MEGABYTE);
        self
    }

    /// Sets script settings.
    ///
    /// Default: scripts embedded as source, no compilation
    pub fn script_settings(mut self, settings: ScriptSettings) -> Self {
        self.scripts = settings;
        self
    }

    /// Sets standalone engine inputs.
    pub fn standalone_settings(mut self, settings: StandaloneSettings) -> Self {
        self.standalone = settings;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing:
    /// - `build_directory`
    /// - `project_paths`
    pub fn build(self) -> crate::bundler::Result<BuildConfiguration> {
        use crate::bundler::error::Context;

        Ok(BuildConfiguration::new(
            self.game_title.unwrap_or_default(),
            self.build_directory
                .context("build_directory is required")?,
            self.flags,
            self.archive,
            self.scripts,
            self.paths.context("project_paths is required")?,
            self.standalone,
        ))
    }
}
