//! Project manifest (`pakforge.toml`) loading.
//!
//! The manifest describes where a game's sources live and how to package
//! them. Relative paths are resolved against the manifest's directory.
//!
//! ```toml
//! [game]
//! title = "Hero"
//!
//! [paths]
//! media = "media"
//! config = "config"
//! language = "lang"
//! build = "build"
//!
//! [build]
//! archives = true
//! compress = true
//!
//! [archive]
//! max_size_mb = 512
//!
//! [scripts]
//! compile = true
//! defines = ["RELEASE"]
//! ```

use crate::bundler::{
    ArchiveSettings, BuildConfiguration, BuildConfigurationBuilder, BuildFlags, ProjectPaths,
    ScriptSettings, StandaloneSettings,
    settings::{DEFAULT_GAME_CONFIG, DEFAULT_NAME_PATTERN},
};
use crate::error::{BundlerError, CliError, Result};
use path_absolutize::Absolutize;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "pakforge.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameSection {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    pub media: PathBuf,
    pub config: PathBuf,
    #[serde(default)]
    pub language: Option<PathBuf>,
    #[serde(default)]
    pub saves: Option<PathBuf>,
    #[serde(default)]
    pub game_config: Option<String>,
    #[serde(default)]
    pub build: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
    pub copy_saves: bool,
    pub standalone: bool,
    pub distributable: bool,
    pub archives: bool,
    pub compress: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveSection {
    /// Split limit in megabytes; `0` or absent means no splitting.
    pub max_size_mb: u64,
    pub name_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsSection {
    pub compile: bool,
    pub defines: Vec<String>,
    pub include_paths: Vec<PathBuf>,
    pub debug: bool,
    pub warnings_as_errors: bool,
    pub messages_as_errors: bool,
    pub keep_source: bool,
    pub compiler: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StandaloneSection {
    pub stub: Option<PathBuf>,
    pub engine_binaries: Vec<PathBuf>,
    pub plugin_dir: Option<PathBuf>,
    pub plugins: Option<Vec<String>>,
    pub engine_config: Option<PathBuf>,
}

/// Parsed `pakforge.toml`, with every path made absolute.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    #[serde(default)]
    pub game: GameSection,
    pub paths: PathsSection,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub archive: ArchiveSection,
    #[serde(default)]
    pub scripts: ScriptsSection,
    #[serde(default)]
    pub standalone: StandaloneSection,
}

/// Command-line values that take precedence over the manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestOverrides {
    pub build_dir: Option<PathBuf>,
    pub standalone: bool,
    pub distributable: bool,
    pub archives: bool,
    pub compress: bool,
    pub max_archive_size_mb: Option<u64>,
    pub keep_source: bool,
    pub no_compile: bool,
}

/// Reads and parses a manifest, resolving relative paths against its directory.
pub fn load_manifest(manifest_path: &Path) -> Result<ProjectManifest> {
    let text = std::fs::read_to_string(manifest_path).map_err(|e| {
        BundlerError::Cli(CliError::ExecutionFailed {
            command: "read_manifest".to_string(),
            reason: format!("Failed to read {}: {}", manifest_path.display(), e),
        })
    })?;

    let mut manifest: ProjectManifest = toml::from_str(&text)?;

    let absolute = manifest_path.absolutize()?;
    let base = absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    manifest.resolve_paths(&base)?;
    log::debug!("Loaded manifest {}", manifest_path.display());
    Ok(manifest)
}

fn resolve(base: &Path, path: &mut PathBuf) -> Result<()> {
    *path = path.absolutize_from(base)?.into_owned();
    Ok(())
}

fn resolve_opt(base: &Path, path: &mut Option<PathBuf>) -> Result<()> {
    if let Some(path) = path {
        resolve(base, path)?;
    }
    Ok(())
}

impl ProjectManifest {
    fn resolve_paths(&mut self, base: &Path) -> Result<()> {
        resolve(base, &mut self.paths.media)?;
        resolve(base, &mut self.paths.config)?;
        resolve_opt(base, &mut self.paths.language)?;
        resolve_opt(base, &mut self.paths.saves)?;
        resolve_opt(base, &mut self.paths.build)?;
        for include in &mut self.scripts.include_paths {
            resolve(base, include)?;
        }
        // Bare program names are looked up on PATH, so only paths are resolved.
        if let Some(compiler) = &mut self.scripts.compiler {
            if compiler.components().count() > 1 {
                resolve(base, compiler)?;
            }
        }
        resolve_opt(base, &mut self.standalone.stub)?;
        for binary in &mut self.standalone.engine_binaries {
            resolve(base, binary)?;
        }
        resolve_opt(base, &mut self.standalone.plugin_dir)?;
        resolve_opt(base, &mut self.standalone.engine_config)?;
        Ok(())
    }

    /// Builds the configuration snapshot for one build.
    pub fn to_configuration(&self, overrides: &ManifestOverrides) -> Result<BuildConfiguration> {
        let build_dir = overrides
            .build_dir
            .clone()
            .or_else(|| self.paths.build.clone())
            .ok_or_else(|| CliError::MissingArgument {
                argument: "--build-dir (or [paths] build in the manifest)".to_string(),
            })?;
        let build_dir = build_dir.absolutize()?.into_owned();

        let flags = BuildFlags {
            copy_saves: self.build.copy_saves,
            build_standalone: self.build.standalone || overrides.standalone,
            build_distributable: self.build.distributable || overrides.distributable,
            compress_archives: self.build.compress || overrides.compress,
            compile_to_archives: self.build.archives || overrides.archives,
        };

        let max_mb = overrides
            .max_archive_size_mb
            .unwrap_or(self.archive.max_size_mb);
        let mut archive = ArchiveSettings::with_max_megabytes(max_mb);
        archive.name_prefix_pattern = self
            .archive
            .name_pattern
            .clone()
            .unwrap_or_else(|| DEFAULT_NAME_PATTERN.to_string());

        let scripts = ScriptSettings {
            compile_scripts: self.scripts.compile && !overrides.no_compile,
            defines: self.scripts.defines.clone(),
            include_paths: self.scripts.include_paths.clone(),
            debug_mode: self.scripts.debug,
            treat_warnings_as_errors: self.scripts.warnings_as_errors,
            treat_messages_as_errors: self.scripts.messages_as_errors,
            keep_source: self.scripts.keep_source || overrides.keep_source,
            compiler: self.scripts.compiler.clone(),
        };

        let paths = ProjectPaths {
            media: self.paths.media.clone(),
            config: self.paths.config.clone(),
            language: self.paths.language.clone(),
            saves: self.paths.saves.clone(),
            game_config_file: self
                .paths
                .game_config
                .clone()
                .unwrap_or_else(|| DEFAULT_GAME_CONFIG.to_string()),
        };

        let standalone = StandaloneSettings {
            stub: self.standalone.stub.clone(),
            engine_binaries: self.standalone.engine_binaries.clone(),
            plugin_dir: self.standalone.plugin_dir.clone(),
            plugin_manifest: self.standalone.plugins.clone(),
            engine_config: self.standalone.engine_config.clone(),
        };

        Ok(BuildConfigurationBuilder::new()
            .game_title(self.game.title.clone())
            .build_directory(build_dir)
            .flags(flags)
            .archive_settings(archive)
            .script_settings(scripts)
            .project_paths(paths)
            .standalone_settings(standalone)
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::BuildMode;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
[game]
title = "Hero"

[paths]
media = "media"
config = "config"
language = "lang"
build = "out"

[build]
archives = true

[archive]
max_size_mb = 25

[scripts]
compile = true
defines = ["RELEASE"]
compiler = "tools/fsc"
"#;

    fn write_manifest(text: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[test]
    fn resolves_paths_against_manifest_directory() {
        let (dir, path) = write_manifest(MANIFEST);
        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.paths.media, dir.path().join("media"));
        assert_eq!(manifest.paths.language, Some(dir.path().join("lang")));
        assert_eq!(manifest.scripts.compiler, Some(dir.path().join("tools/fsc")));
    }

    #[test]
    fn builds_configuration_with_overrides() {
        let (dir, path) = write_manifest(MANIFEST);
        let manifest = load_manifest(&path).unwrap();

        let config = manifest.to_configuration(&ManifestOverrides::default()).unwrap();
        assert_eq!(config.mode(), BuildMode::Archives);
        assert_eq!(config.archive().max_archive_size_bytes, 25 * 1024 * 1024);
        assert_eq!(config.build_directory(), dir.path().join("out"));
        assert_eq!(config.scripts().defines, ["RELEASE"]);
        assert_eq!(config.game_title(), "Hero");

        let config = manifest
            .to_configuration(&ManifestOverrides {
                standalone: true,
                no_compile: true,
                max_archive_size_mb: Some(0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.mode(), BuildMode::Standalone);
        assert!(!config.scripts().compile_scripts);
        assert_eq!(config.archive().max_archive_size_bytes, 0);
    }

    #[test]
    fn bare_compiler_name_is_left_for_path_lookup() {
        let (_dir, path) = write_manifest(
            "[paths]\nmedia = \"m\"\nconfig = \"c\"\n[scripts]\ncompiler = \"fsc\"\n",
        );
        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.scripts.compiler, Some(PathBuf::from("fsc")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (_dir, path) = write_manifest("[paths]\nmedia = \"m\"\nconfig = \"c\"\nmeda = \"x\"\n");
        assert!(matches!(load_manifest(&path), Err(BundlerError::Toml(_))));
    }

    #[test]
    fn missing_build_dir_is_reported() {
        let (_dir, path) = write_manifest("[paths]\nmedia = \"m\"\nconfig = \"c\"\n");
        let manifest = load_manifest(&path).unwrap();
        assert!(matches!(
            manifest.to_configuration(&ManifestOverrides::default()),
            Err(BundlerError::Cli(CliError::MissingArgument { .. }))
        ));
    }
}
