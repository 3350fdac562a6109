//! Source tree locations.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Default file name of the game configuration inside the config directory.
pub const DEFAULT_GAME_CONFIG: &str = "game.toml";

/// Source directories of a game project.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectPaths {
    /// Media root: scripts, textures, sounds, models.
    pub media: PathBuf,

    /// Configuration directory holding the game configuration.
    pub config: PathBuf,

    /// Optional language/localisation directory.
    pub language: Option<PathBuf>,

    /// Optional save-game directory, copied when `copy_saves` is set.
    pub saves: Option<PathBuf>,

    /// Game configuration file name inside `config`.
    pub game_config_file: String,
}

impl ProjectPaths {
    /// Full path of the game configuration file.
    pub fn game_config_path(&self) -> PathBuf {
        let name = if self.game_config_file.is_empty() {
            DEFAULT_GAME_CONFIG
        } else {
            &self.game_config_file
        };
        self.config.join(name)
    }

    /// Final component of a directory, used to name mirrors and locator prefixes.
    pub fn dir_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string())
    }
}
