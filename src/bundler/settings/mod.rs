//! Configuration structures for packaging operations.
//!
//! A [`BuildConfiguration`] is an immutable snapshot assembled once through
//! [`BuildConfigurationBuilder`] and handed to the build worker. Nothing in a
//! running build mutates it.

mod archive;
mod builder;
mod core;
mod mode;
mod project;
mod script;
mod standalone;

pub use archive::{ArchiveSettings, DEFAULT_NAME_PATTERN, MEGABYTE};
pub use builder::BuildConfigurationBuilder;
pub use core::{BuildConfiguration, BuildFlags};
pub use mode::BuildMode;
pub use project::{DEFAULT_GAME_CONFIG, ProjectPaths};
pub use script::ScriptSettings;
pub use standalone::StandaloneSettings;
