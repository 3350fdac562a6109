//! Game asset packaging.
//!
//! Turns a game project (media, language and configuration directories)
//! into one of four outputs:
//!
//! - **Loose**: a mirrored tree in the build directory, scripts compiled in place
//! - **Archives**: size-bounded `.pk` archives plus a rewritten game configuration
//! - **Distributable**: a single `.pk` archive named after the game
//! - **Standalone**: one executable carrying the engine, plugins and data
//!
//! # Example
//!
//! ```no_run
//! use pakforge::bundler::{BuildConfigurationBuilder, ProjectPaths};
//!
//! # async fn example() -> pakforge::bundler::Result<()> {
//! let config = BuildConfigurationBuilder::new()
//!     .game_title("Hero")
//!     .build_directory("build")
//!     .project_paths(ProjectPaths {
//!         media: "media".into(),
//!         config: "config".into(),
//!         ..Default::default()
//!     })
//!     .compile_to_archives(true)
//!     .max_archive_megabytes(512)
//!     .build()?;
//!
//! let result = pakforge::build_project(config).await;
//! for artifact in &result.artifacts {
//!     println!("{} ({} bytes, sha256 {})", artifact.path.display(), artifact.size, artifact.checksum);
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod builder;
pub mod error;
pub mod packaging;
pub mod script;
pub mod settings;
pub mod standalone;
pub mod utils;

pub use archive::{Archive, ArchiveReader, Resource};
pub use builder::{
    BuildArtifact, BuildEvent, BuildHandle, BuildResult, BuildStatus, Bundler, LogLevel, LogLine,
};
pub use error::{Error, Result};
pub use settings::{
    ArchiveSettings, BuildConfiguration, BuildConfigurationBuilder, BuildFlags, BuildMode,
    ProjectPaths, ScriptSettings, StandaloneSettings,
};
