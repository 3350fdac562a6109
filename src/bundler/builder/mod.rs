//! Build orchestration.
//!
//! [`Bundler`] runs one build on a dedicated task and reports progress through
//! [`BuildEvent`]s. The caller holds a [`BuildHandle`] to receive events,
//! request cancellation and collect the final [`BuildResult`].
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA256 checksum calculation for artifacts
//! - [`events`] - Event channel and build result types
//! - [`game_config`] - Game configuration rewrite
//! - [`orchestrator`] - Main [`Bundler`] struct and build steps
//! - [`tool_detection`] - Script compiler lookup

mod checksum;
mod events;
mod game_config;
mod orchestrator;
mod tool_detection;

pub use checksum::{artifact_size, calculate_sha256};
pub use events::{
    BuildArtifact, BuildEvent, BuildResult, BuildStatus, EventSink, LogLevel, LogLine,
};
pub use game_config::GameConfigPatch;
pub use orchestrator::{BuildHandle, Bundler};
pub use tool_detection::DEFAULT_COMPILER_PATH;
