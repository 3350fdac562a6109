//! Command line interface for pakforge.
//!
//! `build` runs a packaging build and renders its events; `list` and
//! `inspect` read back archives and standalone executables.

mod args;
mod output;

pub use args::{Args, BuildArgs, Command, RuntimeConfig};
pub use output::{OutputManager, format_bytes, truncate_hash};

use crate::{
    bundler::{
        ArchiveReader, BuildEvent, BuildResult, Bundler, LogLevel,
        standalone::{DATA_RECORD, StandaloneReader},
    },
    error::{CliError, Result},
    metadata,
};
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;
    let runtime = RuntimeConfig::from(&args);

    match &args.command {
        Command::Build(build_args) => build(build_args, &runtime).await,
        Command::List { archive, json } => list(archive, *json, &runtime).await,
        Command::Inspect { executable, json } => inspect(executable, *json, &runtime).await,
    }
}

async fn build(args: &BuildArgs, runtime: &RuntimeConfig) -> Result<i32> {
    let manifest = metadata::load_manifest(&args.manifest)?;
    let config = manifest.to_configuration(&args.overrides())?;
    if !args.json {
        runtime.section(&format!(
            "Packaging {} ({})",
            config.game_title(),
            config.mode()
        ))?;
    }

    let mut handle = Bundler::new(config).spawn();
    let token = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling build");
            token.cancel();
        }
    });

    while let Some(event) = handle.next_event().await {
        if !args.json {
            render_event(&event, runtime)?;
        }
    }
    let result = handle.wait().await;
    interrupt.abort();

    if args.json {
        runtime.output().json(&result)?;
    } else {
        summarize(&result, runtime)?;
    }
    Ok(if result.is_success() { 0 } else { 1 })
}

fn render_event(event: &BuildEvent, runtime: &RuntimeConfig) -> std::io::Result<()> {
    match event {
        BuildEvent::Task { name, step, total } => {
            runtime.progress(&format!("[{step}/{total}] {name}"))
        }
        BuildEvent::Subtask {
            name,
            current,
            total,
        } => runtime.verbose_println(&format!("({current}/{total}) {name}")),
        BuildEvent::Log(line) => match line.level {
            LogLevel::Info => runtime.verbose_println(&line.message),
            LogLevel::Warning => runtime.warn(&line.message),
            LogLevel::Error => runtime.error(&line.message),
        },
        BuildEvent::Finished(_) => Ok(()),
    }
}

fn summarize(result: &BuildResult, runtime: &RuntimeConfig) -> std::io::Result<()> {
    if result.is_success() {
        runtime.success(&format!("Build {}", result.status))?;
        for artifact in &result.artifacts {
            runtime.indent(&format!(
                "{}  {}  sha256:{}",
                artifact.path.display(),
                format_bytes(artifact.size),
                truncate_hash(&artifact.checksum)
            ))?;
        }
        Ok(())
    } else {
        runtime.error(&format!("Build {}", result.status))
    }
}

async fn list(path: &Path, json: bool, runtime: &RuntimeConfig) -> Result<i32> {
    let reader = ArchiveReader::open(path).await?;
    if json {
        runtime.output().json(&reader.entries())?;
        return Ok(0);
    }

    runtime.section(&format!(
        "{} ({} resources{})",
        path.display(),
        reader.entries().len(),
        if reader.is_compressed() { ", deflate" } else { "" }
    ))?;
    for entry in reader.entries() {
        runtime.indent(&format!("{}  {}", entry.locator, format_bytes(entry.raw_len)))?;
    }
    Ok(0)
}

#[derive(Debug, Serialize)]
struct InspectReport<'a> {
    identifier: String,
    base_offset: u64,
    records: &'a [crate::bundler::standalone::RecordEntry],
    data_resources: usize,
}

async fn inspect(path: &Path, json: bool, runtime: &RuntimeConfig) -> Result<i32> {
    let mut reader = StandaloneReader::open(path).await?;
    let data = reader
        .read(DATA_RECORD)
        .await?
        .with_context(|| format!("{} has no {DATA_RECORD} record", path.display()))?;
    let archive = ArchiveReader::from_bytes(data.to_vec()).await?;

    let trailer = reader.trailer();
    let report = InspectReport {
        identifier: hex::encode(trailer.identifier.to_be_bytes()),
        base_offset: trailer.base_offset,
        records: reader.records(),
        data_resources: archive.entries().len(),
    };
    if json {
        runtime.output().json(&report)?;
        return Ok(0);
    }

    runtime.section(&format!("{} (build {})", path.display(), report.identifier))?;
    runtime.indent(&format!("records start at byte {}", report.base_offset))?;
    for record in report.records {
        runtime.indent(&format!("{}  {}", record.name, format_bytes(record.length)))?;
    }
    runtime.indent(&format!("{DATA_RECORD} holds {} resources", report.data_resources))?;
    Ok(0)
}

/// Parse arguments without executing (for testing)
pub fn parse_args() -> Args {
    Args::parse_args()
}

/// Create runtime configuration from arguments
pub fn create_runtime_config(args: &Args) -> RuntimeConfig {
    RuntimeConfig::from(args)
}
