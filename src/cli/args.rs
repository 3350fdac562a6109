//! Command line argument parsing and validation.

use crate::metadata::{MANIFEST_FILE, ManifestOverrides};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Game asset packager
#[derive(Parser, Debug)]
#[command(
    name = "pakforge",
    version,
    about = "Packages game projects into pak archives or a standalone executable",
    long_about = "Packages a game project described by a pakforge.toml manifest.

Output modes (highest precedence first):
  --standalone     one executable: stub + engine + plugins + configuration + data
  --distributable  one <title>.pk archive holding the whole build
  --archives       size-bounded data#.pk archives plus the game configuration
  (none)           a mirrored directory tree with scripts compiled in place

Usage:
  pakforge build --manifest pakforge.toml --archives --max-archive-size 512
  pakforge list build/data0.pk
  pakforge inspect build/Hero

Exit code 0 = the build succeeded."
)]
pub struct Args {
    /// Only print warnings, errors and the final status
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print every build log line
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Package a project
    Build(BuildArgs),

    /// List the resources of a .pk archive
    List {
        /// Archive to read
        archive: PathBuf,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the records appended to a standalone executable
    Inspect {
        /// Executable to read
        executable: PathBuf,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Project manifest
    #[arg(short, long, value_name = "PATH", default_value = MANIFEST_FILE, env = "PAKFORGE_MANIFEST")]
    pub manifest: PathBuf,

    /// Build directory (overrides [paths] build)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Build one self-contained executable
    #[arg(long)]
    pub standalone: bool,

    /// Build one archive named after the game
    #[arg(long)]
    pub distributable: bool,

    /// Package media into .pk archives
    #[arg(long)]
    pub archives: bool,

    /// Deflate archive payloads
    #[arg(long)]
    pub compress: bool,

    /// Split archives at this many megabytes (0 = never)
    #[arg(long, value_name = "MB")]
    pub max_archive_size: Option<u64>,

    /// Also embed script sources as <name>.source
    #[arg(long)]
    pub keep_source: bool,

    /// Embed scripts without compiling them
    #[arg(long)]
    pub no_compile: bool,

    /// Print the build result as JSON
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Build(build) => build.validate(),
            Command::List { archive: path, .. } | Command::Inspect { executable: path, .. } => {
                if path.as_os_str().is_empty() {
                    Err("Path cannot be empty".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl BuildArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.manifest.as_os_str().is_empty() {
            return Err("Manifest path cannot be empty".to_string());
        }
        let modes = [self.standalone, self.distributable, self.archives]
            .iter()
            .filter(|&&m| m)
            .count();
        if modes > 1 {
            return Err(
                "Choose at most one of --standalone, --distributable and --archives".to_string(),
            );
        }
        Ok(())
    }

    pub fn overrides(&self) -> ManifestOverrides {
        ManifestOverrides {
            build_dir: self.build_dir.clone(),
            standalone: self.standalone,
            distributable: self.distributable,
            archives: self.archives,
            compress: self.compress,
            max_archive_size_mb: self.max_archive_size,
            keep_source: self.keep_source,
            no_compile: self.no_compile,
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print verbose message if in verbose mode
    pub fn verbose_println(&self, message: &str) -> std::io::Result<()> {
        self.output.verbose(message)
    }

    /// Print success message if not in quiet mode
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.output.success(message)
    }

    /// Print warning message
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.output.warn(message)
    }

    /// Print error message
    pub fn error(&self, message: &str) -> std::io::Result<()> {
        self.output.error(message)
    }

    /// Print progress message
    pub fn progress(&self, message: &str) -> std::io::Result<()> {
        self.output.progress(message)
    }

    /// Print section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        self.output.section(title)
    }

    /// Print indented text
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.output.indent(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_flags() {
        let args = Args::try_parse_from([
            "pakforge",
            "build",
            "--manifest",
            "game/pakforge.toml",
            "--archives",
            "--max-archive-size",
            "25",
            "--json",
        ])
        .unwrap();
        let Command::Build(build) = &args.command else {
            panic!("expected build");
        };
        assert!(build.archives);
        assert_eq!(build.max_archive_size, Some(25));
        assert!(args.validate().is_ok());
        assert_eq!(build.overrides().max_archive_size_mb, Some(25));
    }

    #[test]
    fn rejects_two_modes() {
        let args =
            Args::try_parse_from(["pakforge", "build", "--standalone", "--archives"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Args::try_parse_from(["pakforge", "-q", "-v", "list", "a.pk"]).is_err());
    }
}
