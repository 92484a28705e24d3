use crate::config::{CliOverrides, CloneBackend, Config};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "geo-manifest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Refresh geoip/geosite name manifests from upstream repositories")]
#[command(
    long_about = "geo-manifest clones the upstream geoip and domain-list-community repositories, \
                  lists the entries of their data folders, and writes sorted, deduplicated name \
                  manifests into the output directory (geo/geoip.txt and geo/geosite.txt by default)."
)]
#[command(after_help = "EXAMPLES:\n  \
    geo-manifest\n  \
    geo-manifest --cleanup --verbose\n  \
    geo-manifest --config sources.toml --output-dir public/geo\n  \
    geo-manifest --backend libgit2 --output-format json\n  \
    geo-manifest --generate-config --config geo-manifest.toml")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Directory holding checkouts and intermediate manifests
    #[arg(long, help = "Workspace directory (default: current directory)")]
    pub base_dir: Option<PathBuf>,

    /// Final manifest directory
    #[arg(short, long, help = "Output directory for manifests (default: geo)")]
    pub output_dir: Option<PathBuf>,

    /// How repositories are cloned
    #[arg(long, value_enum)]
    pub backend: Option<BackendChoice>,

    /// Remove checkouts once manifests are in place
    #[arg(long, help = "Delete cloned repositories after the manifests are written")]
    pub cleanup: bool,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, help = "Show the update plan without cloning or writing anything")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendChoice {
    /// Run the git command-line client
    Command,
    /// Clone in-process with libgit2
    Libgit2,
}

impl From<BackendChoice> for CloneBackend {
    fn from(choice: BackendChoice) -> Self {
        match choice {
            BackendChoice::Command => CloneBackend::Command,
            BackendChoice::Libgit2 => CloneBackend::Libgit2,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_base_dir(self.base_dir.clone())
            .with_output_dir(self.output_dir.clone())
            .with_backend(self.backend.map(CloneBackend::from))
            .with_cleanup(self.cleanup.then_some(true))
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Default `env_logger` filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity_level() {
            0 => "geo_manifest=warn",
            1 => "geo_manifest=info",
            _ => "geo_manifest=debug",
        }
    }
}
