//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// camsim - simulated scientific camera acquisition pipeline
#[derive(Parser, Debug)]
#[command(
    name = "camsim",
    author,
    version,
    about = "Simulated camera acquisition pipeline",
    long_about = "Synthesizes camera frames (sine stripes, photon noise, colour fixtures),\n\
                  runs timed acquisition sequences through a double-buffer handoff and\n\
                  delivers frames to the configured sink."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CAMSIM_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CAMSIM_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", global = true, env = "CAMSIM_METRICS_PORT")]
    pub metrics_port: u16,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Map the global flags onto the observability settings
    pub fn observability_config(&self) -> observability::ObservabilityConfig {
        let default_log_level = if self.quiet {
            "warn"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        };

        observability::ObservabilityConfig {
            log_format: self.log_format.into(),
            metrics_port: (self.metrics_port != 0).then_some(self.metrics_port),
            default_log_level: default_log_level.to_string(),
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an acquisition sequence
    Run(RunArgs),

    /// Capture a single frame
    Snap(SnapArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display supported formats, bit depths and binning
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "camera.toml", env = "CAMSIM_CONFIG")]
    pub config: PathBuf,

    /// Number of frames to acquire (overrides sequence.frame_count)
    #[arg(long, env = "CAMSIM_FRAMES")]
    pub frames: Option<u64>,

    /// Minimum spacing between frame starts in milliseconds
    #[arg(long, env = "CAMSIM_INTERVAL_MS")]
    pub interval_ms: Option<f64>,

    /// Stop the run when the sink overflows instead of clearing it
    #[arg(long, env = "CAMSIM_STOP_ON_OVERFLOW")]
    pub stop_on_overflow: bool,

    /// Stop the run after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "CAMSIM_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `snap` command
#[derive(Parser, Debug, Clone)]
pub struct SnapArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "camera.toml", env = "CAMSIM_CONFIG")]
    pub config: PathBuf,

    /// Write the raw frame bytes to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output frame description as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "camera.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Also describe the camera built from this configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides_parse() {
        let cli = Cli::parse_from([
            "camsim",
            "-v",
            "run",
            "--config",
            "bench.toml",
            "--frames",
            "10",
            "--interval-ms",
            "2.5",
            "--stop-on-overflow",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("bench.toml"));
                assert_eq!(args.frames, Some(10));
                assert_eq!(args.interval_ms, Some(2.5));
                assert!(args.stop_on_overflow);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_observability_mapping() {
        let cli = Cli::parse_from(["camsim", "-q", "--metrics-port", "9100", "info"]);
        let config = cli.observability_config();
        assert_eq!(config.default_log_level, "warn");
        assert_eq!(config.metrics_port, Some(9100));

        let cli = Cli::parse_from(["camsim", "-vv", "info"]);
        let config = cli.observability_config();
        assert_eq!(config.default_log_level, "trace");
        assert_eq!(config.metrics_port, None);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["camsim", "-q", "-v", "info"]).is_err());
    }
}
