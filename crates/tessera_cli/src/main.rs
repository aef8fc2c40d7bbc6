//! Tessera CLI: the command-line interface for the Tessera CGRA mapper.
//!
//! Provides `tessera map` to run the evolutionary mapper and write a result
//! record, `tessera check` to validate a configuration and application
//! without searching, and `tessera inspect` to summarise a written record.

#![warn(missing_docs)]

mod check;
mod inspect;
mod map;
mod pipeline;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Tessera: evolutionary spatial mapping for CGRAs.
#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Tessera CGRA mapper")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Map an application onto the configured fabric.
    Map(MapArgs),
    /// Validate the configuration and application without searching.
    Check(CheckArgs),
    /// Summarise a mapping record.
    Inspect(InspectArgs),
}

/// Arguments for `tessera map`.
#[derive(Parser, Debug)]
pub struct MapArgs {
    /// Path to `tessera.toml` or the directory containing it.
    #[arg(long)]
    pub config: Option<String>,

    /// Where to write the mapping record (default: `<project>.tsra`).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Wall-clock limit in seconds; the search stops at the next generation
    /// boundary after it elapses.
    #[arg(long)]
    pub time_limit: Option<u64>,

    /// Print diagnostics and the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `tessera check`.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to `tessera.toml` or the directory containing it.
    #[arg(long)]
    pub config: Option<String>,

    /// Print diagnostics as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `tessera inspect`.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// The record file to read.
    pub record: String,

    /// Dump the whole record as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::env::var("TERM").is_ok_and(|t| t != "dumb"),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Map(ref args) => map::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
        Command::Inspect(ref args) => inspect::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the level
/// chosen by `--quiet`/`--verbose`.
fn init_tracing(global: &GlobalArgs) {
    let level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_map_default() {
        let cli = Cli::parse_from(["tessera", "map"]);
        match cli.command {
            Command::Map(ref args) => {
                assert!(args.config.is_none());
                assert!(args.output.is_none());
                assert!(args.time_limit.is_none());
                assert!(!args.json);
            }
            _ => panic!("expected Map command"),
        }
    }

    #[test]
    fn parse_map_with_args() {
        let cli = Cli::parse_from([
            "tessera",
            "map",
            "--config",
            "runs/fir",
            "--output",
            "fir.tsra",
            "--time-limit",
            "60",
            "--json",
        ]);
        match cli.command {
            Command::Map(ref args) => {
                assert_eq!(args.config.as_deref(), Some("runs/fir"));
                assert_eq!(args.output.as_deref(), Some("fir.tsra"));
                assert_eq!(args.time_limit, Some(60));
                assert!(args.json);
            }
            _ => panic!("expected Map command"),
        }
    }

    #[test]
    fn parse_check() {
        let cli = Cli::parse_from(["tessera", "check", "--config", "tessera.toml"]);
        match cli.command {
            Command::Check(ref args) => {
                assert_eq!(args.config.as_deref(), Some("tessera.toml"));
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_inspect_requires_record() {
        assert!(Cli::try_parse_from(["tessera", "inspect"]).is_err());
        let cli = Cli::parse_from(["tessera", "inspect", "fir.tsra"]);
        match cli.command {
            Command::Inspect(ref args) => assert_eq!(args.record, "fir.tsra"),
            _ => panic!("expected Inspect command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["tessera", "--quiet", "--color", "never", "check"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn parse_verbose_after_subcommand() {
        let cli = Cli::parse_from(["tessera", "map", "-v"]);
        assert!(cli.verbose);
    }
}
