use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Toolchain-aware target compatibility resolver.
///
/// Reads a generated rules.toml and decides, for a platform, which targets
/// take part in the build and what each one depends on.
///
/// EXAMPLES:
///     rulekit resolve libc -p x86_64-unknown-linux-gnu    Resolve one target
///     rulekit plan -p aarch64-apple-darwin                Resolve every target
///     rulekit check                                       Validate the manifest
///     rulekit platforms                                   List known platforms
///
/// ENVIRONMENT VARIABLES:
///     RULEKIT_PLATFORM       Default target platform
///     RULEKIT_HOST_PLATFORM  Platform build scripts and proc-macros run on
///     RULEKIT_JOBS           Worker threads for `plan`
///     RULEKIT_JSON           Set to 1 or true for JSON output by default
///     RULEKIT_LOG            Log filter (default: warn)
#[derive(Parser)]
#[command(name = "rulekit")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to rules.toml (default: search upward from the current directory)
    #[arg(long, short = 'm', global = true)]
    manifest: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one target for a platform
    ///
    /// Prints the dependency closure of a compatible target, or the chain of
    /// targets that makes it incompatible.
    ///
    /// EXAMPLES:
    ///     rulekit resolve libc -p x86_64-unknown-linux-gnu
    ///     rulekit resolve libc -p sparc-unknown-linux-gnu --json
    #[command(visible_alias = "r")]
    Resolve {
        /// Target name
        target: String,
        /// Target platform (default: settings.default_platform)
        #[arg(long, short = 'p')]
        platform: Option<String>,
        /// Output in JSON format
        #[arg(long, env = "RULEKIT_JSON", value_parser = FalseyValueParser::new())]
        json: bool,
    },

    /// Resolve every non-manual target for a platform
    ///
    /// Fails when any target fails to resolve. Incompatible targets are
    /// skipped, not failed.
    ///
    /// EXAMPLES:
    ///     rulekit plan -p x86_64-pc-windows-msvc
    ///     rulekit plan --jobs 4 --json
    #[command(visible_alias = "p")]
    Plan {
        /// Target platform (default: settings.default_platform)
        #[arg(long, short = 'p')]
        platform: Option<String>,
        /// Number of worker threads
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
        /// Output in JSON format
        #[arg(long, env = "RULEKIT_JSON", value_parser = FalseyValueParser::new())]
        json: bool,
    },

    /// Validate the manifest
    ///
    /// Checks that every dependency names a declared target and that the
    /// dependency graph has no cycles.
    #[command(visible_alias = "c")]
    Check {
        /// Output in JSON format
        #[arg(long, env = "RULEKIT_JSON", value_parser = FalseyValueParser::new())]
        json: bool,
    },

    /// List platforms
    ///
    /// Shows platforms that ship host tools and platforms named by the
    /// manifest's constraint maps.
    Platforms {
        /// Output in JSON format
        #[arg(long, env = "RULEKIT_JSON", value_parser = FalseyValueParser::new())]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("RULEKIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let workspace = commands::Workspace::load(cli.manifest.as_deref())?;

    match cli.command {
        Commands::Resolve {
            target,
            platform,
            json,
        } => {
            let args = commands::resolve::ResolveArgs {
                target,
                platform,
                json,
            };
            commands::resolve::run(&workspace, args)?;
        }
        Commands::Plan {
            platform,
            jobs,
            json,
        } => {
            let args = commands::plan::PlanArgs {
                platform,
                jobs,
                json,
            };
            commands::plan::run(&workspace, args)?;
        }
        Commands::Check { json } => {
            commands::check::run(&workspace, json)?;
        }
        Commands::Platforms { json } => {
            commands::platforms::run(&workspace, json)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_resolve_args() {
        let cli = Cli::parse_from([
            "rulekit",
            "resolve",
            "libc",
            "--platform",
            "x86_64-unknown-linux-gnu",
        ]);
        match cli.command {
            Commands::Resolve {
                target, platform, ..
            } => {
                assert_eq!(target, "libc");
                assert_eq!(platform.as_deref(), Some("x86_64-unknown-linux-gnu"));
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_global_manifest_flag() {
        let cli = Cli::parse_from(["rulekit", "check", "--manifest", "third_party/rules.toml"]);
        assert_eq!(
            cli.manifest,
            Some(PathBuf::from("third_party/rules.toml"))
        );
        assert!(matches!(cli.command, Commands::Check { .. }));
    }

    #[test]
    fn test_plan_jobs_flag() {
        let cli = Cli::parse_from(["rulekit", "plan", "-j", "4", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Plan { jobs, .. } => assert_eq!(jobs, Some(4)),
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_alias_r_for_resolve() {
        let cli = Cli::parse_from(["rulekit", "r", "libc"]);
        assert!(matches!(cli.command, Commands::Resolve { .. }));
    }

    #[test]
    fn test_alias_p_for_plan() {
        let cli = Cli::parse_from(["rulekit", "p"]);
        assert!(matches!(cli.command, Commands::Plan { .. }));
    }
}
