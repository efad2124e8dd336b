mod commands;
mod serve;

use std::path::{Path, PathBuf};
use std::process;

use assets_core::{AssetsConfig, ConfigError, Registry};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Lifecycle-gated asset tracker.
#[derive(Parser)]
#[command(name = "assets", version, about = "Lifecycle-gated asset tracker")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a configuration file
    Check {
        /// Path to the TOML configuration
        config: PathBuf,
    },

    /// Show a lifecycle's statuses, transitions and rights
    Lifecycle {
        /// Path to the TOML configuration
        config: PathBuf,
        /// Lifecycle name
        name: String,
    },

    /// Ask the lifecycle gate whether a status change is allowed
    Transition {
        /// Path to the TOML configuration
        config: PathBuf,
        /// Lifecycle name
        #[arg(long)]
        lifecycle: String,
        /// Current status; omit to check creation
        #[arg(long)]
        from: Option<String>,
        /// Requested status
        #[arg(long)]
        to: String,
    },

    /// Start the HTTP JSON API over in-memory storage
    Serve {
        /// Path to the TOML configuration
        config: PathBuf,
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match cli.command {
        Commands::Check { config } => commands::check::cmd_check(&config, cli.output, cli.quiet),
        Commands::Lifecycle { config, name } => {
            commands::lifecycle::cmd_lifecycle(&config, &name, cli.output, cli.quiet)
        }
        Commands::Transition {
            config,
            lifecycle,
            from,
            to,
        } => commands::transition::cmd_transition(
            &config,
            &lifecycle,
            from.as_deref(),
            &to,
            cli.output,
            cli.quiet,
        ),
        Commands::Serve { config, port } => {
            let registry = load_registry_or_exit(&config, cli.output, cli.quiet);
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    report_error(
                        &format!("failed to create tokio runtime: {}", e),
                        cli.output,
                        cli.quiet,
                    );
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(registry, port)) {
                report_error(&format!("serve error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
    }
}

/// Logs go to stderr so JSON on stdout stays parseable.
///
/// `ASSETS_LOG` takes precedence over `RUST_LOG`; `--quiet` lowers the
/// default from `info` to `warn`.
fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_env("ASSETS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub(crate) fn load_registry(path: &Path) -> Result<Registry, ConfigError> {
    AssetsConfig::load(path)?.build()
}

pub(crate) fn load_registry_or_exit(path: &Path, output: OutputFormat, quiet: bool) -> Registry {
    match load_registry(path) {
        Ok(registry) => registry,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
