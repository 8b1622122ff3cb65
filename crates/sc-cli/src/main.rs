//! sandbox-console CLI
//!
//! Attaches the current terminal to the debug console of a sandbox:
//! - exec: resolve, dial and relay until the console goes away
//! - resolve: print the console address without connecting
//! - config: inspect or create the configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sandbox_console::commands;
use sandbox_console::output::print_error;
use sc_core::ConsoleError;

#[derive(Parser)]
#[command(name = "sandbox-console")]
#[command(author, version, about = "Attach to the debug console of a sandbox")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where to find the console of a sandbox
#[derive(Args)]
struct Target {
    /// Sandbox identifier
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    sandbox_id: String,

    /// Sandbox monitor address (overrides config)
    #[arg(long, env = "SANDBOX_CONSOLE_MONITOR_ADDR")]
    monitor_addr: Option<String>,

    /// Debug console port inside the sandbox (0 uses the default)
    #[arg(long, env = "SANDBOX_CONSOLE_DEBUG_PORT")]
    debug_port: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Enter the debug console of a sandbox
    /// Alias: attach
    #[command(alias = "attach")]
    Exec {
        #[command(flatten)]
        target: Target,
    },

    /// Print the debug console address of a sandbox without connecting
    Resolve {
        #[command(flatten)]
        target: Target,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Show config file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr, stdout belongs to the console
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            print_error(&format!("{:#}", e));
            exit_code(&e)
        }
    };

    // The detached stdin reader may still be parked in a blocking read;
    // leave without waiting for the runtime to drain it.
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Exec { target } => {
            let config = commands::console_config(
                config_path,
                target.monitor_addr.as_deref(),
                target.debug_port,
            )?;
            commands::exec_command(config, &target.sandbox_id).await?;
        }
        Commands::Resolve { target } => {
            let config = commands::console_config(
                config_path,
                target.monitor_addr.as_deref(),
                target.debug_port,
            )?;
            commands::resolve_command(config, &target.sandbox_id).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(config_path)?,
            ConfigAction::Path => commands::config_path(config_path),
            ConfigAction::Init { force } => commands::config_init(config_path, force)?,
        },
    }

    Ok(())
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ConsoleError>() {
        Some(ConsoleError::Usage(_)) => 2,
        _ => 1,
    }
}
