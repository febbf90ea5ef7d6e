//! ocmsync-plugin binary
//!
//! Diagnostics go to stderr; stdout carries only the protocol output.

use clap::{Parser, Subcommand};
use ocmsync_plugin::{default_plugin, run_put, PutArgs};
use std::io;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "ocmsync-plugin", version, about = "ocmsync upload plugin")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Blob upload operations
    Upload {
        #[command(subcommand)]
        command: UploadCommands,
    },
}

#[derive(Subcommand, Debug)]
enum UploadCommands {
    /// Upload stdin to a repository and print its access specification
    Put(PutArgs),
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let plugin = default_plugin();
    match cli.command {
        Commands::Upload {
            command: UploadCommands::Put(args),
        } => run_put(&plugin, &args, io::stdin().lock(), io::stdout().lock())?,
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
