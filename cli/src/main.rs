//! VEIL Registry CLI
//!
//! Command-line interface for operating a VEIL attestation registry backed
//! by a local FHE coprocessor.
//!
//! # Usage
//!
//! ```bash
//! # Deploy a local registry
//! veil init --network local
//!
//! # Register a provider and submit an attestation as that provider
//! veil provider add provider-1
//! veil submit --value 42 --caller provider-1
//!
//! # Close the batch, request its validation and deliver the oracle result
//! veil close-batch
//! veil validate 1
//! veil relay
//!
//! # Inspect
//! veil status
//! veil events --tail 10
//!
//! # In-memory end-to-end run with a background relayer
//! veil simulate --providers 3 --batches 2
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod context;
mod logging;
mod relayer;

use commands::{
    CloseBatchCommand, CooldownCommand, EncryptCommand, EventsCommand, InitCommand, PauseCommand,
    ProviderCommand, RelayCommand, SimulateCommand, StatusCommand, SubmitCommand, UnpauseCommand,
    ValidateCommand,
};

/// VEIL Attestation Registry
#[derive(Parser)]
#[command(name = "veil")]
#[command(author = "VEIL Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Encrypted attestation registry with oracle-mediated batch validation", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(short, long, global = true, env = "VEIL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the
    /// deployment's `[logging]` section
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a new registry
    Init(InitCommand),

    /// Manage the provider allow-list
    Provider(ProviderCommand),

    /// Pause submissions, validation requests and batch/cooldown changes
    Pause(PauseCommand),

    /// Unpause the registry
    Unpause(UnpauseCommand),

    /// Change the cooldown interval
    Cooldown(CooldownCommand),

    /// Close the active batch
    CloseBatch(CloseBatchCommand),

    /// Encrypt a value and print its handle
    Encrypt(EncryptCommand),

    /// Submit an encrypted attestation
    Submit(SubmitCommand),

    /// Request decryption of a closed batch
    Validate(ValidateCommand),

    /// Fulfil pending decryptions and deliver callbacks
    Relay(RelayCommand),

    /// Show registry status
    Status(StatusCommand),

    /// Show the event log
    Events(EventsCommand),

    /// Run an in-memory end-to-end simulation
    Simulate(SimulateCommand),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; flags override the deployment's config file
    let (_, config_path) = context::resolve_paths(cli.config.clone(), cli.data_dir.clone());
    let file_settings = config::VeilConfig::load(&config_path).ok().map(|c| c.logging);
    let (level, json) =
        logging::resolve(cli.log_level.as_deref(), cli.json_logs, file_settings.as_ref());
    logging::init(&level, json)?;

    // Execute command
    match cli.command {
        Commands::Init(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Provider(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Pause(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Unpause(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Cooldown(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::CloseBatch(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Encrypt(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Submit(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Validate(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Relay(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Status(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Events(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Simulate(cmd) => cmd.execute().await,
        Commands::Version => {
            println!("veil {}", env!("CARGO_PKG_VERSION"));
            println!("Protocol: VEIL attestation registry v1");
            println!("Handle version: {}", veil_fhe::HANDLE_VERSION);
            Ok(())
        }
    }
}
