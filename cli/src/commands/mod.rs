//! CLI Commands

mod admin;
mod attest;
mod init;
mod simulate;
mod status;
mod validate;

pub use admin::{CloseBatchCommand, CooldownCommand, PauseCommand, ProviderCommand, UnpauseCommand};
pub use attest::{EncryptCommand, SubmitCommand};
pub use init::InitCommand;
pub use simulate::SimulateCommand;
pub use status::{EventsCommand, StatusCommand};
pub use validate::{RelayCommand, ValidateCommand};

use clap::Args;

/// Acting principal for a mutating command
#[derive(Args, Debug, Clone, Default)]
pub struct CallerArgs {
    /// 0x address or label; defaults to the configured owner
    #[arg(long)]
    pub caller: Option<String>,
}
