//! Owner administration commands

use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::CallerArgs;
use crate::context::{parse_principal, transact, Deployment};

/// Manage the provider allow-list
#[derive(Args)]
pub struct ProviderCommand {
    #[command(subcommand)]
    action: ProviderAction,
}

#[derive(Subcommand)]
enum ProviderAction {
    /// Register a provider
    Add {
        /// Provider (0x address or label)
        provider: String,

        #[command(flatten)]
        caller: CallerArgs,
    },

    /// Deregister a provider
    Remove {
        /// Provider (0x address or label)
        provider: String,

        #[command(flatten)]
        caller: CallerArgs,
    },

    /// List registered providers
    List,
}

impl ProviderCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        match self.action {
            ProviderAction::Add { provider, caller } => {
                let provider = parse_principal(&provider)?;
                transact(config_path, data_dir, |d| {
                    let caller = d.caller(caller.caller.as_deref())?;
                    d.registry.add_provider(&caller, provider)?;
                    Ok(())
                })?;
                println!("Provider {} registered", provider);
            }
            ProviderAction::Remove { provider, caller } => {
                let provider = parse_principal(&provider)?;
                transact(config_path, data_dir, |d| {
                    let caller = d.caller(caller.caller.as_deref())?;
                    d.registry.remove_provider(&caller, &provider)?;
                    Ok(())
                })?;
                println!("Provider {} removed", provider);
            }
            ProviderAction::List => {
                let deployment = Deployment::open(config_path, data_dir)?;
                let providers = deployment.registry.providers();
                if providers.is_empty() {
                    println!("No providers registered");
                }
                for provider in providers {
                    println!("{}", provider);
                }
            }
        }
        Ok(())
    }
}

/// Halt submissions, validation requests and batch/cooldown changes
#[derive(Args)]
pub struct PauseCommand {
    #[command(flatten)]
    caller: CallerArgs,
}

impl PauseCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        transact(config_path, data_dir, |d| {
            let caller = d.caller(self.caller.caller.as_deref())?;
            d.registry.pause(&caller)?;
            Ok(())
        })?;
        println!("Registry paused");
        Ok(())
    }
}

/// Resume normal operation
#[derive(Args)]
pub struct UnpauseCommand {
    #[command(flatten)]
    caller: CallerArgs,
}

impl UnpauseCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        transact(config_path, data_dir, |d| {
            let caller = d.caller(self.caller.caller.as_deref())?;
            d.registry.unpause(&caller)?;
            Ok(())
        })?;
        println!("Registry unpaused");
        Ok(())
    }
}

/// Change the cooldown interval
#[derive(Args)]
pub struct CooldownCommand {
    /// New interval in seconds (> 0)
    seconds: u64,

    #[command(flatten)]
    caller: CallerArgs,
}

impl CooldownCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let old = transact(config_path, data_dir, |d| {
            let caller = d.caller(self.caller.caller.as_deref())?;
            let old = d.registry.cooldown_seconds();
            d.registry.set_cooldown_seconds(&caller, self.seconds)?;
            Ok(old)
        })?;
        println!("Cooldown changed: {}s -> {}s", old, self.seconds);
        Ok(())
    }
}

/// Close the active batch and open the next one
#[derive(Args)]
pub struct CloseBatchCommand {
    #[command(flatten)]
    caller: CallerArgs,
}

impl CloseBatchCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let (transition, submissions) = transact(config_path, data_dir, |d| {
            let caller = d.caller(self.caller.caller.as_deref())?;
            let transition = d.registry.close_current_batch(&caller)?;
            Ok((transition, d.registry.submissions(transition.closed.id).len()))
        })?;
        println!(
            "Batch {} closed with {} submission(s); batch {} is now active",
            transition.closed.id, submissions, transition.opened.id
        );
        Ok(())
    }
}
