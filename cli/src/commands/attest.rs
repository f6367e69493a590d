//! Provider commands: encrypt a value and submit its handle

use std::path::PathBuf;

use clap::Args;
use veil_fhe::{CiphertextHandle, FheType};

use super::CallerArgs;
use crate::context::transact;

/// Encrypt a value with the local coprocessor and print its handle
#[derive(Args)]
pub struct EncryptCommand {
    /// Plaintext value
    value: u64,

    /// FHE type (bool, u8, u16, u32, u64)
    #[arg(short = 't', long = "type", default_value = "u32")]
    fhe_type: FheType,
}

impl EncryptCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let handle = transact(config_path, data_dir, |d| {
            Ok(d.coprocessor.encrypt(self.value, self.fhe_type)?)
        })?;
        println!("{}", handle);
        Ok(())
    }
}

/// Submit an encrypted attestation into the active batch
#[derive(Args)]
pub struct SubmitCommand {
    /// Handle returned by `veil encrypt`
    #[arg(long, conflicts_with = "value", required_unless_present = "value")]
    handle: Option<CiphertextHandle>,

    /// Encrypt this value first, then submit it
    #[arg(long)]
    value: Option<u64>,

    /// FHE type used with --value
    #[arg(short = 't', long = "type", default_value = "u32")]
    fhe_type: FheType,

    #[command(flatten)]
    caller: CallerArgs,
}

impl SubmitCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let record = transact(config_path, data_dir, |d| {
            let caller = d.caller(self.caller.caller.as_deref())?;
            let handle = match (self.handle, self.value) {
                (Some(handle), _) => handle,
                (None, Some(value)) => d.coprocessor.encrypt(value, self.fhe_type)?,
                (None, None) => anyhow::bail!("Either --handle or --value is required"),
            };
            Ok(d.registry.submit(&caller, handle)?)
        })?;
        println!(
            "Submitted {} into batch {} as {}",
            record.handle, record.batch_id, record.provider
        );
        Ok(())
    }
}
