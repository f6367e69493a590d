//! Decryption commands: request validation of a batch, relay oracle results

use std::path::PathBuf;

use clap::Args;
use veil_fhe::ClearValue;

use super::CallerArgs;
use crate::context::transact;
use crate::relayer::deliver_pending;

/// Ask the oracle to decrypt a closed batch
#[derive(Args)]
pub struct ValidateCommand {
    /// Closed batch id
    batch: u64,

    #[command(flatten)]
    caller: CallerArgs,
}

impl ValidateCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let (request_id, hash) = transact(config_path, data_dir, |d| {
            let caller = d.caller(self.caller.caller.as_deref())?;
            let request_id = d.registry.request_batch_validation(&caller, self.batch)?;
            let hash = d
                .registry
                .decryption_request(request_id)
                .map(|r| r.content_hash)
                .unwrap_or_default();
            Ok((request_id, hash))
        })?;
        println!("Validation of batch {} requested: {}", self.batch, request_id);
        println!("Content hash: 0x{}", hex::encode(hash));
        println!("Deliver the result with `veil relay`");
        Ok(())
    }
}

/// Fulfil pending decryptions and deliver the callbacks
#[derive(Args)]
pub struct RelayCommand {}

impl RelayCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let deliveries = transact(config_path, data_dir, |d| {
            Ok(deliver_pending(&d.coprocessor, &mut d.registry))
        })?;

        if deliveries.is_empty() {
            println!("No pending decryption requests");
        }
        for delivery in deliveries {
            match delivery.result {
                Ok(outcome) => {
                    println!(
                        "{} batch {}: [{}] digest 0x{}",
                        delivery.request_id,
                        outcome.batch_id,
                        format_values(&outcome.values),
                        hex::encode(outcome.result_digest)
                    );
                }
                Err(e) => println!("{} failed: {}", delivery.request_id, e),
            }
        }
        Ok(())
    }
}

fn format_values(values: &[ClearValue]) -> String {
    values
        .iter()
        .map(|v| match v.as_bool() {
            Some(b) => b.to_string(),
            None => v.value.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
