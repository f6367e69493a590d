//! Status Command - Show registry status

use std::path::PathBuf;

use clap::Args;
use veil_registry::Clock;

use crate::context::Deployment;

/// Show registry status
#[derive(Args)]
pub struct StatusCommand {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

impl StatusCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let deployment = Deployment::open(config_path, data_dir)?;
        let registry = &deployment.registry;
        let stats = deployment.storage.stats();
        let owner = registry.owner();
        let cooldown = registry.cooldown_state(&owner);
        let pending = registry.pending_requests();
        let state_root = registry.state().state_root()?;

        if self.json {
            let status = serde_json::json!({
                "network": deployment.config.registry.network,
                "registry": registry.address().to_string(),
                "owner": owner.to_string(),
                "paused": registry.is_paused(),
                "cooldownSeconds": registry.cooldown_seconds(),
                "currentBatch": registry.current_batch_id(),
                "currentBatchSubmissions": registry.submissions(registry.current_batch_id()).len(),
                "providers": registry.providers().iter().map(|p| p.to_string()).collect::<Vec<_>>(),
                "pendingRequests": pending.iter().map(|r| r.request_id.0).collect::<Vec<_>>(),
                "oracleQueue": deployment.coprocessor.pending().len(),
                "stateRoot": format!("0x{}", hex::encode(state_root)),
                "events": stats.event_count,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }

        println!("Network:        {}", deployment.config.registry.network);
        println!("Registry:       {}", registry.address());
        println!("Owner:          {}", owner);
        println!("Paused:         {}", if registry.is_paused() { "yes" } else { "no" });
        println!("Cooldown:       {}s", registry.cooldown_seconds());
        println!(
            "Current batch:  {} ({} submission(s))",
            registry.current_batch_id(),
            registry.submissions(registry.current_batch_id()).len()
        );
        println!("Batches:        {}", registry.batches().len());
        println!("Providers:      {}", registry.providers().len());
        for provider in registry.providers() {
            println!("  - {}", provider);
        }
        println!("Pending decryptions: {}", pending.len());
        for request in &pending {
            println!(
                "  - {} batch {} ({} handle(s), requested at {})",
                request.request_id, request.batch_id, request.handle_count, request.requested_at
            );
        }
        println!("Oracle queue:   {}", deployment.coprocessor.pending().len());
        if let Some(last) = cooldown.last_decryption_request_time {
            let now = registry.clock().now();
            println!("Owner last validation: {}s ago", now.saturating_sub(last));
        }
        println!("State root:     0x{}", hex::encode(state_root));
        println!("Events stored:  {}", stats.event_count);
        println!("Database:       {}", stats.path.display());

        Ok(())
    }
}

/// Show the persisted event log
#[derive(Args)]
pub struct EventsCommand {
    /// First sequence number
    #[arg(long, default_value = "1")]
    from: u64,

    /// Maximum number of events
    #[arg(short, long, default_value = "50")]
    limit: usize,

    /// Show only the most recent events
    #[arg(long, conflicts_with = "from")]
    tail: Option<usize>,

    /// Print one JSON object per line
    #[arg(long)]
    json: bool,
}

impl EventsCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let deployment = Deployment::open(config_path, data_dir)?;
        let events = match self.tail {
            Some(n) => deployment.storage.events.latest(n)?,
            None => deployment.storage.events.range(self.from, self.limit)?,
        };

        for stored in &events {
            if self.json {
                println!("{}", serde_json::to_string(stored)?);
            } else {
                println!(
                    "#{:<6} t={} {:<22} {:?}",
                    stored.seq,
                    stored.timestamp,
                    stored.event.name(),
                    stored.event
                );
            }
        }
        if events.is_empty() && !self.json {
            println!("No events");
        }
        Ok(())
    }
}
