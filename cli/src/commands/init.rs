//! Init Command - Deploy a new registry

use std::fs;
use std::path::PathBuf;

use clap::Args;
use tracing::info;
use veil_fhe::LocalCoprocessor;
use veil_registry::{AttestationRegistry, SystemClock};
use veil_storage::Storage;

use crate::config::VeilConfig;
use crate::context::{parse_principal, resolve_paths, Deployment};

/// Deploy a new registry
#[derive(Args)]
pub struct InitCommand {
    /// Network preset (local, testnet)
    #[arg(short, long, default_value = "local")]
    network: String,

    /// Initial owner (0x address or label)
    #[arg(long)]
    owner: Option<String>,

    /// Initial cooldown in seconds
    #[arg(long)]
    cooldown: Option<u64>,

    /// Force overwrite an existing deployment
    #[arg(short, long)]
    force: bool,
}

impl InitCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let (data_dir, config_path) = resolve_paths(config_path, data_dir);

        info!("Initializing VEIL registry for {} network", self.network);
        info!("Data directory: {}", data_dir.display());

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Registry already initialized at {}. Use --force to overwrite.",
                data_dir.display()
            );
        }

        let mut config = VeilConfig::for_network(&self.network);
        if let Some(owner) = &self.owner {
            config.registry.owner = parse_principal(owner)?.to_string();
        }
        if let Some(cooldown) = self.cooldown {
            config.registry.cooldown_seconds = cooldown;
        }
        config.validate()?;

        fs::create_dir_all(&data_dir)?;
        config.save(&config_path)?;
        info!("Configuration saved to {}", config_path.display());

        let db_path = data_dir.join(&config.storage.db_file);
        if db_path.exists() {
            fs::remove_file(&db_path)?;
        }
        let storage = Storage::open(&db_path)?;

        let coprocessor = LocalCoprocessor::new(&config.coprocessor_config())?;
        let registry =
            AttestationRegistry::new(config.registry_config()?, coprocessor.clone(), SystemClock)?;

        let mut deployment = Deployment {
            config,
            storage,
            registry,
            coprocessor,
        };
        deployment.commit()?;

        println!();
        println!("✅ VEIL registry deployed");
        println!();
        println!("Registry:       {}", deployment.registry.address());
        println!("Owner:          {}", deployment.registry.owner());
        println!("Cooldown:       {}s", deployment.registry.cooldown_seconds());
        println!(
            "KMS committee:  {} of {}",
            deployment.config.oracle.threshold, deployment.config.oracle.signer_count
        );
        println!("Configuration:  {}", config_path.display());
        println!("Database:       {}", db_path.display());
        println!();
        println!("Next steps:");
        println!("  veil provider add <address> --data-dir {}", data_dir.display());
        println!("  veil submit --value 42 --caller <provider> --data-dir {}", data_dir.display());

        Ok(())
    }
}
