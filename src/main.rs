use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fingerprint_control::{
    CapabilityRegistry, ExtensionConfig, LogFormat,
    controller::{
        ClusterMembership, DefaultQuorumControllerExtension, FailoverControlManager, ReplayLoop,
        StandaloneController,
    },
    metadata::read_record_log,
    plugin::{ClusterControlHandle, ControllerHandle, InitOutcome},
};

/// Fingerprint extension host for the metadata controller
#[derive(Parser, Debug)]
#[command(name = "fingerprint-control")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a JSON-lines record log and report the resulting state
    Replay {
        /// Record log, one JSON record per line
        log: PathBuf,

        /// Number of records applied per batch
        #[arg(short = 'b', long = "batch-size", default_value_t = 100)]
        batch_size: usize,

        /// Print the snapshot records of the final image as JSON lines
        #[arg(long = "snapshot")]
        snapshot: bool,
    },

    /// Print the install id of the configured cluster
    InstallId,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Plain => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ExtensionConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ExtensionConfig::from_env().context("Failed to load config from environment")?,
    };

    init_tracing(config.log_format);
    info!(
        cluster_id = %config.cluster_id,
        node_id = config.node_id,
        extension_enabled = config.extension_enabled,
        "Starting fingerprint control host"
    );

    let membership = Arc::new(ClusterMembership::new());
    let controller: ControllerHandle = Arc::new(StandaloneController::new(&config.cluster_id));
    let cluster_control: ClusterControlHandle = membership.clone();

    let registry = CapabilityRegistry::from_config(&config);
    let (manager, outcome) = registry.get_and_initialize(&controller, &cluster_control);
    if let InitOutcome::Failed(reason) = &outcome {
        tracing::warn!(%reason, "Continuing with an uninitialized extension");
    }

    match cli.command {
        Commands::InstallId => {
            let Some(manager) = manager else {
                anyhow::bail!("No fingerprint control manager available");
            };
            println!("{}", manager.install_id());
        }
        Commands::Replay {
            log,
            batch_size,
            snapshot,
        } => {
            if batch_size == 0 {
                anyhow::bail!("Batch size must be at least 1");
            }
            let records = read_record_log(&log)
                .with_context(|| format!("Failed to read record log {}", log.display()))?;

            let failover = Arc::new(FailoverControlManager::new());
            let extension = Arc::new(DefaultQuorumControllerExtension::new(
                failover.clone(),
                manager.clone(),
            ));
            let mut replay = ReplayLoop::new(extension, manager.clone(), membership.clone());

            for batch in records.chunks(batch_size) {
                replay.apply_batch(batch);
            }
            registry.start();

            let image = replay.image();
            println!("records:         {}", records.len());
            println!("last offset:     {}", image.highest_offset());
            println!("fingerprint:     {}", image.fingerprint());
            println!("registered:      {}", membership.len());
            println!("failed nodes:    {:?}", failover.failed_nodes());
            if let Some(manager) = &manager {
                println!("install id:      {}", manager.install_id());
                println!("license valid:   {}", manager.check_license());
            }

            if snapshot {
                for record in replay.snapshot_records() {
                    println!("{}", serde_json::to_string(&record)?);
                }
            }
        }
    }

    Ok(())
}
