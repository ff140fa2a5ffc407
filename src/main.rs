//! xoccm - Xen Orchestra cloud controller manager
//!
//! Runs the node label sync controller against a Xen Orchestra instance.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use xoccm_common::events::KubeEventPublisher;
use xoccm_common::telemetry::{init_telemetry, TelemetryConfig};
use xoccm_common::CONTROLLER_NAME;
use xoccm_label_sync::{KubeNodeClient, LabelSyncConfig, LabelSyncController};
use xoccm_provider::{Instances, XoClient, XoConfig};

/// How long to wait for the initial node listing
const CACHE_SYNC_TIMEOUT: Duration = Duration::from_secs(120);

/// Xen Orchestra cloud controller manager
#[derive(Parser, Debug)]
#[command(name = "xoccm", version, about, long_about = None)]
struct Cli {
    /// Path to the Xen Orchestra cloud config file
    #[arg(long, env = "XOCCM_CLOUD_CONFIG")]
    cloud_config: PathBuf,

    /// Path to a kubeconfig file; in-cluster or default config when unset
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Seconds between node label sync passes
    #[arg(long, env = "XOCCM_NODE_SYNC_PERIOD", default_value_t = 300,
          value_parser = clap::value_parser!(u64).range(1..))]
    node_sync_period: u64,

    /// Nodes reconciled concurrently
    #[arg(long, env = "XOCCM_CONCURRENT_NODE_SYNCS", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..))]
    concurrent_node_syncs: u64,

    /// Emit logs as JSON
    #[arg(long, env = "XOCCM_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        json: cli.log_json,
    })?;

    let xo_config = XoConfig::from_file(&cli.cloud_config)?;
    let xo = XoClient::new(&xo_config)?;
    if let Err(e) = xo.check().await {
        warn!(error = %e, url = %xo_config.url, "Xen Orchestra connectivity check failed");
    }

    let client = kube_client(cli.kubeconfig.as_deref()).await?;
    let shutdown = CancellationToken::new();

    let nodes = KubeNodeClient::spawn(client.clone(), shutdown.clone());
    nodes
        .wait_until_ready(CACHE_SYNC_TIMEOUT)
        .await
        .context("failed to sync node cache")?;

    let controller = Arc::new(LabelSyncController::new(
        Arc::new(nodes),
        Instances::new(Arc::new(xo)),
        Arc::new(KubeEventPublisher::new(client, CONTROLLER_NAME)),
        LabelSyncConfig {
            period: Duration::from_secs(cli.node_sync_period),
            workers: cli.concurrent_node_syncs as usize,
        },
    ));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
        }
        signal_token.cancel();
    });

    controller.run(shutdown).await;
    Ok(())
}

async fn kube_client(kubeconfig: Option<&std::path::Path>) -> anyhow::Result<Client> {
    let Some(path) = kubeconfig else {
        return Client::try_default()
            .await
            .context("failed to create Kubernetes client");
    };

    let kubeconfig = Kubeconfig::read_from(path)
        .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .context("invalid kubeconfig")?;
    Client::try_from(config).context("failed to create Kubernetes client")
}
