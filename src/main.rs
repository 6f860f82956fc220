// Smoke binary for one latent worker slot: substantiate a workload for a
// synthetic build, hold it until Ctrl-C, then decommission.
// Compile: cargo build --bin sutegi
// Run: SUTEGI_WORKER_NAME=builder-01 cargo run --bin sutegi

use std::sync::Arc;

use tracing::{info, warn};

use sutegi_application::workers::LatentWorkerController;
use sutegi_domain::shared_kernel::BuildId;
use sutegi_domain::workers::{LatentWorker, PropertyBuildContext};
use sutegi_infrastructure::cluster::KubeClusterClient;
use sutegi_shared::config::ConfigLoader;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let loader = ConfigLoader::default();
    let config = loader.load()?;

    // Fail fast on malformed cluster configuration before wiring anything
    KubeClusterClient::check_config(&config.cluster).await?;

    let cluster = Arc::new(KubeClusterClient::connect(&config.cluster).await?);
    let controller = LatentWorkerController::from_config(&config, cluster)?;

    info!(
        worker = %controller.identity(),
        namespace = %controller.namespace(),
        "Latent worker configured"
    );

    let build = PropertyBuildContext::new(BuildId::new());
    controller.substantiate(&build).await?;
    info!(worker = %controller.identity(), "Workload substantiated; Ctrl-C to decommission");

    tokio::signal::ctrl_c().await?;

    if let Err(e) = controller.stop_instance(false, true).await {
        warn!(error = %e, "Decommission reported a failure");
    }
    info!(worker = %controller.identity(), "Latent worker decommissioned");

    Ok(())
}
