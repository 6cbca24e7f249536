use std::sync::Arc;

use kube::Client;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use node_recycler::clients::gce::GceInstanceClient;
use node_recycler::clients::kubernetes::KubeClusterClient;
use node_recycler::config::Config;
use node_recycler::error::{Error, Result};
use node_recycler::recycler::{self, RecyclerState};
use node_recycler::rest_api;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        "Starting node-recycler: age threshold {:?}, poll interval {:?}, label {}",
        config.age_to_kill, config.sleep_time, config.eligibility_label
    );

    if std::env::var_os("KUBERNETES_SERVICE_HOST").is_some() {
        info!("Running inside a Kubernetes cluster");
    } else {
        info!("Running outside a Kubernetes cluster");
    }

    let mut kube_config = kube::Config::infer()
        .await
        .map_err(|e| Error::ConfigError(format!("Failed to infer Kubernetes config: {}", e)))?;
    kube_config.connect_timeout = Some(config.api_timeout);
    kube_config.read_timeout = Some(config.api_timeout);
    kube_config.write_timeout = Some(config.api_timeout);
    let client = Client::try_from(kube_config)?;

    let cluster = KubeClusterClient::new(client, config.eligibility_label.clone())
        .with_self(config.pod_name.clone(), config.pod_namespace.clone());
    let instances = GceInstanceClient::new(config.gce_project.clone(), config.api_timeout).await?;

    let state = Arc::new(RecyclerState {
        cluster: Arc::new(cluster),
        instances: Arc::new(instances),
        config,
    });

    let server = tokio::spawn(rest_api::run_server(state.clone()));

    tokio::select! {
        result = recycler::run_recycler(state) => {
            result?;
            info!("Recycler loop finished; shutting down");
        }
        result = server => {
            match result {
                Ok(Err(e)) => error!("HTTP server failed: {}", e),
                Err(e) => error!("HTTP server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}
