//! GCE implementation of the instance client
//!
//! Talks to the Compute Engine v1 REST API with credentials and project
//! identity obtained from the instance metadata server, which is how the
//! controller runs on GKE. A `GCE_PROJECT` override skips the metadata
//! lookup for out-of-cluster use.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::clients::{InstanceClient, InstanceRef};
use crate::error::{Error, Result};

const METADATA_BASE: &str = "http://metadata.google.internal/computeMetadata/v1";
const COMPUTE_BASE: &str = "https://compute.googleapis.com/compute/v1";

/// Token minted by the metadata server for the instance service account
#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Subset of the Compute API instance resource we care about
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComputeInstance {
    #[serde(default)]
    status: Option<String>,
}

/// Instance client backed by the Compute Engine REST API
pub struct GceInstanceClient {
    http: reqwest::Client,
    project: String,
}

impl GceInstanceClient {
    /// Build a client, resolving the project from the metadata server when
    /// no override is configured
    pub async fn new(project: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let project = match project {
            Some(p) => p,
            None => fetch_project(&http).await?,
        };
        info!("Using GCE project {}", project);

        Ok(Self { http, project })
    }

    async fn access_token(&self) -> Result<String> {
        let url = format!("{}/instance/service-accounts/default/token", METADATA_BASE);
        let token: MetadataToken = self
            .http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(token.access_token)
    }
}

/// Ask the metadata server which project this instance belongs to
async fn fetch_project(http: &reqwest::Client) -> Result<String> {
    let url = format!("{}/project/project-id", METADATA_BASE);
    let project = http
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    if project.is_empty() {
        return Err(Error::ConfigError(
            "Metadata server returned an empty project id".to_string(),
        ));
    }
    Ok(project)
}

fn instance_url(project: &str, zone: &str, name: &str) -> String {
    format!(
        "{}/projects/{}/zones/{}/instances/{}",
        COMPUTE_BASE, project, zone, name
    )
}

#[async_trait]
impl InstanceClient for GceInstanceClient {
    async fn find_instance(&self, name: &str, zone: &str) -> Result<InstanceRef> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .get(instance_url(&self.project, zone, name))
            .bearer_auth(&token)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::InstanceNotFound {
                name: name.to_string(),
                zone: zone.to_string(),
            });
        }

        let instance: ComputeInstance = resp.error_for_status()?.json().await?;
        debug!(
            "Instance {} in zone {} is {}",
            name,
            zone,
            instance.status.as_deref().unwrap_or("UNKNOWN")
        );

        Ok(InstanceRef {
            name: name.to_string(),
            zone: zone.to_string(),
        })
    }

    async fn destroy_instance(&self, instance: &InstanceRef) -> Result<()> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .delete(instance_url(&self.project, &instance.zone, &instance.name))
            .bearer_auth(&token)
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => {
                warn!(
                    "Instance {} in zone {} was already gone",
                    instance.name, instance.zone
                );
                Ok(())
            }
            status if status.is_success() => {
                info!(
                    "Deletion of instance {} in zone {} accepted",
                    instance.name, instance.zone
                );
                Ok(())
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(Error::InstanceTerminationFailed {
                    name: instance.name.clone(),
                    zone: instance.zone.clone(),
                    reason: format!("compute API returned {}: {}", status, body),
                })
            }
        }
    }
}
