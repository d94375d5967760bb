use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use control_api::{ControlClient, Endpoints, Targets};
use tracing::info;

use crate::selection::Selection;
use crate::types::{ActionOutcome, CredentialBundle, Deployment, RegionId, RemoteAction};
use crate::{Error, RemoteActions, Result, SecretFetcher};

/// Control-plane functions reached over HTTPS.
///
/// Delegates to `control_api::ControlClient` for all HTTP calls.
pub struct ControlPlane {
    client: ControlClient,
}

impl ControlPlane {
    pub fn new(client: ControlClient) -> Self {
        Self { client }
    }

    /// Create from env vars: `WGFLEET_SECURE_GET_URL`, `WGFLEET_DEPLOY_URL`,
    /// `WGFLEET_TERRAFORM_URL` (required) and `WGFLEET_WAITER_URL` (optional).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let required =
            |name: &str| std::env::var(name).map_err(|_| Error::MissingEnv(name.to_string()));

        let endpoints = Endpoints {
            secure_get: required("WGFLEET_SECURE_GET_URL")?,
            vpn: required("WGFLEET_DEPLOY_URL")?,
            terraform: required("WGFLEET_TERRAFORM_URL")?,
            waiter: std::env::var("WGFLEET_WAITER_URL").ok(),
        };

        Ok(Self::new(ControlClient::new(endpoints)))
    }

    fn wire_targets(targets: &Selection) -> Targets {
        targets
            .iter()
            .map(|(owner, regions)| {
                let regions: BTreeMap<String, Vec<String>> = regions
                    .iter()
                    .map(|(region, ids)| {
                        (
                            region.to_string(),
                            ids.iter().map(ToString::to_string).collect(),
                        )
                    })
                    .collect();
                (owner.to_string(), regions)
            })
            .collect()
    }

    fn deployment(region: &RegionId, resp: control_api::DeployResponse) -> Result<Deployment> {
        let public_ipv4: Ipv4Addr = resp.public_ipv4.trim().parse().map_err(|_| {
            Error::Remote(format!(
                "deploy returned an invalid public_ipv4: {:?}",
                resp.public_ipv4
            ))
        })?;

        Ok(Deployment {
            region: region.clone(),
            is_new: resp.is_new,
            public_ipv4,
            instance_id: resp.instance_id.map(Into::into),
            client_private_key: resp.client_private_key,
            server_public_key: resp.server_public_key,
        })
    }

    /// Terraform answers 200 with the region echoed back on success; a
    /// missing or empty echo means the run did not complete.
    fn echoed_region(echo: Option<String>, requested: &RegionId, what: &str) -> Result<RegionId> {
        match echo {
            Some(r) if !r.trim().is_empty() => Ok(RegionId(r)),
            _ => Err(Error::Remote(format!("{what} of region {requested} failed"))),
        }
    }
}

#[async_trait]
impl SecretFetcher for ControlPlane {
    async fn fetch(&self, keys: &[String], token: &str) -> Result<CredentialBundle> {
        let values = self.client.secure_get(keys, token).await?;
        Ok(CredentialBundle::from_optional(values))
    }
}

#[async_trait]
impl RemoteActions for ControlPlane {
    async fn submit(&self, action: &RemoteAction, token: &str) -> Result<ActionOutcome> {
        match action {
            RemoteAction::Deploy { region, email } => {
                let resp = self.client.deploy(region.as_str(), email, token).await?;
                let deployment = Self::deployment(region, resp)?;
                info!(
                    region = %region,
                    ip = %deployment.public_ipv4,
                    is_new = deployment.is_new,
                    "control: endpoint ready"
                );
                Ok(ActionOutcome::Deployed(deployment))
            }
            RemoteAction::Terminate { targets } => {
                let resp = self
                    .client
                    .terminate(Self::wire_targets(targets), token)
                    .await?;
                info!(count = resp.terminated.len(), "control: instances terminated");
                Ok(ActionOutcome::Terminated {
                    instances: resp.terminated.into_iter().map(Into::into).collect(),
                })
            }
            RemoteAction::BringRegionOnline { region } => {
                let resp = self.client.terraform_region(region.as_str(), token).await?;
                let region = Self::echoed_region(resp.target_region, region, "terraform")?;
                info!(region = %region, "control: region online");
                Ok(ActionOutcome::RegionOnline(region))
            }
            RemoteAction::RetireRegion { region } => {
                let resp = self.client.clean_region(region.as_str(), token).await?;
                let region = Self::echoed_region(resp.region_cleaned, region, "cleaning")?;
                info!(region = %region, "control: region cleaned");
                Ok(ActionOutcome::RegionRetired(region))
            }
        }
    }
}
