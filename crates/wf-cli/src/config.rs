use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use wf_core::control::ControlPlane;
use wf_core::coordinator::{Collaborators, FleetCoordinator};
use wf_core::credentials::CredentialCache;
use wf_core::listing::StoreInstanceLister;
use wf_core::selection::TargetSet;
use wf_core::wireguard::CONFIG_FILE_NAME;

use crate::auth::TokenSession;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub id_token: String,
    pub config_file: PathBuf,
}

impl AppConfig {
    /// `WGFLEET_ID_TOKEN` is required. The control-plane and store URLs are
    /// read when connecting.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            id_token: env::var("WGFLEET_ID_TOKEN")
                .map_err(|_| Error::MissingEnv("WGFLEET_ID_TOKEN".into()))?,
            config_file: env::var("WGFLEET_CONFIG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_NAME)),
        })
    }

    /// Build a coordinator for this session.
    pub fn connect(&self) -> Result<FleetCoordinator> {
        let session = TokenSession::from_token(&self.id_token)?;
        tracing::debug!(
            uid = %session.uid(),
            expires_at = %session.expires_at(),
            "session established"
        );

        let control = Arc::new(ControlPlane::from_env()?);
        let lister = StoreInstanceLister::from_env(&self.id_token)?;

        let collaborators = Collaborators {
            auth: Arc::new(session),
            actions: control.clone(),
            lister: Arc::new(lister),
        };
        Ok(FleetCoordinator::new(
            collaborators,
            Arc::new(CredentialCache::new(control)),
            Arc::new(TargetSet::new()),
        ))
    }
}
