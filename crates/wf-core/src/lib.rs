//! Client-side coordination layer for a fleet of short-lived WireGuard
//! endpoints.
//!
//! The pieces with real invariants live here: the single-flight
//! [`credentials::CredentialCache`], the cascading-cleanup
//! [`selection::TargetSet`], the deterministic [`wireguard`] config
//! synthesizer, and the [`coordinator::FleetCoordinator`] that drives remote
//! actions through them. Everything remote sits behind the collaborator
//! traits below so the coordinator can be exercised without a network.

pub mod control;
pub mod coordinator;
pub mod credentials;
pub mod listing;
pub mod regions;
pub mod selection;
pub mod types;
pub mod wireguard;

use std::fmt;

use async_trait::async_trait;
use types::{ActionOutcome, CredentialBundle, RemoteAction, SessionUser, VpnInstance};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("control plane error: {0}")]
    Control(#[from] control_api::Error),

    #[error("document store error: {0}")]
    Store(#[from] store_api::Error),

    #[error("remote action failed: {0}")]
    Remote(String),

    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("no instances selected")]
    EmptySelection,

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("credential fetch failed: {0}")]
    Credentials(String),

    #[error("session changed while credentials were being fetched")]
    SessionChanged,

    #[error("{0} already in progress")]
    Busy(ActionKind),

    #[error("unknown region: {0}")]
    UnknownRegion(String),

    #[error("region not available on the free tier: {0}")]
    UnsupportedRegion(String),

    #[error("unknown instance: {0}")]
    UnknownInstance(String),

    #[error("unexpected outcome for {0}")]
    UnexpectedOutcome(ActionKind),

    #[error("qr encoding failed: {0}")]
    Qr(String),

    #[error("missing env var: {0}")]
    MissingEnv(String),
}

impl Error {
    /// Failures detected locally, before any remote call was issued.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated(_)
                | Self::EmptySelection
                | Self::MissingCredential(_)
                | Self::UnknownRegion(_)
                | Self::UnsupportedRegion(_)
                | Self::UnknownInstance(_)
                | Self::Busy(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The side-effecting remote actions the coordinator can submit.
///
/// At most one submission per kind is in flight at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Deploy,
    Terminate,
    BringRegionOnline,
    RetireRegion,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Terminate => "terminate",
            Self::BringRegionOnline => "bring_region_online",
            Self::RetireRegion => "retire_region",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of the current session's identity and bearer token.
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// Bearer token for the current session.
    async fn token(&self) -> Result<String>;

    /// The signed-in user, if any.
    fn user(&self) -> Option<SessionUser>;

    /// Invalidate the session. Later `token()` calls fail.
    async fn sign_out(&self) -> Result<()>;
}

/// Fetches named secrets from behind an authenticated endpoint.
#[async_trait]
pub trait SecretFetcher: Send + Sync + 'static {
    async fn fetch(&self, keys: &[String], token: &str) -> Result<CredentialBundle>;
}

/// Control-plane endpoint for side-effecting fleet operations.
#[async_trait]
pub trait RemoteActions: Send + Sync + 'static {
    async fn submit(&self, action: &RemoteAction, token: &str) -> Result<ActionOutcome>;
}

/// Read side of the fleet: which instances exist and which regions are live.
#[async_trait]
pub trait InstanceLister: Send + Sync + 'static {
    /// Non-terminated instances visible to `user`.
    async fn list(&self, user: &SessionUser) -> Result<Vec<VpnInstance>>;

    /// Regions currently online, sorted by display name. `None` when the
    /// caller may not read them.
    async fn live_regions(&self) -> Result<Option<Vec<regions::Region>>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_error_names_the_action() {
        assert_eq!(
            Error::Busy(ActionKind::BringRegionOnline).to_string(),
            "bring_region_online already in progress"
        );
    }

    #[test]
    fn precondition_errors_are_classified() {
        assert!(Error::EmptySelection.is_precondition());
        assert!(Error::Busy(ActionKind::Deploy).is_precondition());
        assert!(!Error::Remote("boom".into()).is_precondition());
        assert!(!Error::Credentials("boom".into()).is_precondition());
    }
}
