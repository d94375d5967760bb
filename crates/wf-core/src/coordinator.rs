//! Fleet coordinator: drives the user-visible workflows through the
//! credential cache, the target set and the remote collaborators.
//!
//! Each remote action kind moves through `Idle -> Submitting -> {Succeeded,
//! Failed}`. A second submission of a kind that is already `Submitting` is
//! refused with [`Error::Busy`] instead of issuing a duplicate remote call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, info, warn};

use crate::credentials::{CLIENT_PRIVATE_KEY, CONFIG_KEYS, CredentialCache, SERVER_PUBLIC_KEY};
use crate::regions::{self, Region};
use crate::selection::{TargetSet, Toggle};
use crate::types::{ActionOutcome, Deployment, InstanceId, RegionId, RemoteAction, VpnInstance};
use crate::wireguard::ConfigArtifact;
use crate::{ActionKind, AuthProvider, Error, InstanceLister, RemoteActions, Result};

/// Per-kind submission state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    Submitting,
    Succeeded,
    Failed(String),
}

impl ActionState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }
}

#[derive(Default)]
struct Gates {
    states: Mutex<HashMap<ActionKind, ActionState>>,
}

impl Gates {
    fn lock(&self) -> MutexGuard<'_, HashMap<ActionKind, ActionState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self, kind: ActionKind) -> ActionState {
        self.lock().get(&kind).cloned().unwrap_or(ActionState::Idle)
    }

    fn begin(&self, kind: ActionKind) -> Result<Submission<'_>> {
        let mut states = self.lock();
        if states.get(&kind).is_some_and(ActionState::is_submitting) {
            warn!(action = %kind, "submission refused, one already in flight");
            return Err(Error::Busy(kind));
        }
        states.insert(kind, ActionState::Submitting);
        Ok(Submission {
            gates: self,
            kind,
            settled: false,
        })
    }
}

/// Holds a kind in `Submitting` until settled. Dropping it unsettled (the
/// submitting future was cancelled) resolves the kind to `Failed`.
struct Submission<'a> {
    gates: &'a Gates,
    kind: ActionKind,
    settled: bool,
}

impl Submission<'_> {
    fn settle(mut self, state: ActionState) {
        self.gates.lock().insert(self.kind, state);
        self.settled = true;
    }
}

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.gates
                .lock()
                .insert(self.kind, ActionState::Failed("submission abandoned".into()));
        }
    }
}

/// External collaborators the coordinator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthProvider>,
    pub actions: Arc<dyn RemoteActions>,
    pub lister: Arc<dyn InstanceLister>,
}

pub struct FleetCoordinator {
    auth: Arc<dyn AuthProvider>,
    actions: Arc<dyn RemoteActions>,
    lister: Arc<dyn InstanceLister>,
    credentials: Arc<CredentialCache>,
    targets: Arc<TargetSet>,
    gates: Gates,
    instances: Mutex<Vec<VpnInstance>>,
    artifact: Mutex<Option<ConfigArtifact>>,
}

impl FleetCoordinator {
    pub fn new(
        collaborators: Collaborators,
        credentials: Arc<CredentialCache>,
        targets: Arc<TargetSet>,
    ) -> Self {
        Self {
            auth: collaborators.auth,
            actions: collaborators.actions,
            lister: collaborators.lister,
            credentials,
            targets,
            gates: Gates::default(),
            instances: Mutex::new(Vec::new()),
            artifact: Mutex::new(None),
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    pub fn targets(&self) -> &Arc<TargetSet> {
        &self.targets
    }

    pub fn action_state(&self, kind: ActionKind) -> ActionState {
        self.gates.state(kind)
    }

    // ── Listing ──────────────────────────────────────────────────────

    /// Reload the instance listing. The selection refers to the old rows,
    /// so it is cleared.
    pub async fn refresh(&self) -> Result<Vec<VpnInstance>> {
        let user = self
            .auth
            .user()
            .ok_or_else(|| Error::NotAuthenticated("no signed-in user".into()))?;

        let listed = self.lister.list(&user).await?;
        info!(count = listed.len(), "instance listing refreshed");

        *lock(&self.instances) = listed.clone();
        self.targets.clear();
        Ok(listed)
    }

    /// Instances from the last refresh.
    pub fn instances(&self) -> Vec<VpnInstance> {
        lock(&self.instances).clone()
    }

    pub fn find_instance(&self, id: &InstanceId) -> Option<VpnInstance> {
        lock(&self.instances).iter().find(|i| &i.id == id).cloned()
    }

    pub async fn live_regions(&self) -> Result<Option<Vec<Region>>> {
        self.lister.live_regions().await
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Build the client config for an already-listed instance using the
    /// session's cached credentials.
    pub async fn show_config(&self, instance: &VpnInstance) -> Result<ConfigArtifact> {
        let token = self.auth.token().await?;
        let bundle = self.credentials.ensure(&CONFIG_KEYS, &token).await?;

        let client_key = bundle
            .get(CLIENT_PRIVATE_KEY)
            .ok_or_else(|| Error::MissingCredential(CLIENT_PRIVATE_KEY.into()))?;
        let server_key = bundle
            .get(SERVER_PUBLIC_KEY)
            .ok_or_else(|| Error::MissingCredential(SERVER_PUBLIC_KEY.into()))?;

        let artifact = ConfigArtifact::generate(client_key, server_key, instance.public_ipv4)?;
        *lock(&self.artifact) = Some(artifact.clone());
        Ok(artifact)
    }

    /// [`Self::show_config`] for an instance id from the last refresh.
    pub async fn show_config_for(&self, id: &InstanceId) -> Result<ConfigArtifact> {
        let instance = self
            .find_instance(id)
            .ok_or_else(|| Error::UnknownInstance(id.to_string()))?;
        self.show_config(&instance).await
    }

    /// The most recently produced artifact.
    pub fn current_artifact(&self) -> Option<ConfigArtifact> {
        lock(&self.artifact).clone()
    }

    // ── Remote actions ───────────────────────────────────────────────

    /// Deploy a new endpoint in `region`, or return the caller's existing one.
    ///
    /// The response carries key material minted for that instance, so the
    /// credential cache is not consulted.
    pub async fn deploy(&self, region: &RegionId) -> Result<Deployment> {
        regions::require_deployable(region)?;

        let email = self
            .auth
            .user()
            .and_then(|u| u.email)
            .ok_or_else(|| Error::NotAuthenticated("signed-in user has no email".into()))?;

        let action = RemoteAction::Deploy {
            region: region.clone(),
            email,
        };
        let deployment = self
            .submit(action, |outcome| match outcome {
                ActionOutcome::Deployed(d) => Ok(d),
                _ => Err(Error::UnexpectedOutcome(ActionKind::Deploy)),
            })
            .await?;

        let artifact = deployment.artifact()?;
        *lock(&self.artifact) = Some(artifact);
        Ok(deployment)
    }

    /// Select or deselect a listed instance for the next batch terminate.
    pub fn toggle(&self, toggle: Toggle, instance: &VpnInstance) {
        self.targets.toggle_instance(toggle, instance);
    }

    /// Terminate every selected instance in one request.
    ///
    /// On success the selection is cleared and the listing refreshed; on
    /// failure the selection is left as it was so the caller can retry.
    pub async fn terminate(&self) -> Result<Vec<InstanceId>> {
        let targets = self.targets.snapshot();
        if targets.is_empty() {
            return Err(Error::EmptySelection);
        }

        let terminated = self
            .submit(RemoteAction::Terminate { targets }, |outcome| match outcome {
                ActionOutcome::Terminated { instances } => Ok(instances),
                _ => Err(Error::UnexpectedOutcome(ActionKind::Terminate)),
            })
            .await?;

        self.targets.clear();
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "listing refresh after terminate failed");
        }
        Ok(terminated)
    }

    /// Prepare a region so endpoints can be deployed there.
    pub async fn bring_region_online(&self, region: &RegionId) -> Result<RegionId> {
        regions::require_deployable(region)?;
        let action = RemoteAction::BringRegionOnline {
            region: region.clone(),
        };
        self.submit(action, |outcome| match outcome {
            ActionOutcome::RegionOnline(r) => Ok(r),
            _ => Err(Error::UnexpectedOutcome(ActionKind::BringRegionOnline)),
        })
        .await
    }

    /// Tear down a region's images and snapshots.
    pub async fn retire_region(&self, region: &RegionId) -> Result<RegionId> {
        regions::lookup(region.as_str()).ok_or_else(|| Error::UnknownRegion(region.to_string()))?;
        let action = RemoteAction::RetireRegion {
            region: region.clone(),
        };
        self.submit(action, |outcome| match outcome {
            ActionOutcome::RegionRetired(r) => Ok(r),
            _ => Err(Error::UnexpectedOutcome(ActionKind::RetireRegion)),
        })
        .await
    }

    /// One remote call under the kind's gate. No retry.
    async fn submit<T>(
        &self,
        action: RemoteAction,
        accept: impl FnOnce(ActionOutcome) -> Result<T>,
    ) -> Result<T> {
        let kind = action.kind();
        let submission = self.gates.begin(kind)?;

        let result = async {
            let token = self.auth.token().await?;
            let outcome = self.actions.submit(&action, &token).await?;
            accept(outcome)
        }
        .await;

        match &result {
            Ok(_) => {
                info!(action = %kind, "remote action succeeded");
                submission.settle(ActionState::Succeeded);
            }
            Err(e) => {
                error!(action = %kind, error = %e, "remote action failed");
                submission.settle(ActionState::Failed(e.to_string()));
            }
        }
        result
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Forget everything tied to the session, then sign out.
    pub async fn logout(&self) -> Result<()> {
        self.credentials.clear();
        self.targets.clear();
        lock(&self.instances).clear();
        *lock(&self.artifact) = None;
        self.auth.sign_out().await
    }
}

impl Deployment {
    /// Client config for this deployment's own key material.
    pub fn artifact(&self) -> Result<ConfigArtifact> {
        if !crate::wireguard::is_well_formed_key(&self.client_private_key)
            || !crate::wireguard::is_well_formed_key(&self.server_public_key)
        {
            warn!(region = %self.region, "deployment returned malformed WireGuard keys");
        }
        ConfigArtifact::generate(
            &self.client_private_key,
            &self.server_public_key,
            self.public_ipv4,
        )
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
