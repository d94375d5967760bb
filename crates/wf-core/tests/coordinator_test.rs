use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use wf_core::coordinator::{ActionState, Collaborators, FleetCoordinator};
use wf_core::credentials::{CacheState, CredentialCache};
use wf_core::selection::{TargetSet, Toggle};
use wf_core::types::{
    ActionOutcome, CredentialBundle, Deployment, InstanceStatus, RegionId, RemoteAction,
    SessionUser, VpnInstance,
};
use wf_core::{
    ActionKind, AuthProvider, Error, InstanceLister, RemoteActions, Result, SecretFetcher,
};

// ── Fakes ────────────────────────────────────────────────────────────

struct FakeAuth {
    signed_out: AtomicBool,
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn token(&self) -> Result<String> {
        if self.signed_out.load(Ordering::SeqCst) {
            return Err(Error::NotAuthenticated("signed out".into()));
        }
        Ok("id-token".into())
    }

    fn user(&self) -> Option<SessionUser> {
        if self.signed_out.load(Ordering::SeqCst) {
            return None;
        }
        Some(SessionUser {
            uid: "u1".into(),
            email: Some("u1@example.com".into()),
        })
    }

    async fn sign_out(&self) -> Result<()> {
        self.signed_out.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeFetcher {
    calls: AtomicUsize,
    bundle: CredentialBundle,
}

#[async_trait]
impl SecretFetcher for FakeFetcher {
    async fn fetch(&self, _keys: &[String], _token: &str) -> Result<CredentialBundle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bundle.clone())
    }
}

#[derive(Default)]
struct ScriptedActions {
    calls: Mutex<Vec<RemoteAction>>,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl ScriptedActions {
    fn calls(&self) -> Vec<RemoteAction> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteActions for ScriptedActions {
    async fn submit(&self, action: &RemoteAction, _token: &str) -> Result<ActionOutcome> {
        self.calls.lock().unwrap().push(action.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Remote("control plane returned 500".into()));
        }

        Ok(match action {
            RemoteAction::Deploy { region, .. } => ActionOutcome::Deployed(Deployment {
                region: region.clone(),
                is_new: true,
                public_ipv4: Ipv4Addr::new(1, 2, 3, 4),
                instance_id: Some("i-new".into()),
                client_private_key: "CKEY".into(),
                server_public_key: "SKEY".into(),
            }),
            RemoteAction::Terminate { targets } => ActionOutcome::Terminated {
                instances: targets
                    .values()
                    .flat_map(|regions| regions.values())
                    .flatten()
                    .cloned()
                    .collect(),
            },
            RemoteAction::BringRegionOnline { region } => {
                ActionOutcome::RegionOnline(region.clone())
            }
            RemoteAction::RetireRegion { region } => ActionOutcome::RegionRetired(region.clone()),
        })
    }
}

struct FakeLister {
    instances: Vec<VpnInstance>,
    lists: AtomicUsize,
}

#[async_trait]
impl InstanceLister for FakeLister {
    async fn list(&self, _user: &SessionUser) -> Result<Vec<VpnInstance>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.instances.clone())
    }
}

fn instance(id: &str, ip: [u8; 4]) -> VpnInstance {
    VpnInstance {
        owner: "u1".into(),
        email: Some("u1@example.com".into()),
        region: Some("us-east-1".into()),
        id: id.into(),
        public_ipv4: Ipv4Addr::from(ip),
        status: InstanceStatus::Running,
    }
}

struct Harness {
    coordinator: FleetCoordinator,
    fetcher: Arc<FakeFetcher>,
    actions: Arc<ScriptedActions>,
    lister: Arc<FakeLister>,
}

fn harness_with(actions: ScriptedActions, bundle: CredentialBundle) -> Harness {
    let fetcher = Arc::new(FakeFetcher {
        calls: AtomicUsize::new(0),
        bundle,
    });
    let actions = Arc::new(actions);
    let lister = Arc::new(FakeLister {
        instances: vec![instance("i-1", [10, 0, 0, 1]), instance("i-2", [10, 0, 0, 2])],
        lists: AtomicUsize::new(0),
    });

    let collaborators = Collaborators {
        auth: Arc::new(FakeAuth {
            signed_out: AtomicBool::new(false),
        }),
        actions: actions.clone(),
        lister: lister.clone(),
    };
    let coordinator = FleetCoordinator::new(
        collaborators,
        Arc::new(CredentialCache::new(fetcher.clone())),
        Arc::new(TargetSet::new()),
    );

    Harness {
        coordinator,
        fetcher,
        actions,
        lister,
    }
}

fn harness() -> Harness {
    harness_with(
        ScriptedActions::default(),
        [("client_private_key", "CKEY"), ("server_public_key", "SKEY")]
            .into_iter()
            .collect(),
    )
}

// ── Deploy ───────────────────────────────────────────────────────────

#[tokio::test]
async fn deploy_produces_config_for_new_endpoint() {
    let h = harness();

    let deployment = h.coordinator.deploy(&"us-west-1".into()).await.unwrap();
    assert!(deployment.is_new);
    assert_eq!(deployment.public_ipv4, Ipv4Addr::new(1, 2, 3, 4));

    let artifact = h.coordinator.current_artifact().unwrap();
    assert_eq!(artifact, deployment.artifact().unwrap());
    assert!(artifact.text().contains("PrivateKey = CKEY\n"));
    assert!(artifact.text().contains("PublicKey = SKEY\n"));
    assert!(artifact.text().contains("Endpoint = 1.2.3.4:51820\n"));

    assert_eq!(
        h.coordinator.action_state(ActionKind::Deploy),
        ActionState::Succeeded
    );
    assert_eq!(
        h.actions.calls(),
        vec![RemoteAction::Deploy {
            region: "us-west-1".into(),
            email: "u1@example.com".into(),
        }]
    );
    // Deploy key material comes from the response, not the secret cache.
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn deploy_to_unsupported_region_never_reaches_the_network() {
    let h = harness();

    let err = h.coordinator.deploy(&"af-south-1".into()).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedRegion(_)));

    let err = h.coordinator.deploy(&"mars-north-1".into()).await.unwrap_err();
    assert!(matches!(err, Error::UnknownRegion(_)));

    assert!(h.actions.calls().is_empty());
    assert_eq!(h.coordinator.action_state(ActionKind::Deploy), ActionState::Idle);
}

#[tokio::test]
async fn second_deploy_while_first_in_flight_is_busy() {
    let h = harness_with(
        ScriptedActions {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        },
        CredentialBundle::default(),
    );

    let region: RegionId = "us-west-1".into();
    let (first, second) = tokio::join!(h.coordinator.deploy(&region), async {
        tokio::task::yield_now().await;
        assert!(h.coordinator.action_state(ActionKind::Deploy).is_submitting());
        h.coordinator.deploy(&region).await
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(Error::Busy(ActionKind::Deploy))));
    assert_eq!(h.actions.calls().len(), 1);
    assert_eq!(
        h.coordinator.action_state(ActionKind::Deploy),
        ActionState::Succeeded
    );
}

// ── Terminate ────────────────────────────────────────────────────────

#[tokio::test]
async fn terminate_with_empty_selection_is_rejected_locally() {
    let h = harness();

    let err = h.coordinator.terminate().await.unwrap_err();
    assert!(matches!(err, Error::EmptySelection));
    assert!(err.is_precondition());
    assert!(h.actions.calls().is_empty());
    assert_eq!(
        h.coordinator.action_state(ActionKind::Terminate),
        ActionState::Idle
    );
}

#[tokio::test]
async fn successful_terminate_clears_selection_and_refreshes() {
    let h = harness();
    let listed = h.coordinator.refresh().await.unwrap();

    for inst in &listed {
        h.coordinator.toggle(Toggle::Add, inst);
    }
    assert_eq!(h.coordinator.targets().len(), 2);

    let terminated = h.coordinator.terminate().await.unwrap();
    let ids: Vec<_> = terminated.iter().map(|i| i.as_str()).collect();
    assert_eq!(ids, ["i-1", "i-2"]);

    assert!(h.coordinator.targets().is_empty());
    assert_eq!(h.lister.lists.load(Ordering::SeqCst), 2);
    assert_eq!(
        h.coordinator.action_state(ActionKind::Terminate),
        ActionState::Succeeded
    );
}

#[tokio::test]
async fn failed_terminate_keeps_selection_for_retry() {
    let h = harness();
    let listed = h.coordinator.refresh().await.unwrap();
    h.coordinator.toggle(Toggle::Add, &listed[0]);
    let before = h.coordinator.targets().snapshot();

    h.actions.fail.store(true, Ordering::SeqCst);
    let err = h.coordinator.terminate().await.unwrap_err();
    assert!(matches!(err, Error::Remote(_)));

    assert_eq!(h.coordinator.targets().snapshot(), before);
    assert!(matches!(
        h.coordinator.action_state(ActionKind::Terminate),
        ActionState::Failed(_)
    ));

    h.actions.fail.store(false, Ordering::SeqCst);
    h.coordinator.terminate().await.unwrap();
    assert!(h.coordinator.targets().is_empty());
}

// ── Config ───────────────────────────────────────────────────────────

#[tokio::test]
async fn show_config_reuses_cached_credentials() {
    let h = harness();
    h.coordinator.refresh().await.unwrap();

    let a = h.coordinator.show_config_for(&"i-1".into()).await.unwrap();
    let b = h.coordinator.show_config_for(&"i-2".into()).await.unwrap();

    assert!(a.text().contains("Endpoint = 10.0.0.1:51820\n"));
    assert!(b.text().contains("Endpoint = 10.0.0.2:51820\n"));
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.coordinator.current_artifact(), Some(b));
}

#[tokio::test]
async fn show_config_with_missing_key_is_reported() {
    let h = harness_with(
        ScriptedActions::default(),
        [("client_private_key", "CKEY")].into_iter().collect(),
    );
    let inst = instance("i-1", [10, 0, 0, 1]);

    let err = h.coordinator.show_config(&inst).await.unwrap_err();
    assert!(matches!(err, Error::MissingCredential(ref k) if k == "server_public_key"));
    assert!(h.coordinator.current_artifact().is_none());
}

#[tokio::test]
async fn show_config_for_unlisted_instance_fails() {
    let h = harness();
    let err = h
        .coordinator
        .show_config_for(&"i-404".into())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownInstance(_)));
}

// ── Regions ──────────────────────────────────────────────────────────

#[tokio::test]
async fn region_lifecycle_actions_use_independent_gates() {
    let h = harness();

    let online = h
        .coordinator
        .bring_region_online(&"eu-west-3".into())
        .await
        .unwrap();
    assert_eq!(online.as_str(), "eu-west-3");

    let retired = h.coordinator.retire_region(&"eu-west-3".into()).await.unwrap();
    assert_eq!(retired.as_str(), "eu-west-3");

    assert_eq!(
        h.coordinator.action_state(ActionKind::BringRegionOnline),
        ActionState::Succeeded
    );
    assert_eq!(
        h.coordinator.action_state(ActionKind::RetireRegion),
        ActionState::Succeeded
    );
    assert_eq!(h.coordinator.action_state(ActionKind::Deploy), ActionState::Idle);
}

// ── Session ──────────────────────────────────────────────────────────

#[tokio::test]
async fn logout_forgets_session_state() {
    let h = harness();
    let listed = h.coordinator.refresh().await.unwrap();
    h.coordinator.toggle(Toggle::Add, &listed[0]);
    h.coordinator.show_config(&listed[0]).await.unwrap();
    assert_eq!(h.coordinator.credentials().state(), CacheState::Populated);

    h.coordinator.logout().await.unwrap();

    assert_eq!(h.coordinator.credentials().state(), CacheState::Empty);
    assert!(h.coordinator.targets().is_empty());
    assert!(h.coordinator.instances().is_empty());
    assert!(h.coordinator.current_artifact().is_none());
    assert!(matches!(
        h.coordinator.refresh().await,
        Err(Error::NotAuthenticated(_))
    ));
}
