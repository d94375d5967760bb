//! Instance listing backed by the document store.
//!
//! Layout: `Users/{uid}` carries `role` and `email`; instances live under
//! `Users/{uid}/Regions/{region}/Instances/{id}` with `ipv4` and `status`;
//! `Live-Regions/{region}` carries a display `name`.
//!
//! Admins see every owner's instances. Per-owner fetches run concurrently
//! and a failing owner contributes nothing rather than failing the listing.

use std::future::Future;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use futures_util::future::join_all;
use store_api::{Document, StoreClient};
use tracing::{debug, warn};

use crate::regions::{self, Region};
use crate::types::{InstanceStatus, OwnerId, RegionId, Role, SessionUser, VpnInstance};
use crate::{Error, InstanceLister, Result};

const USERS: &str = "Users";
const LIVE_REGIONS: &str = "Live-Regions";

/// An owner whose instances should be listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub uid: OwnerId,
    pub email: Option<String>,
}

/// Run `fetch` for every owner concurrently and flatten the results.
/// Failures are logged and contribute no rows.
pub async fn collect_fail_soft<F, Fut>(owners: Vec<Owner>, fetch: F) -> Vec<VpnInstance>
where
    F: Fn(Owner) -> Fut,
    Fut: Future<Output = Result<Vec<VpnInstance>>>,
{
    let per_owner = owners.into_iter().map(|owner| {
        let uid = owner.uid.clone();
        let fut = fetch(owner);
        async move {
            match fut.await {
                Ok(instances) => instances,
                Err(e) => {
                    warn!(owner = %uid, error = %e, "skipping owner, instance fetch failed");
                    Vec::new()
                }
            }
        }
    });

    join_all(per_owner).await.into_iter().flatten().collect()
}

/// Owners whose instances `user` may list: everyone for an admin, else just
/// the user. A failed owner query degrades to an empty listing.
pub async fn visible_owners<F, Fut>(role: Role, user: &SessionUser, all_owners: F) -> Vec<Owner>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<Owner>>>,
{
    match role {
        Role::Admin => match all_owners().await {
            Ok(owners) => owners,
            Err(e) => {
                warn!(uid = %user.uid, error = %e, "owner query failed, listing nothing");
                Vec::new()
            }
        },
        Role::Member => vec![Owner {
            uid: user.uid.clone(),
            email: user.email.clone(),
        }],
    }
}

/// Turn one instance document into a listed instance. Rows without an
/// address or status, with a bad address, or already terminated are dropped.
pub fn parse_instance(owner: &Owner, region: &RegionId, doc: &Document) -> Option<VpnInstance> {
    let (Some(ipv4), Some(status)) = (doc.str_field("ipv4"), doc.str_field("status")) else {
        return None;
    };

    let status = InstanceStatus::parse(status);
    if status == InstanceStatus::Terminated {
        return None;
    }

    let public_ipv4: Ipv4Addr = match ipv4.parse() {
        Ok(ip) => ip,
        Err(_) => {
            warn!(owner = %owner.uid, instance = %doc.id, ipv4, "dropping instance with invalid address");
            return None;
        }
    };

    Some(VpnInstance {
        owner: owner.uid.clone(),
        email: owner.email.clone(),
        region: Some(region.clone()),
        id: doc.id.as_str().into(),
        public_ipv4,
        status,
    })
}

/// Lists instances from the document store on behalf of the session token.
pub struct StoreInstanceLister {
    client: StoreClient,
}

impl StoreInstanceLister {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Create from `WGFLEET_STORE_URL` (required) and the session token.
    pub fn from_env(token: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let base_url = std::env::var("WGFLEET_STORE_URL")
            .map_err(|_| Error::MissingEnv("WGFLEET_STORE_URL".into()))?;

        Ok(Self::new(StoreClient::new(base_url, token)))
    }

    async fn role(&self, uid: &OwnerId) -> Role {
        match self.client.get_document(&format!("{USERS}/{uid}")).await {
            Ok(Some(doc)) => Role::parse(doc.str_field("role")),
            Ok(None) => {
                warn!(owner = %uid, "user document missing, treating as member");
                Role::Member
            }
            Err(e) => {
                warn!(owner = %uid, error = %e, "role lookup failed, treating as member");
                Role::Member
            }
        }
    }

    async fn owner_instances(&self, owner: Owner) -> Result<Vec<VpnInstance>> {
        if owner.email.is_none() {
            warn!(owner = %owner.uid, "owner has no email, skipping");
            return Ok(Vec::new());
        }

        let region_docs = self
            .client
            .list_collection(&format!("{USERS}/{}/Regions", owner.uid))
            .await?;

        let mut instances = Vec::new();
        for region_doc in region_docs {
            let region = RegionId::from(region_doc.id.as_str());
            let docs = self
                .client
                .list_collection(&format!("{USERS}/{}/Regions/{region}/Instances", owner.uid))
                .await?;
            instances.extend(docs.iter().filter_map(|d| parse_instance(&owner, &region, d)));
        }
        debug!(owner = %owner.uid, count = instances.len(), "listed owner instances");
        Ok(instances)
    }

    async fn all_owners(&self) -> Result<Vec<Owner>> {
        let docs = self.client.list_collection(USERS).await?;
        Ok(docs
            .into_iter()
            .map(|d| Owner {
                email: d.str_field("email").map(str::to_string),
                uid: OwnerId(d.id),
            })
            .collect())
    }
}

#[async_trait]
impl InstanceLister for StoreInstanceLister {
    async fn list(&self, user: &SessionUser) -> Result<Vec<VpnInstance>> {
        let role = self.role(&user.uid).await;
        let owners = visible_owners(role, user, || self.all_owners()).await;

        Ok(collect_fail_soft(owners, |owner| self.owner_instances(owner)).await)
    }

    async fn live_regions(&self) -> Result<Option<Vec<Region>>> {
        let docs = match self.client.list_collection(LIVE_REGIONS).await {
            Ok(docs) => docs,
            Err(e) if e.is_permission_denied() => {
                warn!("live regions not readable for this user");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut live: Vec<Region> = docs
            .into_iter()
            .map(|d| {
                let name = d
                    .str_field("name")
                    .map(str::to_string)
                    .or_else(|| regions::region_name(&d.id).map(str::to_string))
                    .unwrap_or_else(|| d.id.clone());
                Region {
                    id: RegionId(d.id),
                    name,
                }
            })
            .collect();
        regions::sort_by_name(&mut live);
        Ok(Some(live))
    }
}
