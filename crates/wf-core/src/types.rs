use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::ActionKind;
use crate::selection::Selection;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Owning user's identifier.
    OwnerId
);
string_id!(
    /// Cloud region identifier, e.g. `us-west-1`.
    RegionId
);
string_id!(
    /// Provider-side instance identifier, unique within a region.
    InstanceId
);

/// Lifecycle status reported for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Running,
    Paused,
    Terminated,
    Unknown,
}

impl InstanceStatus {
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "paused" | "stopped" => Self::Paused,
            "terminated" => Self::Terminated,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Terminated => "terminated",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provisioned endpoint as listed by the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpnInstance {
    pub owner: OwnerId,
    pub email: Option<String>,
    pub region: Option<RegionId>,
    pub id: InstanceId,
    pub public_ipv4: Ipv4Addr,
    pub status: InstanceStatus,
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub uid: OwnerId,
    pub email: Option<String>,
}

/// Role stored on the user document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn parse(role: Option<&str>) -> Self {
        match role {
            Some("admin") => Self::Admin,
            _ => Self::Member,
        }
    }
}

/// Secrets keyed by requested name. Values never appear in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialBundle {
    secrets: BTreeMap<String, String>,
}

impl CredentialBundle {
    /// Build from a fetch response, dropping keys the server did not know.
    pub fn from_optional(values: BTreeMap<String, Option<String>>) -> Self {
        Self {
            secrets: values
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.secrets.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CredentialBundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            secrets: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.secrets.keys()).finish()
    }
}

/// Result of a deploy-or-find submission: the endpoint plus the key
/// material minted for it.
#[derive(Clone, PartialEq, Eq)]
pub struct Deployment {
    pub region: RegionId,
    pub is_new: bool,
    pub public_ipv4: Ipv4Addr,
    pub instance_id: Option<InstanceId>,
    pub client_private_key: String,
    pub server_public_key: String,
}

impl fmt::Debug for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deployment")
            .field("region", &self.region)
            .field("is_new", &self.is_new)
            .field("public_ipv4", &self.public_ipv4)
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}

/// A remote action and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAction {
    Deploy { region: RegionId, email: String },
    Terminate { targets: Selection },
    BringRegionOnline { region: RegionId },
    RetireRegion { region: RegionId },
}

impl RemoteAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Deploy { .. } => ActionKind::Deploy,
            Self::Terminate { .. } => ActionKind::Terminate,
            Self::BringRegionOnline { .. } => ActionKind::BringRegionOnline,
            Self::RetireRegion { .. } => ActionKind::RetireRegion,
        }
    }
}

/// What the control plane reported back for a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Deployed(Deployment),
    Terminated { instances: Vec<InstanceId> },
    RegionOnline(RegionId),
    RegionRetired(RegionId),
}
