use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Owner id -> region id -> instance ids, exactly as the terminate endpoint expects it.
pub type Targets = BTreeMap<String, BTreeMap<String, Vec<String>>>;

// ── Secure get ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SecureGetRequest {
    pub requested_keys: Vec<String>,
}

/// Requested key name -> secret. Unknown keys come back as `null`.
pub type SecureGetResponse = BTreeMap<String, Option<String>>;

// ── VPN deploy / terminate ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VpnRequest {
    Deploy { region: String, email: String },
    Terminate { targets: Targets },
}

#[derive(Clone, Deserialize)]
pub struct DeployResponse {
    #[serde(rename = "isNew", default)]
    pub is_new: bool,
    pub public_ipv4: String,
    pub client_private_key: String,
    pub server_public_key: String,
    #[serde(default)]
    pub instance_id: Option<String>,
}

impl std::fmt::Debug for DeployResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployResponse")
            .field("is_new", &self.is_new)
            .field("public_ipv4", &self.public_ipv4)
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TerminateResponse {
    #[serde(default)]
    pub terminated: Vec<String>,
}

// ── Terraform ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct TerraformRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_to_clean: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiter_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TerraformResponse {
    #[serde(default)]
    pub target_region: Option<String>,
    #[serde(default)]
    pub region_cleaned: Option<String>,
}

/// Error body returned by every control-plane endpoint on failure.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
