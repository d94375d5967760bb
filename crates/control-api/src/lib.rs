//! Typed Rust client for the VPN control plane.
//!
//! The control plane is three independent HTTPS functions, each behind its
//! own URL: secure get (secret fetch), VPN (deploy / terminate) and
//! terraform (bring a region online / clean it up). Every call carries the
//! caller's bearer ID token.

mod types;

pub use types::*;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("control api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("control api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Function URLs for each control-plane endpoint.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub secure_get: String,
    pub vpn: String,
    pub terraform: String,
    /// Forwarded to terraform so the AMI waiter can notify on completion.
    pub waiter: Option<String>,
}

/// Client for the control-plane REST functions.
#[derive(Clone)]
pub struct ControlClient {
    endpoints: Endpoints,
    http: reqwest::Client,
}

impl ControlClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            http: reqwest::Client::new(),
        }
    }

    fn auth(token: &str) -> String {
        format!("Bearer {token}")
    }

    /// Map non-2xx responses to `Error::Api`, preferring the `error` field
    /// of the JSON body over the raw text.
    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let body = serde_json::from_str::<types::ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(Error::Api { endpoint, status, body });
        }
        Ok(resp)
    }

    async fn post<B, T>(&self, url: &str, token: &str, body: &B, endpoint: &'static str) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .http
            .post(url)
            .header("Authorization", Self::auth(token))
            .json(body)
            .send()
            .await?;

        Self::check(resp, endpoint)
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    // ── Secure get ───────────────────────────────────────────────────

    pub async fn secure_get(&self, requested_keys: &[String], token: &str) -> Result<SecureGetResponse> {
        let req = SecureGetRequest {
            requested_keys: requested_keys.to_vec(),
        };
        self.post(&self.endpoints.secure_get, token, &req, "secure get")
            .await
    }

    // ── VPN ──────────────────────────────────────────────────────────

    pub async fn deploy(&self, region: &str, email: &str, token: &str) -> Result<DeployResponse> {
        let req = VpnRequest::Deploy {
            region: region.to_string(),
            email: email.to_string(),
        };
        self.post(&self.endpoints.vpn, token, &req, "deploy").await
    }

    pub async fn terminate(&self, targets: Targets, token: &str) -> Result<TerminateResponse> {
        let req = VpnRequest::Terminate { targets };
        self.post(&self.endpoints.vpn, token, &req, "terminate").await
    }

    // ── Terraform ────────────────────────────────────────────────────

    pub async fn terraform_region(&self, region: &str, token: &str) -> Result<TerraformResponse> {
        let req = TerraformRequest {
            target_region: Some(region.to_string()),
            waiter_url: self.endpoints.waiter.clone(),
            ..Default::default()
        };
        self.post(&self.endpoints.terraform, token, &req, "terraform region")
            .await
    }

    pub async fn clean_region(&self, region: &str, token: &str) -> Result<TerraformResponse> {
        let req = TerraformRequest {
            region_to_clean: Some(region.to_string()),
            waiter_url: self.endpoints.waiter.clone(),
            ..Default::default()
        };
        self.post(&self.endpoints.terraform, token, &req, "clean region")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn deploy_request_is_tagged_by_action() {
        let req = VpnRequest::Deploy {
            region: "us-west-1".into(),
            email: "a@b.c".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "action": "deploy", "region": "us-west-1", "email": "a@b.c" })
        );
    }

    #[test]
    fn terminate_request_nests_targets() {
        let mut targets: Targets = BTreeMap::new();
        targets
            .entry("u1".into())
            .or_default()
            .insert("us-east-1".into(), vec!["i-1".into(), "i-2".into()]);

        let json = serde_json::to_value(VpnRequest::Terminate { targets }).unwrap();
        assert_eq!(json["action"], "terminate");
        assert_eq!(json["targets"]["u1"]["us-east-1"][1], "i-2");
    }

    #[test]
    fn terraform_request_omits_unset_fields() {
        let req = TerraformRequest {
            region_to_clean: Some("eu-west-3".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"region_to_clean":"eu-west-3"}"#);
    }

    #[test]
    fn deploy_response_reads_camel_case_flag() {
        let resp: DeployResponse = serde_json::from_str(
            r#"{"isNew":true,"public_ipv4":"1.2.3.4","client_private_key":"CKEY","server_public_key":"SKEY"}"#,
        )
        .unwrap();
        assert!(resp.is_new);
        assert_eq!(resp.public_ipv4, "1.2.3.4");
        assert!(resp.instance_id.is_none());
        assert!(!format!("{resp:?}").contains("CKEY"));
    }

    #[test]
    fn secure_get_response_keeps_nulls() {
        let resp: SecureGetResponse =
            serde_json::from_str(r#"{"client_private_key":"k","bogus":null}"#).unwrap();
        assert_eq!(resp["client_private_key"].as_deref(), Some("k"));
        assert_eq!(resp["bogus"], None);
    }
}
