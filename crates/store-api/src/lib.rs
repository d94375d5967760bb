//! Typed Rust client for a document store REST facade.
//!
//! The facade sits in front of the backing database and flattens its
//! records to `{ "id", "fields": { name: json } }`; this crate does not speak
//! the database's native wire format. Only reads are exposed: fetch one
//! document (`GET {base}/documents/{path}`) and list a collection
//! (`GET {base}/collections/{path}`). Paths are slash-separated
//! (`Users/{uid}/Regions/{region}/Instances`).

mod types;

pub use types::*;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
}

impl Error {
    /// True when the store refused the read for this principal.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::Api { status, .. } if status.as_u16() == 403)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the document store REST API.
#[derive(Clone)]
pub struct StoreClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl StoreClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, kind: &str, path: &str) -> String {
        format!("{}/{kind}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api { endpoint, status, body });
        }
        Ok(resp)
    }

    // ── Documents ────────────────────────────────────────────────────

    /// Fetch one document. A missing document is `Ok(None)`.
    pub async fn get_document(&self, path: &str) -> Result<Option<Document>> {
        let resp = self
            .http
            .get(self.url("documents", path))
            .header("Authorization", self.auth())
            .send()
            .await?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }

        Self::check(resp, "get document")
            .await?
            .json()
            .await
            .map(Some)
            .map_err(Error::from)
    }

    /// List every document directly under a collection path.
    pub async fn list_collection(&self, path: &str) -> Result<Vec<Document>> {
        let resp = self
            .http
            .get(self.url("collections", path))
            .header("Authorization", self.auth())
            .send()
            .await?;

        let list: ListDocumentsResponse = Self::check(resp, "list collection").await?.json().await?;
        Ok(list.documents)
    }
}
