//! Single-flight cache for the session's secret bundle.
//!
//! State machine: `Empty -> Fetching -> {Populated, Errored}`. While a fetch
//! is in flight every caller awaits the same shared future instead of
//! starting another one. Each fetch is tagged with the cache generation at
//! the time it started; `clear()` bumps the generation, so a fetch that
//! settles after a logout never writes into the next session's cache.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use crate::types::CredentialBundle;
use crate::{Error, Result, SecretFetcher};

/// Key name of the client's WireGuard private key.
pub const CLIENT_PRIVATE_KEY: &str = "client_private_key";
/// Key name of the server's WireGuard public key.
pub const SERVER_PUBLIC_KEY: &str = "server_public_key";

/// The two keys a client config needs.
pub const CONFIG_KEYS: [&str; 2] = [CLIENT_PRIVATE_KEY, SERVER_PUBLIC_KEY];

type FetchOutcome = std::result::Result<CredentialBundle, String>;
type PendingFetch = Shared<BoxFuture<'static, FetchOutcome>>;

enum Phase {
    Empty,
    Fetching(PendingFetch),
    Populated(CredentialBundle),
    Errored(String),
}

/// Observable cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fetching,
    Populated,
    Errored,
}

struct Inner {
    phase: Phase,
    generation: u64,
    fetches: u64,
}

pub struct CredentialCache {
    fetcher: Arc<dyn SecretFetcher>,
    inner: Mutex<Inner>,
}

impl CredentialCache {
    pub fn new(fetcher: Arc<dyn SecretFetcher>) -> Self {
        Self {
            fetcher,
            inner: Mutex::new(Inner {
                phase: Phase::Empty,
                generation: 0,
                fetches: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached bundle, fetching it first if needed.
    ///
    /// A non-empty cached bundle is returned without touching the network.
    /// Otherwise the caller joins the in-flight fetch, or starts one. A
    /// failed fetch is recorded and returned; it is not retried until the
    /// next call.
    pub async fn ensure(&self, keys: &[&str], token: &str) -> Result<CredentialBundle> {
        let (pending, generation) = {
            let mut inner = self.lock();
            match &inner.phase {
                Phase::Populated(bundle) if !bundle.is_empty() => {
                    debug!("credentials served from cache");
                    return Ok(bundle.clone());
                }
                Phase::Fetching(pending) => {
                    debug!("joining in-flight credential fetch");
                    (pending.clone(), inner.generation)
                }
                _ => {
                    let pending = self.start_fetch(keys, token);
                    inner.phase = Phase::Fetching(pending.clone());
                    inner.fetches += 1;
                    (pending, inner.generation)
                }
            }
        };

        let outcome = pending.clone().await;

        let mut inner = self.lock();
        if inner.generation != generation {
            warn!(
                started = generation,
                current = inner.generation,
                "discarding credential fetch from a cleared session"
            );
            return Err(Error::SessionChanged);
        }

        // First settler records the outcome; later joiners find it already stored.
        if matches!(&inner.phase, Phase::Fetching(current) if current.ptr_eq(&pending)) {
            inner.phase = match &outcome {
                Ok(bundle) => Phase::Populated(bundle.clone()),
                Err(e) => {
                    warn!(error = %e, "credential fetch failed");
                    Phase::Errored(e.clone())
                }
            };
        }

        outcome.map_err(Error::Credentials)
    }

    fn start_fetch(&self, keys: &[&str], token: &str) -> PendingFetch {
        let fetcher = Arc::clone(&self.fetcher);
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        let token = token.to_string();

        async move {
            fetcher
                .fetch(&keys, &token)
                .await
                .map_err(|e| e.to_string())
        }
        .boxed()
        .shared()
    }

    /// Drop the cached bundle, the last error and any in-flight marker.
    ///
    /// An in-flight fetch is not cancelled; its result is discarded when it
    /// settles.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.phase = Phase::Empty;
        inner.generation += 1;
        debug!(generation = inner.generation, "credential cache cleared");
    }

    pub fn state(&self) -> CacheState {
        match self.lock().phase {
            Phase::Empty => CacheState::Empty,
            Phase::Fetching(_) => CacheState::Fetching,
            Phase::Populated(_) => CacheState::Populated,
            Phase::Errored(_) => CacheState::Errored,
        }
    }

    pub fn cached(&self) -> Option<CredentialBundle> {
        match &self.lock().phase {
            Phase::Populated(bundle) => Some(bundle.clone()),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<String> {
        match &self.lock().phase {
            Phase::Errored(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// Number of fetches started since construction.
    pub fn fetch_count(&self) -> u64 {
        self.lock().fetches
    }
}
