//! The gateway itself: lifecycle plus the per-class fetch strategies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    classify, CacheError, CacheStore, FetchBackend, FetchError, GatewayRules, Request,
    RequestClass, Response,
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("could not precache shell asset {url}: {source}")]
    InstallFailed {
        url: String,
        #[source]
        source: FetchError,
    },
}

/// The request-interception gateway.
///
/// Built inactive: until [`Gateway::activate`] runs, every fetch passes
/// straight through to the backend. [`Gateway::install`] precaches the
/// application shell into the current generation; an install failure
/// leaves the gateway inactive so callers keep their direct path.
pub struct Gateway {
    rules: GatewayRules,
    generation: String,
    store: Arc<dyn CacheStore>,
    backend: Arc<dyn FetchBackend>,
    active: AtomicBool,
    revalidations: Mutex<Vec<JoinHandle<()>>>,
}

impl Gateway {
    pub fn new(
        rules: GatewayRules,
        generation: impl Into<String>,
        store: Arc<dyn CacheStore>,
        backend: Arc<dyn FetchBackend>,
    ) -> Self {
        Self {
            rules,
            generation: generation.into(),
            store,
            backend,
            active: AtomicBool::new(false),
            revalidations: Mutex::new(Vec::new()),
        }
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Precache every shell asset into the current generation. All of
    /// them must succeed; a partial shell is worse than none.
    pub fn install(&self) -> Result<(), GatewayError> {
        for url in self.rules.shell_urls() {
            let request = Request::get(&url);
            let response = self
                .backend
                .fetch(&request)
                .map_err(|source| GatewayError::InstallFailed {
                    url: url.clone(),
                    source,
                })?;
            if !response.is_success() {
                return Err(GatewayError::InstallFailed {
                    url: url.clone(),
                    source: FetchError::Network {
                        url,
                        message: format!("status {}", response.status),
                    },
                });
            }
            self.store
                .put(&self.generation, &request.cache_key(), &response)?;
        }
        info!(generation = %self.generation, "gateway installed");
        Ok(())
    }

    /// Drop every generation other than the current one, then start
    /// intercepting fetches.
    pub fn activate(&self) -> Result<(), GatewayError> {
        for tag in self.store.generations()? {
            if tag != self.generation {
                self.store.delete_generation(&tag)?;
            }
        }
        self.active.store(true, Ordering::SeqCst);
        info!(generation = %self.generation, "gateway active");
        Ok(())
    }

    pub fn fetch(&self, request: &Request) -> Result<Response, GatewayError> {
        if !self.is_active() {
            return Ok(self.backend.fetch(request)?);
        }
        match classify(&self.rules, request) {
            RequestClass::AppShell => self.fetch_cache_first(request),
            RequestClass::Metadata => self.fetch_stale_while_revalidate(request),
            RequestClass::Blob => self.fetch_cache_then_network(request),
            RequestClass::GenericHttp => self.fetch_network_first(request),
            RequestClass::PassThrough => Ok(self.backend.fetch(request)?),
        }
    }

    /// Shell assets: the cache is authoritative, the network only fills
    /// misses.
    fn fetch_cache_first(&self, request: &Request) -> Result<Response, GatewayError> {
        let key = request.cache_key();
        if let Some(hit) = self.store.get(&self.generation, &key)? {
            debug!(url = %request.url, "shell cache hit");
            return Ok(hit);
        }
        let response = self.backend.fetch(request)?;
        if response.is_success() {
            self.store.put(&self.generation, &key, &response.tee())?;
        }
        Ok(response)
    }

    /// Metadata calls: answer from cache immediately and refresh the
    /// entry on a background thread, so the second listing of a
    /// collection is instant but never permanently stale.
    fn fetch_stale_while_revalidate(&self, request: &Request) -> Result<Response, GatewayError> {
        let key = request.cache_key();
        if let Some(hit) = self.store.get(&self.generation, &key)? {
            let store = Arc::clone(&self.store);
            let backend = Arc::clone(&self.backend);
            let generation = self.generation.clone();
            let request = request.clone();
            let handle = std::thread::spawn(move || {
                match backend.fetch(&request) {
                    Ok(fresh) if fresh.is_success() => {
                        if let Err(e) = store.put(&generation, &key, &fresh) {
                            warn!(url = %request.url, "revalidation write failed: {e}");
                        }
                    }
                    Ok(fresh) => {
                        debug!(url = %request.url, status = fresh.status, "revalidation not cached")
                    }
                    Err(e) => warn!(url = %request.url, "revalidation fetch failed: {e}"),
                }
            });
            self.revalidations.lock().unwrap().push(handle);
            return Ok(hit);
        }

        let response = self.backend.fetch(request)?;
        if response.is_success() {
            self.store.put(&self.generation, &key, &response.tee())?;
        }
        Ok(response)
    }

    /// Blob locators: cached bodies outlive the registry entry, but only
    /// transparent 200s are worth keeping.
    fn fetch_cache_then_network(&self, request: &Request) -> Result<Response, GatewayError> {
        let key = request.cache_key();
        if let Some(hit) = self.store.get(&self.generation, &key)? {
            return Ok(hit);
        }
        let response = self.backend.fetch(request)?;
        if response.status == 200 && !response.opaque {
            self.store.put(&self.generation, &key, &response.tee())?;
        }
        Ok(response)
    }

    /// Everything else: prefer the live answer, fall back to whatever
    /// was cached, and synthesize a 503 only when both are gone.
    fn fetch_network_first(&self, request: &Request) -> Result<Response, GatewayError> {
        let key = request.cache_key();
        match self.backend.fetch(request) {
            Ok(response) => {
                if response.is_success() {
                    self.store.put(&self.generation, &key, &response.tee())?;
                }
                Ok(response)
            }
            Err(e) => {
                warn!(url = %request.url, "network fetch failed, trying cache: {e}");
                if let Some(hit) = self.store.get(&self.generation, &key)? {
                    return Ok(hit);
                }
                Ok(Response::service_unavailable())
            }
        }
    }

    /// Wait for every in-flight background revalidation to finish. Used
    /// at shutdown and by tests that assert on revalidated entries.
    pub fn drain_revalidations(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.revalidations.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.drain_revalidations();
    }
}
