//! Network backends and the in-memory blob registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::{Method, Request, Response};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("no blob registered for {0}")]
    UnknownBlob(String),
}

/// Where requests go once every cache layer has been consulted.
pub trait FetchBackend: Send + Sync {
    fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Registry mapping `blob:` locators to in-memory bodies.
///
/// Registering bytes yields an unguessable locator that resolves only
/// for as long as the entry is held; callers release locators explicitly
/// when the bytes are no longer playable.
#[derive(Default)]
pub struct BlobRegistry {
    entries: Mutex<HashMap<String, (Bytes, Option<String>)>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, body: impl Into<Bytes>, content_type: Option<&str>) -> String {
        let url = format!("blob:{}", Uuid::new_v4());
        let mut entries = self.entries.lock().unwrap();
        entries.insert(url.clone(), (body.into(), content_type.map(str::to_string)));
        debug!(%url, "registered blob");
        url
    }

    pub fn resolve(&self, url: &str) -> Option<(Bytes, Option<String>)> {
        let entries = self.entries.lock().unwrap();
        entries.get(url).cloned()
    }

    /// Drop the entry; the locator stops resolving immediately.
    pub fn revoke(&self, url: &str) {
        let mut entries = self.entries.lock().unwrap();
        if entries.remove(url).is_some() {
            debug!(%url, "revoked blob");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The shipped backend: blocking HTTP via `reqwest`, plus blob
/// resolution against a shared [`BlobRegistry`].
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    blobs: Arc<BlobRegistry>,
}

impl HttpBackend {
    pub fn new(blobs: Arc<BlobRegistry>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self { client, blobs }
    }
}

impl FetchBackend for HttpBackend {
    fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        match request.scheme().as_deref() {
            Some("blob") => {
                let (body, content_type) = self
                    .blobs
                    .resolve(&request.url)
                    .ok_or_else(|| FetchError::UnknownBlob(request.url.clone()))?;
                Ok(Response {
                    status: 200,
                    content_type,
                    body,
                    opaque: false,
                })
            }
            Some("http") | Some("https") => {
                let method = match request.method {
                    Method::Get => reqwest::Method::GET,
                    Method::Head => reqwest::Method::HEAD,
                    Method::Post => reqwest::Method::POST,
                };
                let resp = self
                    .client
                    .request(method, &request.url)
                    .send()
                    .map_err(|e| FetchError::Network {
                        url: request.url.clone(),
                        message: e.to_string(),
                    })?;
                let status = resp.status().as_u16();
                let content_type = resp
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let body = resp.bytes().map_err(|e| FetchError::Network {
                    url: request.url.clone(),
                    message: e.to_string(),
                })?;
                Ok(Response {
                    status,
                    content_type,
                    body,
                    opaque: false,
                })
            }
            Some(other) => Err(FetchError::UnsupportedScheme(other.to_string())),
            None => Err(FetchError::UnsupportedScheme(request.url.clone())),
        }
    }
}
