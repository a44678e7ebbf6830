//! Request and response values as the gateway sees them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Head,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
        }
    }
}

/// An outgoing request routed through the gateway.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub url: String,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
        }
    }

    /// The URL scheme, lowercased, without the trailing `:`.
    pub fn scheme(&self) -> Option<String> {
        self.url
            .split_once(':')
            .map(|(s, _)| s.to_ascii_lowercase())
    }

    /// Host portion of an http(s) URL.
    pub fn host(&self) -> Option<&str> {
        let rest = self
            .url
            .strip_prefix("https://")
            .or_else(|| self.url.strip_prefix("http://"))?;
        let end = rest
            .find(['/', '?', '#'])
            .unwrap_or(rest.len());
        let host = &rest[..end];
        // Strip an explicit port.
        Some(host.split(':').next().unwrap_or(host))
    }

    /// Path portion of an http(s) URL, `/` when absent.
    pub fn path(&self) -> &str {
        let rest = self
            .url
            .strip_prefix("https://")
            .or_else(|| self.url.strip_prefix("http://"));
        let Some(rest) = rest else { return "/" };
        let Some(slash) = rest.find('/') else {
            return "/";
        };
        let path = &rest[slash..];
        let end = path.find(['?', '#']).unwrap_or(path.len());
        &path[..end]
    }

    /// Stable cache key: method and full URL hashed together, so two
    /// verbs on the same URL never collide.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_str().as_bytes());
        hasher.update(self.url.as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// A response flowing back through the gateway.
///
/// Bodies are [`Bytes`], so a response handed to a caller and a copy
/// written into the cache share the same allocation.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    /// Cross-origin responses whose status and body the gateway is not
    /// allowed to inspect. Never cached.
    pub opaque: bool,
}

impl Response {
    pub fn ok(body: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self {
            status: 200,
            content_type: content_type.map(str::to_string),
            body: body.into(),
            opaque: false,
        }
    }

    /// Synthesized fallback when every strategy layer has failed.
    pub fn service_unavailable() -> Self {
        Self {
            status: 503,
            content_type: Some("text/plain".to_string()),
            body: Bytes::from_static(b"Service Unavailable"),
            opaque: false,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.opaque && (200..300).contains(&self.status)
    }

    /// A second copy of this response. One goes to the caller, one to
    /// the cache; the body allocation is shared.
    pub fn tee(&self) -> Response {
        self.clone()
    }
}
