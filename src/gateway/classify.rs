//! Request classification: which caching strategy a request gets.

use super::{Method, Request};

/// The strategy bucket a request falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestClass {
    /// Application shell asset: serve from cache, fill the cache on a miss.
    AppShell,
    /// Metadata API call: serve stale from cache, revalidate in the
    /// background.
    Metadata,
    /// In-memory blob locator: cache-then-network against the registry.
    Blob,
    /// Any other http(s) GET: network first, cache fallback.
    GenericHttp,
    /// Everything else goes straight to the backend untouched.
    PassThrough,
}

/// Routing rules the gateway is constructed with.
#[derive(Clone, Debug)]
pub struct GatewayRules {
    /// Origin the shell assets are served from, e.g. `https://app.example.com`.
    pub app_origin: String,
    /// Paths under `app_origin` that make up the application shell.
    pub shell_paths: Vec<String>,
    /// Host of the metadata API.
    pub api_host: String,
}

impl GatewayRules {
    pub fn shell_urls(&self) -> Vec<String> {
        self.shell_paths
            .iter()
            .map(|p| format!("{}{}", self.app_origin.trim_end_matches('/'), p))
            .collect()
    }
}

pub fn classify(rules: &GatewayRules, request: &Request) -> RequestClass {
    // Only GETs are cacheable.
    if request.method != Method::Get {
        return RequestClass::PassThrough;
    }

    match request.scheme().as_deref() {
        Some("blob") => RequestClass::Blob,
        Some("http") | Some("https") => {
            // Shell assets take precedence even when they live on the
            // metadata host.
            if rules.shell_urls().iter().any(|u| u == &request.url) {
                RequestClass::AppShell
            } else if request.host() == Some(rules.api_host.as_str()) {
                RequestClass::Metadata
            } else {
                RequestClass::GenericHttp
            }
        }
        _ => RequestClass::PassThrough,
    }
}
