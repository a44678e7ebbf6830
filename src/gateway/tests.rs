use super::*;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tempfile::tempdir;

/// Scripted backend: each URL gets a queue of canned outcomes, and every
/// call is recorded so tests can assert on how often the network was hit.
#[derive(Default)]
struct FakeBackend {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    calls: Mutex<Vec<String>>,
}

enum Outcome {
    Reply(Response),
    Offline,
}

impl FakeBackend {
    fn new() -> Self {
        Self::default()
    }

    fn reply(&self, url: &str, response: Response) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(Outcome::Reply(response));
    }

    fn offline(&self, url: &str) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(Outcome::Offline);
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

impl FetchBackend for FakeBackend {
    fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.calls.lock().unwrap().push(request.url.clone());
        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front);
        match outcome {
            Some(Outcome::Reply(r)) => Ok(r),
            Some(Outcome::Offline) | None => Err(FetchError::Network {
                url: request.url.clone(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

fn rules() -> GatewayRules {
    GatewayRules {
        app_origin: "https://app.example.com".to_string(),
        shell_paths: vec!["/".to_string(), "/app.js".to_string()],
        api_host: "api.example.com".to_string(),
    }
}

fn body(s: &str) -> Response {
    Response::ok(s.as_bytes().to_vec(), Some("text/plain"))
}

fn active_gateway(backend: Arc<FakeBackend>) -> Gateway {
    backend.reply("https://app.example.com/", body("shell"));
    backend.reply("https://app.example.com/app.js", body("js"));
    let gw = Gateway::new(rules(), "v1", Arc::new(MemoryCache::new()), backend);
    gw.install().unwrap();
    gw.activate().unwrap();
    gw
}

#[test]
fn request_helpers_pick_apart_urls() {
    let r = Request::get("https://api.example.com:8443/v1/items?page=2#top");
    assert_eq!(r.scheme().as_deref(), Some("https"));
    assert_eq!(r.host(), Some("api.example.com"));
    assert_eq!(r.path(), "/v1/items");

    let r = Request::get("blob:0c7c9c2e-9f4a-4a7e-b9cf-000000000000");
    assert_eq!(r.scheme().as_deref(), Some("blob"));
    assert_eq!(r.host(), None);
}

#[test]
fn cache_key_separates_methods_on_the_same_url() {
    let get = Request::get("https://x.example.com/a");
    let head = Request {
        method: Method::Head,
        url: get.url.clone(),
    };
    assert_ne!(get.cache_key(), head.cache_key());
    assert_eq!(get.cache_key(), Request::get("https://x.example.com/a").cache_key());
}

#[test]
fn classification_covers_every_bucket() {
    let rules = rules();
    let class = |url: &str| classify(&rules, &Request::get(url));

    assert_eq!(class("https://app.example.com/app.js"), RequestClass::AppShell);
    assert_eq!(class("https://api.example.com/v3/items"), RequestClass::Metadata);
    assert_eq!(class("blob:abc"), RequestClass::Blob);
    assert_eq!(class("https://cdn.example.com/x.mp3"), RequestClass::GenericHttp);
    assert_eq!(class("file:///etc/hosts"), RequestClass::PassThrough);

    let post = Request {
        method: Method::Post,
        url: "https://api.example.com/v3/items".to_string(),
    };
    assert_eq!(classify(&rules, &post), RequestClass::PassThrough);
}

#[test]
fn shell_assets_win_over_the_metadata_host() {
    // The shell can be served from the same host as the metadata API;
    // its assets still get the cache-first treatment.
    let rules = GatewayRules {
        app_origin: "https://api.example.com".to_string(),
        shell_paths: vec!["/index.html".to_string()],
        api_host: "api.example.com".to_string(),
    };

    let shell = Request::get("https://api.example.com/index.html");
    assert_eq!(classify(&rules, &shell), RequestClass::AppShell);

    let api = Request::get("https://api.example.com/v3/items");
    assert_eq!(classify(&rules, &api), RequestClass::Metadata);
}

#[test]
fn disk_store_round_trips_and_deletes_generations() {
    let dir = tempdir().unwrap();
    let store = DiskStore::open(dir.path()).unwrap();

    let resp = Response::ok(Bytes::from_static(b"hello"), Some("audio/mpeg"));
    store.put("v1", "key1", &resp).unwrap();
    store.put("v2", "key1", &resp).unwrap();

    let hit = store.get("v1", "key1").unwrap().unwrap();
    assert_eq!(hit.status, 200);
    assert_eq!(hit.content_type.as_deref(), Some("audio/mpeg"));
    assert_eq!(&hit.body[..], b"hello");

    assert_eq!(store.generations().unwrap(), vec!["v1", "v2"]);
    store.delete_generation("v1").unwrap();
    assert_eq!(store.generations().unwrap(), vec!["v2"]);
    assert!(store.get("v1", "key1").unwrap().is_none());
}

#[test]
fn concurrent_puts_leave_a_consistent_entry() {
    let dir = tempdir().unwrap();
    let store = Arc::new(DiskStore::open(dir.path()).unwrap());

    let writer = |status: u16| {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            let resp = Response {
                status,
                content_type: Some("application/octet-stream".to_string()),
                body: Bytes::from(vec![status as u8; 4096]),
                opaque: false,
            };
            for _ in 0..50 {
                store.put("v1", "contended", &resp).unwrap();
            }
        })
    };
    let a = writer(200);
    let b = writer(201);
    a.join().unwrap();
    b.join().unwrap();

    // Whichever writer landed last, body and metadata belong together.
    let hit = store.get("v1", "contended").unwrap().unwrap();
    assert_eq!(&hit.body[..], &vec![hit.status as u8; 4096][..]);

    // No temp files survive the renames.
    for entry in std::fs::read_dir(dir.path().join("v1")).unwrap() {
        let name = entry.unwrap().file_name();
        let name = name.to_string_lossy();
        assert!(
            name.ends_with(".bin") || name.ends_with(".json"),
            "unexpected file {name}"
        );
    }
}

#[test]
fn install_failure_blocks_activation() {
    let backend = Arc::new(FakeBackend::new());
    backend.reply("https://app.example.com/", body("shell"));
    backend.offline("https://app.example.com/app.js");

    let gw = Gateway::new(
        rules(),
        "v1",
        Arc::new(MemoryCache::new()),
        Arc::clone(&backend) as Arc<dyn FetchBackend>,
    );
    assert!(matches!(
        gw.install(),
        Err(GatewayError::InstallFailed { .. })
    ));
    assert!(!gw.is_active());

    // Inactive gateways pass straight through.
    backend.reply("https://cdn.example.com/x", body("direct"));
    let resp = gw.fetch(&Request::get("https://cdn.example.com/x")).unwrap();
    assert_eq!(&resp.body[..], b"direct");
}

#[test]
fn activation_drops_older_generations() {
    let store = Arc::new(MemoryCache::new());
    store.put("v0", "stale", &body("old")).unwrap();

    let backend = Arc::new(FakeBackend::new());
    backend.reply("https://app.example.com/", body("shell"));
    backend.reply("https://app.example.com/app.js", body("js"));

    let gw = Gateway::new(
        rules(),
        "v1",
        Arc::clone(&store) as Arc<dyn CacheStore>,
        backend,
    );
    gw.install().unwrap();
    gw.activate().unwrap();

    assert_eq!(store.generations().unwrap(), vec!["v1"]);
    assert!(gw.is_active());
}

#[test]
fn shell_assets_are_served_from_cache_after_install() {
    let backend = Arc::new(FakeBackend::new());
    let gw = active_gateway(Arc::clone(&backend));

    let resp = gw.fetch(&Request::get("https://app.example.com/app.js")).unwrap();
    assert_eq!(&resp.body[..], b"js");

    // One call during install, none for the fetch itself.
    assert_eq!(backend.calls_to("https://app.example.com/app.js"), 1);
}

#[test]
fn metadata_is_served_stale_and_revalidated_in_the_background() {
    let backend = Arc::new(FakeBackend::new());
    let gw = active_gateway(Arc::clone(&backend));
    let url = "https://api.example.com/v3/items";

    // First call misses the cache and goes to the network.
    backend.reply(url, body("page-1"));
    let first = gw.fetch(&Request::get(url)).unwrap();
    assert_eq!(&first.body[..], b"page-1");

    // Second call returns the cached body even though the network now
    // has fresher content.
    backend.reply(url, body("page-2"));
    let second = gw.fetch(&Request::get(url)).unwrap();
    assert_eq!(&second.body[..], b"page-1");

    // After the background refresh lands the cache holds the new body.
    gw.drain_revalidations();
    let third = gw.fetch(&Request::get(url)).unwrap();
    assert_eq!(&third.body[..], b"page-2");
    gw.drain_revalidations();
}

#[test]
fn blob_responses_are_cached_only_when_transparent() {
    let backend = Arc::new(FakeBackend::new());
    let gw = active_gateway(Arc::clone(&backend));

    let opaque_url = "blob:opaque";
    let mut opaque = body("hidden");
    opaque.opaque = true;
    backend.reply(opaque_url, opaque);
    gw.fetch(&Request::get(opaque_url)).unwrap();

    // The opaque body was not cached, so a repeat fetch needs the backend
    // again and fails once the script runs dry.
    let err = gw.fetch(&Request::get(opaque_url)).unwrap_err();
    assert!(matches!(err, GatewayError::Fetch(_)));

    let clear_url = "blob:clear";
    backend.reply(clear_url, body("bytes"));
    gw.fetch(&Request::get(clear_url)).unwrap();
    let again = gw.fetch(&Request::get(clear_url)).unwrap();
    assert_eq!(&again.body[..], b"bytes");
    assert_eq!(backend.calls_to(clear_url), 1);
}

#[test]
fn generic_fetches_fall_back_to_cache_then_synthesize_503() {
    let backend = Arc::new(FakeBackend::new());
    let gw = active_gateway(Arc::clone(&backend));
    let url = "https://cdn.example.com/track.mp3";

    backend.reply(url, body("audio"));
    gw.fetch(&Request::get(url)).unwrap();

    // Network gone: the cached copy answers.
    backend.offline(url);
    let resp = gw.fetch(&Request::get(url)).unwrap();
    assert_eq!(&resp.body[..], b"audio");

    // Never-cached URL with no network synthesizes a 503.
    let resp = gw.fetch(&Request::get("https://cdn.example.com/missing")).unwrap();
    assert_eq!(resp.status, 503);
}

#[test]
fn blob_registry_locators_resolve_until_revoked() {
    let blobs = BlobRegistry::new();
    let url = blobs.register(Bytes::from_static(b"pcm"), Some("audio/mpeg"));
    assert!(url.starts_with("blob:"));

    let (bytes, content_type) = blobs.resolve(&url).unwrap();
    assert_eq!(&bytes[..], b"pcm");
    assert_eq!(content_type.as_deref(), Some("audio/mpeg"));

    blobs.revoke(&url);
    assert!(blobs.resolve(&url).is_none());
    assert!(blobs.is_empty());
}

#[test]
fn http_backend_serves_registered_blobs() {
    let blobs = Arc::new(BlobRegistry::new());
    let url = blobs.register(Bytes::from_static(b"pcm"), None);
    let backend = HttpBackend::new(Arc::clone(&blobs));

    let resp = backend.fetch(&Request::get(&url)).unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(&resp.body[..], b"pcm");

    blobs.revoke(&url);
    assert!(matches!(
        backend.fetch(&Request::get(&url)),
        Err(FetchError::UnknownBlob(_))
    ));

    assert!(matches!(
        backend.fetch(&Request::get("file:///tmp/x")),
        Err(FetchError::UnsupportedScheme(_))
    ));
}
