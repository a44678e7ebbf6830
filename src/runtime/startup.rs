//! Startup wiring: settings, gateway lifecycle, stores and the engine.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::App;
use crate::config::{self, Settings};
use crate::gateway::{BlobRegistry, DiskStore, Gateway, GatewayRules, HttpBackend, MemoryCache};
use crate::importer::Importer;
use crate::library::{
    default_store_path, local_track, JsonFileStore, LibraryStore, MemoryStore,
};
use crate::mpris::MprisHandle;
use crate::player::{
    AdapterEvent, DetachedPlayer, EmbeddedAdapter, EmbeddedSignal, Player, RodioAdapter,
};
use crate::playlist::Track;

/// Everything the event loop drives.
pub struct Runtime {
    pub settings: Settings,
    pub app: App,
    pub player: Player,
    pub importer: Importer,
    pub gateway: Arc<Gateway>,
    pub store: Box<dyn LibraryStore>,
    pub library_tracks: Vec<Track>,
    pub events: Receiver<AdapterEvent>,
    /// Held so a future embedded backend can be plugged in; the detached
    /// backend never sends on it.
    #[allow(dead_code)]
    pub embedded_signals: Sender<EmbeddedSignal>,
}

pub fn load_settings() -> Settings {
    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            warn!("could not load configuration, using defaults: {e}");
            Settings::default()
        }
    };
    if let Err(e) = settings.validate() {
        warn!("configuration invalid, using defaults: {e}");
        return Settings::default();
    }
    settings
}

fn build_gateway(settings: &Settings, blobs: Arc<BlobRegistry>) -> (Arc<Gateway>, Option<String>) {
    let rules = GatewayRules {
        app_origin: settings.cache.app_origin.clone(),
        shell_paths: settings.cache.shell_paths.clone(),
        api_host: settings.api.host.clone(),
    };
    let backend = Arc::new(HttpBackend::new(blobs));

    let cache_dir = settings
        .cache
        .directory
        .clone()
        .or_else(config::default_cache_dir);
    let store: Arc<dyn crate::gateway::CacheStore> = match cache_dir {
        Some(dir) => match DiskStore::open(dir.join("gateway")) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("cache directory unavailable, caching in memory: {e}");
                Arc::new(MemoryCache::new())
            }
        },
        None => Arc::new(MemoryCache::new()),
    };

    let gateway = Arc::new(Gateway::new(
        rules,
        settings.cache.generation.clone(),
        store,
        backend,
    ));

    // Install failure leaves the gateway inactive; fetches then bypass
    // the cache entirely rather than serving a partial shell.
    let notice = match gateway.install() {
        Ok(()) => match gateway.activate() {
            Ok(()) => None,
            Err(e) => {
                warn!("gateway activation failed: {e}");
                Some(format!("Cache disabled: {e}"))
            }
        },
        Err(e) => {
            warn!("gateway install failed, caching disabled: {e}");
            Some(format!("Cache disabled: {e}"))
        }
    };
    (gateway, notice)
}

fn open_library() -> Box<dyn LibraryStore> {
    let path = config::default_data_dir().map(|dir| default_store_path(&dir));
    match path {
        Some(path) => match JsonFileStore::open(&path) {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!(path = %path.display(), "library store unavailable, starting empty: {e}");
                Box::new(MemoryStore::new())
            }
        },
        None => Box::new(MemoryStore::new()),
    }
}

pub fn build(
    settings: Settings,
    mpris: MprisHandle,
) -> Result<Runtime, Box<dyn std::error::Error>> {
    let blobs = Arc::new(BlobRegistry::new());
    let (gateway, gateway_notice) = build_gateway(&settings, Arc::clone(&blobs));

    let (event_tx, event_rx) = mpsc::channel();
    let (signal_tx, signal_rx) = mpsc::channel();

    let local = RodioAdapter::new(Arc::clone(&gateway), blobs, event_tx.clone())?;
    let embedded = EmbeddedAdapter::new(Box::new(DetachedPlayer), signal_rx, event_tx);

    let player = Player::new(
        Box::new(local),
        Box::new(embedded),
        Box::new(mpris),
        settings.audio.volume,
    );

    let importer = Importer::new(Arc::clone(&gateway), settings.api.clone());

    let store = open_library();
    let library_tracks: Vec<Track> = store.get_all()?.iter().map(local_track).collect();
    info!(tracks = library_tracks.len(), "library loaded");

    let mut app = App::new();
    if let Some(notice) = gateway_notice {
        app.set_message(notice);
    }

    Ok(Runtime {
        settings,
        app,
        player,
        importer,
        gateway,
        store,
        library_tracks,
        events: event_rx,
        embedded_signals: signal_tx,
    })
}
