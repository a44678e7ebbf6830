use super::load::{default_cache_dir, default_config_path, default_data_dir, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_vivace_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("VIVACE_CONFIG_PATH", "/tmp/vivace-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/vivace-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("vivace")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("vivace")
            .join("config.toml")
    );
}

#[test]
fn data_and_cache_dirs_follow_xdg() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_DATA_HOME");
    let _g2 = EnvGuard::remove("XDG_CACHE_HOME");
    let _g3 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        default_data_dir().unwrap(),
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".local/share")
            .join("vivace")
    );
    assert_eq!(
        default_cache_dir().unwrap(),
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".cache")
            .join("vivace")
    );
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[api]
key = "secret"
host = "metadata.example.com"

[cache]
generation = "v7"
app_origin = "https://app.example.com"
shell_paths = ["/", "/app.js"]

[audio]
volume = 55

[controls]
scrub_seconds = 9

[ui]
header_text = "hello"
show_visualizer = false

[library]
extensions = ["mp3"]
recursive = false
include_hidden = true
follow_links = false
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("VIVACE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("VIVACE__AUDIO__VOLUME");

    let s = Settings::load().unwrap();
    assert_eq!(s.api.key.as_deref(), Some("secret"));
    assert_eq!(s.api.host, "metadata.example.com");
    assert_eq!(s.cache.generation, "v7");
    assert_eq!(s.cache.shell_paths, vec!["/", "/app.js"]);
    assert_eq!(s.audio.volume, 55);
    assert_eq!(s.controls.scrub_seconds, 9);
    assert_eq!(s.ui.header_text, "hello");
    assert!(!s.ui.show_visualizer);
    assert_eq!(s.library.extensions, vec!["mp3".to_string()]);
    assert!(!s.library.recursive);
    assert!(s.library.include_hidden);
    assert!(!s.library.follow_links);
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
volume = 80
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("VIVACE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("VIVACE__AUDIO__VOLUME", "30");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.volume, 30);
}

#[test]
fn validate_catches_bad_values() {
    let mut s = Settings::default();
    assert!(s.validate().is_ok());

    s.audio.volume = 130;
    assert!(s.validate().is_err());
    s.audio.volume = 80;

    s.api.host = " ".to_string();
    assert!(s.validate().is_err());
    s.api.host = "www.googleapis.com".to_string();

    s.library.extensions.clear();
    assert!(s.validate().is_err());
}
