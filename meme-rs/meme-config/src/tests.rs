use super::*;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use toml::Value;

static TEST_MUTEX: Mutex<()> = Mutex::new(());
static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[test]
fn config_default_targets_public_service() {
    let config = Config::default();
    assert_eq!(config.service_url, DEFAULT_SERVICE_URL);
    assert!(config.clipboard);
}

#[test]
fn zero_timeout_disables_timeout() {
    let config = Config {
        timeout_secs: 0,
        ..Config::default()
    };
    assert_eq!(config.timeout(), None);
    assert_eq!(
        Config::default().timeout(),
        Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    );
}

#[test]
fn load_or_init_creates_file_with_defaults() {
    with_isolated_home(|home| {
        let outcome = load_or_init().expect("load default config");
        assert!(outcome.created);
        assert_eq!(outcome.config.service_url, DEFAULT_SERVICE_URL);

        let expected_dir = home.join(".meme").to_string_lossy().into_owned();
        assert_eq!(outcome.config.image_output_dir, expected_dir);

        let contents = fs::read_to_string(&outcome.path).expect("read config");
        let parsed: Value = contents.parse().expect("config is valid TOML");
        assert_eq!(
            parsed.get("service_url").and_then(Value::as_str),
            Some(DEFAULT_SERVICE_URL)
        );
        assert_eq!(parsed.get("clipboard").and_then(Value::as_bool), Some(true));
    });
}

#[test]
fn load_or_init_backfills_missing_image_output_dir() {
    with_isolated_home(|home| {
        let config_dir = home.join(".meme");
        fs::create_dir_all(&config_dir).expect("create config dir");
        let path = config_dir.join("config.toml");
        fs::write(
            &path,
            r#"
service_url = "http://meme.example"
clipboard = false
"#,
        )
        .expect("write legacy config");

        let outcome = load_or_init().expect("load legacy config");
        assert!(!outcome.created);
        assert_eq!(outcome.config.service_url, "http://meme.example");
        assert!(!outcome.config.clipboard);
        assert_eq!(outcome.config.timeout_secs, DEFAULT_TIMEOUT_SECS);

        let expected_dir = config_dir.to_string_lossy().into_owned();
        assert_eq!(outcome.config.image_output_dir, expected_dir);

        let contents = fs::read_to_string(&path).expect("read config");
        assert!(contents.contains(&format!("image_output_dir = \"{expected_dir}\"")));
    });
}

#[test]
fn environment_overrides_service_url_without_saving() {
    with_isolated_home(|_| {
        set_env(SERVICE_URL_ENV_VAR, OsStr::new("http://127.0.0.1:9"));

        let outcome = load_or_init().expect("load config");
        assert_eq!(outcome.config.service_url, "http://127.0.0.1:9");

        let contents = fs::read_to_string(&outcome.path).expect("read config");
        assert!(contents.contains(DEFAULT_SERVICE_URL));
        assert!(!contents.contains("127.0.0.1:9"));
    });
}

#[test]
fn malformed_file_is_reported() {
    with_isolated_home(|home| {
        let config_dir = home.join(".meme");
        fs::create_dir_all(&config_dir).expect("create config dir");
        fs::write(config_dir.join("config.toml"), "clipboard = [").expect("write broken config");

        let error = load_or_init().expect_err("broken config");
        assert!(matches!(error, ConfigError::Deserialize(_)));
    });
}

fn with_isolated_home<F>(func: F)
where
    F: FnOnce(&Path),
{
    let _guard = TEST_MUTEX.lock().unwrap();
    let temp_home = create_unique_home();
    let snapshot = EnvSnapshot::capture();
    set_home_env(&temp_home);
    remove_env(SERVICE_URL_ENV_VAR);

    func(&temp_home);

    snapshot.restore();
    let _ = fs::remove_dir_all(&temp_home);
}

fn create_unique_home() -> PathBuf {
    let id = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "meme-config-test-home-{}-{}",
        std::process::id(),
        id
    ));
    fs::create_dir_all(&path).expect("create unique test home");
    path
}

fn set_home_env(path: &Path) {
    set_env("HOME", path.as_os_str());
    set_env("USERPROFILE", path.as_os_str());
}

struct EnvSnapshot {
    home: Option<OsString>,
    userprofile: Option<OsString>,
    service_url: Option<OsString>,
}

impl EnvSnapshot {
    fn capture() -> Self {
        Self {
            home: std::env::var_os("HOME"),
            userprofile: std::env::var_os("USERPROFILE"),
            service_url: std::env::var_os(SERVICE_URL_ENV_VAR),
        }
    }

    fn restore(self) {
        restore_var("HOME", self.home);
        restore_var("USERPROFILE", self.userprofile);
        restore_var(SERVICE_URL_ENV_VAR, self.service_url);
    }
}

fn restore_var(key: &str, value: Option<OsString>) {
    match value {
        Some(value) => set_env(key, &value),
        None => remove_env(key),
    }
}

fn set_env(key: &str, value: &OsStr) {
    // SAFETY: tests serialize environment access through TEST_MUTEX and the
    // keys and values never contain interior null bytes.
    unsafe { std::env::set_var(key, value) };
}

fn remove_env(key: &str) {
    unsafe { std::env::remove_var(key) };
}
