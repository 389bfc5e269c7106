use super::*;

use std::{
    env, fs,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

/// Serializes tests that read the process environment through `load_settings`.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_guard() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn temp_config(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("genebridge_config_test_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("genebridge.toml");
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn defaults_point_at_local_service() {
    let settings = ClientSettings::default();
    assert_eq!(settings.analysis_base_url, "http://127.0.0.1:8000");
    assert_eq!(settings.preprocessing_delay(), Duration::from_millis(600));
    assert_eq!(settings.request_timeout(), None);
    assert!(settings.endpoints().is_ok());
}

#[test]
fn explicit_file_overrides_defaults() {
    let path = temp_config(
        r#"
analysis_base_url = "https://breast.example.org"
lung_base_url = "https://lung.example.org"
preprocessing_delay_ms = 50
request_timeout_secs = 30
"#,
    );

    let settings = {
        let _env = env_guard();
        load_settings(Some(&path)).expect("settings")
    };
    assert_eq!(settings.analysis_base_url, "https://breast.example.org");
    assert_eq!(
        settings.lung_base_url.as_deref(),
        Some("https://lung.example.org")
    );
    assert_eq!(settings.preprocessing_delay_ms, 50);
    assert_eq!(settings.request_timeout(), Some(Duration::from_secs(30)));

    let endpoints = settings.endpoints().expect("endpoints");
    assert_eq!(
        endpoints
            .for_kind(shared::domain::DatasetKind::Lung)
            .as_str(),
        "https://lung.example.org/lung/analyze"
    );

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn partial_file_keeps_remaining_defaults() {
    let path = temp_config("analysis_base_url = \"http://10.0.0.5:9000\"\n");

    let settings = {
        let _env = env_guard();
        load_settings(Some(&path)).expect("settings")
    };
    assert_eq!(settings.analysis_base_url, "http://10.0.0.5:9000");
    assert_eq!(settings.preprocessing_delay_ms, DEFAULT_PREPROCESSING_DELAY_MS);
    assert_eq!(settings.lung_base_url, None);

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let path = env::temp_dir().join("genebridge_definitely_missing_config.toml");
    let _env = env_guard();
    assert!(load_settings(Some(&path)).is_err());
}

#[test]
fn environment_overrides_file_values() {
    let path = temp_config(
        r#"
analysis_base_url = "http://file.example:8000"
request_timeout_secs = 30
preprocessing_delay_ms = 50
"#,
    );

    let settings = {
        let _env = env_guard();
        env::set_var("GENEBRIDGE__ANALYSIS_BASE_URL", "http://env.example:1");
        env::set_var("GENEBRIDGE__REQUEST_TIMEOUT_SECS", "7");
        let settings = load_settings(Some(&path));
        env::remove_var("GENEBRIDGE__ANALYSIS_BASE_URL");
        env::remove_var("GENEBRIDGE__REQUEST_TIMEOUT_SECS");
        settings.expect("settings")
    };

    assert_eq!(settings.analysis_base_url, "http://env.example:1");
    assert_eq!(settings.request_timeout(), Some(Duration::from_secs(7)));
    assert_eq!(settings.preprocessing_delay_ms, 50);
    assert_eq!(
        settings.endpoints().expect("endpoints").fairness().as_str(),
        "http://env.example:1/fairness"
    );

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}
