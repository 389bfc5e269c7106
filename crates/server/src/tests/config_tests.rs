use super::{settings_from, Settings};

use std::collections::HashMap;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_without_file_or_env() {
    assert_eq!(settings_from(None, env_of(&[])), Settings::default());
    assert_eq!(Settings::default().bind_addr, "127.0.0.1:8000");
}

#[test]
fn file_values_override_defaults() {
    let settings = settings_from(
        Some("bind_addr = \"0.0.0.0:9000\"\nresponse_delay_ms = 250\n"),
        env_of(&[]),
    );
    assert_eq!(settings.bind_addr, "0.0.0.0:9000");
    assert_eq!(settings.response_delay_ms, 250);
}

#[test]
fn env_overrides_file_and_app_prefix_wins() {
    let settings = settings_from(
        Some("bind_addr = \"0.0.0.0:9000\""),
        env_of(&[("STUB_BIND", "127.0.0.1:7000"), ("APP__BIND_ADDR", "127.0.0.1:7100")]),
    );
    assert_eq!(settings.bind_addr, "127.0.0.1:7100");

    let settings = settings_from(None, env_of(&[("STUB_BIND", "127.0.0.1:7000")]));
    assert_eq!(settings.bind_addr, "127.0.0.1:7000");
}

#[test]
fn malformed_inputs_fall_back() {
    let settings = settings_from(
        Some("this is = = not toml"),
        env_of(&[("APP__RESPONSE_DELAY_MS", "soon")]),
    );
    assert_eq!(settings, Settings::default());

    let settings = settings_from(Some("response_delay_ms = -5"), env_of(&[]));
    assert_eq!(settings.response_delay_ms, 0);
}
