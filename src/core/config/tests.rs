use super::data::{path_display, Config, ServerConfig};
use super::defaults::*;
use super::io::ConfigError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("missing file should load");
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_full_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
api_url = "http://coach.local:9000/"
data_dir = "/var/lib/coach"

[server]
bind = "0.0.0.0:8080"
model = "gpt-4o"
max_tokens = 512
temperature = 0.2
"#,
    )
    .expect("write config");

    let config = Config::load(Some(config_path.as_path())).expect("config should parse");
    assert_eq!(config.api_url.as_deref(), Some("http://coach.local:9000/"));
    assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/coach")));
    assert_eq!(
        config.server,
        ServerConfig {
            bind: Some("0.0.0.0:8080".into()),
            model: Some("gpt-4o".into()),
            max_tokens: Some(512),
            temperature: Some(0.2),
            ..Default::default()
        }
    );
}

#[test]
fn test_invalid_toml_reports_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "api_url = [unterminated").expect("write config");

    let err = Config::load_from_path(&config_path).expect_err("invalid TOML should fail");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("Failed to parse config at "));
}

#[test]
fn test_unreadable_config_is_read_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    // A directory exists but cannot be read as a file.
    let err = Config::load_from_path(temp_dir.path()).expect_err("directory is not a file");
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn client_settings_default_when_nothing_is_set() {
    let settings = ClientSettings::resolve(
        &Config::default(),
        env_from(&[]),
        None,
        Some(Path::new("/tmp/history")),
    );
    assert_eq!(settings.api_url, DEFAULT_API_URL);
    assert_eq!(settings.data_dir, PathBuf::from("/tmp/history"));
}

#[test]
fn client_settings_precedence_is_flag_env_config() {
    let config = Config {
        api_url: Some("http://from-config:1".into()),
        data_dir: Some(PathBuf::from("/from/config")),
        ..Default::default()
    };

    let from_config = ClientSettings::resolve(&config, env_from(&[]), None, None);
    assert_eq!(from_config.api_url, "http://from-config:1");
    assert_eq!(from_config.data_dir, PathBuf::from("/from/config"));

    let legacy = ClientSettings::resolve(
        &config,
        env_from(&[(LEGACY_API_URL_ENV, "http://legacy:2/")]),
        None,
        None,
    );
    assert_eq!(legacy.api_url, "http://legacy:2");

    let env = env_from(&[
        (API_URL_ENV, "http://from-env:3"),
        (LEGACY_API_URL_ENV, "http://legacy:2"),
    ]);
    let from_env = ClientSettings::resolve(&config, &env, None, None);
    assert_eq!(from_env.api_url, "http://from-env:3");

    let from_flag = ClientSettings::resolve(&config, &env, Some("http://from-flag:4"), None);
    assert_eq!(from_flag.api_url, "http://from-flag:4");
}

#[test]
fn blank_environment_values_are_ignored() {
    let settings = ClientSettings::resolve(
        &Config::default(),
        env_from(&[(API_URL_ENV, "   ")]),
        None,
        Some(Path::new("/tmp")),
    );
    assert_eq!(settings.api_url, DEFAULT_API_URL);
}

#[test]
fn relay_settings_defaults_match_coach_profile() {
    let settings = RelaySettings::resolve(&Config::default(), env_from(&[]), None);
    assert_eq!(settings.bind, DEFAULT_BIND);
    assert_eq!(settings.base_url, DEFAULT_UPSTREAM_BASE_URL);
    assert_eq!(settings.api_key, None);
    assert_eq!(settings.model, "gpt-4o-mini");
    assert_eq!(settings.max_tokens, 300);
    assert!((settings.temperature - 0.7).abs() < f32::EPSILON);
    assert!(settings.system_prompt.starts_with("You are a supportive mental coach."));
}

#[test]
fn relay_settings_read_credentials_and_overrides() {
    let config = Config {
        server: ServerConfig {
            bind: Some("0.0.0.0:9000".into()),
            base_url: Some("https://config.example/v1".into()),
            system_prompt: Some("Be brief.".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let env = env_from(&[
        (API_KEY_ENV, "sk-test"),
        (BASE_URL_ENV, "https://env.example/v1/"),
    ]);

    let settings = RelaySettings::resolve(&config, &env, Some("127.0.0.1:0"));
    assert_eq!(settings.bind, "127.0.0.1:0");
    assert_eq!(settings.base_url, "https://env.example/v1");
    assert_eq!(settings.api_key.as_deref(), Some("sk-test"));
    assert_eq!(settings.system_prompt, "Be brief.");

    let from_config = RelaySettings::resolve(&config, env_from(&[]), None);
    assert_eq!(from_config.bind, "0.0.0.0:9000");
    assert_eq!(from_config.base_url, "https://config.example/v1");
}

#[cfg(unix)]
#[test]
fn path_display_uses_tilde_for_home() {
    if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home).join(".config").join("mental-coach");
        assert_eq!(path_display(&path), "~/.config/mental-coach");
    }
}
