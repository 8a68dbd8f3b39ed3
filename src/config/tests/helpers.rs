//! Shared fixtures and helper functions for config tests.

use std::sync::Arc;

use ortho_config::MergeComposer;
use rstest::fixture;

use crate::config::{AppConfig, LogFormat};

/// Fixture providing an `AppConfig` parsed from a full TOML example.
#[fixture]
pub fn app_config_from_full_toml() -> AppConfig {
    let toml = r#"
        client_binary = "/usr/local/bin/docker"
        payload_dir = "/opt/dockshim/bundle"

        [engine]
        port = 6000
        canary_image = "registry.local/hello-world"
        probe_timeout_secs = 15
        command_timeout_secs = 45

        [deployment]
        base_dir = "/var/tmp"
        settle_millis = 0

        [daemon]
        readiness_timeout_secs = 12
        readiness_poll_millis = 250
        elevate_with = "sudo"

        [log]
        filter = "dockshim=debug"
        format = "json"
    "#;

    toml::from_str(toml).expect("TOML parsing should succeed")
}

/// Fixture providing an `AppConfig` parsed from a minimal TOML example.
#[fixture]
pub fn app_config_from_partial_toml() -> AppConfig {
    let toml = r#"
        [engine]
        port = 7000
    "#;

    toml::from_str(toml).expect("TOML parsing should succeed")
}

/// Helper: Creates a `MergeComposer` with defaults layer already pushed.
pub fn create_composer_with_defaults() -> Result<MergeComposer, serde_json::Error> {
    let mut composer = MergeComposer::new();
    let defaults = ortho_config::serde_json::to_value(AppConfig::default())?;
    composer.push_defaults(defaults);
    Ok(composer)
}

/// Helper: Merges layers from a composer into `AppConfig`.
pub fn merge_config(composer: MergeComposer) -> Result<AppConfig, Arc<ortho_config::OrthoError>> {
    AppConfig::merge_from_layers(composer.layers())
}

/// Helper: Asserts that a config has all default values.
pub fn assert_config_has_defaults(config: &AppConfig) {
    assert!(config.client_binary.is_none(), "client_binary should be None");
    assert_eq!(config.client_binary(), "docker");
    assert!(config.payload_dir.is_none(), "payload_dir should be None");
    assert_eq!(config.engine.port, 5555, "engine.port should be 5555");
    assert_eq!(config.engine.canary_image, "hello-world");
    assert_eq!(config.engine.probe_timeout_secs, 120);
    assert_eq!(config.engine.command_timeout_secs, 600);
    assert!(config.deployment.base_dir.is_none());
    assert_eq!(config.deployment.settle_millis, 500);
    assert_eq!(config.daemon.readiness_timeout_secs, 30);
    assert_eq!(config.daemon.readiness_poll_millis, 500);
    assert!(config.daemon.elevate_with.is_none());
    assert_eq!(config.log.filter, "info");
    assert_eq!(config.log.format, LogFormat::Compact);
}

/// Helper: Creates a `MergeComposer` with defaults, file, and env layers for
/// testing layer precedence.
pub fn create_composer_with_file_and_env() -> Result<MergeComposer, serde_json::Error> {
    use ortho_config::serde_json::json;

    let mut composer = create_composer_with_defaults()?;

    composer.push_file(
        json!({
            "client_binary": "/from/file/docker",
            "engine": { "port": 6001, "canary_image": "file-canary" }
        }),
        None,
    );

    composer.push_environment(json!({
        "client_binary": "/from/env/docker",
        "engine": { "port": 6002 }
    }));

    Ok(composer)
}
