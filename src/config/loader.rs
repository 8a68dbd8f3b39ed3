//! Configuration loading with layered precedence.
//!
//! Layers, lowest to highest: application defaults, configuration file,
//! `DOCKSHIM_*` environment variables, command-line arguments.
//!
//! The layers are composed by hand with `MergeComposer` rather than through the
//! derived `load()`: the `Cli` struct owns subcommand dispatch, and typed
//! environment variables must fail fast instead of being silently ignored.
//!
//! String variables (for example `DOCKSHIM_CLIENT_BINARY`) are always
//! accepted. Numeric variables such as `DOCKSHIM_ENGINE_PORT` must parse as
//! unsigned integers or loading fails with [`ConfigError::InvalidValue`].

use camino::Utf8PathBuf;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};

use crate::config::{AppConfig, Cli};
use crate::error::{ConfigError, Result};

/// The type of value expected from an environment variable.
#[derive(Clone, Copy)]
enum EnvVarType {
    /// Always accepted.
    String,
    /// Unsigned integer; anything else is rejected.
    U64,
}

/// Maps one environment variable onto a path in the configuration tree.
struct EnvVarSpec {
    env_var: &'static str,
    path: &'static [&'static str],
    var_type: EnvVarType,
}

const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    EnvVarSpec {
        env_var: "DOCKSHIM_CLIENT_BINARY",
        path: &["client_binary"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_PAYLOAD_DIR",
        path: &["payload_dir"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_ENGINE_PORT",
        path: &["engine", "port"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_ENGINE_CANARY_IMAGE",
        path: &["engine", "canary_image"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_ENGINE_PROBE_TIMEOUT_SECS",
        path: &["engine", "probe_timeout_secs"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_ENGINE_COMMAND_TIMEOUT_SECS",
        path: &["engine", "command_timeout_secs"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_DEPLOYMENT_BASE_DIR",
        path: &["deployment", "base_dir"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_DEPLOYMENT_SETTLE_MILLIS",
        path: &["deployment", "settle_millis"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_DAEMON_READINESS_TIMEOUT_SECS",
        path: &["daemon", "readiness_timeout_secs"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_DAEMON_READINESS_POLL_MILLIS",
        path: &["daemon", "readiness_poll_millis"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_DAEMON_ELEVATE_WITH",
        path: &["daemon", "elevate_with"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_LOG_FILTER",
        path: &["log", "filter"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "DOCKSHIM_LOG_FORMAT",
        path: &["log", "format"],
        var_type: EnvVarType::String,
    },
];

/// Returns the environment variable names recognised by the loader.
///
/// Tests use this to clear every `DOCKSHIM_*` variable without keeping a
/// second hard-coded list.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|spec| spec.env_var).collect()
}

/// Read a TOML configuration file through `cap_std` and push it as a layer.
fn load_config_file(path: &Utf8PathBuf, composer: &mut MergeComposer) -> Result<()> {
    let current_dir = Utf8PathBuf::from(".");
    let parent = path.parent().unwrap_or_else(|| current_dir.as_ref());
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    let value =
        toml::from_str::<serde_json::Value>(&content).map_err(|e| ConfigError::ParseError {
            message: format!("failed to parse {path}: {e}"),
        })?;

    composer.push_file(value, Some(path.clone()));
    Ok(())
}

fn discover_config_file(cli: &Cli) -> Option<Utf8PathBuf> {
    cli.config.clone().filter(|p| p.exists()).or_else(|| {
        ConfigDiscovery::builder("dockshim")
            .env_var("DOCKSHIM_CONFIG_PATH")
            .config_file_name("config.toml")
            .dotfile_name(".dockshim.toml")
            .build()
            .candidates()
            .into_iter()
            .filter(|p| p.exists())
            .find_map(|p| Utf8PathBuf::try_from(p).ok())
    })
}

/// Load configuration with full layer precedence.
///
/// # Errors
///
/// Returns `ConfigError` when the configuration file is malformed, when a
/// numeric environment variable does not parse, or when the merged layers do
/// not deserialize into [`AppConfig`].
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(AppConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    if let Some(ref path) = discover_config_file(cli) {
        load_config_file(path, &mut composer)?;
    }

    let env_values = collect_env_vars()?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(cli);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let config =
        AppConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;

    Ok(config)
}

/// Collect `DOCKSHIM_*` variables from [`ENV_VAR_SPECS`] into a JSON layer.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for a numeric variable that does not
/// parse.
fn collect_env_vars() -> Result<Value> {
    let mut root = Map::new();

    for spec in ENV_VAR_SPECS {
        let Ok(raw_value) = std::env::var(spec.env_var) else {
            continue;
        };

        let json_value = match spec.var_type {
            EnvVarType::String => Value::String(raw_value),
            EnvVarType::U64 => match raw_value.parse::<u64>() {
                Ok(n) => Value::Number(n.into()),
                Err(_) => {
                    return Err(ConfigError::InvalidValue {
                        field: spec.env_var.to_owned(),
                        reason: format!("expected unsigned integer, got '{raw_value}'"),
                    }
                    .into());
                }
            },
        };

        insert_at_path(&mut root, spec.path, json_value);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

/// Insert `value` at a nested `path`, creating intermediate objects.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(obj) = entry.as_object_mut() else {
            return;
        };
        current = obj;
    }

    current.insert(field.to_owned(), value);
}

/// Build a JSON value containing CLI overrides.
fn build_cli_overrides(cli: &Cli) -> serde_json::Value {
    let mut overrides = serde_json::Map::new();

    if let Some(ref binary) = cli.client_binary {
        overrides.insert(
            "client_binary".to_owned(),
            serde_json::Value::String(binary.clone()),
        );
    }

    if let Some(ref payload_dir) = cli.payload_dir {
        overrides.insert(
            "payload_dir".to_owned(),
            serde_json::Value::String(payload_dir.clone()),
        );
    }

    if overrides.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::Value::Object(overrides)
    }
}
