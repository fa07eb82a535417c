//! Environment-driven helpers for building the service configuration.
//!
//! Unset or unparsable variables fall back to the [`ServiceConfig`]
//! defaults, so an empty environment yields a single-workspace setup against
//! the hosted control plane.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::service::ServiceConfig;

/// Control-plane base URL.
const ENV_BACKEND_URL: &str = "CONFIG_BACKEND_URL";
/// Token identifying the workspace in single-workspace mode.
const ENV_WORKSPACE_TOKEN: &str = "WORKSPACE_TOKEN";
/// Shared secret used in multi-workspace mode.
const ENV_HOSTED_SECRET: &str = "HOSTED_SERVICE_SECRET";
/// Toggles multi-workspace mode.
const ENV_MULTI_WORKSPACE: &str = "RSERVER_BACKEND_CONFIG_MULTI_WORKSPACE";
/// Config poll interval in seconds.
const ENV_POLL_INTERVAL: &str = "RSERVER_BACKEND_CONFIG_POLL_INTERVAL";
/// Regulations poll interval in seconds.
const ENV_REGULATIONS_POLL_INTERVAL: &str = "RSERVER_BACKEND_CONFIG_REGULATIONS_POLL_INTERVAL";
/// Page size used when fetching regulations.
const ENV_MAX_REGULATIONS: &str = "RSERVER_BACKEND_CONFIG_MAX_REGULATIONS_PER_REQUEST";
/// Toggles environment substitution on fetched configuration.
const ENV_REPLACEMENT: &str = "RSERVER_BACKEND_CONFIG_ENV_REPLACEMENT_ENABLED";
/// Toggles the regulations poll driver.
const ENV_POLL_REGULATIONS: &str = "RSERVER_BACKEND_CONFIG_POLL_REGULATIONS";
/// File receiving panic records from background tasks.
const ENV_ERROR_FILE_PATH: &str = "RSERVER_ERROR_FILE_PATH";

/// Options captured from the process environment.
#[derive(Debug, Clone, Default)]
pub struct BackendConfigEnv {
    pub config_backend_url: Option<String>,
    pub workspace_token: Option<String>,
    pub multi_workspace_secret: Option<String>,
    pub multi_workspace: Option<bool>,
    pub poll_interval: Option<Duration>,
    pub regulations_poll_interval: Option<Duration>,
    pub max_regulations_per_request: Option<usize>,
    pub env_replacement_enabled: Option<bool>,
    pub poll_regulations: Option<bool>,
    pub error_file_path: Option<PathBuf>,
}

impl BackendConfigEnv {
    /// Reads the current process environment.
    pub fn from_os_env() -> Self {
        Self::from_env_iter(env::vars())
    }

    /// Reads options from key/value pairs (typically for tests).
    pub fn from_env_iter<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| map.get(key).and_then(|value| sanitize_non_empty(value));

        Self {
            config_backend_url: get(ENV_BACKEND_URL),
            workspace_token: get(ENV_WORKSPACE_TOKEN),
            multi_workspace_secret: get(ENV_HOSTED_SECRET),
            multi_workspace: get(ENV_MULTI_WORKSPACE).and_then(|v| parse_bool(ENV_MULTI_WORKSPACE, &v)),
            poll_interval: get(ENV_POLL_INTERVAL).and_then(|v| parse_seconds(ENV_POLL_INTERVAL, &v)),
            regulations_poll_interval: get(ENV_REGULATIONS_POLL_INTERVAL)
                .and_then(|v| parse_seconds(ENV_REGULATIONS_POLL_INTERVAL, &v)),
            max_regulations_per_request: get(ENV_MAX_REGULATIONS).and_then(|v| {
                v.parse()
                    .map_err(|_| warn!("ignoring {ENV_MAX_REGULATIONS}={v}: not a number"))
                    .ok()
            }),
            env_replacement_enabled: get(ENV_REPLACEMENT).and_then(|v| parse_bool(ENV_REPLACEMENT, &v)),
            poll_regulations: get(ENV_POLL_REGULATIONS)
                .and_then(|v| parse_bool(ENV_POLL_REGULATIONS, &v)),
            error_file_path: get(ENV_ERROR_FILE_PATH).map(PathBuf::from),
        }
    }

    /// Applies the captured overrides on top of `base`.
    pub fn apply(&self, base: ServiceConfig) -> ServiceConfig {
        let mut config = base;
        if let Some(url) = &self.config_backend_url {
            config.config_backend_url = url.clone();
        }
        if let Some(token) = &self.workspace_token {
            config.workspace_token = token.clone();
        }
        if let Some(secret) = &self.multi_workspace_secret {
            config.multi_workspace_secret = secret.clone();
        }
        if let Some(multi) = self.multi_workspace {
            config.multi_workspace = multi;
        }
        if let Some(interval) = self.poll_interval {
            config.poll_interval = interval;
        }
        if let Some(interval) = self.regulations_poll_interval {
            config.regulations_poll_interval = interval;
        }
        if let Some(max) = self.max_regulations_per_request {
            config.max_regulations_per_request = max;
        }
        if let Some(enabled) = self.env_replacement_enabled {
            config.env_replacement_enabled = enabled;
        }
        if let Some(poll) = self.poll_regulations {
            config.poll_regulations = poll;
        }
        if let Some(path) = &self.error_file_path {
            config.error_file_path = path.clone();
        }
        config
    }

    /// Builds a [`ServiceConfig`] from the defaults and the captured overrides.
    pub fn to_service_config(&self) -> ServiceConfig {
        self.apply(ServiceConfig::default())
    }
}

/// Trims whitespace and discards empty values.
fn sanitize_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses common truthy/falsy spellings, warning on anything else.
fn parse_bool(key: &str, value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Some(true),
        "0" | "false" | "f" | "no" | "n" => Some(false),
        other => {
            warn!("ignoring {key}={other}: not a boolean");
            None
        }
    }
}

/// Parses a whole number of seconds.
fn parse_seconds(key: &str, value: &str) -> Option<Duration> {
    match value.parse::<u64>() {
        Ok(seconds) => Some(Duration::from_secs(seconds)),
        Err(_) => {
            warn!("ignoring {key}={value}: not a number of seconds");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::config::{
        DEFAULT_BACKEND_URL, DEFAULT_POLL_INTERVAL, DEFAULT_REGULATIONS_POLL_INTERVAL,
    };

    #[test]
    fn empty_environment_yields_defaults() {
        let env = BackendConfigEnv::from_env_iter::<Vec<(String, String)>, _, _>(vec![]);
        let config = env.to_service_config();
        assert_eq!(config.config_backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(
            config.regulations_poll_interval,
            DEFAULT_REGULATIONS_POLL_INTERVAL
        );
        assert_eq!(config.max_regulations_per_request, 1000);
        assert!(config.env_replacement_enabled);
        assert!(!config.multi_workspace);
        assert!(!config.poll_regulations);
    }

    #[test]
    fn overrides_are_applied() {
        let env = BackendConfigEnv::from_env_iter([
            (ENV_BACKEND_URL, " https://cp.example.com "),
            (ENV_WORKSPACE_TOKEN, "token"),
            (ENV_HOSTED_SECRET, "secret"),
            (ENV_MULTI_WORKSPACE, "yes"),
            (ENV_POLL_INTERVAL, "7"),
            (ENV_REGULATIONS_POLL_INTERVAL, "60"),
            (ENV_MAX_REGULATIONS, "250"),
            (ENV_REPLACEMENT, "false"),
            (ENV_POLL_REGULATIONS, "1"),
            (ENV_ERROR_FILE_PATH, "/var/tmp/errors.json"),
        ]);
        let config = env.to_service_config();
        assert_eq!(config.config_backend_url, "https://cp.example.com");
        assert_eq!(config.workspace_token, "token");
        assert_eq!(config.multi_workspace_secret, "secret");
        assert!(config.multi_workspace);
        assert_eq!(config.poll_interval, Duration::from_secs(7));
        assert_eq!(config.regulations_poll_interval, Duration::from_secs(60));
        assert_eq!(config.max_regulations_per_request, 250);
        assert!(!config.env_replacement_enabled);
        assert!(config.poll_regulations);
        assert_eq!(config.error_file_path, PathBuf::from("/var/tmp/errors.json"));
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let env = BackendConfigEnv::from_env_iter([
            (ENV_POLL_INTERVAL, "soon"),
            (ENV_MULTI_WORKSPACE, "maybe"),
            (ENV_MAX_REGULATIONS, "-3"),
            (ENV_WORKSPACE_TOKEN, "   "),
        ]);
        assert!(env.poll_interval.is_none());
        assert!(env.multi_workspace.is_none());
        assert!(env.max_regulations_per_request.is_none());
        assert!(env.workspace_token.is_none());
    }
}
