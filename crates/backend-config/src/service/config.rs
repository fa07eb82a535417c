//! Static configuration for the backend-config service runtime.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Hosted control plane.
pub const DEFAULT_BACKEND_URL: &str = "https://api.rudderlabs.com";
/// Cadence of the config poll driver.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Cadence of the regulations poll driver.
pub const DEFAULT_REGULATIONS_POLL_INTERVAL: Duration = Duration::from_secs(300);
/// Page size for regulation fetches.
pub const DEFAULT_MAX_REGULATIONS_PER_REQUEST: usize = 1000;
/// Shared secret used in multi-workspace mode when none is configured.
pub const DEFAULT_MULTI_WORKSPACE_SECRET: &str = "password";
/// File receiving panic records from background tasks.
pub const DEFAULT_ERROR_FILE_PATH: &str = "/tmp/error_store.json";

/// Configuration values controlling how the service fetches and polls.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Selects the multi-workspace fetch strategy.
    pub multi_workspace: bool,
    /// Basic-auth secret sent in multi-workspace mode.
    pub multi_workspace_secret: String,
    /// Control-plane base URL.
    pub config_backend_url: String,
    /// Basic-auth token sent in single-workspace mode.
    pub workspace_token: String,
    /// Delay between config poll cycles; also the readiness gate's log cadence.
    pub poll_interval: Duration,
    /// Delay between regulation poll cycles.
    pub regulations_poll_interval: Duration,
    /// Page size used when fetching regulations.
    pub max_regulations_per_request: usize,
    /// Whether fetched config goes through env substitution before decoding.
    pub env_replacement_enabled: bool,
    /// Whether the regulations poll driver runs (and gates readiness).
    pub poll_regulations: bool,
    /// File receiving a JSON line for every background task panic.
    pub error_file_path: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            multi_workspace: false,
            multi_workspace_secret: DEFAULT_MULTI_WORKSPACE_SECRET.into(),
            config_backend_url: DEFAULT_BACKEND_URL.into(),
            workspace_token: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            regulations_poll_interval: DEFAULT_REGULATIONS_POLL_INTERVAL,
            max_regulations_per_request: DEFAULT_MAX_REGULATIONS_PER_REQUEST,
            env_replacement_enabled: true,
            poll_regulations: false,
            error_file_path: PathBuf::from(DEFAULT_ERROR_FILE_PATH),
        }
    }
}

impl ServiceConfig {
    /// Replaces values that would make the poll drivers spin or page forever.
    pub(crate) fn sanitise(mut self) -> Self {
        if self.poll_interval.is_zero() {
            warn!(
                "backend-config: poll interval must be > 0; using {:?}",
                DEFAULT_POLL_INTERVAL
            );
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if self.regulations_poll_interval.is_zero() {
            warn!(
                "backend-config: regulations poll interval must be > 0; using {:?}",
                DEFAULT_REGULATIONS_POLL_INTERVAL
            );
            self.regulations_poll_interval = DEFAULT_REGULATIONS_POLL_INTERVAL;
        }
        if self.max_regulations_per_request == 0 {
            warn!(
                "backend-config: max regulations per request must be > 0; using {}",
                DEFAULT_MAX_REGULATIONS_PER_REQUEST
            );
            self.max_regulations_per_request = DEFAULT_MAX_REGULATIONS_PER_REQUEST;
        }
        if self.config_backend_url.trim().is_empty() {
            warn!("backend-config: empty control plane url; using {DEFAULT_BACKEND_URL}");
            self.config_backend_url = DEFAULT_BACKEND_URL.into();
        }
        self
    }
}
