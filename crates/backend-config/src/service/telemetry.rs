//! Service-level telemetry abstractions.
//!
//! Embedders implement [`BackendConfigTelemetry`] to observe fetch failures
//! and snapshot changes without depending on the service internals. A no-op
//! implementation is installed until [`set_telemetry`] is called.
//!
//! [`set_telemetry`]: super::BackendConfigService::set_telemetry

use crate::http::FetchError;
use crate::store::SnapshotKind;
use crate::types::{Regulations, WorkspaceConfig};

/// Telemetry hook invoked on significant service events.
pub trait BackendConfigTelemetry: Send + Sync {
    /// Called every time a fetch fails; the cached snapshot is left as is.
    fn on_fetch_error(&self, _kind: SnapshotKind, _error: &FetchError) {}
    /// Called after a changed config has been cached.
    fn on_config_changed(&self, _previous: &WorkspaceConfig, _current: &WorkspaceConfig) {}
    /// Called after changed regulations have been cached.
    fn on_regulations_changed(&self, _current: &Regulations) {}
    /// Called once when the first non-empty config reveals the workspace.
    fn on_workspace_identified(&self, _workspace_id: &str) {}
}

/// Default telemetry implementation that performs no-ops.
#[derive(Debug, Default)]
pub(crate) struct NoopTelemetry;

impl BackendConfigTelemetry for NoopTelemetry {}
