//! Public entry points for the backend-config crate.
//!
//! The crate keeps an in-process copy of a workspace's configuration and
//! regulations in sync with the control plane and fans changes out to
//! subscribers grouped by topic. The re-exports below cover what a host
//! needs to build the service from the environment, subscribe to updates,
//! and wait for the first snapshot without digging into the module layout.

pub mod broker;
pub mod canonical;
pub mod config;
pub mod fetch;
pub mod http;
pub mod projector;
pub mod service;
pub mod status;
pub mod store;
pub mod telemetry;
pub mod types;

pub use broker::{DataEvent, EventBroker, EventData, EventReceiver, EventSender, Topic};
pub use canonical::{has_changed, Canonicalize};
pub use config::BackendConfigEnv;
pub use fetch::{
    fetcher_for, ConfigEnvReplacer, ConfigFetcher, MultiWorkspaceFetcher, SingleWorkspaceFetcher,
};
pub use http::{BackendClient, FetchError};
pub use projector::processor_view;
pub use service::{
    BackendConfigHandle, BackendConfigService, BackendConfigTelemetry, ServiceConfig,
    ServiceError, SyncOutcome,
};
pub use status::{status_json, StatusSnapshot, SyncStatus};
pub use store::{Readiness, SnapshotKind, SnapshotStore};
pub use telemetry::{CompositeTelemetry, CountingTelemetry, TelemetryCounters, TelemetrySnapshot};
pub use types::{
    ConfigMap, Destination, DestinationDefinition, Libraries, Library, RegulationKind,
    Regulations, Source, SourceDefinition, SourceRegulation, Transformation, WorkspaceConfig,
    WorkspaceRegulation,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Ensures a service can be assembled from the environment through the crate root.
    #[test]
    fn service_builds_from_env_via_reexports() {
        let env = BackendConfigEnv::from_env_iter([
            ("CONFIG_BACKEND_URL", "http://127.0.0.1:5000"),
            ("WORKSPACE_TOKEN", "token"),
        ]);
        let config = env.to_service_config();
        let fetcher = fetcher_for(&config, None).expect("fetcher");
        let service = BackendConfigService::new(config, fetcher);
        assert_eq!(service.config().config_backend_url, "http://127.0.0.1:5000");
        assert!(!service.readiness().config_ready);
    }

    /// Verifies the status helpers exported at the crate root remain usable.
    #[test]
    fn status_helpers_work_via_reexports() {
        let status = SyncStatus::new();
        status.set_last_error(Some("unauthorized".into()));
        let json = status_json(&status);
        assert_eq!(
            json.get("lastError").and_then(|v| v.as_str()),
            Some("unauthorized")
        );
    }
}
