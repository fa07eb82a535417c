//! Poll drivers.
//!
//! This module hosts the shared service internals: one sync cycle per
//! snapshot kind (fetch, canonicalize, compare, cache, publish) and the loops
//! running those cycles on their configured cadence. Higher-level APIs in
//! `core.rs` delegate to these helpers.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::config::ServiceConfig;
use super::telemetry::BackendConfigTelemetry;
use super::{ServiceError, SyncOutcome};
use crate::broker::{EventBroker, EventData, Topic};
use crate::canonical::{has_changed, Canonicalize};
use crate::fetch::ConfigFetcher;
use crate::http::FetchError;
use crate::projector::processor_view;
use crate::status::SyncStatus;
use crate::store::{SnapshotKind, SnapshotStore};

/// Shared service internals used by the poll drivers and the public API.
pub(crate) struct ServiceShared {
    /// Strategy fetching config and regulations from the control plane.
    pub(crate) fetcher: Arc<dyn ConfigFetcher>,
    pub(crate) store: SnapshotStore,
    pub(crate) broker: EventBroker,
    pub(crate) status: Arc<SyncStatus>,
    pub(crate) telemetry: RwLock<Arc<dyn BackendConfigTelemetry>>,
    /// Static runtime configuration.
    pub(crate) config: ServiceConfig,
    /// Serialises config cycles so a manual refresh never races the poller.
    pub(crate) config_cycle: Mutex<()>,
    pub(crate) regulations_cycle: Mutex<()>,
}

impl std::fmt::Debug for ServiceShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceShared")
            .field("config", &self.config)
            .finish()
    }
}

impl ServiceShared {
    /// Runs one config cycle. Failures leave the cached snapshot untouched.
    pub(crate) async fn sync_config(&self) -> Result<SyncOutcome, ServiceError> {
        let _cycle = self.config_cycle.lock().await;
        let fetched = match self.fetcher.fetch_config().await {
            Ok(config) => config,
            Err(err) => {
                self.handle_fetch_error(SnapshotKind::Config, &err).await;
                return Err(err.into());
            }
        };
        self.status.set_last_error(None);

        let candidate = fetched.canonicalize();
        let previous = self.store.config();
        if !has_changed(previous.as_ref(), &candidate) {
            debug!("backend-config: workspace config unchanged");
            // An empty workspace never differs from the initial snapshot but still counts as fetched.
            self.store.mark_ready(SnapshotKind::Config);
            return Ok(SyncOutcome::Unchanged);
        }

        let current = Arc::new(candidate);
        self.store.write_config(current.clone());
        self.status.record_sync(SnapshotKind::Config);
        info!(
            workspace_id = %current.workspace_id,
            sources = current.sources.len(),
            destinations = current.destination_count(),
            "backend-config: workspace config changed"
        );

        let telemetry = self.telemetry().await;
        telemetry.on_config_changed(&previous, &current);
        // Merged multi-workspace configs carry no workspace id of their own.
        if previous.sources.is_empty() && !current.sources.is_empty() {
            telemetry.on_workspace_identified(&current.sources[0].workspace_id);
        }

        let filtered = Arc::new(processor_view(&current));
        self.broker
            .publish(Topic::BackendConfig, EventData::WorkspaceConfig(current));
        self.broker
            .publish(Topic::ProcessConfig, EventData::WorkspaceConfig(filtered));
        Ok(SyncOutcome::Changed)
    }

    /// Runs one regulations cycle. Failures leave the cached snapshot untouched.
    pub(crate) async fn sync_regulations(&self) -> Result<SyncOutcome, ServiceError> {
        let _cycle = self.regulations_cycle.lock().await;
        let fetched = match self.fetcher.fetch_regulations().await {
            Ok(regulations) => regulations,
            Err(err) => {
                self.handle_fetch_error(SnapshotKind::Regulations, &err).await;
                return Err(err.into());
            }
        };
        self.status.set_last_error(None);

        let candidate = fetched.canonicalize();
        let previous = self.store.regulations();
        if !has_changed(previous.as_ref(), &candidate) {
            debug!("backend-config: regulations unchanged");
            // No regulations never differs from the initial snapshot but still counts as fetched.
            self.store.mark_ready(SnapshotKind::Regulations);
            return Ok(SyncOutcome::Unchanged);
        }

        let current = Arc::new(candidate);
        self.store.write_regulations(current.clone());
        self.status.record_sync(SnapshotKind::Regulations);
        info!(
            workspace = current.workspace_regulations.len(),
            source = current.source_regulations.len(),
            "backend-config: regulations changed"
        );

        self.telemetry().await.on_regulations_changed(&current);
        self.broker
            .publish(Topic::Regulations, EventData::Regulations(current));
        Ok(SyncOutcome::Changed)
    }

    /// Runs config cycles every poll interval until shutdown is signalled.
    pub(crate) async fn run_config_poller(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        let interval = self.config.poll_interval;
        loop {
            tokio::select! {
                biased;
                Ok(()) = shutdown_rx.recv() => break,
                _ = self.sync_config() => {}
            }
            tokio::select! {
                biased;
                Ok(()) = shutdown_rx.recv() => break,
                _ = sleep(interval) => {}
            }
        }
        debug!("backend-config: config poller shutting down");
    }

    /// Runs regulation cycles every regulations poll interval until shutdown is signalled.
    pub(crate) async fn run_regulations_poller(
        self: Arc<Self>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let interval = self.config.regulations_poll_interval;
        loop {
            tokio::select! {
                biased;
                Ok(()) = shutdown_rx.recv() => break,
                _ = self.sync_regulations() => {}
            }
            tokio::select! {
                biased;
                Ok(()) = shutdown_rx.recv() => break,
                _ = sleep(interval) => {}
            }
        }
        debug!("backend-config: regulations poller shutting down");
    }

    /// Counts and logs a failed fetch.
    async fn handle_fetch_error(&self, kind: SnapshotKind, error: &FetchError) {
        warn!(
            kind = kind.as_str(),
            %error,
            "backend-config: fetch failed; keeping cached snapshot"
        );
        self.telemetry().await.on_fetch_error(kind, error);
        self.status.set_last_error(Some(error.to_string()));
    }

    pub(crate) async fn telemetry(&self) -> Arc<dyn BackendConfigTelemetry> {
        self.telemetry.read().await.clone()
    }
}
