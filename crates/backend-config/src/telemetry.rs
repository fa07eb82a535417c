//! Telemetry helpers for the backend-config service.
//!
//! [`CountingTelemetry`] keeps atomic counters for every signal so embedders
//! can export them through whatever metrics backend they run (the error
//! counter corresponds to the `config_backend.errors` stat).

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::http::FetchError;
use crate::service::BackendConfigTelemetry;
use crate::store::SnapshotKind;
use crate::types::{Regulations, WorkspaceConfig};

/// Aggregated telemetry counters (all values use relaxed atomics).
#[derive(Debug, Default)]
pub struct TelemetryCounters {
    config_fetch_errors: AtomicU64,
    regulation_fetch_errors: AtomicU64,
    config_updates: AtomicU64,
    regulation_updates: AtomicU64,
    sources: AtomicU64,
    destinations: AtomicU64,
    metrics_enabled: AtomicBool,
    workspace_id: RwLock<Option<String>>,
}

impl TelemetryCounters {
    /// Captures a point-in-time snapshot of the counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            config_fetch_errors: self.config_fetch_errors.load(Ordering::Relaxed),
            regulation_fetch_errors: self.regulation_fetch_errors.load(Ordering::Relaxed),
            config_updates: self.config_updates.load(Ordering::Relaxed),
            regulation_updates: self.regulation_updates.load(Ordering::Relaxed),
            sources: self.sources.load(Ordering::Relaxed),
            destinations: self.destinations.load(Ordering::Relaxed),
            metrics_enabled: self.metrics_enabled.load(Ordering::Relaxed),
        }
    }

    /// Workspace of the first source, reported whenever sources appear in a config that had none.
    pub fn workspace_id(&self) -> Option<String> {
        self.workspace_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total fetch errors across both poll drivers.
    pub fn fetch_errors(&self) -> u64 {
        self.config_fetch_errors.load(Ordering::Relaxed)
            + self.regulation_fetch_errors.load(Ordering::Relaxed)
    }
}

/// Plain data representation of [`TelemetryCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    /// Failed config fetches.
    pub config_fetch_errors: u64,
    /// Failed regulation fetches.
    pub regulation_fetch_errors: u64,
    /// Config changes cached and published.
    pub config_updates: u64,
    /// Regulation changes cached and published.
    pub regulation_updates: u64,
    /// Sources in the latest config.
    pub sources: u64,
    /// Destinations in the latest config.
    pub destinations: u64,
    /// Metrics flag of the latest config.
    pub metrics_enabled: bool,
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config_fetch_errors={}, regulation_fetch_errors={}, config_updates={}, regulation_updates={}, sources={}, destinations={}, metrics_enabled={}",
            self.config_fetch_errors,
            self.regulation_fetch_errors,
            self.config_updates,
            self.regulation_updates,
            self.sources,
            self.destinations,
            self.metrics_enabled
        )
    }
}

/// Telemetry implementation that maintains atomic counters for every signal.
#[derive(Debug, Clone)]
pub struct CountingTelemetry {
    counters: Arc<TelemetryCounters>,
}

impl CountingTelemetry {
    pub fn new(counters: Arc<TelemetryCounters>) -> Self {
        Self { counters }
    }

    /// Returns the underlying counter set.
    pub fn counters(&self) -> Arc<TelemetryCounters> {
        self.counters.clone()
    }
}

impl Default for CountingTelemetry {
    fn default() -> Self {
        Self::new(Arc::new(TelemetryCounters::default()))
    }
}

impl BackendConfigTelemetry for CountingTelemetry {
    fn on_fetch_error(&self, kind: SnapshotKind, _error: &FetchError) {
        let counter = match kind {
            SnapshotKind::Config => &self.counters.config_fetch_errors,
            SnapshotKind::Regulations => &self.counters.regulation_fetch_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn on_config_changed(&self, _previous: &WorkspaceConfig, current: &WorkspaceConfig) {
        self.counters.config_updates.fetch_add(1, Ordering::Relaxed);
        self.counters
            .sources
            .store(current.sources.len() as u64, Ordering::Relaxed);
        self.counters
            .destinations
            .store(current.destination_count() as u64, Ordering::Relaxed);
        self.counters
            .metrics_enabled
            .store(current.enable_metrics, Ordering::Relaxed);
    }

    fn on_regulations_changed(&self, _current: &Regulations) {
        self.counters
            .regulation_updates
            .fetch_add(1, Ordering::Relaxed);
    }

    fn on_workspace_identified(&self, workspace_id: &str) {
        *self
            .counters
            .workspace_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(workspace_id.to_string());
    }
}

/// Fans every callback out to several telemetry sinks.
#[derive(Clone, Default)]
pub struct CompositeTelemetry {
    sinks: Vec<Arc<dyn BackendConfigTelemetry>>,
}

impl fmt::Debug for CompositeTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeTelemetry")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl CompositeTelemetry {
    pub fn new(sinks: Vec<Arc<dyn BackendConfigTelemetry>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn BackendConfigTelemetry>) {
        self.sinks.push(sink);
    }
}

impl BackendConfigTelemetry for CompositeTelemetry {
    fn on_fetch_error(&self, kind: SnapshotKind, error: &FetchError) {
        for sink in &self.sinks {
            sink.on_fetch_error(kind, error);
        }
    }

    fn on_config_changed(&self, previous: &WorkspaceConfig, current: &WorkspaceConfig) {
        for sink in &self.sinks {
            sink.on_config_changed(previous, current);
        }
    }

    fn on_regulations_changed(&self, current: &Regulations) {
        for sink in &self.sinks {
            sink.on_regulations_changed(current);
        }
    }

    fn on_workspace_identified(&self, workspace_id: &str) {
        for sink in &self.sinks {
            sink.on_workspace_identified(workspace_id);
        }
    }
}
