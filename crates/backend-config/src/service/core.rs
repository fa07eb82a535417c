//! Backend-config service orchestration.
//!
//! [`BackendConfigService`] owns the snapshot store, the event broker, and the
//! poll drivers of one control-plane connection. It is constructed with an
//! injected [`ConfigFetcher`] so several independent instances can coexist,
//! e.g. in tests.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info};

use super::config::ServiceConfig;
use super::poller::ServiceShared;
use super::supervise::spawn_supervised;
use super::telemetry::{BackendConfigTelemetry, NoopTelemetry};
use crate::broker::{EventBroker, EventData, EventReceiver, EventSender, Topic};
use crate::fetch::ConfigFetcher;
use crate::http::FetchError;
use crate::projector::processor_view;
use crate::status::SyncStatus;
use crate::store::{Readiness, SnapshotStore};
use crate::types::{Libraries, Regulations, WorkspaceConfig};

/// Error type surfaced by the service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The fetch collaborator failed; the cached snapshot was kept.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Result of a single sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The fetched snapshot differed from the cached one and was published.
    Changed,
    /// The fetched snapshot matched the cached one; nothing was published.
    Unchanged,
}

/// Handle returned by [`BackendConfigService::start`] to manage background tasks.
pub struct BackendConfigHandle {
    shutdown: broadcast::Sender<()>,
    join_handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for BackendConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfigHandle")
            .field("join_handles", &self.join_handles.len())
            .finish()
    }
}

impl BackendConfigHandle {
    /// Stops the poll drivers and waits for them to terminate.
    ///
    /// Dropping the handle without calling this leaves the drivers running.
    pub async fn shutdown(self) {
        let BackendConfigHandle {
            shutdown,
            join_handles,
        } = self;
        let _ = shutdown.send(());
        for handle in join_handles {
            let _ = handle.await;
        }
    }
}

/// Keeps workspace config and regulations in sync and fans out changes.
#[derive(Debug, Clone)]
pub struct BackendConfigService {
    shared: Arc<ServiceShared>,
}

impl BackendConfigService {
    /// Builds a service polling through `fetcher`.
    ///
    /// The configuration is sanitised up-front.
    pub fn new(config: ServiceConfig, fetcher: Arc<dyn ConfigFetcher>) -> Self {
        let config = config.sanitise();
        let shared = ServiceShared {
            fetcher,
            store: SnapshotStore::new(config.poll_regulations),
            broker: EventBroker::new(),
            status: Arc::new(SyncStatus::new()),
            telemetry: RwLock::new(Arc::new(NoopTelemetry)),
            config,
            config_cycle: Mutex::new(()),
            regulations_cycle: Mutex::new(()),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Spawns the poll drivers and returns a handle controlling them.
    ///
    /// The regulations driver only runs when regulation polling is enabled.
    pub fn start(&self) -> BackendConfigHandle {
        let (shutdown_tx, _) = broadcast::channel(1);
        let error_file = self.shared.config.error_file_path.clone();

        let mut join_handles = Vec::new();
        let shared = self.shared.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        join_handles.push(spawn_supervised(
            "config-poller",
            error_file.clone(),
            shared.run_config_poller(shutdown_rx),
        ));

        if self.shared.config.poll_regulations {
            let shared = self.shared.clone();
            let shutdown_rx = shutdown_tx.subscribe();
            join_handles.push(spawn_supervised(
                "regulations-poller",
                error_file,
                shared.run_regulations_poller(shutdown_rx),
            ));
        }

        info!(
            multi_workspace = self.shared.config.multi_workspace,
            poll_regulations = self.shared.config.poll_regulations,
            "backend-config: poll drivers started"
        );
        BackendConfigHandle {
            shutdown: shutdown_tx,
            join_handles,
        }
    }

    /// Performs a single config cycle without sleeping.
    pub async fn refresh_config_once(&self) -> Result<SyncOutcome, ServiceError> {
        self.shared.sync_config().await
    }

    /// Performs a single regulations cycle without sleeping.
    pub async fn refresh_regulations_once(&self) -> Result<SyncOutcome, ServiceError> {
        self.shared.sync_regulations().await
    }

    /// Current workspace configuration; never blocks on a fetch.
    pub fn get(&self) -> Arc<WorkspaceConfig> {
        self.shared.store.config()
    }

    /// Current regulations; never blocks on a fetch.
    pub fn regulations(&self) -> Arc<Regulations> {
        self.shared.store.regulations()
    }

    /// Both current snapshots. Each half is individually consistent.
    pub fn read(&self) -> (Arc<WorkspaceConfig>, Arc<Regulations>) {
        self.shared.store.read()
    }

    pub fn readiness(&self) -> Readiness {
        self.shared.store.readiness()
    }

    /// Returns a handle exposing last-sync timestamps and the last fetch error.
    pub fn status_handle(&self) -> Arc<SyncStatus> {
        self.shared.status.clone()
    }

    /// Returns a reference to the static service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.shared.config
    }

    /// Registers `sender` under `topic` and replays the current snapshot to it.
    ///
    /// The replay is read under the snapshot's lock, so the subscriber sees
    /// every later change either through the replay or through a publish.
    pub fn subscribe(&self, topic: Topic, sender: EventSender) {
        let shared = &self.shared;
        match topic {
            Topic::BackendConfig | Topic::ProcessConfig => {
                let guard = shared.store.read_config();
                shared.broker.register(topic, sender.clone());
                let config = if topic == Topic::ProcessConfig {
                    Arc::new(processor_view(&guard))
                } else {
                    Arc::clone(&guard)
                };
                self.replay(&sender, topic, EventData::WorkspaceConfig(config));
            }
            Topic::Regulations => {
                let guard = shared.store.read_regulations();
                shared.broker.register(topic, sender.clone());
                self.replay(&sender, topic, EventData::Regulations(Arc::clone(&guard)));
            }
        }
    }

    fn replay(&self, sender: &EventSender, topic: Topic, data: EventData) {
        if !self.shared.broker.publish_to(sender, topic, data) {
            debug!(topic = %topic, "backend-config: subscriber gone before replay");
        }
    }

    /// Creates an unbounded channel, subscribes it to `topic`, and returns its receiver.
    pub fn subscribe_channel(&self, topic: Topic) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(topic, tx);
        rx
    }

    /// Waits until the first config (and, if polled, regulations) fetch succeeded.
    ///
    /// There is no timeout: the call keeps waiting through fetch failures and
    /// logs once per poll interval while blocked.
    pub async fn wait_for_config(&self) {
        let interval = self.shared.config.poll_interval;
        let mut readiness = self.shared.store.watch_readiness();
        loop {
            if readiness.borrow_and_update().is_ready() {
                return;
            }
            match timeout(interval, readiness.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => tokio::time::sleep(interval).await,
                Err(_) => info!("backend-config: waiting for backend config"),
            }
        }
    }

    /// Workspace owning `write_key`, according to the last fetched config.
    pub fn workspace_id_for_write_key(&self, write_key: &str) -> Option<String> {
        self.shared.fetcher.workspace_id_for_write_key(write_key)
    }

    /// Libraries of `workspace_id`, according to the last fetched config.
    pub fn libraries_for_workspace(&self, workspace_id: &str) -> Libraries {
        self.shared.fetcher.libraries_for_workspace(workspace_id)
    }

    /// Replaces the telemetry sink used for reporting service signals.
    pub async fn set_telemetry(&self, telemetry: Arc<dyn BackendConfigTelemetry>) {
        let mut guard = self.shared.telemetry.write().await;
        *guard = telemetry;
    }
}
