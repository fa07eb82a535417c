//! In-memory snapshot store for the workspace configuration and regulations.
//!
//! Each snapshot lives behind its own read/write lock and is replaced as a
//! whole `Arc`, so readers observe either the previous or the new snapshot,
//! never a mix. Readiness flags are published through a `watch` channel so
//! the readiness gate wakes as soon as both halves have been fetched.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tokio::sync::watch;

use crate::types::{Regulations, WorkspaceConfig};

/// Snapshot kinds held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    Config,
    Regulations,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Regulations => "regulations",
        }
    }
}

/// Readiness flags observed by the readiness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    /// At least one config fetch succeeded and was cached.
    pub config_ready: bool,
    /// At least one regulations fetch succeeded, or regulation polling is disabled.
    pub regulations_ready: bool,
}

impl Readiness {
    /// Returns `true` once both halves are ready.
    pub fn is_ready(&self) -> bool {
        self.config_ready && self.regulations_ready
    }
}

/// Holds the current snapshots and readiness state.
#[derive(Debug)]
pub struct SnapshotStore {
    config: RwLock<Arc<WorkspaceConfig>>,
    regulations: RwLock<Arc<Regulations>>,
    readiness: watch::Sender<Readiness>,
}

impl SnapshotStore {
    /// Creates an empty store.
    ///
    /// When `wait_for_regulations` is false the regulations half is reported
    /// ready from the start.
    pub fn new(wait_for_regulations: bool) -> Self {
        let (readiness, _) = watch::channel(Readiness {
            config_ready: false,
            regulations_ready: !wait_for_regulations,
        });
        Self {
            config: RwLock::new(Arc::new(WorkspaceConfig::default())),
            regulations: RwLock::new(Arc::new(Regulations::default())),
            readiness,
        }
    }

    /// Returns the current workspace configuration.
    pub fn config(&self) -> Arc<WorkspaceConfig> {
        self.read_config().clone()
    }

    /// Returns the current regulations.
    pub fn regulations(&self) -> Arc<Regulations> {
        self.read_regulations().clone()
    }

    /// Returns both snapshots. Each half is individually consistent.
    pub fn read(&self) -> (Arc<WorkspaceConfig>, Arc<Regulations>) {
        (self.config(), self.regulations())
    }

    /// Holds the config read lock; used to deliver replays consistent with a point in time.
    pub(crate) fn read_config(&self) -> RwLockReadGuard<'_, Arc<WorkspaceConfig>> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Holds the regulations read lock.
    pub(crate) fn read_regulations(&self) -> RwLockReadGuard<'_, Arc<Regulations>> {
        self.regulations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the cached configuration and marks the config half ready.
    pub(crate) fn write_config(&self, config: Arc<WorkspaceConfig>) {
        {
            let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
            *guard = config;
        }
        self.readiness.send_modify(|state| state.config_ready = true);
    }

    /// Replaces the cached regulations and marks the regulations half ready.
    pub(crate) fn write_regulations(&self, regulations: Arc<Regulations>) {
        {
            let mut guard = self
                .regulations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *guard = regulations;
        }
        self.readiness
            .send_modify(|state| state.regulations_ready = true);
    }

    /// Marks `kind` ready without touching its snapshot.
    ///
    /// Used when a successful fetch matched the cached snapshot, which is how
    /// an empty workspace becomes ready.
    pub(crate) fn mark_ready(&self, kind: SnapshotKind) {
        self.readiness.send_if_modified(|state| {
            let flag = match kind {
                SnapshotKind::Config => &mut state.config_ready,
                SnapshotKind::Regulations => &mut state.regulations_ready,
            };
            let changed = !*flag;
            *flag = true;
            changed
        });
    }

    /// Current readiness flags.
    pub fn readiness(&self) -> Readiness {
        *self.readiness.borrow()
    }

    /// Subscribes to readiness transitions.
    pub(crate) fn watch_readiness(&self) -> watch::Receiver<Readiness> {
        self.readiness.subscribe()
    }
}
