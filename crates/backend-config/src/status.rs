//! Sync status helpers exposing when each snapshot was last refreshed and
//! the last fetch error, for diagnostics endpoints and logs.

use std::sync::{PoisonError, RwLock};

use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::store::SnapshotKind;

/// Tracks last-sync timestamps and the last fetch error.
#[derive(Debug, Default)]
pub struct SyncStatus {
    last_sync: RwLock<Option<OffsetDateTime>>,
    last_regulation_sync: RwLock<Option<OffsetDateTime>>,
    last_error: RwLock<Option<String>>,
}

impl SyncStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful snapshot update at the current time.
    pub fn record_sync(&self, kind: SnapshotKind) {
        self.record_sync_at(kind, OffsetDateTime::now_utc());
    }

    pub(crate) fn record_sync_at(&self, kind: SnapshotKind, at: OffsetDateTime) {
        let slot = match kind {
            SnapshotKind::Config => &self.last_sync,
            SnapshotKind::Regulations => &self.last_regulation_sync,
        };
        *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(at);
    }

    /// Stores the last fetch error message (or clears it when `None`).
    pub fn set_last_error(&self, error: Option<String>) {
        *self
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// RFC 3339 timestamp of the last config update.
    pub fn last_sync(&self) -> Option<String> {
        format_time(*self.last_sync.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// RFC 3339 timestamp of the last regulations update.
    pub fn last_regulation_sync(&self) -> Option<String> {
        format_time(
            *self
                .last_regulation_sync
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns a point-in-time copy of the status.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            last_sync: self.last_sync(),
            last_regulation_sync: self.last_regulation_sync(),
            last_error: self.last_error(),
        }
    }
}

fn format_time(at: Option<OffsetDateTime>) -> Option<String> {
    at.and_then(|at| at.format(&Rfc3339).ok())
}

/// Plain data representation of [`SyncStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub last_sync: Option<String>,
    pub last_regulation_sync: Option<String>,
    pub last_error: Option<String>,
}

impl StatusSnapshot {
    pub fn to_map(&self) -> Map<String, Value> {
        let to_value = |value: &Option<String>| match value {
            Some(value) => Value::String(value.clone()),
            None => Value::Null,
        };
        let mut map = Map::new();
        map.insert("lastSync".into(), to_value(&self.last_sync));
        map.insert(
            "lastRegulationSync".into(),
            to_value(&self.last_regulation_sync),
        );
        map.insert("lastError".into(), to_value(&self.last_error));
        map
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.to_map())
    }
}

/// Formats the current status as `{"lastSync":..,"lastRegulationSync":..,"lastError":..}`.
pub fn status_json(status: &SyncStatus) -> Value {
    status.snapshot().to_json()
}
