//! Shared fixtures for backend-config service tests.

#![cfg(test)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{BackendConfigService, ServiceConfig};
use crate::fetch::ConfigFetcher;
use crate::http::FetchError;
use crate::types::{
    Destination, Libraries, RegulationKind, Regulations, Source, WorkspaceConfig,
    WorkspaceRegulation,
};

/// One scripted fetch result.
#[derive(Debug, Clone)]
pub(crate) enum Step<T> {
    Ok(T),
    Fail(u16),
    Panic,
}

/// Fetcher replaying scripted results; the last successful value repeats once
/// the script is exhausted.
#[derive(Debug, Default)]
pub(crate) struct ScriptedFetcher {
    configs: Mutex<VecDeque<Step<WorkspaceConfig>>>,
    regulations: Mutex<VecDeque<Step<Regulations>>>,
    last_config: Mutex<Option<WorkspaceConfig>>,
    last_regulations: Mutex<Option<Regulations>>,
    pub(crate) config_calls: AtomicUsize,
    pub(crate) regulation_calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_config(&self, step: Step<WorkspaceConfig>) {
        self.configs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
    }

    pub(crate) fn push_regulations(&self, step: Step<Regulations>) {
        self.regulations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
    }

    pub(crate) fn config_calls(&self) -> usize {
        self.config_calls.load(Ordering::SeqCst)
    }
}

fn next<T: Clone>(script: &Mutex<VecDeque<Step<T>>>, last: &Mutex<Option<T>>) -> Result<T, FetchError> {
    let step = script.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
    let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
    match step {
        Some(Step::Ok(value)) => {
            *last = Some(value.clone());
            Ok(value)
        }
        Some(Step::Fail(status)) => Err(FetchError::Status(status)),
        Some(Step::Panic) => panic!("scripted fetch panic"),
        None => last.clone().ok_or(FetchError::Status(503)),
    }
}

#[async_trait]
impl ConfigFetcher for ScriptedFetcher {
    async fn fetch_config(&self) -> Result<WorkspaceConfig, FetchError> {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.configs, &self.last_config)
    }

    async fn fetch_regulations(&self) -> Result<Regulations, FetchError> {
        self.regulation_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.regulations, &self.last_regulations)
    }

    fn workspace_id_for_write_key(&self, write_key: &str) -> Option<String> {
        let last = self.last_config.lock().unwrap_or_else(PoisonError::into_inner);
        last.as_ref()
            .filter(|config| config.source_by_write_key(write_key).is_some())
            .map(|config| config.workspace_id.clone())
    }

    fn libraries_for_workspace(&self, _workspace_id: &str) -> Libraries {
        let last = self.last_config.lock().unwrap_or_else(PoisonError::into_inner);
        last.as_ref().map(|config| config.libraries.clone()).unwrap_or_default()
    }
}

/// Config used by service tests: short intervals, regulation polling as requested.
pub(crate) fn test_config(poll_regulations: bool) -> ServiceConfig {
    ServiceConfig {
        poll_interval: Duration::from_millis(20),
        regulations_poll_interval: Duration::from_millis(20),
        poll_regulations,
        ..Default::default()
    }
}

pub(crate) fn service_with(
    fetcher: &Arc<ScriptedFetcher>,
    poll_regulations: bool,
) -> BackendConfigService {
    BackendConfigService::new(test_config(poll_regulations), fetcher.clone())
}

pub(crate) fn destination(id: &str, processor_enabled: bool) -> Destination {
    Destination {
        id: id.into(),
        enabled: true,
        is_processor_enabled: processor_enabled,
        ..Default::default()
    }
}

pub(crate) fn source(id: &str, destinations: Vec<Destination>) -> Source {
    Source {
        id: id.into(),
        write_key: format!("wk-{id}"),
        workspace_id: "ws-1".into(),
        enabled: true,
        destinations,
        ..Default::default()
    }
}

pub(crate) fn workspace(sources: Vec<Source>) -> WorkspaceConfig {
    WorkspaceConfig {
        workspace_id: "ws-1".into(),
        enable_metrics: true,
        sources,
        ..Default::default()
    }
}

pub(crate) fn suppress(id: &str, user: &str) -> WorkspaceRegulation {
    WorkspaceRegulation {
        id: id.into(),
        regulation_type: RegulationKind::Suppress,
        workspace_id: "ws-1".into(),
        user_id: Some(user.into()),
    }
}
