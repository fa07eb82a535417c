//! Multi-workspace strategy: one hosted secret serves every workspace.
//!
//! The hosted endpoint returns one config per workspace. They are merged into
//! a single [`WorkspaceConfig`] carrying every source, with metrics disabled
//! and no workspace identifier, while the per-workspace identity is kept in
//! lookup tables for write-key resolution.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use super::ConfigFetcher;
use crate::http::{BackendClient, FetchError};
use crate::types::{Libraries, Regulations, WorkspaceConfig};

const CONFIG_ENDPOINT: &str = "/hostedWorkspaceConfig?fetchAll=true";

#[derive(Debug, Default)]
struct Lookups {
    workspace_by_write_key: HashMap<String, String>,
    libraries_by_workspace: HashMap<String, Libraries>,
}

/// Fetches and merges the configuration of every hosted workspace.
#[derive(Debug)]
pub struct MultiWorkspaceFetcher {
    client: BackendClient,
    lookups: RwLock<Lookups>,
}

impl MultiWorkspaceFetcher {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            lookups: RwLock::new(Lookups::default()),
        }
    }
}

/// Merges per-workspace configs in workspace order.
fn merge(workspaces: BTreeMap<String, WorkspaceConfig>) -> (WorkspaceConfig, Lookups) {
    let mut merged = WorkspaceConfig::default();
    let mut lookups = Lookups::default();
    for (workspace_id, config) in workspaces {
        for source in &config.sources {
            lookups
                .workspace_by_write_key
                .insert(source.write_key.clone(), workspace_id.clone());
        }
        merged.sources.extend(config.sources);
        lookups
            .libraries_by_workspace
            .insert(workspace_id, config.libraries);
    }
    (merged, lookups)
}

#[async_trait]
impl ConfigFetcher for MultiWorkspaceFetcher {
    async fn fetch_config(&self) -> Result<WorkspaceConfig, FetchError> {
        let workspaces: BTreeMap<String, WorkspaceConfig> =
            self.client.get_json(CONFIG_ENDPOINT).await?;
        debug!(
            workspaces = workspaces.len(),
            "backend-config: fetched hosted workspace configs"
        );
        let (merged, lookups) = merge(workspaces);
        *self.lookups.write().unwrap_or_else(PoisonError::into_inner) = lookups;
        Ok(merged)
    }

    /// Regulations are not served per hosted workspace.
    async fn fetch_regulations(&self) -> Result<Regulations, FetchError> {
        Ok(Regulations::default())
    }

    fn workspace_id_for_write_key(&self, write_key: &str) -> Option<String> {
        self.lookups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .workspace_by_write_key
            .get(write_key)
            .cloned()
    }

    fn libraries_for_workspace(&self, workspace_id: &str) -> Libraries {
        self.lookups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .libraries_by_workspace
            .get(workspace_id)
            .cloned()
            .unwrap_or_default()
    }
}
