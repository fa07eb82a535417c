//! Single-workspace strategy: the workspace token identifies the workspace.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use super::{fetch_all_pages, ConfigEnvReplacer, ConfigFetcher};
use crate::http::{BackendClient, FetchError};
use crate::types::{
    Libraries, Regulations, SourceRegulationsPage, WorkspaceConfig, WorkspaceRegulationsPage,
};

const CONFIG_ENDPOINT: &str = "/workspaceConfig?fetchAll=true";
const WORKSPACE_REGULATIONS_ENDPOINT: &str = "/workspaces/regulations/workspaceRegulations";
const SOURCE_REGULATIONS_ENDPOINT: &str = "/workspaces/regulations/sourceRegulations";

/// Workspace identity remembered from the last successful fetch.
#[derive(Debug, Clone, Default)]
struct KnownWorkspace {
    workspace_id: String,
    libraries: Libraries,
}

/// Fetches the configuration of the single workspace owning the token.
pub struct SingleWorkspaceFetcher {
    client: BackendClient,
    max_regulations_per_request: usize,
    replacer: Option<Arc<dyn ConfigEnvReplacer>>,
    known: RwLock<Option<KnownWorkspace>>,
}

impl std::fmt::Debug for SingleWorkspaceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleWorkspaceFetcher")
            .field("client", &self.client)
            .field("max_regulations_per_request", &self.max_regulations_per_request)
            .field("env_replacement", &self.replacer.is_some())
            .finish()
    }
}

impl SingleWorkspaceFetcher {
    pub fn new(
        client: BackendClient,
        max_regulations_per_request: usize,
        replacer: Option<Arc<dyn ConfigEnvReplacer>>,
    ) -> Self {
        Self {
            client,
            max_regulations_per_request: max_regulations_per_request.max(1),
            replacer,
            known: RwLock::new(None),
        }
    }

    fn decode(&self, raw: Vec<u8>) -> Result<WorkspaceConfig, FetchError> {
        let raw = match &self.replacer {
            Some(replacer) => replacer.replace(&raw).map_err(FetchError::Replacement)?,
            None => raw,
        };
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[async_trait]
impl ConfigFetcher for SingleWorkspaceFetcher {
    async fn fetch_config(&self) -> Result<WorkspaceConfig, FetchError> {
        let raw = self.client.get_bytes(CONFIG_ENDPOINT).await?;
        let config = self.decode(raw)?;
        *self.known.write().unwrap_or_else(PoisonError::into_inner) = Some(KnownWorkspace {
            workspace_id: config.workspace_id.clone(),
            libraries: config.libraries.clone(),
        });
        Ok(config)
    }

    async fn fetch_regulations(&self) -> Result<Regulations, FetchError> {
        let workspace_regulations = fetch_all_pages::<WorkspaceRegulationsPage>(
            &self.client,
            WORKSPACE_REGULATIONS_ENDPOINT,
            self.max_regulations_per_request,
        )
        .await?;
        let source_regulations = fetch_all_pages::<SourceRegulationsPage>(
            &self.client,
            SOURCE_REGULATIONS_ENDPOINT,
            self.max_regulations_per_request,
        )
        .await?;
        debug!(
            workspace = workspace_regulations.len(),
            source = source_regulations.len(),
            "backend-config: fetched regulations"
        );
        Ok(Regulations {
            workspace_regulations,
            source_regulations,
        })
    }

    /// Every write key served by this control plane belongs to the token's workspace.
    fn workspace_id_for_write_key(&self, _write_key: &str) -> Option<String> {
        self.known
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|known| known.workspace_id.clone())
    }

    fn libraries_for_workspace(&self, _workspace_id: &str) -> Libraries {
        self.known
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|known| known.libraries.clone())
            .unwrap_or_default()
    }
}
