//! Fetch strategies used by the poll drivers.
//!
//! The service only sees the [`ConfigFetcher`] abstraction; the concrete
//! strategy is picked once by [`fetcher_for`] from
//! [`ServiceConfig::multi_workspace`] and injected at construction.

mod multi;
mod single;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::http::{BackendClient, FetchError};
use crate::service::ServiceConfig;
use crate::types::{
    Libraries, Regulations, SourceRegulation, SourceRegulationsPage, WorkspaceConfig,
    WorkspaceRegulation, WorkspaceRegulationsPage,
};

pub use multi::MultiWorkspaceFetcher;
pub use single::SingleWorkspaceFetcher;

/// Source of workspace configuration and regulations.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    /// Fetches the current workspace configuration.
    async fn fetch_config(&self) -> Result<WorkspaceConfig, FetchError>;

    /// Fetches the current regulations.
    async fn fetch_regulations(&self) -> Result<Regulations, FetchError>;

    /// Resolves the workspace owning `write_key`, based on the last fetched config.
    fn workspace_id_for_write_key(&self, write_key: &str) -> Option<String>;

    /// Libraries of `workspace_id`, based on the last fetched config.
    fn libraries_for_workspace(&self, workspace_id: &str) -> Libraries;
}

/// Substitutes environment references inside a raw config payload before it is decoded.
pub trait ConfigEnvReplacer: Send + Sync {
    fn replace(&self, raw: &[u8]) -> Result<Vec<u8>, String>;
}

/// Builds the fetch strategy selected by `config`.
///
/// `replacer` is only consulted in single-workspace mode with env replacement enabled.
pub fn fetcher_for(
    config: &ServiceConfig,
    replacer: Option<Arc<dyn ConfigEnvReplacer>>,
) -> Result<Arc<dyn ConfigFetcher>, FetchError> {
    if config.multi_workspace {
        let client = BackendClient::new(&config.config_backend_url, &config.multi_workspace_secret)?;
        Ok(Arc::new(MultiWorkspaceFetcher::new(client)))
    } else {
        let client = BackendClient::new(&config.config_backend_url, &config.workspace_token)?;
        let replacer = replacer.filter(|_| config.env_replacement_enabled);
        Ok(Arc::new(SingleWorkspaceFetcher::new(
            client,
            config.max_regulations_per_request,
            replacer,
        )))
    }
}

/// A page of a paginated regulations listing.
pub(crate) trait RegulationPage: DeserializeOwned {
    type Item;

    /// Splits the page into its items, the end marker, and the next cursor.
    fn into_parts(self) -> (Vec<Self::Item>, bool, usize);
}

impl RegulationPage for WorkspaceRegulationsPage {
    type Item = WorkspaceRegulation;

    fn into_parts(self) -> (Vec<Self::Item>, bool, usize) {
        (self.workspace_regulations, self.end, self.next)
    }
}

impl RegulationPage for SourceRegulationsPage {
    type Item = SourceRegulation;

    fn into_parts(self) -> (Vec<Self::Item>, bool, usize) {
        (self.source_regulations, self.end, self.next)
    }
}

/// Follows `next` cursors on `path` until the control plane reports the end.
pub(crate) async fn fetch_all_pages<P: RegulationPage>(
    client: &BackendClient,
    path: &str,
    limit: usize,
) -> Result<Vec<P::Item>, FetchError> {
    let mut items = Vec::new();
    let mut start = 0;
    loop {
        let page: P = client
            .get_json(&format!("{path}?start={start}&limit={limit}"))
            .await?;
        let (page_items, end, next) = page.into_parts();
        items.extend(page_items);
        if end {
            return Ok(items);
        }
        if next <= start {
            return Err(FetchError::Pagination { start, next });
        }
        start = next;
    }
}
