//! Processor view of a workspace configuration.

use tracing::trace;

use crate::types::{Source, WorkspaceConfig};

/// Returns a copy of `config` in which every source keeps only its
/// processor-enabled destinations.
///
/// Workspace identity, metrics flag, libraries, and every source are carried
/// over unchanged. The view is computed fresh on every call and never cached.
pub fn processor_view(config: &WorkspaceConfig) -> WorkspaceConfig {
    let sources = config
        .sources
        .iter()
        .map(|source| Source {
            destinations: source
                .destinations
                .iter()
                .filter(|destination| {
                    trace!(
                        destination = %destination.name,
                        processor_enabled = destination.is_processor_enabled,
                        "backend-config: projecting destination"
                    );
                    destination.is_processor_enabled
                })
                .cloned()
                .collect(),
            ..source.clone()
        })
        .collect();

    WorkspaceConfig {
        enable_metrics: config.enable_metrics,
        workspace_id: config.workspace_id.clone(),
        sources,
        libraries: config.libraries.clone(),
    }
}
