//! Workspace configuration and regulation model served by the control plane.
//!
//! Field names follow the control plane's camelCase JSON. Missing collections
//! decode as empty so partially populated payloads still produce a usable
//! snapshot; unknown fields are ignored.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Free-form key/value settings attached to sources, destinations, and definitions.
pub type ConfigMap = Map<String, Value>;

/// Shared transformation libraries available to every source of a workspace.
pub type Libraries = Vec<Library>;

/// Complete configuration of a workspace as returned by the control plane.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    /// Whether usage metrics are enabled for the workspace.
    pub enable_metrics: bool,
    /// Workspace identifier (empty until the first successful fetch).
    pub workspace_id: String,
    /// Sources owned by the workspace, stored sorted by identifier once cached.
    pub sources: Vec<Source>,
    /// Shared libraries referenced by transformations.
    pub libraries: Libraries,
}

impl WorkspaceConfig {
    /// Total number of destinations across every source.
    pub fn destination_count(&self) -> usize {
        self.sources
            .iter()
            .map(|source| source.destinations.len())
            .sum()
    }

    /// Looks up a source by its write key.
    pub fn source_by_write_key(&self, write_key: &str) -> Option<&Source> {
        self.sources
            .iter()
            .find(|source| source.write_key == write_key)
    }
}

/// Category/type of a source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceDefinition {
    pub id: String,
    pub name: String,
    pub category: String,
}

/// Type of a destination, including the response handling rules of the integration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DestinationDefinition {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub config: ConfigMap,
    pub response_rules: ConfigMap,
}

/// An event source belonging to a workspace.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub source_definition: SourceDefinition,
    pub config: ConfigMap,
    pub enabled: bool,
    /// Workspace owning the source.
    pub workspace_id: String,
    /// Destinations receiving events from this source.
    pub destinations: Vec<Destination>,
    /// Credential used to route inbound events to this source.
    pub write_key: String,
}

/// A destination connected to a source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub destination_definition: DestinationDefinition,
    pub config: ConfigMap,
    pub enabled: bool,
    pub transformations: Vec<Transformation>,
    /// When set the destination's events are processed in-process instead of forwarded raw.
    pub is_processor_enabled: bool,
}

/// Reference to a transformation version applied before delivery.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transformation {
    pub version_id: String,
}

/// Reference to a shared library version.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Library {
    pub version_id: String,
}

/// Kind of data regulation requested for a user.
///
/// Labels this build does not recognise are kept verbatim in [`RegulationKind::Other`]
/// so they still compare, cache and re-encode as the control plane sent them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RegulationKind {
    #[default]
    Suppress,
    Delete,
    SuppressWithDelete,
    Other(String),
}

impl RegulationKind {
    /// Control-plane label of the kind.
    pub fn as_str(&self) -> &str {
        match self {
            RegulationKind::Suppress => "Suppress",
            RegulationKind::Delete => "Delete",
            RegulationKind::SuppressWithDelete => "Suppress_With_Delete",
            RegulationKind::Other(label) => label,
        }
    }
}

impl From<String> for RegulationKind {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Suppress" => RegulationKind::Suppress,
            "Delete" => RegulationKind::Delete,
            "Suppress_With_Delete" => RegulationKind::SuppressWithDelete,
            _ => RegulationKind::Other(label),
        }
    }
}

impl Serialize for RegulationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RegulationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(RegulationKind::from)
    }
}

/// Workspace-wide suppress/delete directive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceRegulation {
    pub id: String,
    pub regulation_type: RegulationKind,
    pub workspace_id: String,
    pub user_id: Option<String>,
}

/// Source-scoped suppress/delete directive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceRegulation {
    pub id: String,
    pub regulation_type: RegulationKind,
    pub workspace_id: String,
    pub source_id: Option<String>,
    pub user_id: Option<String>,
}

/// Current set of regulations for the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Regulations {
    pub workspace_regulations: Vec<WorkspaceRegulation>,
    pub source_regulations: Vec<SourceRegulation>,
}

impl Regulations {
    /// Returns `true` when neither list carries a directive.
    pub fn is_empty(&self) -> bool {
        self.workspace_regulations.is_empty() && self.source_regulations.is_empty()
    }
}

/// One page of workspace regulations. The `start`, `limit`, and `size`
/// fields of the listing are not needed to follow the cursor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct WorkspaceRegulationsPage {
    pub workspace_regulations: Vec<WorkspaceRegulation>,
    /// Set on the last page.
    pub end: bool,
    /// Offset of the next page.
    pub next: usize,
}

/// One page of source regulations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct SourceRegulationsPage {
    pub source_regulations: Vec<SourceRegulation>,
    pub end: bool,
    pub next: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn workspace_config_decodes_control_plane_payload() {
        let payload = json!({
            "enableMetrics": true,
            "workspaceId": "ws-1",
            "sources": [{
                "id": "src-1",
                "name": "web",
                "writeKey": "wk-1",
                "enabled": true,
                "workspaceId": "ws-1",
                "sourceDefinition": {"id": "def-1", "name": "Javascript", "category": "web"},
                "config": {"eventUpload": false},
                "destinations": [{
                    "id": "dst-1",
                    "name": "warehouse",
                    "enabled": true,
                    "isProcessorEnabled": true,
                    "destinationDefinition": {"id": "dd-1", "name": "S3", "displayName": "Amazon S3"},
                    "transformations": [{"versionId": "tv-1"}],
                    "unknownField": 42
                }]
            }],
            "libraries": [{"versionId": "lib-1"}]
        });

        let config: WorkspaceConfig = serde_json::from_value(payload).expect("decode");
        assert!(config.enable_metrics);
        assert_eq!(config.workspace_id, "ws-1");
        let source = &config.sources[0];
        assert_eq!(source.write_key, "wk-1");
        assert_eq!(source.source_definition.category, "web");
        let destination = &source.destinations[0];
        assert!(destination.is_processor_enabled);
        assert_eq!(destination.destination_definition.display_name, "Amazon S3");
        assert_eq!(destination.transformations[0].version_id, "tv-1");
        assert_eq!(config.libraries[0].version_id, "lib-1");
        assert_eq!(config.destination_count(), 1);
        assert_eq!(
            config.source_by_write_key("wk-1").map(|s| s.id.as_str()),
            Some("src-1")
        );
    }

    #[test]
    fn missing_collections_decode_as_empty() {
        let config: WorkspaceConfig = serde_json::from_str("{}").expect("decode");
        assert_eq!(config, WorkspaceConfig::default());
        let regulations: Regulations = serde_json::from_str("{}").expect("decode");
        assert!(regulations.is_empty());
    }

    #[test]
    fn regulation_kinds_use_control_plane_labels() {
        let regulations: Regulations = serde_json::from_value(json!({
            "workspaceRegulations": [
                {"id": "r1", "regulationType": "Suppress", "workspaceId": "ws", "userId": "u1"},
                {"id": "r2", "regulationType": "Suppress_With_Delete", "workspaceId": "ws"},
                {"id": "r3", "regulationType": "Anonymize", "workspaceId": "ws"}
            ],
            "sourceRegulations": [
                {"id": "r4", "regulationType": "Delete", "workspaceId": "ws", "sourceId": "src", "userId": "u2"}
            ]
        }))
        .expect("decode");

        let kinds: Vec<_> = regulations
            .workspace_regulations
            .iter()
            .map(|r| r.regulation_type.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                RegulationKind::Suppress,
                RegulationKind::SuppressWithDelete,
                RegulationKind::Other("Anonymize".into())
            ]
        );
        assert_eq!(regulations.workspace_regulations[1].user_id, None);
        let source = &regulations.source_regulations[0];
        assert_eq!(source.regulation_type, RegulationKind::Delete);
        assert_eq!(source.source_id.as_deref(), Some("src"));

        let encoded = serde_json::to_value(RegulationKind::SuppressWithDelete).expect("encode");
        assert_eq!(encoded, json!("Suppress_With_Delete"));
        let encoded = serde_json::to_value(&regulations.workspace_regulations[2]).expect("encode");
        assert_eq!(encoded["regulationType"], json!("Anonymize"));
    }
}
