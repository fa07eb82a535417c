//! Shared fixtures for backend-config integration tests.

#![allow(dead_code)]

use std::time::Duration;

use backend_config::ServiceConfig;
use httptest::Server;
use serde_json::{json, Value};

/// `base64("token:")`
pub const TOKEN_AUTH: &str = "Basic dG9rZW46";

/// Service configuration pointing at `server` with fast poll intervals.
pub fn config_for(server: &Server) -> ServiceConfig {
    ServiceConfig {
        config_backend_url: server.url_str(""),
        workspace_token: "token".into(),
        poll_interval: Duration::from_millis(25),
        regulations_poll_interval: Duration::from_millis(25),
        max_regulations_per_request: 2,
        ..Default::default()
    }
}

/// A workspace payload as served by `/workspaceConfig`, sources in the given order.
pub fn workspace_payload(workspace_id: &str, sources: &[Value]) -> Value {
    json!({
        "workspaceId": workspace_id,
        "enableMetrics": true,
        "sources": sources,
        "libraries": [{"versionId": format!("{workspace_id}-lib")}]
    })
}

/// A source with the given `(destination id, processor enabled)` pairs.
pub fn source_payload(id: &str, workspace_id: &str, destinations: &[(&str, bool)]) -> Value {
    let destinations: Vec<Value> = destinations
        .iter()
        .map(|(id, processor)| {
            json!({
                "id": id,
                "name": format!("dest-{id}"),
                "enabled": true,
                "isProcessorEnabled": processor,
                "destinationDefinition": {"id": "def", "name": "WEBHOOK", "displayName": "Webhook"}
            })
        })
        .collect();
    json!({
        "id": id,
        "name": format!("source-{id}"),
        "writeKey": format!("wk-{id}"),
        "enabled": true,
        "workspaceId": workspace_id,
        "sourceDefinition": {"id": "sd", "name": "HTTP", "category": "web"},
        "destinations": destinations
    })
}

/// A single regulations page.
pub fn regulations_page(key: &str, entries: Value, end: bool, next: usize) -> Value {
    let mut page = json!({"end": end, "next": next});
    page[key] = entries;
    page
}
