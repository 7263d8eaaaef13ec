//! Validation and normalization of a raw document.
//!
//! Output is either a fully-defaulted [`WorkflowDocument`] or a typed
//! [`DocumentError`]; nothing in here panics or logs above `warn`.

use std::collections::HashSet;

use serde_json::Value;

use crate::dsl::parser::RawDocument;
use crate::dsl::schema::{
    supported_versions, AppMetadata, AppMode, ConversationVariable, EnvironmentVariable,
    GraphEdge, GraphNode, GraphSection, WorkflowDocument, WorkflowSection, DEFAULT_VERSION,
    KNOWN_SAFE_PATCH, SUPPORTED_VERSION_MAJOR, SUPPORTED_VERSION_MINOR,
};
use crate::error::DocumentError;

/// A normalized document together with any non-fatal compatibility warnings.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: WorkflowDocument,
    pub warnings: Vec<String>,
}

pub(crate) fn normalize(raw: RawDocument) -> Result<LoadedDocument, DocumentError> {
    let mut warnings = Vec::new();

    let version = raw
        .version
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_VERSION.to_string());
    if let Some(warning) = check_version(&version)? {
        warnings.push(warning);
    }

    if raw.kind.as_deref() != Some("app") {
        return Err(DocumentError::Schema("kind must be \"app\"".into()));
    }

    let app = raw
        .app
        .ok_or_else(|| DocumentError::Schema("app metadata is missing".into()))?;
    let name = app
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DocumentError::Schema("app.name is missing".into()))?;
    let mode = app
        .mode
        .filter(|m| !m.is_empty())
        .ok_or_else(|| DocumentError::Schema("app.mode is missing".into()))?;
    let mode: AppMode = serde_json::from_value(Value::String(mode.clone()))
        .map_err(|_| DocumentError::Schema(format!("unrecognized app.mode: {}", mode)))?;

    let workflow = raw
        .workflow
        .ok_or_else(|| DocumentError::Schema("workflow section is missing".into()))?;
    let graph = workflow
        .graph
        .ok_or_else(|| DocumentError::Schema("workflow graph is missing".into()))?;

    let nodes = sanitize_nodes(graph.nodes.unwrap_or_default());
    let edges = sanitize_edges(graph.edges.unwrap_or_default());

    let document = WorkflowDocument {
        version,
        kind: "app".into(),
        app: AppMetadata {
            name,
            mode,
            icon: app.icon.unwrap_or_else(|| "🤖".into()),
            icon_background: app.icon_background.unwrap_or_else(|| "#FFEAD5".into()),
            description: app.description.unwrap_or_default(),
            use_icon_as_answer_icon: app.use_icon_as_answer_icon.unwrap_or(false),
        },
        workflow: WorkflowSection {
            graph: GraphSection {
                nodes,
                edges,
                viewport: graph.viewport.unwrap_or_default(),
            },
            features: workflow
                .features
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            environment_variables: decode_entries::<EnvironmentVariable>(
                workflow.environment_variables.unwrap_or_default(),
                "environment variable",
            ),
            conversation_variables: decode_entries::<ConversationVariable>(
                workflow.conversation_variables.unwrap_or_default(),
                "conversation variable",
            ),
        },
    };

    Ok(LoadedDocument { document, warnings })
}

/// Check a `major.minor.patch` version string against the supported pair.
///
/// Major or minor mismatch is fatal; a patch above the known-safe threshold
/// yields a warning. A version that does not parse numerically counts as a
/// mismatch, not a parse error.
fn check_version(version: &str) -> Result<Option<String>, DocumentError> {
    let mut parts = version.split('.').map(|p| p.parse::<u32>().ok());
    let major = parts.next().flatten();
    let minor = parts.next().flatten();
    let patch = parts.next().flatten();

    if major != Some(SUPPORTED_VERSION_MAJOR) || minor != Some(SUPPORTED_VERSION_MINOR) {
        return Err(DocumentError::UnsupportedVersion {
            found: version.to_string(),
            supported: supported_versions(),
        });
    }

    if let Some(patch) = patch {
        if patch > KNOWN_SAFE_PATCH {
            return Ok(Some(format!(
                "DSL version {} may not be fully supported; some features could be unavailable",
                version
            )));
        }
    }

    Ok(None)
}

/// Drop null, non-object, id-less, and undecodable node entries, then
/// deduplicate by id keeping the first occurrence.
fn sanitize_nodes(raw_nodes: Vec<Value>) -> Vec<GraphNode> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut nodes = Vec::with_capacity(raw_nodes.len());

    for value in raw_nodes {
        if value.is_null() {
            continue;
        }
        let id = match value.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                tracing::warn!("dropping node entry without an id");
                continue;
            }
        };
        if seen.contains(&id) {
            tracing::warn!(node_id = %id, "dropping duplicate node id");
            continue;
        }
        match serde_json::from_value::<GraphNode>(value) {
            Ok(node) => {
                // A discarded malformed record must not reserve its id, so
                // ids are claimed only by records actually kept.
                seen.insert(id);
                nodes.push(node);
            }
            Err(e) => {
                tracing::warn!(node_id = %id, error = %e, "dropping malformed node entry");
            }
        }
    }

    nodes
}

/// Deduplicate edges by id keeping the first occurrence. Edges without an
/// id are never compared for duplication; undecodable entries are dropped.
fn sanitize_edges(raw_edges: Vec<Value>) -> Vec<GraphEdge> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut edges = Vec::with_capacity(raw_edges.len());

    for value in raw_edges {
        if value.is_null() {
            continue;
        }
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        if let Some(id) = &id {
            if seen.contains(id) {
                tracing::warn!(edge_id = %id, "dropping duplicate edge id");
                continue;
            }
        }
        match serde_json::from_value::<GraphEdge>(value) {
            Ok(edge) => {
                if let Some(id) = id {
                    seen.insert(id);
                }
                edges.push(edge);
            }
            Err(e) => tracing::warn!(error = %e, "dropping malformed edge entry"),
        }
    }

    edges
}

fn decode_entries<T: serde::de::DeserializeOwned>(values: Vec<Value>, what: &str) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<T>(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed {} entry", what);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::load_document;

    fn doc_yaml(version: &str, nodes: &str, edges: &str) -> String {
        format!(
            r#"
version: "{version}"
kind: app
app:
  name: Demo
  mode: workflow
workflow:
  graph:
    nodes:
{nodes}
    edges:
{edges}
"#
        )
    }

    const START_END: &str = r#"
      - id: start_1
        position: { x: 0, y: 0 }
        data: { type: start, title: Start }
      - id: end_1
        position: { x: 300, y: 0 }
        data: { type: end, title: End }
"#;

    #[test]
    fn test_normalize_fills_defaults() {
        let yaml = doc_yaml("0.1.0", START_END, "      []");
        let loaded = load_document(&yaml).unwrap();
        let doc = &loaded.document;
        assert_eq!(doc.app.icon, "🤖");
        assert_eq!(doc.app.icon_background, "#FFEAD5");
        assert_eq!(doc.app.description, "");
        assert!(!doc.app.use_icon_as_answer_icon);
        assert_eq!(doc.workflow.graph.viewport.zoom, 1.0);
        assert!(doc.workflow.environment_variables.is_empty());
        assert!(doc.workflow.conversation_variables.is_empty());
        assert!(doc.workflow.features.is_object());
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_missing_version_defaults_and_passes() {
        let yaml = r#"
kind: app
app: { name: Demo, mode: workflow }
workflow:
  graph: { nodes: [], edges: [] }
"#;
        let loaded = load_document(yaml).unwrap();
        assert_eq!(loaded.document.version, "0.1.0");
    }

    #[test]
    fn test_major_version_mismatch_rejected() {
        let yaml = doc_yaml("1.0.0", START_END, "      []");
        let err = load_document(&yaml).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_minor_version_mismatch_rejected() {
        let yaml = doc_yaml("0.2.0", START_END, "      []");
        assert!(matches!(
            load_document(&yaml),
            Err(DocumentError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_non_numeric_version_rejected() {
        let yaml = doc_yaml("abc", START_END, "      []");
        assert!(matches!(
            load_document(&yaml),
            Err(DocumentError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_high_patch_warns_but_succeeds() {
        let yaml = doc_yaml("0.1.9", START_END, "      []");
        let loaded = load_document(&yaml).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("0.1.9"));
    }

    #[test]
    fn test_patch_at_threshold_is_clean() {
        let yaml = doc_yaml("0.1.5", START_END, "      []");
        assert!(load_document(&yaml).unwrap().warnings.is_empty());
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let yaml = r#"
version: "0.1.0"
kind: workflow
app: { name: Demo, mode: workflow }
workflow:
  graph: { nodes: [], edges: [] }
"#;
        assert!(matches!(
            load_document(yaml),
            Err(DocumentError::Schema(_))
        ));
    }

    #[test]
    fn test_missing_app_fields_rejected() {
        let yaml = r#"
version: "0.1.0"
kind: app
app: { name: Demo }
workflow:
  graph: { nodes: [], edges: [] }
"#;
        let err = load_document(yaml).unwrap_err();
        assert!(err.to_string().contains("app.mode"));
    }

    #[test]
    fn test_missing_graph_rejected() {
        let yaml = r#"
version: "0.1.0"
kind: app
app: { name: Demo, mode: workflow }
workflow: {}
"#;
        let err = load_document(yaml).unwrap_err();
        assert!(err.to_string().contains("graph"));
    }

    #[test]
    fn test_unknown_app_mode_rejected() {
        let yaml = r#"
version: "0.1.0"
kind: app
app: { name: Demo, mode: pipeline }
workflow:
  graph: { nodes: [], edges: [] }
"#;
        let err = load_document(yaml).unwrap_err();
        assert!(err.to_string().contains("app.mode"));
    }

    #[test]
    fn test_null_and_idless_nodes_dropped() {
        let nodes = r#"
      - ~
      - data: { type: start, title: NoId }
      - id: a
        data: { type: start, title: A }
"#;
        let yaml = doc_yaml("0.1.0", nodes, "      []");
        let doc = load_document(&yaml).unwrap().document;
        assert_eq!(doc.workflow.graph.nodes.len(), 1);
        assert_eq!(doc.workflow.graph.nodes[0].id, "a");
    }

    #[test]
    fn test_duplicate_nodes_first_wins_in_order() {
        let nodes = r#"
      - id: a
        data: { type: start, title: First }
      - id: b
        data: { type: llm, title: Middle }
      - id: a
        data: { type: end, title: Second }
"#;
        let yaml = doc_yaml("0.1.0", nodes, "      []");
        let doc = load_document(&yaml).unwrap().document;
        let ids: Vec<_> = doc.workflow.graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(doc.workflow.graph.nodes[0].data.title, "First");
    }

    #[test]
    fn test_duplicate_edges_first_wins_idless_kept() {
        let edges = r#"
      - id: e1
        source: a
        target: b
      - id: e1
        source: a
        target: c
      - source: b
        target: c
      - source: b
        target: c
"#;
        let yaml = doc_yaml("0.1.0", START_END, edges);
        let doc = load_document(&yaml).unwrap().document;
        assert_eq!(doc.workflow.graph.edges.len(), 3);
        assert_eq!(doc.workflow.graph.edges[0].target, "b");
    }

    #[test]
    fn test_malformed_node_does_not_claim_its_id() {
        let nodes = r#"
      - id: a
        data: not-an-object
      - id: a
        data: { type: start, title: Kept }
"#;
        let yaml = doc_yaml("0.1.0", nodes, "      []");
        let doc = load_document(&yaml).unwrap().document;
        assert_eq!(doc.workflow.graph.nodes.len(), 1);
        assert_eq!(doc.workflow.graph.nodes[0].data.title, "Kept");
    }

    #[test]
    fn test_malformed_edge_does_not_claim_its_id() {
        let edges = r#"
      - id: e1
        target: b
      - id: e1
        source: a
        target: b
"#;
        let yaml = doc_yaml("0.1.0", START_END, edges);
        let doc = load_document(&yaml).unwrap().document;
        assert_eq!(doc.workflow.graph.edges.len(), 1);
        assert_eq!(doc.workflow.graph.edges[0].source, "a");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let nodes = r#"
      - id: a
        data: { type: start, title: A }
      - id: a
        data: { type: start, title: Dup }
"#;
        let yaml = doc_yaml("0.1.0", nodes, "      []");
        let first = load_document(&yaml).unwrap().document;
        let reserialized = serde_yaml::to_string(&first).unwrap();
        let second = load_document(&reserialized).unwrap().document;
        assert_eq!(first, second);
    }
}
