//! Pure transform from a normalized document to the render model.
//!
//! Deterministic by construction: no ids are minted, no ordering changes,
//! and no validation happens here — a node referencing a missing parent
//! passes through as an orphaned visual child.

use serde_json::Value;

use crate::dsl::schema::{GraphEdge, GraphNode, NodeType, WorkflowDocument};

use super::handles::resolve_branch_handles;
use super::types::*;

/// Build the renderable graph for a normalized document.
///
/// Same document in, same model out, always.
pub fn build_render_graph(document: &WorkflowDocument) -> RenderGraph {
    let graph = &document.workflow.graph;
    RenderGraph {
        nodes: graph.nodes.iter().map(transform_node).collect(),
        edges: graph.edges.iter().map(transform_edge).collect(),
        viewport: graph.viewport,
    }
}

fn transform_node(node: &GraphNode) -> RenderNode {
    let node_type = NodeType::parse(&node.data.node_type);
    if node_type.is_none() {
        tracing::debug!(node_id = %node.id, node_type = %node.data.node_type,
            "unknown node type, rendering placeholder");
    }
    let is_container = node_type.is_some_and(NodeType::is_container);
    let is_member = node.parent_id.is_some();

    let (width, height) = if is_container {
        (
            Some(resolve_container_dimension(node, node.width, "width", DEFAULT_CONTAINER_WIDTH)),
            Some(resolve_container_dimension(node, node.height, "height", DEFAULT_CONTAINER_HEIGHT)),
        )
    } else {
        (None, None)
    };

    let z_index = if is_member {
        Some(CONTAINER_CHILD_Z_INDEX)
    } else if is_container {
        Some(CONTAINER_Z_INDEX)
    } else {
        None
    };

    RenderNode {
        id: node.id.clone(),
        kind: render_kind(&node.record_kind),
        position: node.position,
        data: node.data.clone(),
        parent_id: node.parent_id.clone(),
        extent_parent: is_member,
        width,
        height,
        z_index,
        branches: resolve_branch_handles(&node.data),
        placeholder: node_type.is_none(),
        draggable: false,
        connectable: false,
        selectable: true,
    }
}

/// Explicit record size wins, then the payload's own size, then the fixed
/// fallback.
fn resolve_container_dimension(
    node: &GraphNode,
    explicit: Option<f64>,
    key: &str,
    fallback: f64,
) -> f64 {
    explicit
        .or_else(|| node.data.extra.get(key).and_then(Value::as_f64))
        .unwrap_or(fallback)
}

/// Container-entry records keep their pinned renderer kind; everything
/// else renders through the generic custom node.
fn render_kind(record_kind: &str) -> String {
    match record_kind {
        RENDER_KIND_ITERATION_START | RENDER_KIND_LOOP_START => record_kind.to_string(),
        _ => RENDER_KIND_CUSTOM.to_string(),
    }
}

fn transform_edge(edge: &GraphEdge) -> RenderEdge {
    let data = edge.data.clone().unwrap_or_default();
    RenderEdge {
        id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
        source_handle: edge
            .source_handle
            .clone()
            .unwrap_or_else(|| DEFAULT_SOURCE_HANDLE.to_string()),
        target_handle: edge
            .target_handle
            .clone()
            .unwrap_or_else(|| DEFAULT_TARGET_HANDLE.to_string()),
        kind: RENDER_KIND_CUSTOM.to_string(),
        source_type: data.source_type,
        target_type: data.target_type,
        deletable: false,
        updatable: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::load_document;
    use serde_json::json;

    fn node(id: &str, ty: &str, extra: serde_json::Value) -> GraphNode {
        serde_json::from_value(json!({
            "id": id,
            "position": {"x": 0.0, "y": 0.0},
            "data": {"type": ty, "title": id, "extra_marker": true}
        }))
        .map(|mut n: GraphNode| {
            if let Some(obj) = extra.as_object() {
                for (k, v) in obj {
                    n.data.extra.insert(k.clone(), v.clone());
                }
            }
            n
        })
        .unwrap()
    }

    fn document_with(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> WorkflowDocument {
        let mut doc: WorkflowDocument = load_document(
            r#"
version: "0.1.0"
kind: app
app: { name: Demo, mode: workflow }
workflow:
  graph: { nodes: [], edges: [] }
"#,
        )
        .unwrap()
        .document;
        doc.workflow.graph.nodes = nodes;
        doc.workflow.graph.edges = edges;
        doc
    }

    #[test]
    fn test_render_nodes_are_read_only() {
        let doc = document_with(vec![node("start_1", "start", json!({}))], vec![]);
        let model = build_render_graph(&doc);
        let n = &model.nodes[0];
        assert!(!n.draggable);
        assert!(!n.connectable);
        assert!(n.selectable);
        assert!(!n.placeholder);
        assert_eq!(n.kind, RENDER_KIND_CUSTOM);
    }

    #[test]
    fn test_container_members_confined_with_higher_z_order() {
        let mut container = node("iter_1", "iteration", json!({}));
        container.width = Some(800.0);
        let mut member_a = node("child_a", "llm", json!({}));
        member_a.parent_id = Some("iter_1".into());
        let mut member_b = node("child_b", "code", json!({}));
        member_b.parent_id = Some("iter_1".into());

        let doc = document_with(vec![container, member_a, member_b], vec![]);
        let model = build_render_graph(&doc);

        let container = &model.nodes[0];
        assert_eq!(container.z_index, Some(CONTAINER_Z_INDEX));
        assert_eq!(container.width, Some(800.0));
        assert_eq!(container.height, Some(DEFAULT_CONTAINER_HEIGHT));
        assert!(!container.extent_parent);

        for member in &model.nodes[1..] {
            assert_eq!(member.z_index, Some(CONTAINER_CHILD_Z_INDEX));
            assert!(member.z_index.unwrap() > container.z_index.unwrap());
            assert!(member.extent_parent);
            assert_eq!(member.parent_id.as_deref(), Some("iter_1"));
        }
    }

    #[test]
    fn test_container_size_payload_fallback() {
        let container = node("loop_1", "loop", json!({"width": 720.0, "height": 320.0}));
        let doc = document_with(vec![container], vec![]);
        let model = build_render_graph(&doc);
        assert_eq!(model.nodes[0].width, Some(720.0));
        assert_eq!(model.nodes[0].height, Some(320.0));
    }

    #[test]
    fn test_non_container_nodes_have_no_size() {
        let mut llm = node("llm_1", "llm", json!({}));
        llm.width = Some(240.0);
        let doc = document_with(vec![llm], vec![]);
        assert_eq!(build_render_graph(&doc).nodes[0].width, None);
    }

    #[test]
    fn test_unknown_type_renders_placeholder() {
        let doc = document_with(vec![node("x", "warp-drive", json!({}))], vec![]);
        let model = build_render_graph(&doc);
        assert!(model.nodes[0].placeholder);
        assert_eq!(model.nodes[0].kind, RENDER_KIND_CUSTOM);
    }

    #[test]
    fn test_container_entry_kind_preserved() {
        let mut entry = node("iter_start", "iteration-start", json!({}));
        entry.record_kind = RENDER_KIND_ITERATION_START.to_string();
        entry.parent_id = Some("iter_1".into());
        let doc = document_with(vec![entry], vec![]);
        let model = build_render_graph(&doc);
        assert_eq!(model.nodes[0].kind, RENDER_KIND_ITERATION_START);
    }

    #[test]
    fn test_edge_defaults_and_metadata() {
        let edges = vec![
            serde_json::from_value(json!({
                "id": "e1", "source": "a", "target": "b",
                "sourceHandle": "true",
                "data": {"sourceType": "if-else", "targetType": "llm"}
            }))
            .unwrap(),
            serde_json::from_value(json!({"source": "b", "target": "c"})).unwrap(),
        ];
        let doc = document_with(vec![], edges);
        let model = build_render_graph(&doc);
        assert_eq!(model.edges[0].source_handle, "true");
        assert_eq!(model.edges[0].source_type.as_deref(), Some("if-else"));
        assert!(!model.edges[0].deletable);
        assert!(!model.edges[0].updatable);
        assert_eq!(model.edges[1].source_handle, DEFAULT_SOURCE_HANDLE);
        assert_eq!(model.edges[1].target_handle, DEFAULT_TARGET_HANDLE);
        assert_eq!(model.edges[1].id, "");
    }

    #[test]
    fn test_dangling_edge_passes_through() {
        let edges = vec![serde_json::from_value::<GraphEdge>(
            json!({"id": "e1", "source": "ghost", "target": "phantom"}),
        )
        .unwrap()];
        let doc = document_with(vec![], edges);
        assert_eq!(build_render_graph(&doc).edges.len(), 1);
    }

    #[test]
    fn test_builder_is_pure() {
        let mut member = node("m", "llm", json!({}));
        member.parent_id = Some("iter".into());
        let doc = document_with(
            vec![node("iter", "iteration", json!({})), member],
            vec![serde_json::from_value(json!({"id": "e", "source": "iter", "target": "m"})).unwrap()],
        );
        assert_eq!(build_render_graph(&doc), build_render_graph(&doc));
    }
}
