//! Structured summaries of the loaded graph for the assistant.
//!
//! Read-only and deterministic: everything here is derived from the
//! normalized document with no side effects.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::dsl::schema::{
    count_node_types, AppMode, GraphNode, NodeData, NodeType, WorkflowDocument,
};

/// Lightweight node reference used in summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRef {
    pub id: String,
    pub title: String,
}

/// A neighboring node, including its block type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedNode {
    pub id: String,
    pub title: String,
    pub node_type: String,
}

/// Capability flags computed by existence-testing the node-type inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GraphCapabilities {
    pub has_iteration: bool,
    pub has_conditional_branching: bool,
    pub uses_knowledge_retrieval: bool,
    pub uses_external_tools: bool,
    pub uses_http_requests: bool,
    pub uses_code_execution: bool,
    pub has_memory: bool,
}

/// Whole-graph summary handed to the assistant alongside a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowAgentContext {
    pub app_name: String,
    pub app_mode: AppMode,
    pub app_description: String,
    pub total_nodes: usize,
    pub node_type_counts: BTreeMap<String, usize>,
    /// Empty ref when the document has no start node; never an error.
    pub entry_point: NodeRef,
    pub exit_points: Vec<NodeRef>,
    pub environment_variables: Vec<String>,
    pub conversation_variables: Vec<String>,
    pub graph_summary: GraphCapabilities,
}

/// Per-node summary for a selected node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeAgentContext {
    pub node_id: String,
    pub node_type: String,
    pub node_title: String,
    pub node_description: String,
    /// Type-specific whitelist extraction of the payload.
    pub node_data: serde_json::Map<String, Value>,
    pub incoming: Vec<LinkedNode>,
    pub outgoing: Vec<LinkedNode>,
    pub parent_container: Option<NodeRef>,
}

/// Build the whole-graph summary.
pub fn build_workflow_context(document: &WorkflowDocument) -> WorkflowAgentContext {
    let nodes = &document.workflow.graph.nodes;

    let entry_point = nodes
        .iter()
        .find(|n| n.data.node_type == "start")
        .map(node_ref)
        .unwrap_or(NodeRef {
            id: String::new(),
            title: String::new(),
        });

    let exit_points = nodes
        .iter()
        .filter(|n| matches!(n.data.node_type.as_str(), "end" | "answer"))
        .map(node_ref)
        .collect();

    WorkflowAgentContext {
        app_name: document.app.name.clone(),
        app_mode: document.app.mode,
        app_description: document.app.description.clone(),
        total_nodes: nodes.len(),
        node_type_counts: count_node_types(nodes),
        entry_point,
        exit_points,
        environment_variables: document
            .workflow
            .environment_variables
            .iter()
            .map(|v| v.name.clone())
            .collect(),
        conversation_variables: document
            .workflow
            .conversation_variables
            .iter()
            .map(|v| v.name.clone())
            .collect(),
        graph_summary: capabilities(nodes),
    }
}

/// Build the per-node summary, or `None` when the id is unknown.
///
/// Predecessors and successors come from a single scan over the edge list,
/// O(E) per call.
pub fn build_node_context(document: &WorkflowDocument, node_id: &str) -> Option<NodeAgentContext> {
    let graph = &document.workflow.graph;
    let node = graph.nodes.iter().find(|n| n.id == node_id)?;

    let mut incoming = Vec::new();
    let mut outgoing = Vec::new();
    for edge in &graph.edges {
        if edge.target == node_id {
            if let Some(source) = graph.nodes.iter().find(|n| n.id == edge.source) {
                incoming.push(linked_node(source));
            }
        }
        if edge.source == node_id {
            if let Some(target) = graph.nodes.iter().find(|n| n.id == edge.target) {
                outgoing.push(linked_node(target));
            }
        }
    }

    let parent_container = node
        .parent_id
        .as_deref()
        .and_then(|pid| graph.nodes.iter().find(|n| n.id == pid))
        .map(node_ref);

    Some(NodeAgentContext {
        node_id: node.id.clone(),
        node_type: node.data.node_type.clone(),
        node_title: title_of(node),
        node_description: node.data.desc.clone(),
        node_data: extract_node_payload(&node.data),
        incoming,
        outgoing,
        parent_container,
    })
}

fn capabilities(nodes: &[GraphNode]) -> GraphCapabilities {
    let has_type = |pred: fn(NodeType) -> bool| {
        nodes
            .iter()
            .filter_map(|n| NodeType::parse(&n.data.node_type))
            .any(pred)
    };
    GraphCapabilities {
        has_iteration: has_type(NodeType::is_container),
        has_conditional_branching: has_type(|t| t == NodeType::IfElse),
        uses_knowledge_retrieval: has_type(|t| t == NodeType::KnowledgeRetrieval),
        uses_external_tools: has_type(|t| t == NodeType::Tool),
        uses_http_requests: has_type(|t| t == NodeType::HttpRequest),
        uses_code_execution: has_type(|t| t == NodeType::Code),
        has_memory: nodes.iter().any(memory_enabled),
    }
}

/// An llm node with a windowed conversational memory turned on.
fn memory_enabled(node: &GraphNode) -> bool {
    node.data.node_type == "llm"
        && node
            .data
            .extra
            .get("memory")
            .and_then(|m| m.get("window"))
            .and_then(|w| w.get("enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
}

/// Fields forwarded to the assistant, per block type. UI bookkeeping
/// (positions, handle caches, `_`-prefixed fields) is deliberately absent.
fn payload_whitelist(node_type: &str) -> &'static [&'static str] {
    match node_type {
        "llm" => &["model", "prompt_template", "memory", "context", "vision"],
        "code" => &["code_language", "code", "outputs", "dependencies"],
        "http-request" => &["method", "url", "headers", "body", "authorization"],
        "if-else" => &["cases"],
        "knowledge-retrieval" => &["dataset_ids", "retrieval_mode"],
        "iteration" | "loop" => &[
            "iterator_selector",
            "output_selector",
            "is_parallel",
            "parallel_nums",
            "error_handle_mode",
        ],
        "tool" => &[
            "provider_id",
            "provider_type",
            "tool_name",
            "tool_label",
            "tool_parameters",
        ],
        "question-classifier" => &["classes", "instruction"],
        "parameter-extractor" => &["parameters", "reasoning_mode"],
        "assigner" => &["items"],
        "start" => &["variables"],
        "end" => &["outputs"],
        "answer" => &["answer"],
        _ => &[],
    }
}

fn extract_node_payload(data: &NodeData) -> serde_json::Map<String, Value> {
    let mut out = serde_json::Map::new();

    // Input variable declarations are meaningful for every block type.
    if let Some(variables) = data.extra.get("variables") {
        out.insert("variables".into(), variables.clone());
    }

    for key in payload_whitelist(&data.node_type) {
        if let Some(value) = data.extra.get(*key) {
            out.insert((*key).to_string(), value.clone());
        }
    }

    // Retrieval tuning lives one level down in the payload.
    if data.node_type == "knowledge-retrieval" {
        if let Some(config) = data.extra.get("multiple_retrieval_config") {
            for key in ["top_k", "score_threshold"] {
                if let Some(value) = config.get(key) {
                    out.insert(key.to_string(), value.clone());
                }
            }
        }
    }

    out
}

fn title_of(node: &GraphNode) -> String {
    if node.data.title.is_empty() {
        node.data.node_type.clone()
    } else {
        node.data.title.clone()
    }
}

fn node_ref(node: &GraphNode) -> NodeRef {
    NodeRef {
        id: node.id.clone(),
        title: title_of(node),
    }
}

fn linked_node(node: &GraphNode) -> LinkedNode {
    LinkedNode {
        id: node.id.clone(),
        title: title_of(node),
        node_type: node.data.node_type.clone(),
    }
}
