use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ================================
// Version support
// ================================

/// Supported DSL major version.
pub const SUPPORTED_VERSION_MAJOR: u32 = 0;
/// Supported DSL minor version.
pub const SUPPORTED_VERSION_MINOR: u32 = 1;
/// Patch levels above this are accepted with a compatibility warning.
pub const KNOWN_SAFE_PATCH: u32 = 5;
/// Version assumed when the document omits one.
pub const DEFAULT_VERSION: &str = "0.1.0";

/// Human-readable description of the supported version range.
pub fn supported_versions() -> String {
    format!("{}.{}.x", SUPPORTED_VERSION_MAJOR, SUPPORTED_VERSION_MINOR)
}

// ================================
// Workflow document
// ================================

/// Normalized in-memory form of an ingested workflow app export.
///
/// Produced only by [`load_document`](crate::dsl::load_document); every
/// optional field has received its documented default, so downstream
/// components never branch on "missing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub version: String,
    pub kind: String,
    pub app: AppMetadata,
    pub workflow: WorkflowSection,
}

/// App-level metadata from the document header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppMetadata {
    pub name: String,
    pub mode: AppMode,
    pub icon: String,
    pub icon_background: String,
    pub description: String,
    pub use_icon_as_answer_icon: bool,
}

/// Application mode declared by the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    #[serde(rename = "workflow")]
    Workflow,
    #[serde(rename = "advanced-chat")]
    AdvancedChat,
}

/// The `workflow` section: graph plus surrounding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSection {
    pub graph: GraphSection,
    #[serde(default)]
    pub features: Value,
    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,
    #[serde(default)]
    pub conversation_variables: Vec<ConversationVariable>,
}

/// Raw graph as declared in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSection {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub viewport: Viewport,
}

/// Initial pan/zoom of the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

// ================================
// Nodes and edges
// ================================

/// A single node record.
///
/// The record-level `type` is the renderer kind hint (normally `custom`);
/// the semantic block type lives in [`NodeData::node_type`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub record_kind: String,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// Node coordinates in the canvas (or the container's) coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Common node data. The `type` tag selects the block; all block-specific
/// configuration is captured in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A single edge record. Ids are optional in the wild; an absent id
/// normalizes to the empty string and is never deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "sourceHandle", default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(rename = "targetHandle", default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EdgeData>,
}

/// Optional edge endpoint metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeData {
    #[serde(rename = "sourceType", default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(rename = "targetType", default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

/// Environment variable declaration. Only the name is interpreted here;
/// remaining fields ride along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Conversation variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationVariable {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// ================================
// Node type
// ================================

/// Closed enum over the supported block set.
///
/// Anything outside this set is rendered as a generic placeholder rather
/// than rejected, so the enum intentionally has no catch-all variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Start,
    End,
    Answer,
    Llm,
    KnowledgeRetrieval,
    QuestionClassifier,
    IfElse,
    Code,
    TemplateTransform,
    HttpRequest,
    VariableAggregator,
    Tool,
    ParameterExtractor,
    Iteration,
    IterationStart,
    Loop,
    LoopStart,
    DocumentExtractor,
    #[serde(rename = "assigner")]
    VariableAssigner,
}

impl NodeType {
    /// Parse a block type tag; `None` for anything outside the closed set.
    pub fn parse(tag: &str) -> Option<NodeType> {
        serde_json::from_value(Value::String(tag.to_string())).ok()
    }

    /// Container types own member nodes via `parentId`. `loop` is an
    /// alias of `iteration`.
    pub fn is_container(self) -> bool {
        matches!(self, NodeType::Iteration | NodeType::Loop)
    }

    /// Synthetic entry node rendered inside a container.
    pub fn is_container_entry(self) -> bool {
        matches!(self, NodeType::IterationStart | NodeType::LoopStart)
    }

    /// Types capable of multi-output fan-out.
    pub fn is_branching(self) -> bool {
        matches!(self, NodeType::IfElse | NodeType::QuestionClassifier)
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

/// Per-type node counts in deterministic (lexicographic) order.
pub fn count_node_types(nodes: &[GraphNode]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for node in nodes {
        *counts.entry(node.data.node_type.clone()).or_insert(0) += 1;
    }
    counts
}
