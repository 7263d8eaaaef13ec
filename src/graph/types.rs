use serde::Serialize;

use crate::dsl::schema::{NodeData, Viewport};

// Renderer kind strings understood by the graph surface.
pub const RENDER_KIND_CUSTOM: &str = "custom";
pub const RENDER_KIND_ITERATION_START: &str = "custom-iteration-start";
pub const RENDER_KIND_LOOP_START: &str = "custom-loop-start";

// Z-order: members must always paint above their container.
pub const CONTAINER_Z_INDEX: i64 = 1;
pub const CONTAINER_CHILD_Z_INDEX: i64 = 1002;

// Fallback extent for container nodes with no declared size.
pub const DEFAULT_CONTAINER_WIDTH: f64 = 600.0;
pub const DEFAULT_CONTAINER_HEIGHT: f64 = 400.0;

// Handle ids synthesized when an edge or node declares none.
pub const DEFAULT_SOURCE_HANDLE: &str = "source";
pub const DEFAULT_TARGET_HANDLE: &str = "target";

/// The complete renderable model handed to the graph surface.
///
/// Derived-only: recomputed wholesale from a normalized document, never
/// mutated incrementally.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RenderGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    pub viewport: Viewport,
}

/// One renderable node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: String,
    /// Renderer kind (`custom` unless the record pins a container-entry kind).
    pub kind: String,
    pub position: crate::dsl::schema::Position,
    pub data: NodeData,
    pub parent_id: Option<String>,
    /// Confined to the container's coordinate space.
    pub extent_parent: bool,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub z_index: Option<i64>,
    /// Resolved output handles; one entry per branch for fan-out nodes.
    pub branches: Vec<BranchHandle>,
    /// Set when the block type is outside the closed enum; the surface
    /// renders a generic placeholder instead of failing.
    pub placeholder: bool,
    pub draggable: bool,
    pub connectable: bool,
    pub selectable: bool,
}

/// A named output connection point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchHandle {
    pub id: String,
    pub label: String,
}

/// One renderable edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
    pub kind: String,
    pub source_type: Option<String>,
    pub target_type: Option<String>,
    pub deletable: bool,
    pub updatable: bool,
}
