//! Graph viewer state.

use parking_lot::RwLock;

use crate::dsl::{load_document, GraphNode, WorkflowDocument};
use crate::error::DocumentResult;
use crate::graph::{build_render_graph, RenderGraph};

#[derive(Debug, Default)]
struct GraphState {
    document: Option<WorkflowDocument>,
    render: RenderGraph,
    warnings: Vec<String>,
    selected: Option<GraphNode>,
    panel_open: bool,
    loading: bool,
    error: Option<String>,
}

/// Holds the loaded document, its derived render model, and the node
/// selection. All mutation goes through named actions; a failed action
/// leaves every field untouched.
#[derive(Debug, Default)]
pub struct GraphStore {
    state: RwLock<GraphState>,
}

impl GraphStore {
    pub fn new() -> Self {
        GraphStore::default()
    }

    /// Parse, normalize, and render `content`, then replace the store
    /// contents in one step. On error the previous document stays loaded.
    pub fn load_source(&self, content: &str) -> DocumentResult<()> {
        let loaded = load_document(content)?;
        let render = build_render_graph(&loaded.document);
        let mut state = self.state.write();
        state.document = Some(loaded.document);
        state.render = render;
        state.warnings = loaded.warnings;
        state.selected = None;
        state.panel_open = false;
        state.error = None;
        Ok(())
    }

    /// Drop the document and every derived piece of state.
    pub fn clear(&self) {
        *self.state.write() = GraphState::default();
    }

    /// Select a node by id, resolving it from the normalized document.
    /// The detail panel opens only when the id resolves; an unknown id
    /// leaves the current selection in place.
    pub fn select_node(&self, id: &str) -> bool {
        let mut state = self.state.write();
        let found = state
            .document
            .as_ref()
            .and_then(|doc| doc.workflow.graph.nodes.iter().find(|n| n.id == id))
            .cloned();
        match found {
            Some(node) => {
                state.selected = Some(node);
                state.panel_open = true;
                true
            }
            None => false,
        }
    }

    pub fn deselect_node(&self) {
        let mut state = self.state.write();
        state.selected = None;
        state.panel_open = false;
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.write().loading = loading;
    }

    pub fn set_error(&self, error: Option<String>) {
        self.state.write().error = error;
    }

    pub fn document(&self) -> Option<WorkflowDocument> {
        self.state.read().document.clone()
    }

    pub fn render_graph(&self) -> RenderGraph {
        self.state.read().render.clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.state.read().warnings.clone()
    }

    pub fn selected_node(&self) -> Option<GraphNode> {
        self.state.read().selected.clone()
    }

    pub fn is_panel_open(&self) -> bool {
        self.state.read().panel_open
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }
}
