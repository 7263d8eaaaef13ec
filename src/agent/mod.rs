//! Agent-facing context extraction.

mod context;

pub use context::{
    build_node_context, build_workflow_context, GraphCapabilities, LinkedNode, NodeAgentContext,
    NodeRef, WorkflowAgentContext,
};
