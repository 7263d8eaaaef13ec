//! # Flowscope — A Dify-compatible Workflow Viewer Core
//!
//! `flowscope` is the headless core of a read-only viewer for Dify-style
//! workflow DSL documents. It parses and normalizes workflow YAML, derives
//! a render-ready graph model, extracts structured context for an AI
//! assistant, and drives a streaming conversation about the loaded
//! document:
//!
//! - **Validation & normalization**: lenient YAML loading that drops
//!   malformed node and edge records with warnings, dedupes by id, gates
//!   on the supported DSL version, and fills defaults so downstream code
//!   sees a fully-populated document.
//! - **Graph model**: a pure transformation from the normalized document
//!   to a render graph with container membership, z-ordering, read-only
//!   interaction flags, and resolved branch handles for if-else and
//!   question-classifier nodes.
//! - **Agent context**: workflow- and node-level summaries (entry/exit
//!   points, capability flags, per-type payload extraction) suitable for
//!   grounding an assistant prompt.
//! - **Streaming chat**: a state-machine client for a `data:`-framed
//!   newline-delimited event stream, plus a session driver that streams
//!   answers into the conversation store turn by turn.
//! - **State stores**: thread-safe graph and chat stores with named
//!   actions and atomic updates.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use flowscope::dsl::load_document;
//! use flowscope::graph::build_render_graph;
//!
//! let yaml = std::fs::read_to_string("workflow.yaml").unwrap();
//! let loaded = load_document(&yaml).unwrap();
//! for warning in &loaded.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! let graph = build_render_graph(&loaded.document);
//! println!("{} nodes, {} edges", graph.nodes.len(), graph.edges.len());
//! ```

pub mod agent;
pub mod chat;
pub mod dsl;
pub mod error;
pub mod graph;
pub mod store;

pub use agent::{build_node_context, build_workflow_context};
pub use chat::{ChatSession, RequestPhase, StreamingClient};
pub use dsl::{load_document, LoadedDocument, WorkflowDocument};
pub use error::{ChatError, DocumentError, DocumentResult};
pub use graph::{build_render_graph, RenderGraph};
pub use store::{ChatStore, GraphStore};
