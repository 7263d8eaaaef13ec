//! Render-model construction for the graph surface.

mod builder;
mod handles;
mod types;

pub use builder::build_render_graph;
pub use handles::resolve_branch_handles;
pub use types::*;
