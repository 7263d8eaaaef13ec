//! Lenient first-stage parse of raw document text.
//!
//! Parsing is deliberately loose: node and edge lists come out as raw JSON
//! values so the normalizer can drop malformed entries individually instead
//! of failing the whole document.

use serde::Deserialize;
use serde_json::Value;

use crate::dsl::schema::Viewport;
use crate::error::DocumentError;

/// Raw top-level structure before any validation or defaulting.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawDocument {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub app: Option<RawApp>,
    #[serde(default)]
    pub workflow: Option<RawWorkflow>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawApp {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub icon_background: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub use_icon_as_answer_icon: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawWorkflow {
    #[serde(default)]
    pub graph: Option<RawGraph>,
    #[serde(default)]
    pub features: Option<Value>,
    #[serde(default)]
    pub environment_variables: Option<Vec<Value>>,
    #[serde(default)]
    pub conversation_variables: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawGraph {
    #[serde(default)]
    pub nodes: Option<Vec<Value>>,
    #[serde(default)]
    pub edges: Option<Vec<Value>>,
    #[serde(default)]
    pub viewport: Option<Viewport>,
}

/// Parse YAML text into the raw document structure.
pub(crate) fn parse_raw(content: &str) -> Result<RawDocument, DocumentError> {
    serde_yaml::from_str(content).map_err(|e| DocumentError::Parse(e.to_string()))
}
