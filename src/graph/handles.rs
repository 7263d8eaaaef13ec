//! Output handle resolution for fan-out nodes.

use serde::Deserialize;

use crate::dsl::schema::{NodeData, NodeType};

use super::types::{BranchHandle, DEFAULT_SOURCE_HANDLE};

/// Explicit branch metadata some exports carry on the node payload.
#[derive(Debug, Deserialize)]
struct ExplicitBranch {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct IfElseCase {
    case_id: String,
}

#[derive(Debug, Deserialize)]
struct ClassifierClass {
    id: String,
    #[serde(default)]
    name: String,
}

/// Resolve the output handles for a node.
///
/// Precedence: explicit `_targetBranches` payload metadata, then declared
/// `cases` (if-else) or `classes` (question-classifier), then a single
/// synthesized handle. Sentinel case ids `true`/`false` map to the
/// canonical `IF`/`ELSE` labels; every other case id gets an ordinal
/// `ELIF` label in declaration order.
pub fn resolve_branch_handles(data: &NodeData) -> Vec<BranchHandle> {
    if let Some(value) = data.extra.get("_targetBranches") {
        if let Ok(branches) = serde_json::from_value::<Vec<ExplicitBranch>>(value.clone()) {
            if !branches.is_empty() {
                return branches
                    .into_iter()
                    .map(|b| BranchHandle {
                        id: b.id,
                        label: b.name,
                    })
                    .collect();
            }
        }
    }

    match NodeType::parse(&data.node_type) {
        Some(NodeType::IfElse) => {
            if let Some(cases) = decode::<Vec<IfElseCase>>(data, "cases") {
                if !cases.is_empty() {
                    return label_cases(&cases);
                }
            }
        }
        Some(NodeType::QuestionClassifier) => {
            if let Some(classes) = decode::<Vec<ClassifierClass>>(data, "classes") {
                if !classes.is_empty() {
                    return classes
                        .into_iter()
                        .map(|c| BranchHandle {
                            id: c.id,
                            label: c.name,
                        })
                        .collect();
                }
            }
        }
        _ => {}
    }

    vec![BranchHandle {
        id: DEFAULT_SOURCE_HANDLE.to_string(),
        label: String::new(),
    }]
}

fn label_cases(cases: &[IfElseCase]) -> Vec<BranchHandle> {
    let mut elif_ordinal = 0usize;
    cases
        .iter()
        .map(|case| {
            let label = match case.case_id.as_str() {
                "true" => "IF".to_string(),
                "false" => "ELSE".to_string(),
                _ => {
                    elif_ordinal += 1;
                    format!("ELIF {}", elif_ordinal)
                }
            };
            BranchHandle {
                id: case.case_id.clone(),
                label,
            }
        })
        .collect()
}

fn decode<T: serde::de::DeserializeOwned>(data: &NodeData, key: &str) -> Option<T> {
    data.extra
        .get(key)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}
