//! Override specifications and the typed batch configuration they live in.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A template document: workflow nodes keyed by node identifier
pub type Document = Map<String, Value>;

/// Set one named input field of one named node to a value
///
/// Serialized as `{"node_id": ..., "field": ..., "value": ...}`. Numeric node
/// identifiers are accepted and stringified; missing members default to
/// empty so that a malformed override degrades to a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideSpec {
    #[serde(
        rename = "node_id",
        alias = "target_node",
        default,
        deserialize_with = "deserialize_node_id"
    )]
    pub target_node: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: Value,
}

impl OverrideSpec {
    pub fn new(target_node: impl Into<String>, field: impl Into<String>, value: Value) -> Self {
        Self {
            target_node: target_node.into(),
            field: field.into(),
            value,
        }
    }
}

fn deserialize_node_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    Ok(node_id_from_value(&value))
}

fn node_id_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The per-sub-task override shape: one spec or an ordered list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Overrides {
    List(Vec<OverrideSpec>),
    Single(OverrideSpec),
}

impl Overrides {
    /// Normalize a stored params blob without failing
    ///
    /// Objects become a one-element list, arrays keep their object entries in
    /// order, anything else yields no overrides.
    pub fn normalize(value: &Value) -> Vec<OverrideSpec> {
        match value {
            Value::Object(map) => vec![spec_from_map(map)],
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.as_object().map(spec_from_map))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<OverrideSpec> for Overrides {
    fn from(spec: OverrideSpec) -> Self {
        Self::Single(spec)
    }
}

impl From<Vec<OverrideSpec>> for Overrides {
    fn from(specs: Vec<OverrideSpec>) -> Self {
        Self::List(specs)
    }
}

fn spec_from_map(map: &Map<String, Value>) -> OverrideSpec {
    let target_node = map
        .get("node_id")
        .or_else(|| map.get("target_node"))
        .map(node_id_from_value)
        .unwrap_or_default();
    let field = match map.get("field") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    let value = map.get("value").cloned().unwrap_or(Value::Null);

    OverrideSpec {
        target_node,
        field,
        value,
    }
}

/// Persisted batch configuration: the template plus one override entry per sub-task
///
/// Stored as JSON text in `batch_tasks.config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub workflow: Document,
    #[serde(default)]
    pub params: Vec<Overrides>,
}

impl BatchConfig {
    pub fn new(workflow: Document, params: Vec<Overrides>) -> Self {
        Self { workflow, params }
    }

    /// Number of sub-tasks this configuration expands into
    pub fn sub_task_count(&self) -> usize {
        self.params.len()
    }
}
