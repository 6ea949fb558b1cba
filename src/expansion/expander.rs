//! Template expansion: derive one concrete job document from a template and
//! a sub-task's overrides.

use serde_json::Value;
use tracing::debug;

use super::overrides::{Document, OverrideSpec};

/// Apply `overrides` in order to an independent copy of `template`
///
/// An override whose node is absent, whose node has no `inputs` map, or
/// whose field is not already present in `inputs` is skipped. Expansion
/// never fails and never touches `template`.
pub fn expand(template: &Document, overrides: &[OverrideSpec]) -> Document {
    let mut expanded = template.clone();

    for spec in overrides {
        let Some(inputs) = expanded
            .get_mut(&spec.target_node)
            .and_then(|node| node.get_mut("inputs"))
            .and_then(Value::as_object_mut)
        else {
            continue;
        };

        if let Some(slot) = inputs.get_mut(&spec.field) {
            debug!(
                node_id = %spec.target_node,
                field = %spec.field,
                value = %spec.value,
                "Applied override"
            );
            *slot = spec.value.clone();
        }
    }

    expanded
}
