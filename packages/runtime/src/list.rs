//! Dynamic list materialization.
//!
//! A list-bound region renders a hidden template anchor. Every write to the
//! bound variable replaces the whole region: the anchor is cloned once per
//! item and the previous clones are destroyed. There is no keyed
//! reconciliation.

use crate::node_key::NodeKey;
use crate::surface::RenderSurface;
use crate::value::json_to_text;
use serde_json::Value;
use tracing::{debug, warn};

/// Items a list value expands to.
///
/// A JSON array yields one item per element (strings verbatim, anything else
/// including `null` as compact JSON). Any other value, JSON or not, is a
/// single item holding the raw text.
pub fn list_items(value: &str) -> Vec<String> {
    match serde_json::from_str::<Value>(value) {
        Ok(Value::Array(items)) => items.iter().map(item_text).collect(),
        _ => vec![value.to_string()],
    }
}

fn item_text(item: &Value) -> String {
    match item {
        Value::Null => "null".to_string(),
        other => json_to_text(other),
    }
}

/// Clone `anchor` once per item of `value` and return the new keys in
/// creation order.
pub fn materialize<S: RenderSurface + ?Sized>(
    surface: &mut S,
    anchor: &S::Node,
    anchor_key: &NodeKey,
    value: &str,
    placeholder: &str,
) -> Vec<NodeKey> {
    let items = list_items(value);
    let mut created = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Some(key) = anchor_key.list_item(index) else {
            warn!(anchor = %anchor_key, "Materialize called on a node that is not a template anchor");
            break;
        };
        let node = surface.clone_node(anchor, &key);
        surface.set_style(&node, "display", None, false);
        surface.substitute_text(&node, placeholder, item);
        created.push(key);
    }

    debug!(anchor = %anchor_key, items = created.len(), "Materialized list items");
    created
}

/// Remove the nodes for `keys`; returns the keys that were already gone
pub fn destroy<S: RenderSurface + ?Sized>(surface: &mut S, keys: &[NodeKey]) -> Vec<NodeKey> {
    let mut missing = Vec::new();
    for key in keys {
        match surface.locate(key) {
            Some(node) => surface.remove(&node),
            None => missing.push(key.clone()),
        }
    }
    if !missing.is_empty() {
        debug!(missing = missing.len(), "List items already removed");
    }
    missing
}
