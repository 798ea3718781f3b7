//! Literal-or-reference resolution.
//!
//! Action parameters carry a literal `value` and an optional `reference`
//! naming the variable that supplies it. Structured literals are resolved
//! field by field against a reference value of the same shape.

use crate::store::VariableStore;
use serde_json::{Map, Value};

/// Literal replaced by the caller-supplied context value (an event payload)
pub const VALUE_SENTINEL: &str = "$VALUE";

/// Resolve `value` against `reference` using the live variables in `store`.
///
/// `reference` is `Value::Null` when the literal stands on its own. The store
/// is never mutated.
pub fn resolve(value: &Value, reference: &Value, store: &VariableStore, context: Option<&str>) -> Value {
    match value {
        Value::Object(fields) => resolve_object(fields, reference, store, context),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let field_reference = match reference {
                        Value::Array(refs) => refs.get(index),
                        Value::Object(refs) => refs.get(&index.to_string()),
                        _ => None,
                    };
                    resolve_field(item, field_reference, store, context)
                })
                .collect(),
        ),
        scalar => match reference {
            Value::String(name) => lookup(store, name).unwrap_or_else(|| substitute(scalar, context)),
            _ => substitute(scalar, context),
        },
    }
}

fn resolve_object(
    fields: &Map<String, Value>,
    reference: &Value,
    store: &VariableStore,
    context: Option<&str>,
) -> Value {
    let references = reference.as_object();
    let mut result = Map::with_capacity(fields.len());

    for (key, field) in fields {
        let field_reference = references.and_then(|refs| refs.get(key));
        result.insert(key.clone(), resolve_field(field, field_reference, store, context));
    }

    // Fields named only by the reference are synthesized from the store
    if let Some(references) = references {
        for (key, field_reference) in references {
            if fields.contains_key(key) {
                continue;
            }
            if let Some(value) = field_reference.as_str().and_then(|name| lookup(store, name)) {
                result.insert(key.clone(), value);
            }
        }
    }

    Value::Object(result)
}

fn resolve_field(
    field: &Value,
    reference: Option<&Value>,
    store: &VariableStore,
    context: Option<&str>,
) -> Value {
    match (field, reference) {
        (Value::Object(_) | Value::Array(_), Some(sub)) => resolve(field, sub, store, context),
        (_, Some(Value::String(name))) => lookup(store, name).unwrap_or_else(|| field.clone()),
        _ => substitute(field, context),
    }
}

fn lookup(store: &VariableStore, name: &str) -> Option<Value> {
    store.value(name).map(|v| Value::String(v.to_string()))
}

fn substitute(value: &Value, context: Option<&str>) -> Value {
    match (value, context) {
        (Value::String(s), Some(context)) if s == VALUE_SENTINEL => Value::String(context.to_string()),
        _ => value.clone(),
    }
}
