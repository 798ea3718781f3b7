//! Action descriptors produced by user interactions.
//!
//! The page ships actions as untyped JSON (`{action, target, parameters}`).
//! They are validated once at the boundary into the closed [`Action`] set the
//! dispatcher matches on.

use crate::error::ActionError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire shape of one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Vec<ActionParameter>>,
}

impl ActionDescriptor {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: None,
            parameters: IndexMap::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, parameter: ActionParameter) -> Self {
        self.parameters.entry(name.into()).or_default().push(parameter);
        self
    }

    fn parameter(&self, name: &str, index: usize) -> Option<ActionParameter> {
        self.parameters.get(name).and_then(|list| list.get(index)).cloned()
    }

    fn require_target(&self) -> Result<String, ActionError> {
        self.target.clone().ok_or_else(|| ActionError::MissingTarget {
            action: self.action.clone(),
        })
    }
}

/// A literal value with an optional variable reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionParameter {
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub reference: Value,
}

impl ActionParameter {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            reference: Value::Null,
        }
    }

    pub fn reference(variable: impl Into<String>) -> Self {
        Self {
            value: Value::Null,
            reference: Value::String(variable.into()),
        }
    }

    /// Undo the string encoding `message-host` payloads are shipped with
    pub fn decoded(&self) -> Self {
        Self {
            value: decode_embedded(&self.value),
            reference: decode_embedded(&self.reference),
        }
    }
}

fn decode_embedded(value: &Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

/// Declared logical type a `set-value` coerces to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    Integer,
    Decimal,
    Boolean,
    #[default]
    Text,
}

impl ValueKind {
    fn from_parameter(parameter: Option<&ActionParameter>) -> Self {
        match parameter.and_then(|p| p.value.as_str()) {
            Some("integer") => ValueKind::Integer,
            Some("decimal") => ValueKind::Decimal,
            Some("boolean") => ValueKind::Boolean,
            _ => ValueKind::Text,
        }
    }
}

/// Operands shared by `increment` and `decrement`
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub target: String,
    /// Step magnitude, 1 when absent
    pub by: Option<ActionParameter>,
    /// Empty, `[max]` or `[min, max]`
    pub clamp: Vec<ActionParameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    StopPropagation,
    PreventDefault,
    Toggle {
        target: String,
    },
    MessageHost {
        target: Option<String>,
        data: Option<ActionParameter>,
    },
    Increment(Step),
    Decrement(Step),
    SetValue {
        target: String,
        value: ActionParameter,
        kind: ValueKind,
    },
    Insert {
        target: String,
        value: Option<ActionParameter>,
        at: Option<ActionParameter>,
    },
    Clear {
        target: String,
    },
    Unknown(String),
}

impl Action {
    pub fn kind(&self) -> &str {
        match self {
            Action::StopPropagation => "stop-propagation",
            Action::PreventDefault => "prevent-default",
            Action::Toggle { .. } => "toggle",
            Action::MessageHost { .. } => "message-host",
            Action::Increment(_) => "increment",
            Action::Decrement(_) => "decrement",
            Action::SetValue { .. } => "set-value",
            Action::Insert { .. } => "insert",
            Action::Clear { .. } => "clear",
            Action::Unknown(kind) => kind,
        }
    }
}

impl TryFrom<ActionDescriptor> for Action {
    type Error = ActionError;

    fn try_from(descriptor: ActionDescriptor) -> Result<Self, Self::Error> {
        let action = match descriptor.action.as_str() {
            "stop-propagation" => Action::StopPropagation,
            "prevent-default" => Action::PreventDefault,
            "toggle" => Action::Toggle {
                target: descriptor.require_target()?,
            },
            "message-host" => {
                let data = descriptor.parameter("data", 0);
                if data.is_none() && descriptor.target.is_none() {
                    return Err(ActionError::MissingTarget {
                        action: descriptor.action.clone(),
                    });
                }
                Action::MessageHost {
                    target: descriptor.target.clone(),
                    data,
                }
            }
            "increment" | "decrement" => {
                let step = Step {
                    target: descriptor.require_target()?,
                    by: descriptor.parameter("by", 0),
                    clamp: descriptor.parameters.get("clamp").cloned().unwrap_or_default(),
                };
                if descriptor.action == "increment" {
                    Action::Increment(step)
                } else {
                    Action::Decrement(step)
                }
            }
            "set-value" => {
                let target = descriptor.require_target()?;
                let value = descriptor
                    .parameter("value", 0)
                    .ok_or_else(|| ActionError::MissingParameter {
                        action: descriptor.action.clone(),
                        parameter: "value".to_string(),
                    })?;
                Action::SetValue {
                    target,
                    value,
                    kind: ValueKind::from_parameter(descriptor.parameter("value", 1).as_ref()),
                }
            }
            "insert" => Action::Insert {
                target: descriptor.require_target()?,
                value: descriptor.parameter("value", 0),
                at: descriptor.parameter("at", 0),
            },
            "clear" => Action::Clear {
                target: descriptor.require_target()?,
            },
            other => Action::Unknown(other.to_string()),
        };
        Ok(action)
    }
}

/// Parse an interaction's action list as shipped by the page
pub fn parse_actions(json: &str) -> Result<Vec<ActionDescriptor>, serde_json::Error> {
    serde_json::from_str(json)
}
