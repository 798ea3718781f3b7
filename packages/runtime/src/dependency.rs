//! Dependency descriptors.
//!
//! Each variable maps render-surface element ids to the list of effects a
//! write must apply to that node. Page bootstrap ships the list JSON-encoded
//! per node key; it is decoded and validated once, here, so the propagator
//! only ever sees closed variants.

use crate::value::json_to_text;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

const IS_NULL: &str = "$IsNull$";
const IS_NOT_NULL: &str = "$IsNotNull$";

/// Effect applied to one node when its variable changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDependency", into = "RawDependency")]
pub enum Dependency {
    /// Replace the node's text, or re-materialize a list on a template anchor
    Value,
    /// Show the node when the condition holds, hide it otherwise
    Visible { condition: Condition },
    /// Apply `parameters` when the value equals `condition`, reset them otherwise
    Style {
        condition: Option<String>,
        parameters: IndexMap<String, StyleParameter>,
    },
}

/// Visibility condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Value is empty after trimming
    IsNull,
    /// Value is non-empty after trimming
    IsNotNull,
    Equals(String),
}

impl Condition {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) if s == IS_NULL => Condition::IsNull,
            Value::String(s) if s == IS_NOT_NULL => Condition::IsNotNull,
            other => Condition::Equals(json_to_text(other)),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Condition::IsNull => value.trim().is_empty(),
            Condition::IsNotNull => !value.trim().is_empty(),
            Condition::Equals(expected) => expected == value,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::IsNull => f.write_str(IS_NULL),
            Condition::IsNotNull => f.write_str(IS_NOT_NULL),
            Condition::Equals(value) => f.write_str(value),
        }
    }
}

/// One logical style parameter of a `Style` dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleParameter {
    pub value: StyleValue,
    #[serde(default)]
    pub default: Option<StyleValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleValue {
    /// `None` clears the property
    #[serde(default, deserialize_with = "deserialize_text")]
    pub value: Option<String>,
    #[serde(default)]
    pub important: bool,
}

impl StyleValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            important: false,
        }
    }

    pub fn important(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            important: true,
        }
    }
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(json_to_text(&other)),
    })
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DependencyError {
    #[error("Visible dependency without a condition")]
    MissingCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum DependencyType {
    Value,
    Visible,
    Style,
}

/// Wire shape of a descriptor, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDependency {
    dependency_type: DependencyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameters: Option<IndexMap<String, StyleParameter>>,
}

impl TryFrom<RawDependency> for Dependency {
    type Error = DependencyError;

    fn try_from(raw: RawDependency) -> Result<Self, Self::Error> {
        let condition = raw.condition.filter(|c| !c.is_null());
        match raw.dependency_type {
            DependencyType::Value => Ok(Dependency::Value),
            DependencyType::Visible => {
                let condition = condition.ok_or(DependencyError::MissingCondition)?;
                Ok(Dependency::Visible {
                    condition: Condition::from_json(&condition),
                })
            }
            DependencyType::Style => Ok(Dependency::Style {
                condition: condition.as_ref().map(json_to_text),
                parameters: raw.parameters.unwrap_or_default(),
            }),
        }
    }
}

impl From<Dependency> for RawDependency {
    fn from(dependency: Dependency) -> Self {
        match dependency {
            Dependency::Value => RawDependency {
                dependency_type: DependencyType::Value,
                condition: None,
                parameters: None,
            },
            Dependency::Visible { condition } => RawDependency {
                dependency_type: DependencyType::Visible,
                condition: Some(Value::String(condition.to_string())),
                parameters: None,
            },
            Dependency::Style {
                condition,
                parameters,
            } => RawDependency {
                dependency_type: DependencyType::Style,
                condition: condition.map(Value::String),
                parameters: Some(parameters),
            },
        }
    }
}

/// Descriptor list for one node key, either JSON-encoded or inline
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum EncodedDependencies {
    Encoded(String),
    Decoded(Vec<Dependency>),
}

impl EncodedDependencies {
    pub(crate) fn decode(self) -> Result<Vec<Dependency>, serde_json::Error> {
        match self {
            EncodedDependencies::Encoded(json) => serde_json::from_str(&json),
            EncodedDependencies::Decoded(list) => Ok(list),
        }
    }
}
