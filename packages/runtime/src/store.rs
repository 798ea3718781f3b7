//! Per-instance variable store.

use crate::dependency::{Dependency, EncodedDependencies};
use crate::value::json_to_text;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Node element id → effects to apply to that node, in insertion order
pub type DependencyTable = IndexMap<String, Vec<Dependency>>;

/// A named piece of reactive state
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawVariable")]
pub struct Variable {
    /// Always the string form of the last written value
    pub value: String,
    pub dependencies: DependencyTable,
}

impl Variable {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            dependencies: IndexMap::new(),
        }
    }

    pub fn with_dependency(mut self, element: impl Into<String>, dependencies: Vec<Dependency>) -> Self {
        self.dependencies.insert(element.into(), dependencies);
        self
    }
}

#[derive(Deserialize)]
struct RawVariable {
    #[serde(default)]
    value: Value,
    #[serde(default)]
    dependencies: IndexMap<String, EncodedDependencies>,
}

impl TryFrom<RawVariable> for Variable {
    type Error = serde_json::Error;

    fn try_from(raw: RawVariable) -> Result<Self, Self::Error> {
        let mut dependencies = IndexMap::with_capacity(raw.dependencies.len());
        for (element, encoded) in raw.dependencies {
            dependencies.insert(element, encoded.decode()?);
        }
        Ok(Variable {
            value: json_to_text(&raw.value),
            dependencies,
        })
    }
}

/// Variable name → variable, in page declaration order
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct VariableStore {
    variables: IndexMap<String, Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the variable table produced by page bootstrap
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn insert(&mut self, name: impl Into<String>, variable: Variable) {
        self.variables.insert(name.into(), variable);
    }

    pub fn with_variable(mut self, name: impl Into<String>, variable: Variable) -> Self {
        self.insert(name, variable);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(|v| v.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
