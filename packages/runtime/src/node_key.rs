//! Render-surface locators.
//!
//! A node on the render surface is addressed by an element id plus the id of
//! the instance that rendered it. The rendered `data-id` of a node is
//! `"{element}:{instance}"`.
//!
//! List regions render a hidden prototype whose element id ends with
//! [`TEMPLATE_SUFFIX`]. Each materialized item of the list gets the element id
//! `"{base},{index}:new"` where `base` is the anchor id without the suffix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved suffix marking a template anchor
pub const TEMPLATE_SUFFIX: &str = ":dummy";

const LIST_ITEM_SUFFIX: &str = ":new";

/// Opaque id of a render instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for InstanceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Locator of one node rendered by one instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    element: String,
    instance: InstanceId,
}

impl NodeKey {
    pub fn new(element: impl Into<String>, instance: &InstanceId) -> Self {
        Self {
            element: element.into(),
            instance: instance.clone(),
        }
    }

    /// Element id without the instance component
    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    pub fn is_template_anchor(&self) -> bool {
        is_template_anchor(&self.element)
    }

    /// Key of the `index`-th materialized item of this anchor.
    ///
    /// Returns `None` when this key is not a template anchor.
    pub fn list_item(&self, index: usize) -> Option<NodeKey> {
        list_item_element(&self.element, index).map(|element| NodeKey {
            element,
            instance: self.instance.clone(),
        })
    }

    pub fn is_list_item_of(&self, anchor: &NodeKey) -> bool {
        self.instance == anchor.instance && is_list_item_of(&self.element, &anchor.element)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.element, self.instance)
    }
}

pub fn is_template_anchor(element: &str) -> bool {
    element.ends_with(TEMPLATE_SUFFIX)
}

/// Element id of the `index`-th item materialized from `anchor`
pub fn list_item_element(anchor: &str, index: usize) -> Option<String> {
    let base = anchor.strip_suffix(TEMPLATE_SUFFIX)?;
    Some(format!("{base},{index}{LIST_ITEM_SUFFIX}"))
}

/// Whether `element` was materialized from the template `anchor`
pub fn is_list_item_of(element: &str, anchor: &str) -> bool {
    let Some(base) = anchor.strip_suffix(TEMPLATE_SUFFIX) else {
        return false;
    };
    element
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix(','))
        .and_then(|rest| rest.strip_suffix(LIST_ITEM_SUFFIX))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// Whether `element` is any materialized list item
pub fn is_list_item(element: &str) -> bool {
    element.ends_with(LIST_ITEM_SUFFIX)
        && element
            .rsplit_once(',')
            .and_then(|(_, rest)| rest.strip_suffix(LIST_ITEM_SUFFIX))
            .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}
