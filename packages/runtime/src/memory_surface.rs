//! In-memory render surface.
//!
//! An arena tree standing in for the browser DOM. Pages are described with
//! the serde-loadable [`SurfaceNode`] builder, mounted into a
//! [`MemorySurface`], mutated by the runtime, and exported back with
//! [`MemorySurface::snapshot`].

use crate::node_key::NodeKey;
use crate::surface::RenderSurface;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const IMPORTANT_SUFFIX: &str = "!important";

/// Declarative description of a rendered node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SurfaceNode {
    pub tag: String,
    /// Rendered `data-id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// External-child tag (`data-ext-id`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext_id: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    /// Property → value, with a trailing `!important` for important entries
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub styles: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SurfaceNode>,
}

impl SurfaceNode {
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_ext_id(mut self, ext_id: impl Into<String>) -> Self {
        self.ext_id = Some(ext_id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: SurfaceNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, new_children: Vec<SurfaceNode>) -> Self {
        self.children.extend(new_children);
        self
    }
}

/// Handle to a node in a [`MemorySurface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(usize);

#[derive(Debug, Clone, PartialEq)]
struct StyleEntry {
    value: String,
    important: bool,
}

#[derive(Debug, Clone)]
struct MemoryNode {
    tag: String,
    data_id: Option<String>,
    ext_id: Option<String>,
    text: String,
    attributes: IndexMap<String, String>,
    styles: IndexMap<String, StyleEntry>,
    children: Vec<NodeRef>,
    parent: Option<NodeRef>,
    removed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    nodes: Vec<MemoryNode>,
    roots: Vec<NodeRef>,
    /// Slots of removed nodes, reused by the next mount or clone
    free: Vec<usize>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roots(roots: Vec<SurfaceNode>) -> Self {
        let mut surface = Self::new();
        for root in roots {
            surface.mount(None, root);
        }
        surface
    }

    /// Mount `node` under `parent`, or as a new root
    pub fn mount(&mut self, parent: Option<NodeRef>, node: SurfaceNode) -> NodeRef {
        let styles = node
            .styles
            .into_iter()
            .map(|(property, value)| (property, parse_style_entry(&value)))
            .collect();
        let handle = self.push(MemoryNode {
            tag: node.tag,
            data_id: node.id,
            ext_id: node.ext_id,
            text: node.text,
            attributes: node.attributes,
            styles,
            children: Vec::new(),
            parent: None,
            removed: false,
        });
        self.attach(parent, handle);
        for child in node.children {
            self.mount(Some(handle), child);
        }
        handle
    }

    /// Export the live tree
    pub fn snapshot(&self) -> Vec<SurfaceNode> {
        self.roots.iter().map(|root| self.export(*root)).collect()
    }

    pub fn find(&self, data_id: &str) -> Option<NodeRef> {
        self.live().find(|(_, node)| node.data_id.as_deref() == Some(data_id)).map(|(handle, _)| handle)
    }

    pub fn text_of(&self, data_id: &str) -> Option<String> {
        self.find(data_id).map(|handle| self.text_content(handle))
    }

    pub fn style_of(&self, data_id: &str, property: &str) -> Option<String> {
        let handle = self.find(data_id)?;
        self.node(handle).styles.get(property).map(|s| s.value.clone())
    }

    pub fn is_important(&self, data_id: &str, property: &str) -> bool {
        self.find(data_id)
            .and_then(|handle| self.node(handle).styles.get(property).map(|s| s.important))
            .unwrap_or(false)
    }

    /// `data-id`s of the direct children of `data_id`, untagged children skipped
    pub fn child_ids(&self, data_id: &str) -> Vec<String> {
        self.find(data_id)
            .map(|handle| {
                self.node(handle)
                    .children
                    .iter()
                    .filter_map(|child| self.node(*child).data_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn parent_id(&self, data_id: &str) -> Option<String> {
        let handle = self.find(data_id)?;
        let parent = self.node(handle).parent?;
        self.node(parent).data_id.clone()
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self, handle: NodeRef) -> String {
        let node = self.node(handle);
        let mut text = node.text.clone();
        for child in &node.children {
            text.push_str(&self.text_content(*child));
        }
        text
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    /// Slots allocated so far, live or free
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    fn live(&self) -> impl Iterator<Item = (NodeRef, &MemoryNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.removed)
            .map(|(index, node)| (NodeRef(index), node))
    }

    fn node(&self, handle: NodeRef) -> &MemoryNode {
        &self.nodes[handle.0]
    }

    fn node_mut(&mut self, handle: NodeRef) -> &mut MemoryNode {
        &mut self.nodes[handle.0]
    }

    fn push(&mut self, node: MemoryNode) -> NodeRef {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                NodeRef(slot)
            }
            None => {
                self.nodes.push(node);
                NodeRef(self.nodes.len() - 1)
            }
        }
    }

    fn attach(&mut self, parent: Option<NodeRef>, child: NodeRef) {
        self.node_mut(child).parent = parent;
        match parent {
            Some(parent) => self.node_mut(parent).children.push(child),
            None => self.roots.push(child),
        }
    }

    fn detach(&mut self, child: NodeRef) {
        match self.node(child).parent {
            Some(parent) => self.node_mut(parent).children.retain(|c| *c != child),
            None => self.roots.retain(|c| *c != child),
        }
        self.node_mut(child).parent = None;
    }

    fn copy_subtree(&mut self, source: NodeRef, parent: Option<NodeRef>) -> NodeRef {
        let mut copy = self.node(source).clone();
        let children = std::mem::take(&mut copy.children);
        copy.parent = None;
        let handle = self.push(copy);
        self.attach(parent, handle);
        for child in children {
            self.copy_subtree(child, Some(handle));
        }
        handle
    }

    /// Tombstone the subtree and hand its slots back to the free list
    fn mark_removed(&mut self, handle: NodeRef) {
        if self.node(handle).removed {
            return;
        }
        let node = self.node_mut(handle);
        node.removed = true;
        node.parent = None;
        node.data_id = None;
        node.ext_id = None;
        node.text.clear();
        node.attributes.clear();
        node.styles.clear();
        let children = std::mem::take(&mut node.children);
        self.free.push(handle.0);
        for child in children {
            self.mark_removed(child);
        }
    }

    /// Pre-order replacement of the first placeholder occurrence
    fn replace_first(&mut self, handle: NodeRef, placeholder: &str, replacement: &str) -> bool {
        let node = self.node_mut(handle);
        if let Some(index) = node.text.find(placeholder) {
            node.text.replace_range(index..index + placeholder.len(), replacement);
            return true;
        }
        let children = node.children.clone();
        children
            .into_iter()
            .any(|child| self.replace_first(child, placeholder, replacement))
    }

    fn export(&self, handle: NodeRef) -> SurfaceNode {
        let node = self.node(handle);
        SurfaceNode {
            tag: node.tag.clone(),
            id: node.data_id.clone(),
            ext_id: node.ext_id.clone(),
            text: node.text.clone(),
            attributes: node.attributes.clone(),
            styles: node
                .styles
                .iter()
                .map(|(property, entry)| (property.clone(), format_style_entry(entry)))
                .collect(),
            children: node.children.iter().map(|child| self.export(*child)).collect(),
        }
    }
}

fn parse_style_entry(value: &str) -> StyleEntry {
    match value.trim().strip_suffix(IMPORTANT_SUFFIX) {
        Some(value) => StyleEntry {
            value: value.trim().to_string(),
            important: true,
        },
        None => StyleEntry {
            value: value.trim().to_string(),
            important: false,
        },
    }
}

fn format_style_entry(entry: &StyleEntry) -> String {
    if entry.important {
        format!("{} {}", entry.value, IMPORTANT_SUFFIX)
    } else {
        entry.value.clone()
    }
}

impl RenderSurface for MemorySurface {
    type Node = NodeRef;

    fn locate(&self, key: &NodeKey) -> Option<NodeRef> {
        self.find(&key.to_string())
    }

    fn locate_external(&self, key: &NodeKey) -> Vec<NodeRef> {
        let ext_id = key.to_string();
        self.live()
            .filter(|(_, node)| node.ext_id.as_deref() == Some(ext_id.as_str()))
            .map(|(handle, _)| handle)
            .collect()
    }

    fn parent(&self, node: &NodeRef) -> Option<NodeRef> {
        self.node(*node).parent
    }

    fn children(&self, node: &NodeRef) -> Vec<NodeRef> {
        self.node(*node).children.clone()
    }

    fn attribute(&self, node: &NodeRef, name: &str) -> Option<String> {
        self.node(*node).attributes.get(name).cloned()
    }

    fn style(&self, node: &NodeRef, property: &str) -> Option<String> {
        self.node(*node).styles.get(property).map(|s| s.value.clone())
    }

    fn set_style(&mut self, node: &NodeRef, property: &str, value: Option<&str>, important: bool) {
        let styles = &mut self.node_mut(*node).styles;
        match value {
            Some(value) if !value.is_empty() => {
                styles.insert(
                    property.to_string(),
                    StyleEntry {
                        value: value.to_string(),
                        important,
                    },
                );
            }
            _ => {
                styles.shift_remove(property);
            }
        }
    }

    fn set_text(&mut self, node: &NodeRef, text: &str) {
        let children = std::mem::take(&mut self.node_mut(*node).children);
        for child in children {
            self.mark_removed(child);
        }
        self.node_mut(*node).text = text.to_string();
    }

    fn clone_node(&mut self, template: &NodeRef, key: &NodeKey) -> NodeRef {
        let parent = self.node(*template).parent;
        let copy = self.copy_subtree(*template, parent);
        self.node_mut(copy).data_id = Some(key.to_string());
        copy
    }

    fn substitute_text(&mut self, node: &NodeRef, placeholder: &str, replacement: &str) {
        self.replace_first(*node, placeholder, replacement);
    }

    fn remove(&mut self, node: &NodeRef) {
        self.detach(*node);
        self.mark_removed(*node);
    }

    fn append_child(&mut self, parent: &NodeRef, child: &NodeRef) {
        self.detach(*child);
        self.attach(Some(*parent), *child);
    }
}
