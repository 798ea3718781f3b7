//! Render-surface capability.
//!
//! The core never touches a concrete UI toolkit. Everything it needs from the
//! rendered tree goes through [`RenderSurface`]: locating nodes by key,
//! reading and writing inline style properties, cloning list templates,
//! removing and reparenting nodes.

use crate::error::SurfaceError;
use crate::node_key::NodeKey;
use std::fmt;

/// Parent attribute holding a `property:value` spacing rule for its children
pub const SPACING_ATTRIBUTE: &str = "spacing";

pub trait RenderSurface {
    /// Handle to a live node
    type Node: Clone + PartialEq + fmt::Debug;

    /// Node whose id is the rendering of `key`
    fn locate(&self, key: &NodeKey) -> Option<Self::Node>;

    /// Nodes tagged as the external child `key`
    fn locate_external(&self, key: &NodeKey) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Inline style property; `None` when unset
    fn style(&self, node: &Self::Node, property: &str) -> Option<String>;

    /// Set an inline style property, or clear it when `value` is `None`
    fn set_style(&mut self, node: &Self::Node, property: &str, value: Option<&str>, important: bool);

    /// Replace the node's content with `text`
    fn set_text(&mut self, node: &Self::Node, text: &str);

    /// Deep-copy `template`, give the copy the id of `key` and append it to
    /// the template's parent
    fn clone_node(&mut self, template: &Self::Node, key: &NodeKey) -> Self::Node;

    /// Replace the first occurrence of `placeholder` in the subtree's text
    fn substitute_text(&mut self, node: &Self::Node, placeholder: &str, replacement: &str);

    fn remove(&mut self, node: &Self::Node);

    /// Move `child` to the end of `parent`'s children
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);

    fn is_visible(&self, node: &Self::Node) -> bool {
        self.style(node, "display").as_deref() != Some("none")
    }

    fn require(&self, key: &NodeKey) -> Result<Self::Node, SurfaceError> {
        self.locate(key).ok_or_else(|| SurfaceError::NodeNotFound(key.clone()))
    }

    fn has_style(&self, node: &Self::Node, property: &str) -> bool {
        self.style(node, property).is_some_and(|v| !v.is_empty())
    }
}

/// Display mode a node is shown with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    Flex,
    LineClamp,
    Grid,
    Block,
}

impl LayoutMode {
    /// Detect the mode from the residual style flags the node was rendered with
    pub fn detect<S: RenderSurface + ?Sized>(surface: &S, node: &S::Node) -> Self {
        if surface.has_style(node, "flex-direction") {
            LayoutMode::Flex
        } else if surface.has_style(node, "-webkit-line-clamp") {
            LayoutMode::LineClamp
        } else if surface.has_style(node, "grid-template-areas") {
            LayoutMode::Grid
        } else {
            LayoutMode::Block
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            LayoutMode::Flex => "flex",
            LayoutMode::LineClamp => "-webkit-box",
            LayoutMode::Grid => "grid",
            LayoutMode::Block => "block",
        }
    }
}

/// Re-apply the parent's spacing rule so no gap precedes the first visible child.
///
/// Children before the first visible one are left alone, the first visible
/// child has the property cleared, every later child gets it set.
pub fn refresh_group_spacing<S: RenderSurface + ?Sized>(surface: &mut S, node: &S::Node) {
    let Some(parent) = surface.parent(node) else {
        return;
    };
    let Some(rule) = surface.attribute(&parent, SPACING_ATTRIBUTE) else {
        return;
    };
    let Some((property, value)) = rule.split_once(':') else {
        return;
    };
    let (property, value) = (property.trim(), value.trim());

    let mut seen_visible = false;
    for child in surface.children(&parent) {
        if seen_visible {
            surface.set_style(&child, property, Some(value), false);
        } else if surface.is_visible(&child) {
            surface.set_style(&child, property, None, false);
            seen_visible = true;
        }
    }
}
