//! # Dependency Propagation
//!
//! The write path. Storing a value into a variable synchronously re-applies
//! every effect declared against that variable, in the store's insertion
//! order:
//!
//! - `Value` replaces the dependent node's text, or re-materializes the list
//!   when the node is a template anchor.
//! - `Visible` shows the node in its detected layout mode or hides it, then
//!   fixes the group spacing of its siblings.
//! - `Style` applies a parameter set when the value equals the condition and
//!   resets it to its defaults otherwise.
//!
//! After all dependents are processed, pending external children of the
//! instance are re-evaluated.
//!
//! ## Style precedence
//!
//! Within one write, a parameter applied by a matching descriptor is never
//! reset by a later non-matching descriptor on the same node. The first
//! matching condition wins; resets only touch parameters nobody applied.
//!
//! ## Missing nodes
//!
//! A dependent whose node is not on the render surface is skipped and
//! recorded in [`PropagationReport::missing_nodes`]. Propagation continues
//! with the next dependent.

use crate::dependency::{Dependency, StyleParameter};
use crate::error::SurfaceError;
use crate::instance::Instance;
use crate::list;
use crate::node_key::{is_list_item_of, InstanceId, NodeKey};
use crate::options::RuntimeOptions;
use crate::style::StyleEffector;
use crate::surface::{refresh_group_spacing, LayoutMode, RenderSurface};
use crate::value::WriteValue;
use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, instrument, warn};

const ZERO_WIDTH: &str = "0px";

/// What one write did to the render surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagationReport {
    pub variable: String,
    /// Stored string form of the written value
    pub value: String,
    /// Dependents whose node could not be located
    pub missing_nodes: Vec<NodeKey>,
    /// Template anchors that could not be expanded for lack of a parent
    pub detached_anchors: Vec<NodeKey>,
    /// List items created by anchor re-materialization
    pub materialized: Vec<NodeKey>,
    /// External objects placed after this write
    pub placed: Vec<String>,
}

impl PropagationReport {
    pub fn is_clean(&self) -> bool {
        self.missing_nodes.is_empty() && self.detached_anchors.is_empty()
    }
}

/// Why a write was turned into a logged no-op
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("instance '{0}' is not registered")]
    UnknownInstance(InstanceId),

    #[error("variable '{0}' is not in the store")]
    UnknownVariable(String),

    #[error("variable '{variable}' does not hold a JSON list")]
    NotAList { variable: String },

    #[error("nothing to insert")]
    NothingToInsert,

    #[error("'{value}' is not a number")]
    NotANumber { value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Applied(PropagationReport),
    Skipped(SkipReason),
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied(_))
    }

    pub fn report(&self) -> Option<&PropagationReport> {
        match self {
            WriteOutcome::Applied(report) => Some(report),
            WriteOutcome::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            WriteOutcome::Applied(_) => None,
            WriteOutcome::Skipped(reason) => Some(reason),
        }
    }
}

/// Bookkeeping scoped to a single write
struct Pass {
    value: String,
    /// (element, parameter) pairs applied by a matching style descriptor
    edited: HashSet<(String, String)>,
    /// List items destroyed earlier in this pass
    destroyed: HashSet<String>,
    report: PropagationReport,
}

pub struct Propagator<'a, S: RenderSurface, E: StyleEffector> {
    surface: &'a mut S,
    effector: &'a E,
    options: &'a RuntimeOptions,
}

impl<'a, S: RenderSurface, E: StyleEffector> Propagator<'a, S, E> {
    pub fn new(surface: &'a mut S, effector: &'a E, options: &'a RuntimeOptions) -> Self {
        Self {
            surface,
            effector,
            options,
        }
    }

    /// Store `value` into `name` and apply every declared effect
    #[instrument(skip_all, fields(instance = %instance.id(), variable = %name))]
    pub fn write(&mut self, instance: &mut Instance, name: &str, value: &WriteValue) -> WriteOutcome {
        let Some(variable) = instance.store.get_mut(name) else {
            warn!("Variable is not in the store, ignoring");
            return WriteOutcome::Skipped(SkipReason::UnknownVariable(name.to_string()));
        };

        let text = value.to_string();
        variable.value = text.clone();

        // The table may be re-keyed by list re-materialization while we walk it
        let dependents: Vec<(String, Vec<Dependency>)> = variable
            .dependencies
            .iter()
            .map(|(element, dependencies)| (element.clone(), dependencies.clone()))
            .collect();
        debug!(value = %text, dependents = dependents.len(), "Propagating write");

        let instance_id = instance.id().clone();
        let mut pass = Pass {
            value: text.clone(),
            edited: HashSet::new(),
            destroyed: HashSet::new(),
            report: PropagationReport {
                variable: name.to_string(),
                value: text,
                ..Default::default()
            },
        };

        for (element, dependencies) in &dependents {
            if pass.destroyed.contains(element) {
                continue;
            }
            let key = NodeKey::new(element, &instance_id);

            for dependency in dependencies {
                let applied = match dependency {
                    Dependency::Value if owned_by_anchor(element, &dependents) => {
                        debug!(node = %key, "List item text is owned by its anchor");
                        Ok(())
                    }
                    Dependency::Value if key.is_template_anchor() => {
                        self.rematerialize(instance, name, &key, dependencies, &mut pass)
                    }
                    Dependency::Value => self.apply_text(&key, &pass.value),
                    Dependency::Visible { condition } => {
                        self.apply_visibility(&key, condition.matches(&pass.value))
                    }
                    Dependency::Style {
                        condition,
                        parameters,
                    } => {
                        let matched = condition.as_deref() == Some(pass.value.as_str());
                        self.apply_style(&key, matched, parameters, &mut pass.edited)
                    }
                };

                match applied {
                    Ok(()) => {}
                    Err(SurfaceError::NodeNotFound(missing)) => {
                        warn!(node = %missing, "Dependent node not found on the render surface");
                        pass.report.missing_nodes.push(missing);
                        break;
                    }
                    Err(SurfaceError::Detached(anchor)) => {
                        warn!(node = %anchor, "Template anchor is detached, list not rendered");
                        pass.report.detached_anchors.push(anchor);
                    }
                }
            }
        }

        pass.report.placed = instance
            .external_children
            .place_pending(&mut *self.surface, &instance_id);

        WriteOutcome::Applied(pass.report)
    }

    fn apply_text(&mut self, key: &NodeKey, text: &str) -> Result<(), SurfaceError> {
        let node = self.surface.require(key)?;
        self.surface.set_text(&node, text);
        debug!(node = %key, "Replaced text");
        Ok(())
    }

    /// Rebuild the list region behind `anchor_key` and re-key the table
    fn rematerialize(
        &mut self,
        instance: &mut Instance,
        name: &str,
        anchor_key: &NodeKey,
        dependencies: &[Dependency],
        pass: &mut Pass,
    ) -> Result<(), SurfaceError> {
        let anchor = self.surface.require(anchor_key)?;
        if self.surface.parent(&anchor).is_none() {
            return Err(SurfaceError::Detached(anchor_key.clone()));
        }
        let Some(variable) = instance.store.get_mut(name) else {
            return Ok(());
        };

        // Old items go first so new items never share an id with a live node
        let stale: Vec<NodeKey> = variable
            .dependencies
            .keys()
            .filter(|element| is_list_item_of(element, anchor_key.element()))
            .map(|element| NodeKey::new(element, anchor_key.instance()))
            .collect();
        list::destroy(&mut *self.surface, &stale);
        pass.destroyed
            .extend(stale.iter().map(|key| key.element().to_string()));

        let created = list::materialize(
            &mut *self.surface,
            &anchor,
            anchor_key,
            &pass.value,
            &self.options.loop_placeholder,
        );

        // New items take the anchor's place in insertion order, ahead of it
        let previous = std::mem::take(&mut variable.dependencies);
        let mut table = IndexMap::with_capacity(previous.len() + created.len());
        for (element, entry) in previous {
            if is_list_item_of(&element, anchor_key.element()) {
                continue;
            }
            if element == anchor_key.element() {
                for key in &created {
                    table.insert(key.element().to_string(), dependencies.to_vec());
                }
            }
            table.insert(element, entry);
        }
        variable.dependencies = table;

        debug!(
            anchor = %anchor_key,
            created = created.len(),
            destroyed = stale.len(),
            "Re-materialized list"
        );
        pass.report.materialized.extend(created);
        Ok(())
    }

    fn apply_visibility(&mut self, key: &NodeKey, matched: bool) -> Result<(), SurfaceError> {
        let node = self.surface.require(key)?;
        let display_value = if matched {
            LayoutMode::detect(&*self.surface, &node).display()
        } else {
            "none"
        };
        self.surface.set_style(&node, "display", Some(display_value), false);
        refresh_group_spacing(&mut *self.surface, &node);
        debug!(node = %key, display = display_value, "Applied visibility");
        Ok(())
    }

    fn apply_style(
        &mut self,
        key: &NodeKey,
        matched: bool,
        parameters: &IndexMap<String, StyleParameter>,
        edited: &mut HashSet<(String, String)>,
    ) -> Result<(), SurfaceError> {
        let node = self.surface.require(key)?;

        for (parameter, style) in parameters {
            let slot = (key.element().to_string(), parameter.clone());
            if matched {
                self.effector.apply(
                    &mut *self.surface,
                    &node,
                    parameter,
                    style.value.value.as_deref(),
                    style.value.important,
                );
                edited.insert(slot);
            } else if !edited.contains(&slot) {
                match &style.default {
                    Some(default) => self.effector.apply(
                        &mut *self.surface,
                        &node,
                        parameter,
                        default.value.as_deref(),
                        default.important,
                    ),
                    None if self.options.resets_to_zero(parameter) => {
                        self.surface.set_style(&node, parameter, Some(ZERO_WIDTH), false)
                    }
                    None => self.effector.apply(&mut *self.surface, &node, parameter, None, false),
                }
            }
        }

        debug!(node = %key, matched, parameters = parameters.len(), "Applied style");
        Ok(())
    }
}

/// Whether `element` is an item of a template anchor in the same table
fn owned_by_anchor(element: &str, dependents: &[(String, Vec<Dependency>)]) -> bool {
    dependents
        .iter()
        .any(|(anchor, _)| is_list_item_of(element, anchor))
}
