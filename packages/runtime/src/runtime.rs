//! # Runtime
//!
//! Owns the render surface, the live instances and the handler registry, and
//! exposes the host-facing operations. Every mutating operation funnels into
//! [`Runtime::write`], so propagation always fires.
//!
//! Store-level problems (unknown instance, unknown variable, a list variable
//! that does not hold a list) never surface as errors: the operation is
//! logged and returns [`WriteOutcome::Skipped`].

use crate::error::{HandlerError, RuntimeResult};
use crate::external::ExternalChildren;
use crate::handlers::{HandlerCall, HandlerRegistry};
use crate::instance::Instance;
use crate::node_key::InstanceId;
use crate::options::RuntimeOptions;
use crate::propagator::{Propagator, SkipReason, WriteOutcome};
use crate::store::VariableStore;
use crate::style::{CssStyleEffector, StyleEffector};
use crate::surface::RenderSurface;
use crate::value::{is_json, parse_int, wrap_step, WriteValue};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{info, instrument, warn};

/// Where `insert` places the new item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPosition {
    Start,
    #[default]
    End,
}

impl InsertPosition {
    /// `"start"` inserts at the front; any other marker appends
    pub fn from_marker(marker: &str) -> Self {
        if marker == "start" {
            InsertPosition::Start
        } else {
            InsertPosition::End
        }
    }
}

pub struct Runtime<S, E = CssStyleEffector> {
    pub(crate) surface: S,
    pub(crate) effector: E,
    pub(crate) options: RuntimeOptions,
    /// Live instances in creation order
    pub(crate) instances: IndexMap<InstanceId, Instance>,
    pub(crate) handlers: HandlerRegistry<S, E>,
}

impl<S: RenderSurface> Runtime<S> {
    pub fn new(surface: S) -> Self {
        Self::with_effector(surface, CssStyleEffector)
    }
}

impl<S: RenderSurface, E: StyleEffector> Runtime<S, E> {
    pub fn with_effector(surface: S, effector: E) -> Self {
        Self {
            surface,
            effector,
            options: RuntimeOptions::default(),
            instances: IndexMap::new(),
            handlers: HandlerRegistry::new(),
        }
    }

    pub fn with_options(mut self, options: RuntimeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn handlers(&self) -> &HandlerRegistry<S, E> {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry<S, E> {
        &mut self.handlers
    }

    pub fn register_handler<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut Runtime<S, E>, &HandlerCall<'_>) -> Result<(), HandlerError> + 'static,
    {
        self.handlers.register(name, handler);
    }

    // --- lifecycle ---

    /// Register an instance. An existing instance with the same id is replaced.
    pub fn init(&mut self, id: impl Into<InstanceId>, store: VariableStore, external_children: ExternalChildren) {
        let id = id.into();
        info!(
            instance = %id,
            variables = store.len(),
            external_children = external_children.registrations().len(),
            "Initializing instance"
        );
        let instance = Instance::new(id.clone(), store, external_children);
        if self.instances.insert(id.clone(), instance).is_some() {
            warn!(instance = %id, "Instance re-initialized, previous state dropped");
        }
    }

    /// Register an instance from the page bootstrap payloads
    pub fn init_json(
        &mut self,
        id: impl Into<InstanceId>,
        variables_json: &str,
        external_children_json: Option<&str>,
    ) -> RuntimeResult<()> {
        let store = VariableStore::from_json(variables_json)?;
        let external_children = match external_children_json {
            Some(json) => ExternalChildren::from_json(json)?,
            None => ExternalChildren::new(),
        };
        self.init(id, store, external_children);
        Ok(())
    }

    /// Destroy an instance and its external-children registry
    pub fn teardown(&mut self, id: &InstanceId) -> bool {
        let removed = self.instances.shift_remove(id).is_some();
        if removed {
            info!(instance = %id, "Instance torn down");
        } else {
            warn!(instance = %id, "Teardown of unknown instance");
        }
        removed
    }

    pub fn instance(&self, id: &InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    pub fn instance_ids(&self) -> impl Iterator<Item = &InstanceId> {
        self.instances.keys()
    }

    // --- write path ---

    /// Store `value` and propagate it to every dependent node
    pub fn write(&mut self, id: &InstanceId, variable: &str, value: impl Into<WriteValue>) -> WriteOutcome {
        let Some(instance) = self.instances.get_mut(id) else {
            warn!(instance = %id, variable, "Write to unknown instance, ignoring");
            return WriteOutcome::Skipped(SkipReason::UnknownInstance(id.clone()));
        };
        Propagator::new(&mut self.surface, &self.effector, &self.options).write(instance, variable, &value.into())
    }

    pub fn set_boolean(&mut self, id: &InstanceId, variable: &str, value: bool) -> WriteOutcome {
        self.write(id, variable, value)
    }

    pub fn set_string(&mut self, id: &InstanceId, variable: &str, value: &str) -> WriteOutcome {
        self.write(id, variable, value)
    }

    /// Current string value; `None` when the instance or variable is unknown
    pub fn get_value(&self, id: &InstanceId, variable: &str) -> Option<&str> {
        match self.current_value(id, variable) {
            Ok(value) => Some(value),
            Err(_) => None,
        }
    }

    /// Flip a boolean variable: `"true"` becomes `false`, anything else `true`
    pub fn toggle(&mut self, id: &InstanceId, variable: &str) -> WriteOutcome {
        match self.current_value(id, variable) {
            Ok(current) => {
                let next = current != "true";
                self.write(id, variable, next)
            }
            Err(reason) => WriteOutcome::Skipped(reason),
        }
    }

    /// Add `by` (negative to decrement) with wrap-around clamping
    pub fn increment(
        &mut self,
        id: &InstanceId,
        variable: &str,
        by: i64,
        clamp_min: Option<i64>,
        clamp_max: Option<i64>,
    ) -> WriteOutcome {
        let current = match self.current_value(id, variable) {
            Ok(current) => current,
            Err(reason) => return WriteOutcome::Skipped(reason),
        };
        let Some(current) = parse_int(current) else {
            warn!(instance = %id, variable, value = current, "Variable is not an integer, ignoring");
            return WriteOutcome::Skipped(SkipReason::NotANumber {
                value: current.to_string(),
            });
        };
        let next = wrap_step(current, by, clamp_min, clamp_max);
        self.write(id, variable, next)
    }

    /// Insert `value` into the JSON list held by `variable`
    pub fn insert(
        &mut self,
        id: &InstanceId,
        variable: &str,
        value: Option<&str>,
        position: InsertPosition,
    ) -> WriteOutcome {
        let current = match self.current_value(id, variable) {
            Ok(current) => current,
            Err(reason) => return WriteOutcome::Skipped(reason),
        };
        let Ok(Value::Array(mut items)) = serde_json::from_str::<Value>(current) else {
            warn!(instance = %id, variable, value = current, "Variable is not a list, ignoring");
            return WriteOutcome::Skipped(SkipReason::NotAList {
                variable: variable.to_string(),
            });
        };
        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
            warn!(instance = %id, variable, "Nothing to insert");
            return WriteOutcome::Skipped(SkipReason::NothingToInsert);
        };

        let item = Value::String(value.to_string());
        match position {
            InsertPosition::Start => items.insert(0, item),
            InsertPosition::End => items.push(item),
        }
        self.write(id, variable, Value::Array(items).to_string())
    }

    /// Reset to `[]` when the current value is JSON, `""` otherwise
    pub fn clear(&mut self, id: &InstanceId, variable: &str) -> WriteOutcome {
        match self.current_value(id, variable) {
            Ok(current) => {
                let cleared = if is_json(current) { "[]" } else { "" };
                self.write(id, variable, cleared)
            }
            Err(reason) => WriteOutcome::Skipped(reason),
        }
    }

    /// Apply boolean writes in list order
    pub fn set_many_booleans<N: AsRef<str>>(
        &mut self,
        id: &InstanceId,
        values: impl IntoIterator<Item = (N, bool)>,
    ) -> Vec<WriteOutcome> {
        values
            .into_iter()
            .map(|(variable, value)| self.set_boolean(id, variable.as_ref(), value))
            .collect()
    }

    pub fn set_boolean_for_all(&mut self, variable: &str, value: bool) -> Vec<WriteOutcome> {
        self.for_all(|runtime, id| runtime.set_boolean(id, variable, value))
    }

    pub fn set_string_for_all(&mut self, variable: &str, value: &str) -> Vec<WriteOutcome> {
        self.for_all(|runtime, id| runtime.set_string(id, variable, value))
    }

    /// Re-evaluate pending external children without a write
    pub fn refresh_external_children(&mut self, id: &InstanceId) -> Vec<String> {
        match self.instances.get_mut(id) {
            Some(instance) => instance
                .external_children
                .place_pending(&mut self.surface, id),
            None => {
                warn!(instance = %id, "Refresh of unknown instance");
                Vec::new()
            }
        }
    }

    /// Run a handler by name, as a `message-host` action without payload would
    #[instrument(skip(self, payload, reference), fields(instance = %id))]
    pub fn message_host(
        &mut self,
        id: &InstanceId,
        name: &str,
        payload: Option<&Value>,
        reference: Option<&Value>,
    ) -> Result<(), HandlerError> {
        let handler = self.handlers.get(name)?;
        let name = crate::handlers::normalize_handler_name(name);
        let call = HandlerCall {
            name: &name,
            instance: id,
            payload,
            reference,
        };
        handler(self, &call)
    }

    fn for_all(&mut self, mut write: impl FnMut(&mut Self, &InstanceId) -> WriteOutcome) -> Vec<WriteOutcome> {
        let ids: Vec<InstanceId> = self.instances.keys().cloned().collect();
        ids.iter().map(|id| write(self, id)).collect()
    }

    pub(crate) fn current_value(&self, id: &InstanceId, variable: &str) -> Result<&str, SkipReason> {
        let Some(instance) = self.instances.get(id) else {
            warn!(instance = %id, variable, "Unknown instance, ignoring");
            return Err(SkipReason::UnknownInstance(id.clone()));
        };
        instance.value(variable).ok_or_else(|| {
            warn!(instance = %id, variable, "Variable is not in the store, ignoring");
            SkipReason::UnknownVariable(variable.to_string())
        })
    }
}

impl<S, E> std::fmt::Debug for Runtime<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("instances", &self.instances.keys().collect::<Vec<_>>())
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}
