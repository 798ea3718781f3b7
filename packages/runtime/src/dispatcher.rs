//! # Action Dispatch
//!
//! An interaction delivers an ordered action list. Actions run strictly in
//! order, each to completion, and every mutating action goes through the
//! runtime's write path. Nothing raised by an individual action crosses this
//! boundary: invalid or unknown actions are logged and reported per action
//! while the rest of the list still runs.

use crate::action::{parse_actions, Action, ActionDescriptor, ActionParameter, Step, ValueKind};
use crate::error::{ActionError, HandlerError, RuntimeError, RuntimeResult};
use crate::handlers::normalize_handler_name;
use crate::node_key::InstanceId;
use crate::propagator::{SkipReason, WriteOutcome};
use crate::resolver::resolve;
use crate::runtime::{InsertPosition, Runtime};
use crate::style::StyleEffector;
use crate::surface::RenderSurface;
use crate::value::{json_to_text, parse_decimal, parse_int, WriteValue};
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Everything one interaction did, in action order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionReport {
    /// The triggering event should stop propagating
    pub stop_propagation: bool,
    /// The triggering event's default behaviour should be suppressed
    pub prevent_default: bool,
    pub outcomes: Vec<ActionOutcome>,
}

impl InteractionReport {
    pub fn writes(&self) -> impl Iterator<Item = &WriteOutcome> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            ActionOutcome::Write(write) => Some(write),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Flag forwarded to the triggering event
    EventForwarded,
    Write(WriteOutcome),
    HostMessage {
        handler: String,
        result: Result<(), HandlerError>,
    },
    Invalid(ActionError),
    Unknown(String),
}

impl<S: RenderSurface, E: StyleEffector> Runtime<S, E> {
    /// Run the JSON action list of one interaction against `id`.
    ///
    /// `context` replaces `$VALUE` literals, e.g. an input's new value.
    #[instrument(skip(self, actions_json, context), fields(instance = %id))]
    pub fn handle_interaction(
        &mut self,
        id: &InstanceId,
        actions_json: &str,
        context: Option<&str>,
    ) -> RuntimeResult<InteractionReport> {
        if !self.instances.contains_key(id) {
            warn!(instance = %id, "Interaction for unknown instance, ignoring");
            return Err(RuntimeError::UnknownInstance(id.clone()));
        }
        let descriptors = parse_actions(actions_json).map_err(|err| {
            warn!(error = %err, "Malformed action list, ignoring");
            RuntimeError::MalformedActions(err)
        })?;
        debug!(actions = descriptors.len(), "Handling interaction");
        Ok(self.dispatch(id, descriptors, context))
    }

    /// Run already-parsed action descriptors in order
    pub fn dispatch(
        &mut self,
        id: &InstanceId,
        descriptors: impl IntoIterator<Item = ActionDescriptor>,
        context: Option<&str>,
    ) -> InteractionReport {
        let mut report = InteractionReport::default();

        for descriptor in descriptors {
            let outcome = match Action::try_from(descriptor) {
                Ok(action) => self.run_action(id, action, context, &mut report),
                Err(err) => {
                    warn!(error = %err, "Invalid action, ignoring");
                    ActionOutcome::Invalid(err)
                }
            };
            report.outcomes.push(outcome);
        }

        report
    }

    fn run_action(
        &mut self,
        id: &InstanceId,
        action: Action,
        context: Option<&str>,
        report: &mut InteractionReport,
    ) -> ActionOutcome {
        debug!(action = action.kind(), "Running action");
        match action {
            Action::StopPropagation => {
                report.stop_propagation = true;
                ActionOutcome::EventForwarded
            }
            Action::PreventDefault => {
                report.prevent_default = true;
                ActionOutcome::EventForwarded
            }
            Action::Toggle { target } => ActionOutcome::Write(self.toggle(id, &target)),
            Action::MessageHost { target, data } => self.run_message_host(id, target, data, context),
            Action::Increment(step) => ActionOutcome::Write(self.run_step(id, &step, 1, context)),
            Action::Decrement(step) => ActionOutcome::Write(self.run_step(id, &step, -1, context)),
            Action::SetValue { target, value, kind } => {
                let resolved = self.resolve_text(id, &value, context);
                let outcome = match coerce(&resolved, kind) {
                    Ok(value) => self.write(id, &target, value),
                    Err(reason) => {
                        warn!(variable = %target, value = %resolved, "Value does not match its declared type");
                        WriteOutcome::Skipped(reason)
                    }
                };
                ActionOutcome::Write(outcome)
            }
            Action::Insert { target, value, at } => {
                let value = value.map(|value| self.resolve_text(id, &value, context));
                let position = at
                    .map(|at| InsertPosition::from_marker(&self.resolve_text(id, &at, context)))
                    .unwrap_or_default();
                ActionOutcome::Write(self.insert(id, &target, value.as_deref(), position))
            }
            Action::Clear { target } => ActionOutcome::Write(self.clear(id, &target)),
            Action::Unknown(kind) => {
                warn!(action = %kind, "Unknown action, ignoring");
                ActionOutcome::Unknown(kind)
            }
        }
    }

    fn run_step(&mut self, id: &InstanceId, step: &Step, direction: i64, context: Option<&str>) -> WriteOutcome {
        let by = match &step.by {
            Some(by) => {
                let text = self.resolve_text(id, by, context);
                match parse_int(&text) {
                    Some(by) => by,
                    None => {
                        warn!(variable = %step.target, by = %text, "Step is not an integer, ignoring");
                        return WriteOutcome::Skipped(SkipReason::NotANumber { value: text });
                    }
                }
            }
            None => 1,
        };

        let bounds: Vec<Option<i64>> = step
            .clamp
            .iter()
            .map(|bound| parse_int(&self.resolve_text(id, bound, context)))
            .collect();
        let (clamp_min, clamp_max) = match bounds.as_slice() {
            [max] => (None, *max),
            [min, max] => (*min, *max),
            _ => (None, None),
        };

        self.increment(id, &step.target, direction * by, clamp_min, clamp_max)
    }

    fn run_message_host(
        &mut self,
        id: &InstanceId,
        target: Option<String>,
        data: Option<ActionParameter>,
        context: Option<&str>,
    ) -> ActionOutcome {
        let (handler, payload, reference) = match (data, target) {
            (Some(data), _) => {
                let data = data.decoded();
                let payload = self.resolve_parameter(id, &data, context);
                let Some(function) = payload.get("function").and_then(Value::as_str) else {
                    warn!("Host message payload has no function, ignoring");
                    return ActionOutcome::HostMessage {
                        handler: String::new(),
                        result: Err(HandlerError::MissingFunction),
                    };
                };
                (normalize_handler_name(function), Some(payload), Some(data.reference))
            }
            (None, Some(target)) => (normalize_handler_name(&target), None, None),
            (None, None) => {
                return ActionOutcome::Invalid(ActionError::MissingTarget {
                    action: "message-host".to_string(),
                })
            }
        };

        let result = self.message_host(id, &handler, payload.as_ref(), reference.as_ref());
        if let Err(err) = &result {
            warn!(handler = %handler, error = %err, "Host message failed");
        }
        ActionOutcome::HostMessage { handler, result }
    }

    fn resolve_parameter(&self, id: &InstanceId, parameter: &ActionParameter, context: Option<&str>) -> Value {
        match self.instances.get(id) {
            Some(instance) => resolve(&parameter.value, &parameter.reference, instance.store(), context),
            None => parameter.value.clone(),
        }
    }

    fn resolve_text(&self, id: &InstanceId, parameter: &ActionParameter, context: Option<&str>) -> String {
        json_to_text(&self.resolve_parameter(id, parameter, context))
    }
}

/// Coerce a resolved `set-value` operand to its declared logical type
fn coerce(text: &str, kind: ValueKind) -> Result<WriteValue, SkipReason> {
    let not_a_number = || SkipReason::NotANumber {
        value: text.to_string(),
    };
    match kind {
        ValueKind::Integer => parse_int(text).map(WriteValue::Integer).ok_or_else(not_a_number),
        ValueKind::Decimal => parse_decimal(text).map(WriteValue::Decimal).ok_or_else(not_a_number),
        ValueKind::Boolean => Ok(WriteValue::Boolean(text == "true")),
        ValueKind::Text => Ok(WriteValue::Text(text.to_string())),
    }
}
