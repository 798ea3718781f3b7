//! Browser bindings for the Weave runtime.
//!
//! The page owns the DOM; it hands us a `JsSurface` that resolves `data-id`s
//! to opaque numeric handles and performs the primitive edits, and an
//! optional `JsMessageHost` that receives `message-host` calls nobody
//! registered on the Rust side.

use serde_json::Value;
use tracing::debug;
use wasm_bindgen::prelude::*;
use weave_runtime::{
    HandlerError, InsertPosition, InstanceId, InteractionReport, NodeKey, RenderSurface, Runtime,
    RuntimeOptions, WriteOutcome,
};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen]
extern "C" {
    /// Render-surface primitives implemented by the page
    pub type JsSurface;

    #[wasm_bindgen(method)]
    fn locate(this: &JsSurface, data_id: &str) -> Option<u32>;

    #[wasm_bindgen(method, js_name = locateExternal)]
    fn locate_external(this: &JsSurface, ext_id: &str) -> Vec<u32>;

    #[wasm_bindgen(method)]
    fn parent(this: &JsSurface, node: u32) -> Option<u32>;

    #[wasm_bindgen(method)]
    fn children(this: &JsSurface, node: u32) -> Vec<u32>;

    #[wasm_bindgen(method)]
    fn attribute(this: &JsSurface, node: u32, name: &str) -> Option<String>;

    #[wasm_bindgen(method)]
    fn style(this: &JsSurface, node: u32, property: &str) -> Option<String>;

    #[wasm_bindgen(method, js_name = setStyle)]
    fn set_style(this: &JsSurface, node: u32, property: &str, value: Option<String>, important: bool);

    #[wasm_bindgen(method, js_name = setText)]
    fn set_text(this: &JsSurface, node: u32, text: &str);

    #[wasm_bindgen(method, js_name = cloneNode)]
    fn clone_node(this: &JsSurface, template: u32, data_id: &str) -> u32;

    #[wasm_bindgen(method, js_name = substituteText)]
    fn substitute_text(this: &JsSurface, node: u32, placeholder: &str, replacement: &str);

    #[wasm_bindgen(method)]
    fn remove(this: &JsSurface, node: u32);

    #[wasm_bindgen(method, js_name = appendChild)]
    fn append_child(this: &JsSurface, parent: u32, child: u32);

    /// Receiver of host messages
    pub type JsMessageHost;

    #[wasm_bindgen(method, catch)]
    fn call(this: &JsMessageHost, name: &str, instance: &str, payload: Option<String>) -> Result<(), JsValue>;
}

/// [`RenderSurface`] over the page's `JsSurface`
pub struct HostSurface {
    js: JsSurface,
}

impl RenderSurface for HostSurface {
    type Node = u32;

    fn locate(&self, key: &NodeKey) -> Option<u32> {
        self.js.locate(&key.to_string())
    }

    fn locate_external(&self, key: &NodeKey) -> Vec<u32> {
        self.js.locate_external(&key.to_string())
    }

    fn parent(&self, node: &u32) -> Option<u32> {
        self.js.parent(*node)
    }

    fn children(&self, node: &u32) -> Vec<u32> {
        self.js.children(*node)
    }

    fn attribute(&self, node: &u32, name: &str) -> Option<String> {
        self.js.attribute(*node, name)
    }

    fn style(&self, node: &u32, property: &str) -> Option<String> {
        self.js.style(*node, property).filter(|value| !value.is_empty())
    }

    fn set_style(&mut self, node: &u32, property: &str, value: Option<&str>, important: bool) {
        self.js.set_style(*node, property, value.map(str::to_string), important);
    }

    fn set_text(&mut self, node: &u32, text: &str) {
        self.js.set_text(*node, text);
    }

    fn clone_node(&mut self, template: &u32, key: &NodeKey) -> u32 {
        self.js.clone_node(*template, &key.to_string())
    }

    fn substitute_text(&mut self, node: &u32, placeholder: &str, replacement: &str) {
        self.js.substitute_text(*node, placeholder, replacement);
    }

    fn remove(&mut self, node: &u32) {
        self.js.remove(*node);
    }

    fn append_child(&mut self, parent: &u32, child: &u32) {
        self.js.append_child(*parent, *child);
    }
}

/// Event flags the page applies after an interaction
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionFlags {
    stop_propagation: bool,
    prevent_default: bool,
}

#[wasm_bindgen]
impl InteractionFlags {
    #[wasm_bindgen(getter, js_name = stopPropagation)]
    pub fn stop_propagation(&self) -> bool {
        self.stop_propagation
    }

    #[wasm_bindgen(getter, js_name = preventDefault)]
    pub fn prevent_default(&self) -> bool {
        self.prevent_default
    }
}

impl From<&InteractionReport> for InteractionFlags {
    fn from(report: &InteractionReport) -> Self {
        Self {
            stop_propagation: report.stop_propagation,
            prevent_default: report.prevent_default,
        }
    }
}

fn applied_count(outcomes: &[WriteOutcome]) -> u32 {
    outcomes.iter().filter(|outcome| outcome.is_applied()).count() as u32
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Parse `[["name", true], ...]`
fn parse_boolean_pairs(json: &str) -> Result<Vec<(String, bool)>, serde_json::Error> {
    serde_json::from_str(json)
}

#[wasm_bindgen]
pub struct WeaveRuntime {
    inner: Runtime<HostSurface>,
}

#[wasm_bindgen]
impl WeaveRuntime {
    #[wasm_bindgen(constructor)]
    pub fn new(
        surface: JsSurface,
        host: Option<JsMessageHost>,
        options_json: Option<String>,
    ) -> Result<WeaveRuntime, JsValue> {
        let options = match options_json {
            Some(json) => serde_json::from_str::<RuntimeOptions>(&json).map_err(to_js_error)?,
            None => RuntimeOptions::default(),
        };
        let mut inner = Runtime::new(HostSurface { js: surface }).with_options(options);

        if let Some(host) = host {
            inner.handlers_mut().set_fallback(move |_runtime, call| {
                debug!(handler = call.name, "Forwarding to message host");
                host.call(call.name, call.instance.as_str(), call.payload.map(Value::to_string))
                    .map_err(|err| HandlerError::Failed {
                        name: call.name.to_string(),
                        message: err.as_string().unwrap_or_else(|| format!("{err:?}")),
                    })
            });
        }

        Ok(WeaveRuntime { inner })
    }

    /// Register an instance from its bootstrap payloads
    pub fn init(
        &mut self,
        instance: &str,
        variables_json: &str,
        external_children_json: Option<String>,
    ) -> Result<(), JsValue> {
        self.inner
            .init_json(instance, variables_json, external_children_json.as_deref())
            .map_err(to_js_error)?;
        self.inner.refresh_external_children(&InstanceId::new(instance));
        Ok(())
    }

    pub fn teardown(&mut self, instance: &str) -> bool {
        self.inner.teardown(&InstanceId::new(instance))
    }

    #[wasm_bindgen(js_name = handleInteraction)]
    pub fn handle_interaction(
        &mut self,
        instance: &str,
        actions_json: &str,
        context: Option<String>,
    ) -> Result<InteractionFlags, JsValue> {
        let report = self
            .inner
            .handle_interaction(&InstanceId::new(instance), actions_json, context.as_deref())
            .map_err(to_js_error)?;
        Ok(InteractionFlags::from(&report))
    }

    #[wasm_bindgen(js_name = setBoolean)]
    pub fn set_boolean(&mut self, instance: &str, variable: &str, value: bool) -> bool {
        self.inner
            .set_boolean(&InstanceId::new(instance), variable, value)
            .is_applied()
    }

    #[wasm_bindgen(js_name = setString)]
    pub fn set_string(&mut self, instance: &str, variable: &str, value: &str) -> bool {
        self.inner
            .set_string(&InstanceId::new(instance), variable, value)
            .is_applied()
    }

    #[wasm_bindgen(js_name = getValue)]
    pub fn get_value(&self, instance: &str, variable: &str) -> Option<String> {
        self.inner
            .get_value(&InstanceId::new(instance), variable)
            .map(str::to_string)
    }

    pub fn increment(
        &mut self,
        instance: &str,
        variable: &str,
        by: i32,
        clamp_min: Option<i32>,
        clamp_max: Option<i32>,
    ) -> bool {
        self.inner
            .increment(
                &InstanceId::new(instance),
                variable,
                i64::from(by),
                clamp_min.map(i64::from),
                clamp_max.map(i64::from),
            )
            .is_applied()
    }

    pub fn insert(&mut self, instance: &str, variable: &str, value: Option<String>, at: Option<String>) -> bool {
        let position = at.as_deref().map(InsertPosition::from_marker).unwrap_or_default();
        self.inner
            .insert(&InstanceId::new(instance), variable, value.as_deref(), position)
            .is_applied()
    }

    pub fn clear(&mut self, instance: &str, variable: &str) -> bool {
        self.inner.clear(&InstanceId::new(instance), variable).is_applied()
    }

    /// `values_json` is a list of `[name, value]` pairs, applied in order
    #[wasm_bindgen(js_name = setManyBooleans)]
    pub fn set_many_booleans(&mut self, instance: &str, values_json: &str) -> Result<u32, JsValue> {
        let values = parse_boolean_pairs(values_json).map_err(to_js_error)?;
        let outcomes = self.inner.set_many_booleans(&InstanceId::new(instance), values);
        Ok(applied_count(&outcomes))
    }

    #[wasm_bindgen(js_name = setBooleanForAll)]
    pub fn set_boolean_for_all(&mut self, variable: &str, value: bool) -> u32 {
        applied_count(&self.inner.set_boolean_for_all(variable, value))
    }

    #[wasm_bindgen(js_name = setStringForAll)]
    pub fn set_string_for_all(&mut self, variable: &str, value: &str) -> u32 {
        applied_count(&self.inner.set_string_for_all(variable, value))
    }

    /// Run a registered or host-side handler directly
    #[wasm_bindgen(js_name = messageHost)]
    pub fn message_host(&mut self, instance: &str, name: &str, payload_json: Option<String>) -> Result<(), JsValue> {
        let payload = match payload_json {
            Some(json) => Some(serde_json::from_str::<Value>(&json).map_err(to_js_error)?),
            None => None,
        };
        self.inner
            .message_host(&InstanceId::new(instance), name, payload.as_ref(), None)
            .map_err(to_js_error)
    }
}
