//! Named callables for `message-host` actions.
//!
//! Handlers are registered up front and looked up by normalized name. A
//! handler receives the runtime itself, so it may synchronously issue further
//! writes; those nest inside the running interaction.

use crate::error::HandlerError;
use crate::node_key::InstanceId;
use crate::runtime::Runtime;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use tracing::info;

pub const CONSOLE_PRINT: &str = "console_print";

/// Arguments handed to a handler
#[derive(Debug, Clone, Copy)]
pub struct HandlerCall<'a> {
    /// Normalized name the handler was looked up by
    pub name: &'a str,
    pub instance: &'a InstanceId,
    /// Resolved `data` payload, absent for target-only dispatch
    pub payload: Option<&'a Value>,
    /// Reference the payload was resolved against
    pub reference: Option<&'a Value>,
}

pub type Handler<S, E> = Rc<dyn Fn(&mut Runtime<S, E>, &HandlerCall<'_>) -> Result<(), HandlerError>>;

/// `" open-menu "` and `open_menu` name the same handler
pub fn normalize_handler_name(name: &str) -> String {
    name.trim().replace('-', "_")
}

pub struct HandlerRegistry<S, E> {
    handlers: IndexMap<String, Handler<S, E>>,
    fallback: Option<Handler<S, E>>,
}

impl<S, E> HandlerRegistry<S, E> {
    /// Registry holding the built-in `console_print` handler
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(CONSOLE_PRINT, |_runtime, call| {
            let payload = call.payload.map(Value::to_string).unwrap_or_default();
            info!(instance = %call.instance, payload = %payload, "console_print");
            Ok(())
        });
        registry
    }

    pub fn empty() -> Self {
        Self {
            handlers: IndexMap::new(),
            fallback: None,
        }
    }

    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut Runtime<S, E>, &HandlerCall<'_>) -> Result<(), HandlerError> + 'static,
    {
        self.handlers.insert(normalize_handler_name(name), Rc::new(handler));
    }

    /// Handler used for names nobody registered, e.g. a host bridge
    pub fn set_fallback<F>(&mut self, handler: F)
    where
        F: Fn(&mut Runtime<S, E>, &HandlerCall<'_>) -> Result<(), HandlerError> + 'static,
    {
        self.fallback = Some(Rc::new(handler));
    }

    /// Look up `name`; already-normalized names pass through unchanged
    pub fn get(&self, name: &str) -> Result<Handler<S, E>, HandlerError> {
        let name = normalize_handler_name(name);
        self.handlers
            .get(&name)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or(HandlerError::NotRegistered(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(&normalize_handler_name(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl<S, E> Default for HandlerRegistry<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, E> fmt::Debug for HandlerRegistry<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
