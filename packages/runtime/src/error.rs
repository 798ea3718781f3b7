//! Error types for the runtime

use crate::node_key::{InstanceId, NodeKey};
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Instance '{0}' is not registered")]
    UnknownInstance(InstanceId),

    #[error("Malformed action list: {0}")]
    MalformedActions(#[source] serde_json::Error),

    #[error("Malformed page data: {0}")]
    MalformedPage(#[from] serde_json::Error),
}

/// Render-surface inconsistency found while applying effects
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("No render-surface node for key '{0}'")]
    NodeNotFound(NodeKey),

    #[error("Node '{0}' has no parent to render into")]
    Detached(NodeKey),
}

/// Action descriptor that cannot be turned into a typed action
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Action '{action}' has no target")]
    MissingTarget { action: String },

    #[error("Action '{action}' is missing parameter '{parameter}'")]
    MissingParameter { action: String, parameter: String },
}

/// Failure resolving or running a `message-host` handler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    #[error("No handler registered as '{0}'")]
    NotRegistered(String),

    #[error("Message payload has no 'function' field")]
    MissingFunction,

    #[error("Handler '{name}' failed: {message}")]
    Failed { name: String, message: String },
}
