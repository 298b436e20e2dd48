//! User-triggered control actions.

mod busy;
mod coordinator;

pub use busy::*;
pub use coordinator::*;

use crate::remote::TransportError;

use serde::Serialize;
use thiserror::Error;

/// The five control actions a user can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Connect,
    Disconnect,
    Rotate,
    SpeedTest,
    ToggleAutoRotation,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Connect,
        ActionKind::Disconnect,
        ActionKind::Rotate,
        ActionKind::SpeedTest,
        ActionKind::ToggleAutoRotation,
    ];

    /// Prefix for failures the remote reported or local validation rejected.
    fn failed_label(self) -> &'static str {
        match self {
            ActionKind::Connect => "Connection failed",
            ActionKind::Disconnect => "Disconnect failed",
            ActionKind::Rotate => "IP rotation failed",
            ActionKind::SpeedTest => "Speed test failed",
            ActionKind::ToggleAutoRotation => "Auto rotation update failed",
        }
    }

    /// Prefix for calls that never completed.
    fn error_label(self) -> &'static str {
        match self {
            ActionKind::Connect => "Connection error",
            ActionKind::Disconnect => "Disconnect error",
            ActionKind::Rotate => "Rotation error",
            ActionKind::SpeedTest => "Speed test error",
            ActionKind::ToggleAutoRotation => "Auto rotation error",
        }
    }

    /// Activity log line for a failed action.
    pub fn describe_failure(self, error: &ActionError) -> String {
        match error {
            ActionError::Validation(reason) => format!("{}: {}", self.failed_label(), reason),
            ActionError::RequestFailed { reason } => format!("{}: {}", self.failed_label(), reason),
            ActionError::Transport(detail) => format!("{}: {}", self.error_label(), detail),
        }
    }
}

/// Why an action did not succeed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("{0}")]
    Validation(String),
    #[error("{reason}")]
    RequestFailed { reason: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ActionError {
    pub(crate) fn request_failed(message: Option<String>) -> Self {
        ActionError::RequestFailed {
            reason: message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "unknown error".to_string()),
        }
    }
}

/// Settled result of a coordinator action. Errors stop here.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Succeeded,
    Failed(ActionError),
    /// Another invocation of the same kind is still in flight; nothing was sent.
    Busy,
    /// The control is not available in the current connection state.
    Unavailable,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded)
    }
}
