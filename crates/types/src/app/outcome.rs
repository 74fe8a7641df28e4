// Path: crates/types/src/app/outcome.rs

use serde::{Deserialize, Serialize};

/// Result of applying one directive to the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    /// The action was dispatched; the loop continues.
    Success,
    /// Terminal: the decision service declared the task complete.
    Done { message: Option<String> },
    /// Non-fatal failure; logged, the loop continues and the oracle is
    /// expected to adapt.
    Failed { reason: String },
    /// Classified error. `recoverable` decides continuation vs termination.
    Error { message: String, recoverable: bool },
}

impl ExecutionOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        ExecutionOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn protocol_error(message: impl Into<String>) -> Self {
        ExecutionOutcome::Error {
            message: message.into(),
            recoverable: false,
        }
    }

    /// True for `Done` and non-recoverable `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionOutcome::Done { .. }
                | ExecutionOutcome::Error {
                    recoverable: false,
                    ..
                }
        )
    }

    /// One-line form used in step summaries.
    pub fn summary(&self) -> String {
        match self {
            ExecutionOutcome::Success => "success".to_string(),
            ExecutionOutcome::Done { message } => {
                format!("done({})", message.as_deref().unwrap_or(""))
            }
            ExecutionOutcome::Failed { reason } => format!("failed({})", reason),
            ExecutionOutcome::Error {
                message,
                recoverable,
            } => format!("error({}, recoverable={})", message, recoverable),
        }
    }
}

/// Result of the screen-unlock pre-condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnlockState {
    /// The device was interactive and not locked; nothing was dispatched.
    AlreadyUnlocked,
    /// The lock cleared after our input.
    Success,
    /// Unlock was attempted and did not converge.
    Failed(String),
    /// The user must intervene (enable the capability, store a credential).
    NeedUserAction(String),
    /// The lock kind cannot be driven by synthetic input.
    NotSupported(String),
}

/// The single terminal result a session exposes to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskResult {
    Success(Option<String>),
    Failed(String),
    NeedUserAction(String),
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success(_))
    }
}
