// Path: crates/types/src/app/session.rs

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Opaque per-run session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionId(pub [u8; 32]);

impl SessionId {
    pub fn generate() -> Self {
        let mut id = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut id);
        SessionId(id)
    }

    /// First four bytes, hex-encoded, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// One unit of work handed to the session controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Task label forwarded to the decision service.
    pub task: String,
    /// Location of the payload the task is about (file path, URI).
    pub payload_ref: String,
    /// Caption or text payload to be entered when the flow asks for it.
    pub caption: String,
    /// Overrides the configured target application when set.
    pub package: Option<String>,
}

/// Session state machine phases. `Idle` is both the initial phase and the
/// phase restored on every exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    UnlockingScreen,
    OpeningTargetApp,
    WaitingForTargetApp,
    PerceivingAndDeciding(u32),
    ExecutingStep(u32),
    Completed,
    Failed,
    NeedsUserAction,
}

/// Diagnostic record of one dispatched action and its humanized parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub step: u32,
    pub kind: String,
    /// Humanized parameters actually sent to the device.
    pub detail: String,
    pub outcome: String,
    pub at_ms: u64,
}
