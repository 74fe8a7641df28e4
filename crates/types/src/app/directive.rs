// Path: crates/types/src/app/directive.rs

use serde::{Deserialize, Serialize};

/// Wire shape of one decision-service reply. Every field except `action`
/// is optional; which ones are required depends on the action kind and is
/// enforced by the normalizer, not by serde.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDirective {
    pub action: String,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub element_width: Option<i32>,
    pub element_height: Option<i32>,
    pub element_index: Option<u32>,
    pub start_x: Option<i32>,
    pub start_y: Option<i32>,
    pub end_x: Option<i32>,
    pub end_y: Option<i32>,
    pub duration: Option<u64>,
    pub text: Option<String>,
    pub package_name: Option<String>,
    pub wait_after: Option<u64>,
    pub confidence: Option<f32>,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub recoverable: Option<bool>,
}

/// Size hint for the element a tap targets. Drives jitter scaling and the
/// clamp box of the humanizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSize {
    pub width: i32,
    pub height: i32,
}

/// A validated action, one variant per recognized kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentAction {
    Tap {
        x: i32,
        y: i32,
        element: Option<ElementSize>,
        element_index: Option<u32>,
    },
    Swipe {
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration_ms: u64,
    },
    TypeText {
        text: String,
    },
    Wait {
        /// None falls back to the post-action wait, then the humanizer default.
        duration_ms: Option<u64>,
    },
    Back,
    LaunchApp {
        package: Option<String>,
    },
    DismissPopup,
    Finish {
        message: Option<String>,
    },
    Error {
        message: String,
        recoverable: bool,
    },
}

impl AgentAction {
    /// Short label used in action summaries and dispatch records.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentAction::Tap { .. } => "tap",
            AgentAction::Swipe { .. } => "swipe",
            AgentAction::TypeText { .. } => "type_text",
            AgentAction::Wait { .. } => "wait",
            AgentAction::Back => "back",
            AgentAction::LaunchApp { .. } => "launch_app",
            AgentAction::DismissPopup => "dismiss_popup",
            AgentAction::Finish { .. } => "finish",
            AgentAction::Error { .. } => "error",
        }
    }
}

/// A normalized directive: the validated action plus the loop-level hints
/// that are not part of the action itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub action: AgentAction,
    pub wait_after_ms: Option<u64>,
    pub reason: Option<String>,
    pub confidence: Option<f32>,
}
