// Path: crates/api/src/oracle/mod.rs

pub mod http_adapter;

use async_trait::async_trait;
use autotap_types::app::{Element, Scene};
use autotap_types::error::OracleError;
use serde::{Deserialize, Serialize};

pub use http_adapter::HttpDecisionOracle;

/// Element tree as serialized for the decision service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiTreeWire {
    pub package: String,
    pub activity: Option<String>,
    pub elements: Vec<Element>,
}

/// Accumulated loop context forwarded with every scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionContext {
    pub task: String,
    pub session_id: String,
    pub step: u32,
    pub payload_ref: String,
    pub caption: String,
    pub previous_actions: Vec<String>,
}

/// One perceived scene plus context, submitted per step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Base64 of the JPEG screenshot.
    pub screenshot: String,
    pub ui_tree: UiTreeWire,
    pub context: DecisionContext,
}

impl DecisionRequest {
    pub fn from_scene(scene: &Scene, screenshot_b64: String, context: DecisionContext) -> Self {
        Self {
            screenshot: screenshot_b64,
            ui_tree: UiTreeWire {
                package: scene.package.clone(),
                activity: scene.activity.clone(),
                elements: scene.elements.clone(),
            },
            context,
        }
    }
}

/// The external decision service, consumed as a request/response boundary.
/// Returns the raw reply text; normalization into a validated directive is
/// the caller's concern.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn decide(&self, request: &DecisionRequest) -> Result<String, OracleError>;
}
