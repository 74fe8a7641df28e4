// Path: crates/services/src/session/execution/mod.rs
//! The actuator: validates nothing (the normalizer already did), applies
//! humanization, dispatches one platform primitive, and classifies the
//! result. Every dispatch is recorded for diagnostics.

use super::humanize::Humanizer;
use super::pause;
use autotap_api::ports::{ActuationPort, Gesture};
use autotap_types::app::{
    AgentAction, Directive, DispatchRecord, ExecutionOutcome, Scene,
};
use autotap_types::config::ControllerConfig;
use autotap_types::error::SessionError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Dismissal labels tried in order, common locale variants included.
/// When none is on screen, `back` is the fallback.
const DISMISS_LABELS: &[&str] = &[
    "Not now",
    "NOT NOW",
    "Later",
    "Skip",
    "SKIP",
    "No thanks",
    "Close",
    "CLOSE",
    "Cancel",
    "Got it",
    "OK",
    "稍后",
    "跳过",
    "关闭",
    "取消",
];

pub struct Actuator {
    actuation: Arc<dyn ActuationPort>,
    humanizer: Arc<Humanizer>,
    cfg: ControllerConfig,
    dispatch_log: Mutex<Vec<DispatchRecord>>,
}

impl Actuator {
    pub fn new(
        actuation: Arc<dyn ActuationPort>,
        humanizer: Arc<Humanizer>,
        cfg: ControllerConfig,
    ) -> Self {
        Self {
            actuation,
            humanizer,
            cfg,
            dispatch_log: Mutex::new(Vec::new()),
        }
    }

    /// Diagnostic record of every dispatched action this session.
    pub fn dispatch_log(&self) -> Vec<DispatchRecord> {
        self.dispatch_log.lock().unwrap().clone()
    }

    /// A sampled post-action delay, for steps that never reached dispatch.
    pub fn post_delay(&self) -> Duration {
        self.humanizer.post_action_delay()
    }

    /// Applies one directive against the live UI.
    ///
    /// Sequence for everything except `finish`/`error`: pre-action delay,
    /// platform primitive, then (when non-terminal) a post-action delay
    /// where the directive's wait hint takes precedence over the
    /// humanizer default.
    pub async fn execute(
        &self,
        step: u32,
        directive: &Directive,
        scene: &Scene,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        // Terminal declarations dispatch nothing.
        match &directive.action {
            AgentAction::Finish { message } => {
                return ExecutionOutcome::Done {
                    message: message.clone(),
                }
            }
            AgentAction::Error {
                message,
                recoverable,
            } => {
                return ExecutionOutcome::Error {
                    message: message.clone(),
                    recoverable: *recoverable,
                }
            }
            _ => {}
        }

        if !pause(cancel, self.humanizer.pre_action_delay()).await {
            return ExecutionOutcome::protocol_error(SessionError::Cancelled.to_string());
        }

        let (outcome, detail) = self.dispatch(directive, scene, cancel).await;
        self.record(step, directive, &detail, &outcome);
        log::info!(
            "step {}: {} [{}] -> {}",
            step,
            directive.action.kind(),
            detail,
            outcome.summary()
        );

        if !outcome.is_terminal() {
            let wait = directive
                .wait_after_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| self.humanizer.post_action_delay());
            if !pause(cancel, wait).await {
                return ExecutionOutcome::protocol_error(SessionError::Cancelled.to_string());
            }
        }
        outcome
    }

    async fn dispatch(
        &self,
        directive: &Directive,
        scene: &Scene,
        cancel: &CancellationToken,
    ) -> (ExecutionOutcome, String) {
        match &directive.action {
            AgentAction::Tap {
                x, y, element, ..
            } => {
                // The raw target is never dispatched directly.
                let gesture = self.humanizer.tap(*x, *y, *element);
                let detail = gesture_detail(&gesture);
                (self.inject(gesture, "tap").await, detail)
            }
            AgentAction::Swipe {
                start_x,
                start_y,
                end_x,
                end_y,
                duration_ms,
            } => {
                let gesture = self
                    .humanizer
                    .swipe(*start_x, *start_y, *end_x, *end_y, *duration_ms);
                let detail = gesture_detail(&gesture);
                (self.inject(gesture, "swipe").await, detail)
            }
            AgentAction::TypeText { text } => {
                let outcome = match self.actuation.input_text(text).await {
                    Ok(true) => ExecutionOutcome::Success,
                    Ok(false) => ExecutionOutcome::failure("text entry failed"),
                    Err(e) => ExecutionOutcome::failure(format!("text entry: {}", e)),
                };
                (outcome, format!("{} chars", text.chars().count()))
            }
            AgentAction::Wait { duration_ms } => {
                let wait = duration_ms
                    .or(directive.wait_after_ms)
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| self.humanizer.post_action_delay());
                let outcome = if pause(cancel, wait).await {
                    ExecutionOutcome::Success
                } else {
                    ExecutionOutcome::protocol_error(SessionError::Cancelled.to_string())
                };
                (outcome, format!("{}ms", wait.as_millis()))
            }
            AgentAction::Back => {
                let outcome = match self.actuation.press_back().await {
                    Ok(true) => ExecutionOutcome::Success,
                    Ok(false) => ExecutionOutcome::failure("back failed"),
                    Err(e) => ExecutionOutcome::failure(format!("back: {}", e)),
                };
                (outcome, String::new())
            }
            AgentAction::LaunchApp { package } => self.launch(package.as_deref(), cancel).await,
            AgentAction::DismissPopup => self.dismiss_popup(scene).await,
            AgentAction::Finish { .. } | AgentAction::Error { .. } => {
                unreachable!("terminal actions handled before dispatch")
            }
        }
    }

    async fn inject(&self, gesture: Gesture, kind: &str) -> ExecutionOutcome {
        match self.actuation.inject_gesture(gesture).await {
            Ok(true) => ExecutionOutcome::Success,
            Ok(false) => ExecutionOutcome::failure(format!("{} failed", kind)),
            Err(e) => ExecutionOutcome::failure(format!("{}: {}", kind, e)),
        }
    }

    /// Resolves the requested package (directive, then configured target,
    /// then the fallback id) and launches it. A fixed settle delay
    /// follows; cold start is not observable synchronously.
    async fn launch(
        &self,
        requested: Option<&str>,
        cancel: &CancellationToken,
    ) -> (ExecutionOutcome, String) {
        let mut candidates: Vec<&str> = Vec::new();
        if let Some(pkg) = requested {
            candidates.push(pkg);
        } else {
            candidates.push(&self.cfg.target_package);
            candidates.push(&self.cfg.fallback_package);
        }

        let mut resolved = None;
        for pkg in &candidates {
            match self.actuation.is_app_installed(pkg).await {
                Ok(true) => {
                    resolved = Some(*pkg);
                    break;
                }
                Ok(false) => continue,
                Err(e) => {
                    return (
                        ExecutionOutcome::failure(format!("package lookup: {}", e)),
                        String::new(),
                    )
                }
            }
        }
        let Some(package) = resolved else {
            return (ExecutionOutcome::failure("app not found"), String::new());
        };

        if let Err(e) = self.actuation.launch_app(package).await {
            return (
                ExecutionOutcome::failure(format!("launch: {}", e)),
                package.to_string(),
            );
        }
        if !pause(cancel, Duration::from_millis(self.cfg.launch_settle_ms)).await {
            return (
                ExecutionOutcome::protocol_error(SessionError::Cancelled.to_string()),
                package.to_string(),
            );
        }
        (ExecutionOutcome::Success, package.to_string())
    }

    /// Taps the first dismissal label present in the scene; falls back to
    /// `back` when nothing matches.
    async fn dismiss_popup(&self, scene: &Scene) -> (ExecutionOutcome, String) {
        for label in DISMISS_LABELS {
            if let Some(element) = scene.find_by_label(label) {
                let (x, y) = element.center();
                let (w, h) = element.size();
                let gesture = self.humanizer.tap(
                    x,
                    y,
                    Some(autotap_types::app::ElementSize { width: w, height: h }),
                );
                let detail = format!("'{}' {}", label, gesture_detail(&gesture));
                return (self.inject(gesture, "dismiss tap").await, detail);
            }
        }
        let outcome = match self.actuation.press_back().await {
            Ok(true) => ExecutionOutcome::Success,
            Ok(false) => ExecutionOutcome::failure("back failed"),
            Err(e) => ExecutionOutcome::failure(format!("back: {}", e)),
        };
        (outcome, "fallback back".to_string())
    }

    fn record(
        &self,
        step: u32,
        directive: &Directive,
        detail: &str,
        outcome: &ExecutionOutcome,
    ) {
        self.dispatch_log.lock().unwrap().push(DispatchRecord {
            step,
            kind: directive.action.kind().to_string(),
            detail: detail.to_string(),
            outcome: outcome.summary(),
            at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
        });
    }
}

fn gesture_detail(gesture: &Gesture) -> String {
    match gesture {
        Gesture::Tap { x, y, duration_ms } => format!("({},{}) {}ms", x, y, duration_ms),
        Gesture::Swipe {
            start_x,
            start_y,
            end_x,
            end_y,
            duration_ms,
        } => format!(
            "({},{})->({},{}) {}ms",
            start_x, start_y, end_x, end_y, duration_ms
        ),
    }
}
