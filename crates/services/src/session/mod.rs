// Path: crates/services/src/session/mod.rs
//! The session state machine:
//! `Idle -> UnlockingScreen -> OpeningTargetApp -> WaitingForTargetApp ->
//! {PerceivingAndDeciding -> ExecutingStep}* -> terminal`, with `Idle`
//! restored on every exit path.

pub mod execution;
pub mod humanize;
pub mod normalizer;
pub mod perception;
pub mod unlock;

#[cfg(test)]
mod tests;

use autotap_api::oracle::{DecisionContext, DecisionOracle, DecisionRequest};
use autotap_api::ports::{ActuationPort, PerceptionPort};
use autotap_types::app::{
    DispatchRecord, ExecutionOutcome, Scene, SessionId, SessionPhase, TaskResult, UnlockState,
    WorkItem,
};
use autotap_types::config::AppConfig;
use autotap_types::error::SessionError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use execution::Actuator;
use humanize::Humanizer;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use unlock::UnlockController;

/// Cooperative suspension point: sleeps for `duration`, yielding early on
/// cancellation. Returns false when cancelled.
pub(crate) async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Scoped hold on the display wake state; released on drop, on every exit
/// path.
struct WakeLease {
    port: Arc<dyn ActuationPort>,
}

impl WakeLease {
    fn acquire(port: Arc<dyn ActuationPort>) -> Self {
        port.set_wake_lease(true);
        Self { port }
    }
}

impl Drop for WakeLease {
    fn drop(&mut self) {
        self.port.set_wake_lease(false);
    }
}

/// Owns one automation session at a time and sequences every other
/// component. The capability handle is injected, never global.
pub struct SessionController {
    perception: Arc<dyn PerceptionPort>,
    oracle: Arc<dyn DecisionOracle>,
    actuation: Arc<dyn ActuationPort>,
    actuator: Actuator,
    unlock: UnlockController,
    cfg: autotap_types::config::ControllerConfig,
    phase: Mutex<SessionPhase>,
}

impl SessionController {
    pub fn new(
        perception: Arc<dyn PerceptionPort>,
        actuation: Arc<dyn ActuationPort>,
        oracle: Arc<dyn DecisionOracle>,
        cfg: &AppConfig,
    ) -> Self {
        let humanizer = Arc::new(Humanizer::new(cfg.humanizer.clone()));
        Self {
            actuator: Actuator::new(actuation.clone(), humanizer, cfg.controller.clone()),
            unlock: UnlockController::new(
                actuation.clone(),
                perception.clone(),
                cfg.unlock.clone(),
            ),
            perception,
            oracle,
            actuation,
            cfg: cfg.controller.clone(),
            phase: Mutex::new(SessionPhase::Idle),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock().unwrap()
    }

    pub fn dispatch_log(&self) -> Vec<DispatchRecord> {
        self.actuator.dispatch_log()
    }

    fn set_phase(&self, phase: SessionPhase) {
        *self.phase.lock().unwrap() = phase;
    }

    /// Runs one work item to its single terminal result.
    pub async fn run(&self, item: WorkItem, cancel: CancellationToken) -> TaskResult {
        let session_id = SessionId::generate();
        log::info!("session {} started: {}", session_id.short(), item.task);

        let result = self.run_inner(session_id, &item, &cancel).await;

        match &result {
            TaskResult::Success(msg) => {
                self.set_phase(SessionPhase::Completed);
                log::info!(
                    "session {} completed: {}",
                    session_id.short(),
                    msg.as_deref().unwrap_or("")
                );
            }
            TaskResult::Failed(reason) => {
                self.set_phase(SessionPhase::Failed);
                log::warn!("session {} failed: {}", session_id.short(), reason);
            }
            TaskResult::NeedUserAction(msg) => {
                self.set_phase(SessionPhase::NeedsUserAction);
                log::warn!("session {} needs user action: {}", session_id.short(), msg);
            }
        }

        // Idle is restored on every exit path.
        self.set_phase(SessionPhase::Idle);
        result
    }

    async fn run_inner(
        &self,
        session_id: SessionId,
        item: &WorkItem,
        cancel: &CancellationToken,
    ) -> TaskResult {
        let _lease = WakeLease::acquire(self.actuation.clone());

        // Unlock is a precondition, not a step.
        self.set_phase(SessionPhase::UnlockingScreen);
        match self.unlock.ensure_unlocked(cancel).await {
            UnlockState::AlreadyUnlocked | UnlockState::Success => {}
            UnlockState::Failed(reason) => {
                return TaskResult::Failed(format!("unlock failed: {}", reason))
            }
            UnlockState::NeedUserAction(msg) | UnlockState::NotSupported(msg) => {
                return TaskResult::NeedUserAction(msg)
            }
        }
        if cancel.is_cancelled() {
            return TaskResult::Failed(SessionError::Cancelled.to_string());
        }

        // Foreground the target application. No retry: a missing app is a
        // precondition failure, not a transient fault.
        self.set_phase(SessionPhase::OpeningTargetApp);
        let package = match self.resolve_target(item).await {
            Ok(pkg) => pkg,
            Err(result) => return result,
        };
        if let Err(e) = self.actuation.launch_app(&package).await {
            return TaskResult::Failed(format!("{} launch failed: {}", package, e));
        }

        self.set_phase(SessionPhase::WaitingForTargetApp);
        if !self.await_foreground(&package, cancel).await {
            if cancel.is_cancelled() {
                return TaskResult::Failed(SessionError::Cancelled.to_string());
            }
            return TaskResult::Failed(format!(
                "timed out waiting for {} to reach the foreground",
                package
            ));
        }

        // Main loop, bounded by the step budget.
        let mut summaries: Vec<String> = Vec::new();
        let mut consecutive_failures = 0u32;

        for step in 1..=self.cfg.max_steps {
            if cancel.is_cancelled() {
                return TaskResult::Failed(SessionError::Cancelled.to_string());
            }

            let (outcome, label, dispatched) = self
                .run_step(session_id, step, item, &summaries, cancel)
                .await;

            // The summary is appended regardless of outcome.
            summaries.push(format!("step {}: {} -> {}", step, label, outcome.summary()));
            if summaries.len() > self.cfg.action_history_limit {
                let drop = summaries.len() - self.cfg.action_history_limit;
                summaries.drain(..drop);
            }

            match outcome {
                ExecutionOutcome::Done { message } => return TaskResult::Success(message),
                ExecutionOutcome::Error {
                    message,
                    recoverable: false,
                } => {
                    if cancel.is_cancelled() {
                        return TaskResult::Failed(SessionError::Cancelled.to_string());
                    }
                    return TaskResult::Failed(message);
                }
                ExecutionOutcome::Error {
                    message,
                    recoverable: true,
                } => {
                    consecutive_failures += 1;
                    log::warn!("step {} recoverable error: {}", step, message);
                }
                ExecutionOutcome::Failed { reason } => {
                    consecutive_failures += 1;
                    log::warn!("step {} failed: {}", step, reason);
                }
                ExecutionOutcome::Success => consecutive_failures = 0,
            }

            if consecutive_failures >= self.cfg.max_consecutive_failures {
                return TaskResult::Failed("too many consecutive step failures".into());
            }

            // Steps that never reached the actuator skipped its post-action
            // delay; pace the loop here instead.
            if !dispatched && !pause(cancel, self.actuator.post_delay()).await {
                return TaskResult::Failed(SessionError::Cancelled.to_string());
            }
        }

        TaskResult::Failed("step budget exceeded".into())
    }

    /// One perceive -> decide -> act iteration. Returns the classified
    /// outcome, a short label for the summary, and whether the actuator
    /// ran. Faults are coerced into outcomes; nothing escapes.
    async fn run_step(
        &self,
        session_id: SessionId,
        step: u32,
        item: &WorkItem,
        summaries: &[String],
        cancel: &CancellationToken,
    ) -> (ExecutionOutcome, String, bool) {
        self.set_phase(SessionPhase::PerceivingAndDeciding(step));

        let (scene, reply) = match self
            .perceive_and_decide(session_id, step, item, summaries)
            .await
        {
            Ok(pair) => pair,
            Err(fault) => {
                let label = match &fault {
                    SessionError::Driver(_) => "perceive",
                    SessionError::Oracle(_) => "decide",
                    SessionError::Cancelled => "cancelled",
                };
                return (
                    ExecutionOutcome::protocol_error(fault.to_string()),
                    label.into(),
                    false,
                );
            }
        };

        let directive = match normalizer::normalize(&reply) {
            Ok(directive) => directive,
            Err(e) => return (e.into_outcome(), "invalid directive".into(), false),
        };
        let label = directive.action.kind().to_string();

        self.set_phase(SessionPhase::ExecutingStep(step));
        let outcome = self.actuator.execute(step, &directive, &scene, cancel).await;
        (outcome, label, true)
    }

    /// Perception plus the decision call for one step. Driver and oracle
    /// faults surface as [`SessionError`]; the caller coerces them into
    /// the non-recoverable outcome.
    async fn perceive_and_decide(
        &self,
        session_id: SessionId,
        step: u32,
        item: &WorkItem,
        summaries: &[String],
    ) -> Result<(Scene, String), SessionError> {
        let scene = perception::capture_scene(self.perception.as_ref()).await?;
        let request = DecisionRequest::from_scene(
            &scene,
            BASE64.encode(&scene.screenshot_jpeg),
            DecisionContext {
                task: item.task.clone(),
                session_id: session_id.to_string(),
                step,
                payload_ref: item.payload_ref.clone(),
                caption: item.caption.clone(),
                previous_actions: summaries.to_vec(),
            },
        );
        let reply = self.oracle.decide(&request).await?;
        Ok((scene, reply))
    }

    async fn resolve_target(&self, item: &WorkItem) -> Result<String, TaskResult> {
        let candidates: Vec<String> = match &item.package {
            Some(pkg) => vec![pkg.clone()],
            None => vec![
                self.cfg.target_package.clone(),
                self.cfg.fallback_package.clone(),
            ],
        };
        for pkg in &candidates {
            match self.actuation.is_app_installed(pkg).await {
                Ok(true) => return Ok(pkg.clone()),
                Ok(false) => continue,
                Err(e) => {
                    return Err(TaskResult::Failed(format!("package lookup failed: {}", e)))
                }
            }
        }
        Err(TaskResult::Failed(format!(
            "{} not installed",
            candidates.first().cloned().unwrap_or_default()
        )))
    }

    /// Bounded poll until the target package owns the foreground.
    async fn await_foreground(&self, package: &str, cancel: &CancellationToken) -> bool {
        let deadline = Instant::now() + Duration::from_millis(self.cfg.app_ready_timeout_ms);
        loop {
            match self.perception.foreground_package().await {
                Ok(Some(front)) if front == package => return true,
                Ok(_) => {}
                Err(e) => log::debug!("foreground probe failed: {}", e),
            }
            if Instant::now() >= deadline {
                return false;
            }
            if !pause(cancel, Duration::from_millis(self.cfg.app_ready_poll_ms)).await {
                return false;
            }
        }
    }
}
