// Path: crates/services/src/session/unlock.rs
//! Screen-unlock pre-condition: guarantees the display is on and the
//! keyguard cleared before automation proceeds, using only the same
//! actuation primitives the executor has. Unlock latency varies widely
//! across devices, so convergence is detected by polling lock state
//! under a bounded timeout rather than by a fixed delay.

use super::pause;
use autotap_api::ports::{ActuationPort, Gesture, LockStatus, PerceptionPort};
use autotap_types::app::UnlockState;
use autotap_types::config::UnlockConfig;
use autotap_types::error::SessionError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub struct UnlockController {
    actuation: Arc<dyn ActuationPort>,
    perception: Arc<dyn PerceptionPort>,
    cfg: UnlockConfig,
}

impl UnlockController {
    pub fn new(
        actuation: Arc<dyn ActuationPort>,
        perception: Arc<dyn PerceptionPort>,
        cfg: UnlockConfig,
    ) -> Self {
        Self {
            actuation,
            perception,
            cfg,
        }
    }

    pub async fn ensure_unlocked(&self, cancel: &CancellationToken) -> UnlockState {
        // 1. Wake the display and wait until it reports interactive.
        if let Err(e) = self.actuation.wake_display().await {
            return UnlockState::Failed(format!("display wake: {}", e));
        }
        if !self
            .poll(cancel, self.cfg.wake_timeout_ms, self.cfg.wake_poll_ms, || {
                self.display_on()
            })
            .await
        {
            return UnlockState::Failed("display did not become interactive".into());
        }
        // Let the lock screen finish initializing before probing it.
        if !pause(cancel, Duration::from_millis(self.cfg.settle_ms)).await {
            return UnlockState::Failed(SessionError::Cancelled.to_string());
        }

        // 2. Nothing to do when the keyguard is already gone.
        let status = match self.actuation.lock_status().await {
            Ok(s) => s,
            Err(e) => return UnlockState::Failed(format!("lock state query: {}", e)),
        };
        let secured = match status {
            LockStatus::Unlocked => return UnlockState::AlreadyUnlocked,
            LockStatus::Locked { secured } => secured,
        };

        // 3. Without the input capability there is nothing we can drive.
        match self.actuation.capability_ready().await {
            Ok(true) => {}
            Ok(false) => {
                return UnlockState::NeedUserAction(
                    "input capability is unavailable; enable it on the device".into(),
                )
            }
            Err(e) => return UnlockState::Failed(format!("capability probe: {}", e)),
        }

        if secured {
            self.unlock_with_credential(cancel).await
        } else {
            self.unlock_with_swipe(cancel).await
        }
    }

    /// Swipe-only keyguard: one fixed vertical swipe, centered, from
    /// `swipe_start_pct` down to `swipe_end_pct` of screen height.
    async fn unlock_with_swipe(&self, cancel: &CancellationToken) -> UnlockState {
        let (width, height) = match self.actuation.screen_size().await {
            Ok(dims) => dims,
            Err(e) => return UnlockState::Failed(format!("screen size: {}", e)),
        };
        let x = (width / 2) as i32;
        let gesture = Gesture::Swipe {
            start_x: x,
            start_y: (height as f64 * self.cfg.swipe_start_pct) as i32,
            end_x: x,
            end_y: (height as f64 * self.cfg.swipe_end_pct) as i32,
            duration_ms: self.cfg.swipe_duration_ms,
        };
        match self.actuation.inject_gesture(gesture).await {
            Ok(true) => {}
            Ok(false) => return UnlockState::Failed("unlock swipe rejected".into()),
            Err(e) => return UnlockState::Failed(format!("unlock swipe: {}", e)),
        }

        if self
            .poll(
                cancel,
                self.cfg.swipe_clear_timeout_ms,
                self.cfg.lock_poll_ms,
                || self.lock_cleared(),
            )
            .await
        {
            UnlockState::Success
        } else {
            UnlockState::Failed("lock did not clear after swipe".into())
        }
    }

    /// Credential-secured keyguard: locate the entry surface in the
    /// current scene and type the stored PIN/password.
    async fn unlock_with_credential(&self, cancel: &CancellationToken) -> UnlockState {
        let Some(credential) = self.cfg.credential.clone() else {
            return UnlockState::NeedUserAction(
                "lock screen is secured and no credential is stored".into(),
            );
        };

        let capture = match self.perception.capture_ui().await {
            Ok(c) => c,
            Err(e) => return UnlockState::Failed(format!("lock screen capture: {}", e)),
        };
        let Some(entry) = capture.find_text_entry() else {
            // Pattern and biometric keyguards have no surface we can type
            // into.
            return UnlockState::NotSupported(
                "lock screen offers no text entry surface".into(),
            );
        };

        let (x, y) = entry.bounds.center();
        let focus = Gesture::Tap {
            x,
            y,
            duration_ms: 80,
        };
        if let Err(e) = self.actuation.inject_gesture(focus).await {
            return UnlockState::Failed(format!("credential focus tap: {}", e));
        }
        match self.actuation.input_text(&credential).await {
            Ok(true) => {}
            Ok(false) => return UnlockState::Failed("credential entry rejected".into()),
            Err(e) => return UnlockState::Failed(format!("credential entry: {}", e)),
        }

        if self
            .poll(
                cancel,
                self.cfg.credential_clear_timeout_ms,
                self.cfg.lock_poll_ms,
                || self.lock_cleared(),
            )
            .await
        {
            UnlockState::Success
        } else {
            UnlockState::Failed("lock did not clear after credential entry".into())
        }
    }

    async fn display_on(&self) -> bool {
        self.actuation.display_interactive().await.unwrap_or(false)
    }

    async fn lock_cleared(&self) -> bool {
        matches!(self.actuation.lock_status().await, Ok(LockStatus::Unlocked))
    }

    /// Bounded poll; true once the probe reports done, false on timeout
    /// or cancellation.
    async fn poll<F, Fut>(
        &self,
        cancel: &CancellationToken,
        timeout_ms: u64,
        interval_ms: u64,
        probe: F,
    ) -> bool
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if probe().await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            if !pause(cancel, Duration::from_millis(interval_ms)).await {
                return false;
            }
        }
    }
}
