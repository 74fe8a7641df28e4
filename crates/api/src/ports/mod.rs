// Path: crates/api/src/ports/mod.rs

use async_trait::async_trait;
use autotap_types::app::UiCapture;
use autotap_types::error::DriverError;
use serde::{Deserialize, Serialize};

/// A humanized input gesture, ready for dispatch. Produced by the
/// humanizer, consumed once by the actuation port, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gesture {
    /// Press at (x, y) held for `duration_ms`.
    Tap { x: i32, y: i32, duration_ms: u64 },
    /// Drag from start to end over `duration_ms`.
    Swipe {
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration_ms: u64,
    },
}

/// Lock-screen status as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockStatus {
    Unlocked,
    /// `secured` is true when a credential (PIN/password) guards the lock.
    Locked { secured: bool },
}

/// Scene capture side of the device capability (the "eyes").
#[async_trait]
pub trait PerceptionPort: Send + Sync {
    /// Captures the visible element tree, unfiltered.
    async fn capture_ui(&self) -> Result<UiCapture, DriverError>;

    /// Captures a full-screen screenshot as PNG bytes.
    async fn capture_screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Package of the application currently in the foreground, if any.
    async fn foreground_package(&self) -> Result<Option<String>, DriverError>;
}

/// Input dispatch and device-state side of the capability (the "hands").
///
/// A single instance is the session's single-owner resource: one gesture
/// completes fully before perception may run again.
#[async_trait]
pub trait ActuationPort: Send + Sync {
    /// Dispatches a gesture. `Ok(false)` means the device rejected it.
    async fn inject_gesture(&self, gesture: Gesture) -> Result<bool, DriverError>;

    /// Types text into the focused surface. `Ok(false)` on rejection.
    async fn input_text(&self, text: &str) -> Result<bool, DriverError>;

    /// Sends the global back navigation event.
    async fn press_back(&self) -> Result<bool, DriverError>;

    /// Brings the application to the foreground via its launcher intent.
    async fn launch_app(&self, package: &str) -> Result<(), DriverError>;

    /// True when the package resolves on the device.
    async fn is_app_installed(&self, package: &str) -> Result<bool, DriverError>;

    /// Requests display wake; completion is observed via
    /// [`Self::display_interactive`].
    async fn wake_display(&self) -> Result<(), DriverError>;

    /// True when the display is powered and accepting input.
    async fn display_interactive(&self) -> Result<bool, DriverError>;

    /// Queries the lock screen state.
    async fn lock_status(&self) -> Result<LockStatus, DriverError>;

    /// Display size in pixels (width, height).
    async fn screen_size(&self) -> Result<(u32, u32), DriverError>;

    /// True when the input capability is usable at all (device attached,
    /// injection service enabled).
    async fn capability_ready(&self) -> Result<bool, DriverError>;

    /// Marks or clears the session's hold on the display wake state.
    /// Cheap and synchronous; drivers that need no bookkeeping ignore it.
    fn set_wake_lease(&self, held: bool);
}
