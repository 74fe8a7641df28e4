// Path: crates/drivers/src/adb/mod.rs
//! ADB-backed device driver: perception via `uiautomator dump` +
//! `screencap`, actuation via `input`/`monkey`, state via `dumpsys`.

pub mod dumpsys;
pub mod uiautomator;

use async_trait::async_trait;
use autotap_api::ports::{ActuationPort, Gesture, LockStatus, PerceptionPort};
use autotap_types::app::UiCapture;
use autotap_types::config::AdbConfig;
use autotap_types::error::DriverError;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::Command;

/// Thin wrapper around adb invocations for one device.
#[derive(Debug, Clone)]
pub struct AdbTransport {
    adb_path: String,
    serial: Option<String>,
}

impl AdbTransport {
    pub fn new(cfg: &AdbConfig) -> Self {
        Self {
            adb_path: cfg.adb_path.clone(),
            serial: cfg.serial.clone(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.stdin(Stdio::null());
        cmd
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, DriverError> {
        let output = self
            .command()
            .args(args)
            .output()
            .await
            .map_err(|e| DriverError::Transport(format!("adb spawn: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DriverError::Transport(format!(
                "adb {} exited {}: {}",
                args.first().unwrap_or(&""),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    /// `adb shell <args...>`, stdout decoded lossily.
    pub async fn shell(&self, args: &[&str]) -> Result<String, DriverError> {
        let mut full = vec!["shell"];
        full.extend_from_slice(args);
        let out = self.run(&full).await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// `adb exec-out <args...>`, raw stdout (binary-safe).
    pub async fn exec_out(&self, args: &[&str]) -> Result<Vec<u8>, DriverError> {
        let mut full = vec!["exec-out"];
        full.extend_from_slice(args);
        self.run(&full).await
    }

    pub async fn get_state(&self) -> Result<String, DriverError> {
        let out = self.run(&["get-state"]).await?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }
}

/// The concrete device capability. A single instance owns the device for
/// the session's lifetime.
pub struct AdbDevice {
    transport: AdbTransport,
    wake_lease: AtomicBool,
}

impl AdbDevice {
    pub fn new(cfg: &AdbConfig) -> Self {
        Self {
            transport: AdbTransport::new(cfg),
            wake_lease: AtomicBool::new(false),
        }
    }

    pub fn transport(&self) -> &AdbTransport {
        &self.transport
    }
}

/// Escapes text for `input text`: spaces become `%s`, shell-significant
/// characters are backslash-escaped.
pub fn escape_input_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            ' ' => out.push_str("%s"),
            '\\' | '"' | '\'' | '`' | '&' | '<' | '>' | '(' | ')' | '|' | ';' | '$' | '*'
            | '~' | '#' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

fn dispatch_ok(output: &str) -> bool {
    !output.contains("Error") && !output.contains("Exception")
}

#[async_trait]
impl PerceptionPort for AdbDevice {
    async fn capture_ui(&self) -> Result<UiCapture, DriverError> {
        let raw = self
            .transport
            .shell(&["uiautomator", "dump", "/dev/tty"])
            .await?;
        let (nodes, package) = uiautomator::parse_dump(&raw)?;

        // The dump does not carry the activity; resolve it separately.
        let activity = match self.foreground_package_and_activity().await {
            Ok(Some((_, activity))) => activity,
            _ => None,
        };

        Ok(UiCapture {
            package: package.unwrap_or_default(),
            activity,
            nodes,
        })
    }

    async fn capture_screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let png = self.transport.exec_out(&["screencap", "-p"]).await?;
        if png.is_empty() {
            return Err(DriverError::Transport("screencap returned no data".into()));
        }
        Ok(png)
    }

    async fn foreground_package(&self) -> Result<Option<String>, DriverError> {
        Ok(self
            .foreground_package_and_activity()
            .await?
            .map(|(pkg, _)| pkg))
    }
}

impl AdbDevice {
    async fn foreground_package_and_activity(
        &self,
    ) -> Result<Option<(String, Option<String>)>, DriverError> {
        let out = self
            .transport
            .shell(&["dumpsys", "activity", "activities"])
            .await?;
        Ok(dumpsys::parse_foreground(&out))
    }
}

#[async_trait]
impl ActuationPort for AdbDevice {
    async fn inject_gesture(&self, gesture: Gesture) -> Result<bool, DriverError> {
        let out = match gesture {
            // `input tap` has no duration control; a zero-length swipe
            // carries the humanized press duration.
            Gesture::Tap { x, y, duration_ms } => {
                let (x, y, d) = (x.to_string(), y.to_string(), duration_ms.to_string());
                self.transport
                    .shell(&["input", "swipe", &x, &y, &x, &y, &d])
                    .await?
            }
            Gesture::Swipe {
                start_x,
                start_y,
                end_x,
                end_y,
                duration_ms,
            } => {
                let (sx, sy) = (start_x.to_string(), start_y.to_string());
                let (ex, ey) = (end_x.to_string(), end_y.to_string());
                let d = duration_ms.to_string();
                self.transport
                    .shell(&["input", "swipe", &sx, &sy, &ex, &ey, &d])
                    .await?
            }
        };
        Ok(dispatch_ok(&out))
    }

    async fn input_text(&self, text: &str) -> Result<bool, DriverError> {
        let escaped = escape_input_text(text);
        let out = self.transport.shell(&["input", "text", &escaped]).await?;
        Ok(dispatch_ok(&out))
    }

    async fn press_back(&self) -> Result<bool, DriverError> {
        let out = self
            .transport
            .shell(&["input", "keyevent", "KEYCODE_BACK"])
            .await?;
        Ok(dispatch_ok(&out))
    }

    async fn launch_app(&self, package: &str) -> Result<(), DriverError> {
        let out = self
            .transport
            .shell(&[
                "monkey",
                "-p",
                package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ])
            .await?;
        if out.contains("No activities found") || out.contains("monkey aborted") {
            return Err(DriverError::Dispatch(format!(
                "launcher intent for {} did not resolve",
                package
            )));
        }
        Ok(())
    }

    async fn is_app_installed(&self, package: &str) -> Result<bool, DriverError> {
        let out = self.transport.shell(&["pm", "path", package]).await?;
        Ok(out.lines().any(|l| l.starts_with("package:")))
    }

    async fn wake_display(&self) -> Result<(), DriverError> {
        self.transport
            .shell(&["input", "keyevent", "KEYCODE_WAKEUP"])
            .await?;
        Ok(())
    }

    async fn display_interactive(&self) -> Result<bool, DriverError> {
        let out = self.transport.shell(&["dumpsys", "power"]).await?;
        Ok(dumpsys::parse_interactive(&out))
    }

    async fn lock_status(&self) -> Result<LockStatus, DriverError> {
        let out = self.transport.shell(&["dumpsys", "window", "policy"]).await?;
        Ok(dumpsys::parse_lock_status(&out))
    }

    async fn screen_size(&self) -> Result<(u32, u32), DriverError> {
        let out = self.transport.shell(&["wm", "size"]).await?;
        dumpsys::parse_screen_size(&out)
            .ok_or_else(|| DriverError::Parse(format!("wm size: '{}'", out.trim())))
    }

    async fn capability_ready(&self) -> Result<bool, DriverError> {
        match self.transport.get_state().await {
            Ok(state) => Ok(state == "device"),
            Err(DriverError::Transport(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn set_wake_lease(&self, held: bool) {
        self.wake_lease.store(held, Ordering::SeqCst);
        log::debug!("wake lease {}", if held { "acquired" } else { "released" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_text_escaping() {
        assert_eq!(escape_input_text("hello world"), "hello%sworld");
        assert_eq!(escape_input_text("a&b"), "a\\&b");
        assert_eq!(escape_input_text("it's"), "it\\'s");
        assert_eq!(escape_input_text("plain"), "plain");
    }

    #[test]
    fn dispatch_output_classification() {
        assert!(dispatch_ok(""));
        assert!(!dispatch_ok("Error: Invalid arguments"));
        assert!(!dispatch_ok("java.lang.SecurityException: ..."));
    }
}
