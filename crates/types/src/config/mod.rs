// Path: crates/types/src/config/mod.rs

//! Configuration structures for the autotap components. All fields carry
//! serde defaults so a partial TOML file is enough to boot.

use serde::{Deserialize, Serialize};

/// How the adb transport reaches the device.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdbConfig {
    /// Path to the adb binary.
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    /// Device serial; None lets adb pick the only connected device.
    #[serde(default)]
    pub serial: Option<String>,
}

fn default_adb_path() -> String {
    "adb".to_string()
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            serial: None,
        }
    }
}

/// Session controller limits and target-application identity.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Hard bound on perceive/decide/act iterations per session.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Consecutive failed steps tolerated before the session abandons.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Default target application package.
    #[serde(default = "default_target_package")]
    pub target_package: String,
    /// Fallback package tried when the default is not installed.
    #[serde(default = "default_fallback_package")]
    pub fallback_package: String,
    /// Total time to wait for the target app to reach the foreground.
    #[serde(default = "default_app_ready_timeout_ms")]
    pub app_ready_timeout_ms: u64,
    /// Poll interval while waiting for the foreground app.
    #[serde(default = "default_app_ready_poll_ms")]
    pub app_ready_poll_ms: u64,
    /// Fixed settle delay after an app launch; cold start is not
    /// observable synchronously.
    #[serde(default = "default_launch_settle_ms")]
    pub launch_settle_ms: u64,
    /// Bound on the previous-actions window forwarded to the oracle.
    #[serde(default = "default_action_history_limit")]
    pub action_history_limit: usize,
}

fn default_max_steps() -> u32 {
    50
}
fn default_max_consecutive_failures() -> u32 {
    5
}
fn default_target_package() -> String {
    "com.zhiliaoapp.musically".to_string()
}
fn default_fallback_package() -> String {
    "com.ss.android.ugc.trill".to_string()
}
fn default_app_ready_timeout_ms() -> u64 {
    10_000
}
fn default_app_ready_poll_ms() -> u64 {
    500
}
fn default_launch_settle_ms() -> u64 {
    2_000
}
fn default_action_history_limit() -> usize {
    20
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_consecutive_failures: default_max_consecutive_failures(),
            target_package: default_target_package(),
            fallback_package: default_fallback_package(),
            app_ready_timeout_ms: default_app_ready_timeout_ms(),
            app_ready_poll_ms: default_app_ready_poll_ms(),
            launch_settle_ms: default_launch_settle_ms(),
            action_history_limit: default_action_history_limit(),
        }
    }
}

/// One log-normal duration band: mode in milliseconds, dispersion in
/// log-space, and a hard clamp.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct DelayBand {
    pub mode_ms: u64,
    pub sigma: f64,
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Statistical parameters of the synthetic-input realism model.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HumanizerConfig {
    /// Jitter sigma is element extent divided by this factor.
    #[serde(default = "default_jitter_divisor")]
    pub jitter_divisor: f64,
    /// Mean of the directional bias, in pixels toward positive x/y.
    #[serde(default = "default_bias_mean_px")]
    pub bias_mean_px: f64,
    /// Sigma of the directional bias distribution.
    #[serde(default = "default_bias_sigma_px")]
    pub bias_sigma_px: f64,
    /// Assumed element size when a tap carries no size hint.
    #[serde(default = "default_element_size_px")]
    pub default_element_size_px: i32,
    #[serde(default = "default_tap_duration")]
    pub tap_duration: DelayBand,
    #[serde(default = "default_pre_delay")]
    pub pre_action_delay: DelayBand,
    #[serde(default = "default_post_delay")]
    pub post_action_delay: DelayBand,
    /// Per-axis sigma of swipe start-point jitter.
    #[serde(default = "default_swipe_start_sigma")]
    pub swipe_start_sigma_px: f64,
    /// Per-axis sigma of swipe end-point jitter; endpoints vary more than
    /// starts.
    #[serde(default = "default_swipe_end_sigma")]
    pub swipe_end_sigma_px: f64,
    /// Uniform duration scale range for swipes.
    #[serde(default = "default_swipe_scale_min")]
    pub swipe_duration_scale_min: f64,
    #[serde(default = "default_swipe_scale_max")]
    pub swipe_duration_scale_max: f64,
}

fn default_jitter_divisor() -> f64 {
    6.0
}
fn default_bias_mean_px() -> f64 {
    1.0
}
fn default_bias_sigma_px() -> f64 {
    0.5
}
fn default_element_size_px() -> i32 {
    100
}
fn default_tap_duration() -> DelayBand {
    DelayBand {
        mode_ms: 100,
        sigma: 0.3,
        min_ms: 70,
        max_ms: 150,
    }
}
fn default_pre_delay() -> DelayBand {
    DelayBand {
        mode_ms: 300,
        sigma: 0.4,
        min_ms: 150,
        max_ms: 600,
    }
}
fn default_post_delay() -> DelayBand {
    DelayBand {
        mode_ms: 400,
        sigma: 0.3,
        min_ms: 200,
        max_ms: 800,
    }
}
fn default_swipe_start_sigma() -> f64 {
    5.0
}
fn default_swipe_end_sigma() -> f64 {
    10.0
}
fn default_swipe_scale_min() -> f64 {
    0.8
}
fn default_swipe_scale_max() -> f64 {
    1.2
}

impl Default for HumanizerConfig {
    fn default() -> Self {
        Self {
            jitter_divisor: default_jitter_divisor(),
            bias_mean_px: default_bias_mean_px(),
            bias_sigma_px: default_bias_sigma_px(),
            default_element_size_px: default_element_size_px(),
            tap_duration: default_tap_duration(),
            pre_action_delay: default_pre_delay(),
            post_action_delay: default_post_delay(),
            swipe_start_sigma_px: default_swipe_start_sigma(),
            swipe_end_sigma_px: default_swipe_end_sigma(),
            swipe_duration_scale_min: default_swipe_scale_min(),
            swipe_duration_scale_max: default_swipe_scale_max(),
        }
    }
}

/// Screen-unlock pre-condition parameters.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UnlockConfig {
    /// Total time to wait for the display to become interactive.
    #[serde(default = "default_wake_timeout_ms")]
    pub wake_timeout_ms: u64,
    #[serde(default = "default_wake_poll_ms")]
    pub wake_poll_ms: u64,
    /// Settle delay after wake, before the lock screen is probed.
    #[serde(default = "default_wake_settle_ms")]
    pub settle_ms: u64,
    /// Swipe start as a fraction of screen height, centered horizontally.
    #[serde(default = "default_swipe_start_pct")]
    pub swipe_start_pct: f64,
    #[serde(default = "default_swipe_end_pct")]
    pub swipe_end_pct: f64,
    #[serde(default = "default_unlock_swipe_duration_ms")]
    pub swipe_duration_ms: u64,
    /// Bounded poll for the lock to clear after a swipe.
    #[serde(default = "default_swipe_clear_timeout_ms")]
    pub swipe_clear_timeout_ms: u64,
    #[serde(default = "default_lock_poll_ms")]
    pub lock_poll_ms: u64,
    /// Stored PIN/password; None means secured devices need user action.
    #[serde(default)]
    pub credential: Option<String>,
    /// Bounded poll for the lock to clear after credential entry.
    #[serde(default = "default_credential_clear_timeout_ms")]
    pub credential_clear_timeout_ms: u64,
}

fn default_wake_timeout_ms() -> u64 {
    2_000
}
fn default_wake_poll_ms() -> u64 {
    50
}
fn default_wake_settle_ms() -> u64 {
    500
}
fn default_swipe_start_pct() -> f64 {
    0.90
}
fn default_swipe_end_pct() -> f64 {
    0.40
}
fn default_unlock_swipe_duration_ms() -> u64 {
    300
}
fn default_swipe_clear_timeout_ms() -> u64 {
    1_500
}
fn default_lock_poll_ms() -> u64 {
    100
}
fn default_credential_clear_timeout_ms() -> u64 {
    3_000
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            wake_timeout_ms: default_wake_timeout_ms(),
            wake_poll_ms: default_wake_poll_ms(),
            settle_ms: default_wake_settle_ms(),
            swipe_start_pct: default_swipe_start_pct(),
            swipe_end_pct: default_swipe_end_pct(),
            swipe_duration_ms: default_unlock_swipe_duration_ms(),
            swipe_clear_timeout_ms: default_swipe_clear_timeout_ms(),
            lock_poll_ms: default_lock_poll_ms(),
            credential: None,
            credential_clear_timeout_ms: default_credential_clear_timeout_ms(),
        }
    }
}

/// Decision-service endpoint configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OracleConfig {
    #[serde(default = "default_oracle_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_oracle_endpoint() -> String {
    "http://127.0.0.1:8087/v1/decide".to_string()
}
fn default_oracle_timeout_secs() -> u64 {
    60
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: default_oracle_endpoint(),
            api_key: String::new(),
            timeout_secs: default_oracle_timeout_secs(),
        }
    }
}

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub adb: AdbConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub humanizer: HumanizerConfig,
    #[serde(default)]
    pub unlock: UnlockConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}
