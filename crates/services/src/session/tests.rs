// Path: crates/services/src/session/tests.rs

use super::unlock::UnlockController;
use super::SessionController;
use async_trait::async_trait;
use autotap_api::oracle::{DecisionOracle, DecisionRequest};
use autotap_api::ports::Gesture;
use autotap_drivers::mock::{MockDevice, MockEvent};
use autotap_types::app::{TaskResult, UnlockState, WorkItem};
use autotap_types::config::{AppConfig, DelayBand};
use autotap_types::error::OracleError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const PKG: &str = "com.zhiliaoapp.musically";

/// Oracle scripted with canned replies; repeats the last one when the
/// script runs out.
struct ScriptedOracle {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    calls: AtomicU32,
    last_request: Mutex<Option<DecisionRequest>>,
}

impl ScriptedOracle {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn decide(&self, request: &DecisionRequest) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        let mut replies = self.replies.lock().unwrap();
        if let Some(next) = replies.pop_front() {
            *self.last.lock().unwrap() = Some(next.clone());
            return Ok(next);
        }
        self.last
            .lock()
            .unwrap()
            .clone()
            .ok_or(OracleError::EmptyResponse)
    }
}

/// Shrinks every delay and timeout so tests run in milliseconds.
fn fast_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    let instant = DelayBand {
        mode_ms: 1,
        sigma: 0.1,
        min_ms: 0,
        max_ms: 2,
    };
    cfg.humanizer.tap_duration = DelayBand {
        mode_ms: 100,
        sigma: 0.3,
        min_ms: 70,
        max_ms: 150,
    };
    cfg.humanizer.pre_action_delay = instant;
    cfg.humanizer.post_action_delay = instant;
    cfg.controller.launch_settle_ms = 1;
    cfg.controller.app_ready_timeout_ms = 200;
    cfg.controller.app_ready_poll_ms = 5;
    cfg.unlock.wake_timeout_ms = 100;
    cfg.unlock.wake_poll_ms = 2;
    cfg.unlock.settle_ms = 1;
    cfg.unlock.swipe_clear_timeout_ms = 100;
    cfg.unlock.lock_poll_ms = 2;
    cfg.unlock.credential_clear_timeout_ms = 100;
    cfg
}

fn ready_device() -> Arc<MockDevice> {
    Arc::new(
        MockDevice::new()
            .with_installed(PKG)
            .with_scene(MockDevice::simple_scene(PKG)),
    )
}

fn controller(device: &Arc<MockDevice>, oracle: Arc<ScriptedOracle>, cfg: &AppConfig) -> SessionController {
    SessionController::new(device.clone(), device.clone(), oracle, cfg)
}

fn work_item() -> WorkItem {
    WorkItem {
        task: "post_video".into(),
        payload_ref: "/sdcard/DCIM/clip.mp4".into(),
        caption: "first light".into(),
        package: None,
    }
}

#[tokio::test]
async fn finish_directive_completes_with_no_further_steps() {
    let device = ready_device();
    let oracle = ScriptedOracle::new(&[r#"{"action":"finish","message":"posted"}"#]);
    let ctl = controller(&device, oracle.clone(), &fast_config());

    let result = ctl.run(work_item(), CancellationToken::new()).await;
    assert_eq!(result, TaskResult::Success(Some("posted".into())));
    assert_eq!(oracle.calls(), 1);
    assert_eq!(ctl.phase(), autotap_types::app::SessionPhase::Idle);
}

#[tokio::test]
async fn step_budget_is_a_hard_bound() {
    let device = ready_device();
    let oracle = ScriptedOracle::new(&[r#"{"action":"tap","x":540,"y":960}"#]);
    let mut cfg = fast_config();
    cfg.controller.max_steps = 3;
    let ctl = controller(&device, oracle.clone(), &cfg);

    let result = ctl.run(work_item(), CancellationToken::new()).await;
    assert_eq!(result, TaskResult::Failed("step budget exceeded".into()));
    assert_eq!(oracle.calls(), 3);
}

#[tokio::test]
async fn unknown_action_kind_terminates_the_session() {
    let device = ready_device();
    let oracle = ScriptedOracle::new(&[r#"{"action":"unknown_kind"}"#]);
    let ctl = controller(&device, oracle.clone(), &fast_config());

    match ctl.run(work_item(), CancellationToken::new()).await {
        TaskResult::Failed(reason) => {
            assert!(reason.contains("unrecognized action kind"), "{}", reason)
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn missing_target_app_fails_before_the_loop() {
    let device = Arc::new(MockDevice::new().with_scene(MockDevice::simple_scene(PKG)));
    let oracle = ScriptedOracle::new(&[r#"{"action":"finish"}"#]);
    let ctl = controller(&device, oracle.clone(), &fast_config());

    let result = ctl.run(work_item(), CancellationToken::new()).await;
    assert_eq!(
        result,
        TaskResult::Failed(format!("{} not installed", PKG))
    );
    assert_eq!(oracle.calls(), 0);
    assert!(!device
        .events()
        .iter()
        .any(|e| matches!(e, MockEvent::Launch(_))));
}

#[tokio::test]
async fn tap_is_dispatched_humanized_within_the_element_box() {
    let device = ready_device();
    let oracle = ScriptedOracle::new(&[
        r#"{"action":"tap","x":540,"y":960,"element_width":100,"element_height":50}"#,
        r#"{"action":"finish"}"#,
    ]);
    let ctl = controller(&device, oracle.clone(), &fast_config());

    let result = ctl.run(work_item(), CancellationToken::new()).await;
    assert!(result.is_success());

    let tap = device
        .events()
        .into_iter()
        .find_map(|e| match e {
            MockEvent::Gesture(Gesture::Tap { x, y, duration_ms }) => Some((x, y, duration_ms)),
            _ => None,
        })
        .expect("a tap was dispatched");
    assert!((490..=590).contains(&tap.0), "x={}", tap.0);
    assert!((935..=985).contains(&tap.1), "y={}", tap.1);
    assert!((70..=150).contains(&tap.2));

    let log = ctl.dispatch_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].kind, "tap");
}

#[tokio::test]
async fn invalid_directive_is_non_fatal_and_the_loop_continues() {
    let device = ready_device();
    let oracle = ScriptedOracle::new(&[r#"{"action":"tap"}"#, r#"{"action":"finish"}"#]);
    let ctl = controller(&device, oracle.clone(), &fast_config());

    let result = ctl.run(work_item(), CancellationToken::new()).await;
    assert!(result.is_success());
    assert_eq!(oracle.calls(), 2);
    // Nothing reached the device for the rejected step.
    assert!(ctl.dispatch_log().is_empty());
}

#[tokio::test]
async fn recoverable_error_directives_continue_the_loop() {
    let device = ready_device();
    let oracle = ScriptedOracle::new(&[
        r#"{"action":"error","message":"popup in the way","recoverable":true}"#,
        r#"{"action":"finish"}"#,
    ]);
    let ctl = controller(&device, oracle.clone(), &fast_config());

    assert!(ctl.run(work_item(), CancellationToken::new()).await.is_success());
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn consecutive_failures_abandon_the_session() {
    let device = ready_device();
    let oracle = ScriptedOracle::new(&[r#"{"action":"tap"}"#]);
    let mut cfg = fast_config();
    cfg.controller.max_consecutive_failures = 2;
    let ctl = controller(&device, oracle.clone(), &cfg);

    let result = ctl.run(work_item(), CancellationToken::new()).await;
    assert_eq!(
        result,
        TaskResult::Failed("too many consecutive step failures".into())
    );
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn previous_action_summaries_accumulate_in_the_context() {
    let device = ready_device();
    let oracle = ScriptedOracle::new(&[
        r#"{"action":"back"}"#,
        r#"{"action":"finish"}"#,
    ]);
    let ctl = controller(&device, oracle.clone(), &fast_config());

    assert!(ctl.run(work_item(), CancellationToken::new()).await.is_success());
    let request = oracle.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.context.step, 2);
    assert_eq!(request.context.previous_actions.len(), 1);
    assert!(request.context.previous_actions[0].starts_with("step 1: back"));
    assert_eq!(request.context.caption, "first light");
}

#[tokio::test]
async fn cancellation_stops_the_session_and_releases_the_lease() {
    let device = ready_device();
    let oracle = ScriptedOracle::new(&[r#"{"action":"tap","x":540,"y":960}"#]);
    let ctl = controller(&device, oracle.clone(), &fast_config());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = ctl.run(work_item(), cancel).await;
    assert_eq!(result, TaskResult::Failed("session cancelled".into()));
    assert!(!device.wake_lease_held());
    assert_eq!(ctl.phase(), autotap_types::app::SessionPhase::Idle);
}

#[tokio::test]
async fn wake_lease_is_released_after_a_normal_run() {
    let device = ready_device();
    let oracle = ScriptedOracle::new(&[r#"{"action":"finish"}"#]);
    let ctl = controller(&device, oracle, &fast_config());

    ctl.run(work_item(), CancellationToken::new()).await;
    assert!(!device.wake_lease_held());
}

// --- Unlock controller ---

fn unlock_controller(device: &Arc<MockDevice>, cfg: &AppConfig) -> UnlockController {
    UnlockController::new(device.clone(), device.clone(), cfg.unlock.clone())
}

#[tokio::test]
async fn already_unlocked_dispatches_no_gesture() {
    let device = Arc::new(MockDevice::new());
    let unlock = unlock_controller(&device, &fast_config());

    let state = unlock.ensure_unlocked(&CancellationToken::new()).await;
    assert_eq!(state, UnlockState::AlreadyUnlocked);
    assert!(!device
        .events()
        .iter()
        .any(|e| matches!(e, MockEvent::Gesture(_))));
}

#[tokio::test]
async fn swipe_clears_an_unsecured_lock() {
    let device = Arc::new(MockDevice::new().with_locked(false, true));
    let unlock = unlock_controller(&device, &fast_config());

    let state = unlock.ensure_unlocked(&CancellationToken::new()).await;
    assert_eq!(state, UnlockState::Success);

    let events = device.events();
    assert!(matches!(events[0], MockEvent::Wake));
    match events
        .iter()
        .find(|e| matches!(e, MockEvent::Gesture(Gesture::Swipe { .. })))
    {
        Some(MockEvent::Gesture(Gesture::Swipe {
            start_x,
            start_y,
            end_y,
            ..
        })) => {
            assert_eq!(*start_x, 540);
            assert_eq!(*start_y, (1920.0f64 * 0.90) as i32);
            assert_eq!(*end_y, (1920.0f64 * 0.40) as i32);
        }
        _ => panic!("no unlock swipe dispatched"),
    }
}

#[tokio::test]
async fn stuck_unsecured_lock_fails_after_the_bounded_poll() {
    let device = Arc::new(MockDevice::new().with_locked(false, false));
    let unlock = unlock_controller(&device, &fast_config());

    let state = unlock.ensure_unlocked(&CancellationToken::new()).await;
    assert_eq!(
        state,
        UnlockState::Failed("lock did not clear after swipe".into())
    );
}

#[tokio::test]
async fn secured_lock_without_credential_needs_the_user() {
    let device = Arc::new(MockDevice::new().with_locked(true, false));
    let unlock = unlock_controller(&device, &fast_config());

    let state = unlock.ensure_unlocked(&CancellationToken::new()).await;
    assert!(matches!(state, UnlockState::NeedUserAction(_)));
}

#[tokio::test]
async fn secured_lock_is_cleared_with_the_stored_credential() {
    let lock_scene = {
        let mut scene = MockDevice::simple_scene("com.android.systemui");
        scene.nodes[1].class_name = "android.widget.EditText".into();
        scene.nodes[1].text = None;
        scene
    };
    let device = Arc::new(
        MockDevice::new()
            .with_locked(true, false)
            .with_credential("4912")
            .with_scene(lock_scene),
    );
    let mut cfg = fast_config();
    cfg.unlock.credential = Some("4912".into());
    let unlock = unlock_controller(&device, &cfg);

    let state = unlock.ensure_unlocked(&CancellationToken::new()).await;
    assert_eq!(state, UnlockState::Success);
    assert!(device
        .events()
        .iter()
        .any(|e| matches!(e, MockEvent::Text(t) if t == "4912")));
}

#[tokio::test]
async fn secured_lock_without_text_surface_is_not_supported() {
    let device = Arc::new(
        MockDevice::new()
            .with_locked(true, false)
            .with_scene(MockDevice::simple_scene("com.android.systemui")),
    );
    let mut cfg = fast_config();
    cfg.unlock.credential = Some("4912".into());
    let unlock = unlock_controller(&device, &cfg);

    let state = unlock.ensure_unlocked(&CancellationToken::new()).await;
    assert!(matches!(state, UnlockState::NotSupported(_)));
}

#[tokio::test]
async fn unavailable_capability_needs_the_user() {
    let device = Arc::new(
        MockDevice::new()
            .with_locked(false, true)
            .with_capability(false),
    );
    let unlock = unlock_controller(&device, &fast_config());

    let state = unlock.ensure_unlocked(&CancellationToken::new()).await;
    assert!(matches!(state, UnlockState::NeedUserAction(_)));
}
