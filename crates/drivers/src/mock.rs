// Path: crates/drivers/src/mock.rs
//! Scripted in-memory device for tests: queued scenes, a lock-screen
//! script, and a recorded event log.

use async_trait::async_trait;
use autotap_api::ports::{ActuationPort, Gesture, LockStatus, PerceptionPort};
use autotap_types::app::{Bounds, UiCapture, UiNode};
use autotap_types::error::DriverError;
use image::{ImageFormat, RgbaImage};
use std::collections::{HashSet, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Everything the mock observed, in dispatch order.
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    Gesture(Gesture),
    Text(String),
    Back,
    Launch(String),
    Wake,
}

#[derive(Debug, Clone)]
struct LockScript {
    status: LockStatus,
    clears_on_swipe: bool,
    clears_on_text: Option<String>,
}

pub struct MockDevice {
    scenes: Mutex<VecDeque<UiCapture>>,
    last_scene: Mutex<Option<UiCapture>>,
    screenshot_png: Vec<u8>,
    foreground: Mutex<Option<String>>,
    installed: Mutex<HashSet<String>>,
    lock: Mutex<LockScript>,
    display_on: AtomicBool,
    capability: AtomicBool,
    accept_gestures: AtomicBool,
    screen: (u32, u32),
    wake_lease: AtomicBool,
    events: Mutex<Vec<MockEvent>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            scenes: Mutex::new(VecDeque::new()),
            last_scene: Mutex::new(None),
            screenshot_png: tiny_png(),
            foreground: Mutex::new(None),
            installed: Mutex::new(HashSet::new()),
            lock: Mutex::new(LockScript {
                status: LockStatus::Unlocked,
                clears_on_swipe: true,
                clears_on_text: None,
            }),
            display_on: AtomicBool::new(true),
            capability: AtomicBool::new(true),
            accept_gestures: AtomicBool::new(true),
            screen: (1080, 1920),
            wake_lease: AtomicBool::new(false),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn with_installed(self, package: &str) -> Self {
        self.installed.lock().unwrap().insert(package.to_string());
        self
    }

    pub fn with_scene(self, scene: UiCapture) -> Self {
        self.scenes.lock().unwrap().push_back(scene);
        self
    }

    pub fn with_locked(self, secured: bool, clears_on_swipe: bool) -> Self {
        {
            let mut lock = self.lock.lock().unwrap();
            lock.status = LockStatus::Locked { secured };
            lock.clears_on_swipe = clears_on_swipe;
        }
        self.display_on.store(false, Ordering::SeqCst);
        self
    }

    pub fn with_credential(self, credential: &str) -> Self {
        self.lock.lock().unwrap().clears_on_text = Some(credential.to_string());
        self
    }

    pub fn with_capability(self, ready: bool) -> Self {
        self.capability.store(ready, Ordering::SeqCst);
        self
    }

    pub fn with_gestures_rejected(self) -> Self {
        self.accept_gestures.store(false, Ordering::SeqCst);
        self
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn wake_lease_held(&self) -> bool {
        self.wake_lease.load(Ordering::SeqCst)
    }

    fn record(&self, event: MockEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// A minimal plausible scene for `package`: one full-screen frame and
    /// one clickable button.
    pub fn simple_scene(package: &str) -> UiCapture {
        UiCapture {
            package: package.to_string(),
            activity: Some(format!("{}.MainActivity", package)),
            nodes: vec![
                UiNode {
                    class_name: "android.widget.FrameLayout".into(),
                    resource_id: None,
                    text: None,
                    content_desc: None,
                    bounds: Bounds {
                        left: 0,
                        top: 0,
                        right: 1080,
                        bottom: 1920,
                    },
                    clickable: false,
                    enabled: true,
                    visible: true,
                },
                UiNode {
                    class_name: "android.widget.Button".into(),
                    resource_id: Some(format!("{}:id/next", package)),
                    text: Some("Next".into()),
                    content_desc: None,
                    bounds: Bounds {
                        left: 420,
                        top: 1700,
                        right: 660,
                        bottom: 1820,
                    },
                    clickable: true,
                    enabled: true,
                    visible: true,
                },
            ],
        }
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn tiny_png() -> Vec<u8> {
    let img = RgbaImage::from_pixel(8, 8, image::Rgba([30, 30, 30, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode fixture png");
    buf
}

#[async_trait]
impl PerceptionPort for MockDevice {
    async fn capture_ui(&self) -> Result<UiCapture, DriverError> {
        let mut scenes = self.scenes.lock().unwrap();
        if let Some(next) = scenes.pop_front() {
            *self.last_scene.lock().unwrap() = Some(next.clone());
            return Ok(next);
        }
        // Repeat the last scene once the script runs out.
        self.last_scene
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| DriverError::Unavailable("mock: no scene scripted".into()))
    }

    async fn capture_screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Ok(self.screenshot_png.clone())
    }

    async fn foreground_package(&self) -> Result<Option<String>, DriverError> {
        Ok(self.foreground.lock().unwrap().clone())
    }
}

#[async_trait]
impl ActuationPort for MockDevice {
    async fn inject_gesture(&self, gesture: Gesture) -> Result<bool, DriverError> {
        self.record(MockEvent::Gesture(gesture));
        if !self.accept_gestures.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut lock = self.lock.lock().unwrap();
        if matches!(lock.status, LockStatus::Locked { secured: false })
            && lock.clears_on_swipe
            && matches!(gesture, Gesture::Swipe { .. })
        {
            lock.status = LockStatus::Unlocked;
        }
        Ok(true)
    }

    async fn input_text(&self, text: &str) -> Result<bool, DriverError> {
        self.record(MockEvent::Text(text.to_string()));
        let mut lock = self.lock.lock().unwrap();
        if matches!(lock.status, LockStatus::Locked { secured: true }) {
            if lock.clears_on_text.as_deref() == Some(text) {
                lock.status = LockStatus::Unlocked;
            }
        }
        Ok(true)
    }

    async fn press_back(&self) -> Result<bool, DriverError> {
        self.record(MockEvent::Back);
        Ok(true)
    }

    async fn launch_app(&self, package: &str) -> Result<(), DriverError> {
        self.record(MockEvent::Launch(package.to_string()));
        if !self.installed.lock().unwrap().contains(package) {
            return Err(DriverError::Dispatch(format!(
                "launcher intent for {} did not resolve",
                package
            )));
        }
        *self.foreground.lock().unwrap() = Some(package.to_string());
        Ok(())
    }

    async fn is_app_installed(&self, package: &str) -> Result<bool, DriverError> {
        Ok(self.installed.lock().unwrap().contains(package))
    }

    async fn wake_display(&self) -> Result<(), DriverError> {
        self.record(MockEvent::Wake);
        self.display_on.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn display_interactive(&self) -> Result<bool, DriverError> {
        Ok(self.display_on.load(Ordering::SeqCst))
    }

    async fn lock_status(&self) -> Result<LockStatus, DriverError> {
        Ok(self.lock.lock().unwrap().status)
    }

    async fn screen_size(&self) -> Result<(u32, u32), DriverError> {
        Ok(self.screen)
    }

    async fn capability_ready(&self) -> Result<bool, DriverError> {
        Ok(self.capability.load(Ordering::SeqCst))
    }

    fn set_wake_lease(&self, held: bool) {
        self.wake_lease.store(held, Ordering::SeqCst);
    }
}
