// Path: crates/types/src/app/scene.rs

use serde::{Deserialize, Serialize};

/// Axis-aligned element bounds in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }

    /// True when the box encloses at least one pixel.
    pub fn is_positive(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }
}

/// One raw node as reported by the device, before scene filtering.
/// No index is assigned at this level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiNode {
    #[serde(rename = "class")]
    pub class_name: String,
    pub resource_id: Option<String>,
    pub text: Option<String>,
    pub content_desc: Option<String>,
    pub bounds: Bounds,
    pub clickable: bool,
    pub enabled: bool,
    pub visible: bool,
}

/// Unfiltered capture of the element tree, as handed over by the
/// perception port. The perception pipeline turns this into a [`Scene`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiCapture {
    pub package: String,
    pub activity: Option<String>,
    pub nodes: Vec<UiNode>,
}

impl UiCapture {
    /// Finds the first editable text surface, used for credential entry
    /// on the lock screen.
    pub fn find_text_entry(&self) -> Option<&UiNode> {
        self.nodes.iter().find(|n| {
            n.enabled
                && (n.class_name.contains("EditText")
                    || n.resource_id
                        .as_deref()
                        .map(|id| id.contains("pinEntry") || id.contains("passwordEntry"))
                        .unwrap_or(false))
        })
    }
}

/// One visible, interactable or informational element of a [`Scene`].
///
/// The index is assigned by traversal order within a single scene and is
/// not stable across scenes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub index: u32,
    #[serde(rename = "class")]
    pub class_name: String,
    pub resource_id: Option<String>,
    pub text: Option<String>,
    pub content_desc: Option<String>,
    pub bounds: Bounds,
    pub clickable: bool,
    pub enabled: bool,
    pub visible: bool,
}

impl Element {
    pub fn center(&self) -> (i32, i32) {
        self.bounds.center()
    }

    pub fn size(&self) -> (i32, i32) {
        (self.bounds.width(), self.bounds.height())
    }
}

/// An immutable snapshot of the target application's UI.
/// Produced once per step and consumed once by the decision call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub package: String,
    pub activity: Option<String>,
    pub elements: Vec<Element>,
    /// JPEG-compressed screenshot bytes. Transported separately on the
    /// wire (base64), never inside the ui_tree JSON.
    #[serde(skip)]
    pub screenshot_jpeg: Vec<u8>,
    pub captured_at_ms: u64,
}

impl Scene {
    /// Finds the first element whose text or accessibility label matches
    /// `needle` after trimming, case-insensitively.
    pub fn find_by_label(&self, needle: &str) -> Option<&Element> {
        let wanted = needle.trim().to_lowercase();
        self.elements.iter().find(|e| {
            e.text
                .as_deref()
                .map(|t| t.trim().to_lowercase() == wanted)
                .unwrap_or(false)
                || e.content_desc
                    .as_deref()
                    .map(|d| d.trim().to_lowercase() == wanted)
                    .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(idx: u32, text: Option<&str>, desc: Option<&str>) -> Element {
        Element {
            index: idx,
            class_name: "android.widget.Button".into(),
            resource_id: None,
            text: text.map(String::from),
            content_desc: desc.map(String::from),
            bounds: Bounds {
                left: 0,
                top: 0,
                right: 100,
                bottom: 40,
            },
            clickable: true,
            enabled: true,
            visible: true,
        }
    }

    #[test]
    fn bounds_center_and_size() {
        let b = Bounds {
            left: 100,
            top: 200,
            right: 300,
            bottom: 260,
        };
        assert_eq!(b.width(), 200);
        assert_eq!(b.height(), 60);
        assert_eq!(b.center(), (200, 230));
        assert!(b.is_positive());
    }

    #[test]
    fn zero_area_bounds_are_not_positive() {
        let b = Bounds {
            left: 10,
            top: 10,
            right: 10,
            bottom: 50,
        };
        assert!(!b.is_positive());
    }

    #[test]
    fn find_text_entry_matches_class_or_resource_id() {
        let mut capture = UiCapture {
            package: "com.android.systemui".into(),
            activity: None,
            nodes: vec![UiNode {
                class_name: "android.widget.TextView".into(),
                resource_id: None,
                text: Some("Enter PIN".into()),
                content_desc: None,
                bounds: Bounds {
                    left: 0,
                    top: 0,
                    right: 1080,
                    bottom: 100,
                },
                clickable: false,
                enabled: true,
                visible: true,
            }],
        };
        assert!(capture.find_text_entry().is_none());

        let mut entry = capture.nodes[0].clone();
        entry.class_name = "android.widget.EditText".into();
        capture.nodes.push(entry);
        assert_eq!(
            capture.find_text_entry().unwrap().class_name,
            "android.widget.EditText"
        );

        capture.nodes[1].class_name = "android.view.View".into();
        capture.nodes[1].resource_id = Some("com.android.systemui:id/pinEntry".into());
        assert!(capture.find_text_entry().is_some());
    }

    #[test]
    fn find_by_label_matches_text_and_description() {
        let scene = Scene {
            package: "com.example".into(),
            activity: None,
            elements: vec![
                element(0, Some("  Not Now "), None),
                element(1, None, Some("Close")),
            ],
            screenshot_jpeg: vec![],
            captured_at_ms: 0,
        };
        assert_eq!(scene.find_by_label("not now").unwrap().index, 0);
        assert_eq!(scene.find_by_label("CLOSE").unwrap().index, 1);
        assert!(scene.find_by_label("Accept").is_none());
    }
}
