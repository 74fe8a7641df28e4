// Path: crates/services/src/session/perception.rs
//! Scene assembly: raw port capture -> filtered, indexed, immutable
//! [`Scene`] with a JPEG screenshot sized for the decision service.

use autotap_api::ports::PerceptionPort;
use autotap_types::app::{Element, Scene, UiNode};
use autotap_types::error::DriverError;
use image::ImageFormat;
use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

/// Longest edge of the screenshot shipped to the oracle.
const SCREENSHOT_MAX_DIM: u32 = 1024;

/// Captures one scene. The gesture in flight must have completed before
/// this runs; the caller sequences that.
pub async fn capture_scene(port: &dyn PerceptionPort) -> Result<Scene, DriverError> {
    let capture = port.capture_ui().await?;
    let png = port.capture_screenshot().await?;
    let screenshot_jpeg = encode_screenshot(&png)?;

    Ok(Scene {
        package: capture.package,
        activity: capture.activity,
        elements: filter_elements(capture.nodes),
        screenshot_jpeg,
        captured_at_ms: now_ms(),
    })
}

/// Drops invisible and zero-area nodes and assigns indices in traversal
/// order. Indices are stable for one snapshot, never across snapshots.
pub fn filter_elements(nodes: Vec<UiNode>) -> Vec<Element> {
    nodes
        .into_iter()
        .filter(|n| n.visible && n.bounds.is_positive())
        .enumerate()
        .map(|(i, n)| Element {
            index: i as u32,
            class_name: n.class_name,
            resource_id: n.resource_id,
            text: n.text,
            content_desc: n.content_desc,
            bounds: n.bounds,
            clickable: n.clickable,
            enabled: n.enabled,
            visible: n.visible,
        })
        .collect()
}

/// PNG capture -> bounded JPEG for the wire.
fn encode_screenshot(png: &[u8]) -> Result<Vec<u8>, DriverError> {
    let img = image::load_from_memory(png)
        .map_err(|e| DriverError::Parse(format!("screenshot decode: {}", e)))?;
    let img = if img.width() > SCREENSHOT_MAX_DIM || img.height() > SCREENSHOT_MAX_DIM {
        img.resize(
            SCREENSHOT_MAX_DIM,
            SCREENSHOT_MAX_DIM,
            image::imageops::FilterType::Lanczos3,
        )
    } else {
        img
    };
    let mut buf = Vec::new();
    img.to_rgb8()
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .map_err(|e| DriverError::Parse(format!("screenshot encode: {}", e)))?;
    Ok(buf)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autotap_types::app::Bounds;

    fn node(visible: bool, bounds: Bounds) -> UiNode {
        UiNode {
            class_name: "android.view.View".into(),
            resource_id: None,
            text: None,
            content_desc: None,
            bounds,
            clickable: false,
            enabled: true,
            visible,
        }
    }

    #[test]
    fn filtering_drops_invisible_and_degenerate_nodes() {
        let nodes = vec![
            node(true, Bounds { left: 0, top: 0, right: 100, bottom: 100 }),
            node(false, Bounds { left: 0, top: 0, right: 100, bottom: 100 }),
            node(true, Bounds { left: 5, top: 5, right: 5, bottom: 80 }),
            node(true, Bounds { left: 0, top: 100, right: 50, bottom: 160 }),
        ];
        let elements = filter_elements(nodes);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].index, 0);
        assert_eq!(elements[1].index, 1);
        assert_eq!(elements[1].bounds.top, 100);
    }

    #[test]
    fn indices_are_deterministic_for_the_same_snapshot() {
        let nodes: Vec<UiNode> = (0..10)
            .map(|i| {
                node(
                    true,
                    Bounds {
                        left: i,
                        top: 0,
                        right: i + 10,
                        bottom: 10,
                    },
                )
            })
            .collect();
        let a = filter_elements(nodes.clone());
        let b = filter_elements(nodes);
        let idx_a: Vec<(u32, i32)> = a.iter().map(|e| (e.index, e.bounds.left)).collect();
        let idx_b: Vec<(u32, i32)> = b.iter().map(|e| (e.index, e.bounds.left)).collect();
        assert_eq!(idx_a, idx_b);
    }

    #[test]
    fn screenshot_reencodes_to_jpeg() {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 10, 10, 255]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let jpeg = encode_screenshot(&png).unwrap();
        // JPEG SOI marker.
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
