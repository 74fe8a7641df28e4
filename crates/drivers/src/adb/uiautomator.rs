// Path: crates/drivers/src/adb/uiautomator.rs
//! UI Automator dump parsing: XML element tree -> raw [`UiNode`] list in
//! document order.

use autotap_types::app::{Bounds, UiNode};
use autotap_types::error::DriverError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parses `uiautomator dump` output. The dump may carry a trailing status
/// line after the document; everything past the closing tag is ignored.
/// Returns the nodes plus the package of the root node, when present.
pub fn parse_dump(raw: &str) -> Result<(Vec<UiNode>, Option<String>), DriverError> {
    let end = raw
        .rfind("</hierarchy>")
        .map(|i| i + "</hierarchy>".len())
        .unwrap_or(raw.len());
    let start = raw.find('<').unwrap_or(0);
    let xml = &raw[start..end];

    let mut reader = Reader::from_str(xml);

    let mut nodes = Vec::new();
    let mut package: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"node" {
                    let node = node_from_attributes(&e)?;
                    if package.is_none() {
                        package = attr(&e, b"package")?;
                    }
                    nodes.push(node);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DriverError::Parse(format!("ui dump: {}", e))),
            _ => {}
        }
    }

    Ok((nodes, package))
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, DriverError> {
    for a in e.attributes() {
        let a = a.map_err(|err| DriverError::Parse(format!("ui dump attribute: {}", err)))?;
        if a.key.as_ref() == key {
            let value = a
                .unescape_value()
                .map_err(|err| DriverError::Parse(format!("ui dump attribute: {}", err)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn attr_flag(e: &BytesStart<'_>, key: &[u8], default: bool) -> Result<bool, DriverError> {
    Ok(attr(e, key)?.map(|v| v == "true").unwrap_or(default))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn node_from_attributes(e: &BytesStart<'_>) -> Result<UiNode, DriverError> {
    let bounds_raw = attr(e, b"bounds")?
        .ok_or_else(|| DriverError::Parse("ui dump: node without bounds".into()))?;
    let bounds = parse_bounds(&bounds_raw)
        .ok_or_else(|| DriverError::Parse(format!("ui dump: bad bounds '{}'", bounds_raw)))?;

    Ok(UiNode {
        class_name: attr(e, b"class")?.unwrap_or_default(),
        resource_id: non_empty(attr(e, b"resource-id")?),
        text: non_empty(attr(e, b"text")?),
        content_desc: non_empty(attr(e, b"content-desc")?),
        bounds,
        clickable: attr_flag(e, b"clickable", false)?,
        enabled: attr_flag(e, b"enabled", true)?,
        // Classic dumps omit the attribute; nodes present in the dump are
        // on screen unless the device says otherwise.
        visible: attr_flag(e, b"visible-to-user", true)?,
    })
}

/// Parses the "[left,top][right,bottom]" bounds notation.
pub fn parse_bounds(raw: &str) -> Option<Bounds> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?;
    let (first, second) = inner.split_once("][")?;
    let (l, t) = first.split_once(',')?;
    let (r, b) = second.split_once(',')?;
    Some(Bounds {
        left: l.trim().parse().ok()?,
        top: t.trim().parse().ok()?,
        right: r.trim().parse().ok()?,
        bottom: b.trim().parse().ok()?,
    })
}
