// Path: crates/services/src/session/normalizer.rs
//! The boundary function for oracle output.
//! Input: raw, potentially fenced or enveloped JSON from the decision
//! service. Output: a validated [`Directive`] or a typed rejection.

use autotap_types::app::{AgentAction, Directive, ElementSize, ExecutionOutcome, RawDirective};
use serde_json::Value;
use thiserror::Error;

/// Why a reply was rejected. Missing fields are local validation
/// failures; everything else is a protocol violation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DirectiveError {
    /// A field the action kind requires is absent.
    #[error("missing {0}")]
    Missing(&'static str),
    /// The action kind is not part of the protocol.
    #[error("unrecognized action kind '{0}'")]
    UnknownKind(String),
    /// The reply is not a directive at all.
    #[error("directive syntax: {0}")]
    Syntax(String),
}

impl DirectiveError {
    /// Maps the rejection onto the step outcome taxonomy: missing fields
    /// are non-fatal, protocol violations terminate the session.
    pub fn into_outcome(self) -> ExecutionOutcome {
        match self {
            DirectiveError::Missing(_) => ExecutionOutcome::failure(self.to_string()),
            DirectiveError::UnknownKind(_) | DirectiveError::Syntax(_) => {
                ExecutionOutcome::protocol_error(self.to_string())
            }
        }
    }
}

/// Parses and validates one oracle reply.
pub fn normalize(raw: &str) -> Result<Directive, DirectiveError> {
    if raw.trim().is_empty() {
        return Err(DirectiveError::Syntax("empty reply".into()));
    }

    // 1. Strip markdown fences the service may wrap its JSON in.
    let json_str = strip_fences(raw);

    // 2. Generic JSON, then unwrap a {"directive": {...}} envelope.
    let mut value: Value =
        serde_json::from_str(json_str).map_err(|e| DirectiveError::Syntax(e.to_string()))?;
    if value.get("action").is_none() {
        if let Some(inner) = value.get_mut("directive").map(Value::take) {
            if inner.is_object() {
                value = inner;
            }
        }
    }

    // 3. Strict typed deserialization of the wire shape.
    let raw_directive: RawDirective =
        serde_json::from_value(value).map_err(|e| DirectiveError::Syntax(e.to_string()))?;

    // 4. Per-kind field validation.
    validate(raw_directive)
}

/// Returns the content between the first and last fence line when the
/// reply is fenced, otherwise the trimmed input.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.rsplit_once("```").map(|(body, _)| body.trim()).unwrap_or(rest.trim())
}

fn validate(raw: RawDirective) -> Result<Directive, DirectiveError> {
    let action = match raw.action.as_str() {
        "tap" => {
            let x = raw.x.ok_or(DirectiveError::Missing("coordinate"))?;
            let y = raw.y.ok_or(DirectiveError::Missing("coordinate"))?;
            let element = match (raw.element_width, raw.element_height) {
                (Some(width), Some(height)) => Some(ElementSize { width, height }),
                _ => None,
            };
            AgentAction::Tap {
                x,
                y,
                element,
                element_index: raw.element_index,
            }
        }
        "swipe" => AgentAction::Swipe {
            start_x: raw.start_x.ok_or(DirectiveError::Missing("start_x"))?,
            start_y: raw.start_y.ok_or(DirectiveError::Missing("start_y"))?,
            end_x: raw.end_x.ok_or(DirectiveError::Missing("end_x"))?,
            end_y: raw.end_y.ok_or(DirectiveError::Missing("end_y"))?,
            duration_ms: raw.duration.unwrap_or(300),
        },
        "type_text" => AgentAction::TypeText {
            text: raw.text.ok_or(DirectiveError::Missing("text"))?,
        },
        "wait" => AgentAction::Wait {
            duration_ms: raw.duration,
        },
        "back" => AgentAction::Back,
        "launch_app" => AgentAction::LaunchApp {
            package: raw.package_name.clone(),
        },
        "dismiss_popup" => AgentAction::DismissPopup,
        "finish" => AgentAction::Finish {
            message: raw.message.clone().or_else(|| raw.reason.clone()),
        },
        "error" => AgentAction::Error {
            message: raw
                .message
                .clone()
                .or_else(|| raw.reason.clone())
                .unwrap_or_else(|| "decision service reported an error".to_string()),
            recoverable: raw.recoverable.unwrap_or(false),
        },
        other => return Err(DirectiveError::UnknownKind(other.to_string())),
    };

    Ok(Directive {
        action,
        wait_after_ms: raw.wait_after,
        reason: raw.reason,
        confidence: raw.confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_with_size_hint() {
        let d = normalize(
            r#"{"action":"tap","x":540,"y":960,"element_width":100,"element_height":50,"wait_after":1200}"#,
        )
        .unwrap();
        assert_eq!(
            d.action,
            AgentAction::Tap {
                x: 540,
                y: 960,
                element: Some(ElementSize { width: 100, height: 50 }),
                element_index: None,
            }
        );
        assert_eq!(d.wait_after_ms, Some(1200));
    }

    #[test]
    fn tap_without_coordinates_is_a_local_failure() {
        let err = normalize(r#"{"action":"tap"}"#).unwrap_err();
        assert_eq!(err, DirectiveError::Missing("coordinate"));
        assert_eq!(
            err.into_outcome(),
            ExecutionOutcome::failure("missing coordinate")
        );
    }

    #[test]
    fn swipe_reports_the_missing_field_by_name() {
        let err =
            normalize(r#"{"action":"swipe","start_x":540,"start_y":1700,"end_x":540}"#).unwrap_err();
        assert_eq!(err, DirectiveError::Missing("end_y"));
    }

    #[test]
    fn unknown_kind_is_a_protocol_error() {
        let err = normalize(r#"{"action":"unknown_kind"}"#).unwrap_err();
        assert_eq!(err, DirectiveError::UnknownKind("unknown_kind".into()));
        match err.into_outcome() {
            ExecutionOutcome::Error { recoverable, .. } => assert!(!recoverable),
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn fenced_reply_is_unwrapped() {
        let raw = "```json\n{\"action\":\"back\"}\n```";
        assert_eq!(normalize(raw).unwrap().action, AgentAction::Back);
    }

    #[test]
    fn directive_envelope_is_unwrapped() {
        let raw = r#"{"directive":{"action":"type_text","text":"hello"}}"#;
        assert_eq!(
            normalize(raw).unwrap().action,
            AgentAction::TypeText { text: "hello".into() }
        );
    }

    #[test]
    fn error_defaults_to_non_recoverable() {
        let d = normalize(r#"{"action":"error","message":"element tree empty"}"#).unwrap();
        assert_eq!(
            d.action,
            AgentAction::Error {
                message: "element tree empty".into(),
                recoverable: false,
            }
        );
    }

    #[test]
    fn garbage_is_a_syntax_error() {
        assert!(matches!(
            normalize("the button is blue"),
            Err(DirectiveError::Syntax(_))
        ));
        assert!(matches!(normalize("   "), Err(DirectiveError::Syntax(_))));
    }

    #[test]
    fn wait_without_duration_defers_to_defaults() {
        let d = normalize(r#"{"action":"wait"}"#).unwrap();
        assert_eq!(d.action, AgentAction::Wait { duration_ms: None });
    }
}
