// Path: crates/types/src/app/mod.rs
//! Application-level domain types: scenes, directives, outcomes, sessions.

pub mod directive;
pub mod outcome;
pub mod scene;
pub mod session;

pub use directive::{AgentAction, Directive, ElementSize, RawDirective};
pub use outcome::{ExecutionOutcome, TaskResult, UnlockState};
pub use scene::{Bounds, Element, Scene, UiCapture, UiNode};
pub use session::{DispatchRecord, SessionId, SessionPhase, WorkItem};
