// Path: crates/types/src/error/mod.rs
//! Core error types for the autotap controller.

use thiserror::Error;

/// Errors surfaced by a device driver (perception or actuation port).
#[derive(Error, Debug)]
pub enum DriverError {
    /// The underlying transport (adb invocation, socket) failed.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Device output could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The capability is not available (device offline, service disabled).
    #[error("Capability unavailable: {0}")]
    Unavailable(String),
    /// An input event was rejected by the device.
    #[error("Dispatch failed: {0}")]
    Dispatch(String),
}

/// Errors from the decision-oracle boundary.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The request could not be delivered.
    #[error("Network error: {0}")]
    Network(String),
    /// The oracle answered with a non-success status.
    #[error("Provider error {status}: {body}")]
    Provider {
        /// HTTP status code returned by the service.
        status: u16,
        /// Response body as returned, truncated by the caller if needed.
        body: String,
    },
    /// The oracle answered with an empty body.
    #[error("Empty response from decision service")]
    EmptyResponse,
}

/// Faults raised inside the session loop. The controller coerces these
/// into step outcomes or terminal failure reasons; they never cross the
/// caller boundary directly.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A driver call failed while perceiving the scene.
    #[error("perception failed: {0}")]
    Driver(#[from] DriverError),
    /// The decision call failed.
    #[error("decision call failed: {0}")]
    Oracle(#[from] OracleError),
    /// The session was cancelled from outside.
    #[error("session cancelled")]
    Cancelled,
}
