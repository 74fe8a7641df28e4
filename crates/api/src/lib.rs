// Path: crates/api/src/lib.rs
//! Capability ports and the decision-oracle boundary.
//!
//! The core never touches a concrete platform API: perception and
//! actuation are reached through the traits defined here, and the
//! decision service is reached through [`oracle::DecisionOracle`].

pub mod oracle;
pub mod ports;
