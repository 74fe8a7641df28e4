// Path: integration_tests/src/lib.rs
//! End-to-end session tests live under `tests/`.
