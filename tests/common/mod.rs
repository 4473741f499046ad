//! Shared helpers for integration tests.
//!
//! - `fixtures`: upstream payloads and mock-server wiring
//! - `logger`: structured test logging

#![allow(dead_code)]

pub mod fixtures;
pub mod logger;
