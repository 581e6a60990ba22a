//! Test helpers module
//!
//! This module provides utilities and helpers for testing the EventHub crate.
//! It includes a mock hosted backend, row fixtures and test context setup.

#![allow(dead_code)]

pub mod backend_mock;
pub mod slow_backend;
pub mod test_context;
pub mod test_data;

pub use backend_mock::*;
pub use slow_backend::*;
pub use test_context::*;
pub use test_data::*;
