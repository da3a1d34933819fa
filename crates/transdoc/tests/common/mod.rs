//! Shared test utilities for transdoc integration tests.
//!
//! This module provides:
//! - `FakeBackend`, a scripted in-memory `TranslationBackend`
//! - `TestHarness` wiring a `ClientState` to the fake
//! - Builders for backend records and status responses

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{Failure, FakeBackend, TestHarness};
