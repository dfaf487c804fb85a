//! Integration test infrastructure for bootsync managers
//!
//! Provides:
//! - Inventory fixtures for common machine layouts
//! - Mock command runner, name resolver and renderer
//! - Verification helpers for executed commands and rendered scopes

pub mod fixtures;
mod mocks;
mod verification;

pub use fixtures::*;
pub use mocks::{CapturingRenderer, RecordingRunner, RenderedFile, StaticResolver};
pub use verification::*;
