//! Core domain types for the clamor feedback platform.
//!
//! This crate provides the strongly-typed identifiers shared by every other
//! crate in the workspace. Each domain crate defines its own error types in
//! its own error module.

pub mod id;

pub use id::{ParseIdError, ProjectId, RoleId, UserId};
