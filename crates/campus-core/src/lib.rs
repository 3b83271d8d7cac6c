//! Core types, rules and trait definitions for the Campus school portal.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod approval;
pub mod backend;
pub mod error;
pub mod exam;
pub mod identity;
pub mod registry;
pub mod roster;
pub mod store;
pub mod validate;

pub use error::{Error, ErrorKind, Result};
pub use identity::Identity;
