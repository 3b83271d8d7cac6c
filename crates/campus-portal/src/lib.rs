//! Client side of Campus: session handling, cached data access, the
//! authorization resolver and the route shell.
//!
//! Everything here talks to a [`SchoolBackend`](campus_core::backend::SchoolBackend):
//! the HTTP [`ApiClient`](client::ApiClient) in production, or a
//! [`LocalBackend`](campus_core::backend::LocalBackend) in-process.

#![allow(async_fn_in_trait)]

pub mod access;
pub mod cache;
pub mod client;
pub mod notice;
pub mod portal;
pub mod query;
pub mod route;
pub mod session;

pub use portal::Portal;

#[cfg(test)]
mod tests;
