//! # btreach-server
//!
//! HTTP server library for btreach.
//!
//! This library provides the API handlers, shared state and logging setup;
//! the `btreach-server` binary wires them to the background scanner.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
