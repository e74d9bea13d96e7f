//! Core domain + application logic for the real-time messaging bot client.
//!
//! This crate is intentionally framework-agnostic. The HTTP API and the
//! websocket transport live behind ports (traits) implemented in adapter
//! crates; the bot behavior itself is an `EventHandler` supplied by the
//! binary.

pub mod client;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod frames;
pub mod logging;
pub mod ports;
pub mod session;

pub use errors::{Error, Result};
