//! Slack-style backend adapters.
//!
//! This crate implements the `rmb-core` ports over a concrete stack:
//! the synchronous API via `reqwest`, the streaming transport via
//! `tokio-tungstenite`.

mod http;
mod ws;

pub use http::HttpApi;
pub use ws::WsConnector;
