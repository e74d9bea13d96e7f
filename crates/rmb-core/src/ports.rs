use async_trait::async_trait;

use crate::{
    domain::{Channel, User},
    Result,
};

/// One raw read off the streaming transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadEvent {
    /// A text fragment; `fin` marks the end of the logical message.
    Fragment { text: String, fin: bool },
    /// The peer closed the stream. Sole clean exit of the receive loop.
    Closed,
}

/// Hexagonal port for the synchronous API side-channel.
///
/// Covers the handshake calls (`auth.test`, `rtm.start`) and chat-message
/// posting. Parameters are a flat string-to-string mapping; the
/// `attachments` value carries a serialized-array string when present and
/// an empty string otherwise.
#[async_trait]
pub trait ApiPort: Send + Sync {
    async fn call(
        &self,
        method: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value>;
}

/// Read half of the streaming transport. Owned by the receive loop.
#[async_trait]
pub trait TransportReader: Send {
    async fn read(&mut self) -> Result<ReadEvent>;
}

/// Write half of the streaming transport.
///
/// Shared behind a mutex by the client so concurrent senders cannot
/// interleave on the socket's write side.
#[async_trait]
pub trait TransportWriter: Send {
    async fn send_text(&mut self, text: &str) -> Result<()>;
}

/// Opens the streaming transport at the URL returned by session start.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn TransportReader>, Box<dyn TransportWriter>)>;
}

/// Bot-behavior callback: the sole hook by which decoded message events
/// reach application logic.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_message(&self, channel: &Channel, user: &User, text: &str, mentioned: bool);
}
