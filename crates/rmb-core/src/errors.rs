/// Core error type for the client.
///
/// Adapter crates map their library errors into this type so the core can
/// apply one propagation policy: handshake-phase failures are fatal to
/// `connect()`, everything after that stays inside the receive loop and
/// is logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("already connected")]
    AlreadyConnected,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("session start failed: {0}")]
    SessionStart(String),

    #[error("transport connect failed: {0}")]
    TransportConnect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unknown {kind} id: {id}")]
    Lookup { kind: &'static str, id: String },

    #[error("duplicate {kind} id in snapshot: {id}")]
    SnapshotConflict { kind: &'static str, id: String },

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
