use serde::Deserialize;

/// User id (string-keyed, `U…` style).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct UserId(pub String);

/// Channel id (string-keyed; `C…` for channels, `D…` for DMs).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A known user, seeded from the session snapshot and replaced wholesale
/// on user-change events. There is no removal path: departures are a
/// known gap of the upstream protocol handling.
#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

/// A known channel. Standard channels and DM channels share one id
/// namespace; `is_im` marks the latter.
#[derive(Clone, Debug, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    #[serde(default)]
    pub name: String,
    /// Whether this client is currently a member.
    #[serde(default)]
    pub is_member: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_im: bool,
    #[serde(default)]
    pub created: Option<i64>,
}

impl Channel {
    /// Channels that get greeting/farewell fan-out: public and joined.
    pub fn is_public_and_joined(&self) -> bool {
        self.is_member && !self.is_private && !self.is_im
    }
}

/// The bot's own identity, fixed at session start.
#[derive(Clone, Debug, Deserialize)]
pub struct SelfIdentity {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
}

impl SelfIdentity {
    /// Canonical mention token for this identity (`<@U123>`).
    pub fn mention_token(&self) -> String {
        format!("<@{}>", self.id.0)
    }
}
