//! Inbound event model with two-phase decoding.
//!
//! A logical message is decoded in two steps: first a cheap probe of the
//! `type` discriminant, then a full decode into the matching variant.
//! Unknown discriminants map to [`Event::Ignored`] and are dropped without
//! error, which keeps the event schema forward compatible.

use serde::Deserialize;

use crate::{
    domain::{Channel, ChannelId, User, UserId},
    Result,
};

/// One decoded inbound event off the streaming socket.
#[derive(Clone, Debug)]
pub enum Event {
    /// A posted chat message.
    Message(MessageEvent),
    /// Channel metadata changed or a channel was created; upsert.
    ChannelMeta(Channel),
    /// User metadata changed or a user joined the team; upsert.
    UserMeta(User),
    /// This client joined a channel.
    ChannelJoined(Channel),
    /// Unrecognized discriminant; dropped without error.
    Ignored,
}

/// A posted chat message, normalized across the two physical shapes the
/// protocol uses: top-level fields, or a nested `message` sub-object for
/// edits. The nested one wins when present.
#[derive(Clone, Debug)]
pub struct MessageEvent {
    pub channel: ChannelId,
    pub user: Option<UserId>,
    pub text: String,
}

#[derive(Deserialize)]
struct TagProbe {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct RawMessage {
    channel: Option<ChannelId>,
    user: Option<UserId>,
    #[serde(default)]
    text: String,
    message: Option<Box<RawMessage>>,
}

impl RawMessage {
    fn normalize(self) -> Option<MessageEvent> {
        let outer_channel = self.channel.clone();
        let inner = match self.message {
            Some(m) => *m,
            None => self,
        };
        let channel = inner.channel.or(outer_channel)?;
        Some(MessageEvent {
            channel,
            user: inner.user,
            text: inner.text,
        })
    }
}

#[derive(Deserialize)]
struct ChannelEnvelope {
    channel: Channel,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

impl Event {
    /// Decode one logical message.
    ///
    /// A JSON error here means the payload is malformed for its declared
    /// discriminant; the caller logs it and keeps the loop alive.
    pub fn decode(raw: &str) -> Result<Event> {
        let probe: TagProbe = serde_json::from_str(raw)?;
        let Some(kind) = probe.kind else {
            return Ok(Event::Ignored);
        };

        let event = match kind.as_str() {
            "message" => {
                let msg: RawMessage = serde_json::from_str(raw)?;
                match msg.normalize() {
                    Some(event) => Event::Message(event),
                    None => Event::Ignored,
                }
            }
            // "created" and "changed" both carry the full record and
            // collapse to one upsert variant.
            "channel_created" | "channel_change" => {
                let env: ChannelEnvelope = serde_json::from_str(raw)?;
                Event::ChannelMeta(env.channel)
            }
            "team_join" | "user_change" => {
                let env: UserEnvelope = serde_json::from_str(raw)?;
                Event::UserMeta(env.user)
            }
            "channel_joined" => {
                let env: ChannelEnvelope = serde_json::from_str(raw)?;
                Event::ChannelJoined(env.channel)
            }
            _ => Event::Ignored,
        };
        Ok(event)
    }
}
