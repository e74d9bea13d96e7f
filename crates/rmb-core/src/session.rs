//! Session state store: the authoritative snapshot of users and channels.

use std::collections::HashMap;

use crate::{
    domain::{Channel, ChannelId, SelfIdentity, User, UserId},
    errors::Error,
    Result,
};

/// Bulk payload returned by session start: the bot identity, every known
/// user, and both channel namespaces (standard + DM) to be merged.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub me: SelfIdentity,
    pub users: Vec<User>,
    pub channels: Vec<Channel>,
    pub ims: Vec<Channel>,
}

/// Users and channels keyed by id.
///
/// Mutated only from the receive loop (single-writer contract), so the
/// maps need no internal locking. There is deliberately no removal path;
/// user/channel departures are a documented gap.
#[derive(Debug)]
pub struct SessionState {
    me: SelfIdentity,
    users: HashMap<UserId, User>,
    channels: HashMap<ChannelId, Channel>,
}

impl SessionState {
    /// Build the store from the session-start snapshot.
    ///
    /// Duplicate ids inside the snapshot are an integrity error, never a
    /// silent overwrite.
    pub fn seed(snapshot: Snapshot) -> Result<Self> {
        let mut users = HashMap::with_capacity(snapshot.users.len());
        for user in snapshot.users {
            let id = user.id.clone();
            if users.insert(id.clone(), user).is_some() {
                return Err(Error::SnapshotConflict {
                    kind: "user",
                    id: id.0,
                });
            }
        }

        let mut channels =
            HashMap::with_capacity(snapshot.channels.len() + snapshot.ims.len());
        for channel in snapshot.channels.into_iter().chain(snapshot.ims) {
            let id = channel.id.clone();
            if channels.insert(id.clone(), channel).is_some() {
                return Err(Error::SnapshotConflict {
                    kind: "channel",
                    id: id.0,
                });
            }
        }

        Ok(Self {
            me: snapshot.me,
            users,
            channels,
        })
    }

    pub fn me(&self) -> &SelfIdentity {
        &self.me
    }

    /// Whole-record replacement; update events never carry partial patches.
    pub fn upsert_user(&mut self, user: User) {
        let _ = self.users.insert(user.id.clone(), user);
    }

    /// Whole-record replacement, also used to refresh on channel-joined.
    pub fn upsert_channel(&mut self, channel: Channel) {
        let _ = self.channels.insert(channel.id.clone(), channel);
    }

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn channel(&self, id: &ChannelId) -> Option<&Channel> {
        self.channels.get(id)
    }

    /// Point-in-time copy, never a live reference.
    pub fn users_snapshot(&self) -> Vec<User> {
        self.users.values().cloned().collect()
    }

    /// Point-in-time copy, never a live reference.
    pub fn channels_snapshot(&self) -> Vec<Channel> {
        self.channels.values().cloned().collect()
    }
}
