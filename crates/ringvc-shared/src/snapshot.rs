//! Point-in-time view of a voice channel.
//!
//! The platform adapter resolves everything that needs a gateway lookup
//! (who is connected, who may connect, presences, role members) before
//! handing an event to the engine, so every ring decision is a pure
//! function of this snapshot and the stored settings.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, GroupId, Presence, UserId};

/// Who holds the permission to connect to a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "users", rename_all = "snake_case")]
pub enum Access {
    #[default]
    Everyone,
    Only(HashSet<UserId>),
    Except(HashSet<UserId>),
}

impl Access {
    pub fn allows(&self, user: &UserId) -> bool {
        match self {
            Access::Everyone => true,
            Access::Only(users) => users.contains(user),
            Access::Except(users) => !users.contains(user),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    #[serde(default)]
    pub name: String,
    /// Users currently connected. May or may not include the joining user.
    #[serde(default)]
    pub occupants: BTreeSet<UserId>,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub presences: HashMap<UserId, Presence>,
    /// Resolved members of the groups signed up for this channel. A group
    /// missing here could not be resolved and is skipped.
    #[serde(default)]
    pub groups: HashMap<GroupId, BTreeSet<UserId>>,
    #[serde(default)]
    pub display_names: HashMap<UserId, String>,
}

impl ChannelSnapshot {
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            occupants: BTreeSet::new(),
            access: Access::Everyone,
            presences: HashMap::new(),
            groups: HashMap::new(),
            display_names: HashMap::new(),
        }
    }

    pub fn with_occupant(mut self, user: impl Into<UserId>) -> Self {
        self.occupants.insert(user.into());
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_presence(mut self, user: impl Into<UserId>, presence: Presence) -> Self {
        self.presences.insert(user.into(), presence);
        self
    }

    pub fn with_group<I, U>(mut self, group: impl Into<GroupId>, members: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        self.groups
            .insert(group.into(), members.into_iter().map(Into::into).collect());
        self
    }

    pub fn can_join(&self, user: &UserId) -> bool {
        self.access.allows(user)
    }

    pub fn is_present(&self, user: &UserId) -> bool {
        self.occupants.contains(user)
    }

    /// Occupants other than `user`.
    pub fn others<'a>(&'a self, user: &'a UserId) -> impl Iterator<Item = &'a UserId> + 'a {
        self.occupants.iter().filter(move |occupant| *occupant != user)
    }

    pub fn presence(&self, user: &UserId) -> Option<Presence> {
        self.presences.get(user).copied()
    }

    pub fn group_members(&self, group: &GroupId) -> Option<&BTreeSet<UserId>> {
        self.groups.get(group)
    }

    /// Display name of a user, falling back to the raw id.
    pub fn display_name(&self, user: &UserId) -> String {
        self.display_names
            .get(user)
            .cloned()
            .unwrap_or_else(|| user.to_string())
    }
}
