use std::collections::BTreeSet;

use ringvc_shared::{GroupId, UserId};

/// Users and groups signed up to be notified about a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRoster {
    pub(crate) users: BTreeSet<UserId>,
    pub(crate) groups: BTreeSet<GroupId>,
}

impl ChannelRoster {
    pub fn users(&self) -> &BTreeSet<UserId> {
        &self.users
    }

    pub fn groups(&self) -> &BTreeSet<GroupId> {
        &self.groups
    }

    pub fn has_user(&self, user: &UserId) -> bool {
        self.users.contains(user)
    }

    pub fn has_group(&self, group: &GroupId) -> bool {
        self.groups.contains(group)
    }

    pub fn add_user(&mut self, user: UserId) -> bool {
        self.users.insert(user)
    }

    pub fn remove_user(&mut self, user: &UserId) -> bool {
        self.users.remove(user)
    }

    pub fn add_group(&mut self, group: GroupId) -> bool {
        self.groups.insert(group)
    }

    pub fn remove_group(&mut self, group: &GroupId) -> bool {
        self.groups.remove(group)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }
}
