//! Scoped allow/deny rule over user ids.

use std::collections::BTreeSet;

use ringvc_shared::{FilterKind, UserId};

/// A whitelist or blacklist of users.
///
/// The default filter is an empty blacklist, which lets everyone through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    whitelist: bool,
    members: BTreeSet<UserId>,
}

impl Filter {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            whitelist: kind == FilterKind::Whitelist,
            members: BTreeSet::new(),
        }
    }

    pub(crate) fn from_parts(whitelist: bool, members: BTreeSet<UserId>) -> Self {
        Self { whitelist, members }
    }

    pub fn kind(&self) -> FilterKind {
        if self.whitelist {
            FilterKind::Whitelist
        } else {
            FilterKind::Blacklist
        }
    }

    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }

    pub fn members(&self) -> &BTreeSet<UserId> {
        &self.members
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    /// Whether `user` gets through: listed on a whitelist, or unlisted on a
    /// blacklist.
    pub fn passes(&self, user: &UserId) -> bool {
        self.whitelist == self.members.contains(user)
    }

    /// Switches the filter type and clears the membership, since a list means
    /// the opposite under the other type. Setting the current type does
    /// nothing. Returns whether anything changed.
    pub fn set_kind(&mut self, kind: FilterKind) -> bool {
        if self.kind() == kind {
            return false;
        }
        self.whitelist = kind == FilterKind::Whitelist;
        self.members.clear();
        true
    }

    pub fn add(&mut self, user: UserId) -> bool {
        self.members.insert(user)
    }

    pub fn remove(&mut self, user: &UserId) -> bool {
        self.members.remove(user)
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.members.is_empty();
        self.members.clear();
        changed
    }

    /// Back to an empty blacklist.
    pub fn reset(&mut self) -> bool {
        if self.is_default() {
            return false;
        }
        *self = Self::default();
        true
    }

    pub fn is_default(&self) -> bool {
        !self.whitelist && self.members.is_empty()
    }
}
