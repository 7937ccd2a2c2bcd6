//! Per-user settings: filters, visibility mode, auto-ring and default
//! recipients.

use std::collections::{BTreeMap, BTreeSet};

use ringvc_shared::{ChannelId, Mode, Scope, UserId};

use crate::filter::Filter;

/// Everything a user can configure. A user with all-default settings is
/// never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSettings {
    pub(crate) global_filter: Filter,
    /// Only materialised on first edit.
    pub(crate) channel_filters: BTreeMap<ChannelId, Filter>,
    pub(crate) mode: Mode,
    pub(crate) channel_auto_ring: BTreeMap<ChannelId, bool>,
    pub(crate) global_auto_ring: bool,
    pub(crate) channel_defaults: BTreeMap<ChannelId, BTreeSet<UserId>>,
    pub(crate) global_defaults: BTreeSet<UserId>,
}

impl UserSettings {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    // ------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------

    pub fn global_filter(&self) -> &Filter {
        &self.global_filter
    }

    pub fn channel_filters(&self) -> &BTreeMap<ChannelId, Filter> {
        &self.channel_filters
    }

    /// The filter for a scope, if one exists. The global filter always does.
    pub fn filter(&self, scope: &Scope) -> Option<&Filter> {
        match scope {
            Scope::Global => Some(&self.global_filter),
            Scope::Channel(channel) => self.channel_filters.get(channel),
        }
    }

    /// Mutable filter for a scope, creating the channel filter if needed.
    pub fn filter_mut(&mut self, scope: &Scope) -> &mut Filter {
        match scope {
            Scope::Global => &mut self.global_filter,
            Scope::Channel(channel) => self.channel_filters.entry(channel.clone()).or_default(),
        }
    }

    /// Mutable filter for a scope without materialising a channel filter.
    pub fn existing_filter_mut(&mut self, scope: &Scope) -> Option<&mut Filter> {
        match scope {
            Scope::Global => Some(&mut self.global_filter),
            Scope::Channel(channel) => self.channel_filters.get_mut(channel),
        }
    }

    pub fn remove_channel_filter(&mut self, channel: &ChannelId) -> bool {
        self.channel_filters.remove(channel).is_some()
    }

    /// `user` must pass the channel filter (if any) and the global filter.
    pub fn passes_filter(&self, channel: &ChannelId, user: &UserId) -> bool {
        let channel_ok = self
            .channel_filters
            .get(channel)
            .map_or(true, |filter| filter.passes(user));
        channel_ok && self.global_filter.passes(user)
    }

    // ------------------------------------------------------------------
    // Mode
    // ------------------------------------------------------------------

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        true
    }

    // ------------------------------------------------------------------
    // Auto-ring
    // ------------------------------------------------------------------

    pub fn global_auto_ring(&self) -> bool {
        self.global_auto_ring
    }

    pub fn auto_ring_override(&self, channel: &ChannelId) -> Option<bool> {
        self.channel_auto_ring.get(channel).copied()
    }

    pub fn channel_auto_ring(&self) -> &BTreeMap<ChannelId, bool> {
        &self.channel_auto_ring
    }

    /// A channel override takes precedence over the global value.
    pub fn auto_ring_enabled(&self, channel: Option<&ChannelId>) -> bool {
        channel
            .and_then(|channel| self.auto_ring_override(channel))
            .unwrap_or(self.global_auto_ring)
    }

    pub fn set_auto_ring(&mut self, scope: &Scope, enabled: bool) -> bool {
        match scope {
            Scope::Global => {
                let changed = self.global_auto_ring != enabled;
                self.global_auto_ring = enabled;
                changed
            }
            Scope::Channel(channel) => {
                self.channel_auto_ring.insert(channel.clone(), enabled) != Some(enabled)
            }
        }
    }

    pub fn unset_auto_ring(&mut self, channel: &ChannelId) -> bool {
        self.channel_auto_ring.remove(channel).is_some()
    }

    // ------------------------------------------------------------------
    // Default recipients
    // ------------------------------------------------------------------

    pub fn global_defaults(&self) -> &BTreeSet<UserId> {
        &self.global_defaults
    }

    pub fn channel_defaults(&self) -> &BTreeMap<ChannelId, BTreeSet<UserId>> {
        &self.channel_defaults
    }

    /// The default recipients configured for exactly this scope.
    pub fn default_recipients(&self, scope: &Scope) -> Option<&BTreeSet<UserId>> {
        match scope {
            Scope::Global => Some(&self.global_defaults),
            Scope::Channel(channel) => self.channel_defaults.get(channel),
        }
    }

    /// Global defaults followed by the channel's, without duplicates.
    pub fn all_default_recipients(&self, channel: Option<&ChannelId>) -> Vec<UserId> {
        let mut seen = BTreeSet::new();
        let channel_defaults = channel
            .and_then(|channel| self.channel_defaults.get(channel))
            .into_iter()
            .flatten();
        self.global_defaults
            .iter()
            .chain(channel_defaults)
            .filter(|user| seen.insert(*user))
            .cloned()
            .collect()
    }

    pub fn add_default_recipient(&mut self, scope: &Scope, user: UserId) -> bool {
        match scope {
            Scope::Global => self.global_defaults.insert(user),
            Scope::Channel(channel) => self
                .channel_defaults
                .entry(channel.clone())
                .or_default()
                .insert(user),
        }
    }

    pub fn remove_default_recipient(&mut self, scope: &Scope, user: &UserId) -> bool {
        match scope {
            Scope::Global => self.global_defaults.remove(user),
            Scope::Channel(channel) => {
                let Some(users) = self.channel_defaults.get_mut(channel) else {
                    return false;
                };
                let removed = users.remove(user);
                if users.is_empty() {
                    self.channel_defaults.remove(channel);
                }
                removed
            }
        }
    }

    pub fn clear_default_recipients(&mut self, scope: &Scope) -> bool {
        match scope {
            Scope::Global => {
                let changed = !self.global_defaults.is_empty();
                self.global_defaults.clear();
                changed
            }
            Scope::Channel(channel) => self
                .channel_defaults
                .remove(channel)
                .map_or(false, |users| !users.is_empty()),
        }
    }
}
