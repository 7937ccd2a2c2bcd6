//! The in-memory model: user settings and channel rosters keyed by id.
//!
//! All mutation goes through [`State::edit_user`] and [`State::edit_roster`],
//! which prune entities that fall back to their defaults and signal the
//! owning store when something actually changed.

use std::collections::BTreeMap;

use ringvc_shared::{ChannelId, UserId};
use tokio::sync::mpsc;

use crate::roster::ChannelRoster;
use crate::settings::UserSettings;

/// Tells the debounced store that the model changed.
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    tx: Option<mpsc::UnboundedSender<()>>,
}

impl ChangeNotifier {
    /// A notifier and the receiving end the store listens on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier nobody listens to.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn notify(&self) {
        if let Some(tx) = &self.tx {
            // The store being gone only happens during shutdown.
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, Default)]
pub struct State {
    users: BTreeMap<UserId, UserSettings>,
    rosters: BTreeMap<ChannelId, ChannelRoster>,
    changes: ChangeNotifier,
}

impl State {
    pub fn new(changes: ChangeNotifier) -> Self {
        Self {
            users: BTreeMap::new(),
            rosters: BTreeMap::new(),
            changes,
        }
    }

    pub fn detached() -> Self {
        Self::new(ChangeNotifier::detached())
    }

    pub(crate) fn from_parts(
        users: BTreeMap<UserId, UserSettings>,
        rosters: BTreeMap<ChannelId, ChannelRoster>,
    ) -> Self {
        Self {
            users,
            rosters,
            changes: ChangeNotifier::detached(),
        }
    }

    pub(crate) fn set_notifier(&mut self, changes: ChangeNotifier) {
        self.changes = changes;
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Stored settings; `None` means every setting is at its default.
    pub fn user(&self, id: &UserId) -> Option<&UserSettings> {
        self.users.get(id)
    }

    pub fn roster(&self, channel: &ChannelId) -> Option<&ChannelRoster> {
        self.rosters.get(channel)
    }

    pub fn users(&self) -> impl Iterator<Item = (&UserId, &UserSettings)> {
        self.users.iter()
    }

    pub fn rosters(&self) -> impl Iterator<Item = (&ChannelId, &ChannelRoster)> {
        self.rosters.iter()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Runs `edit` on the user's settings, creating them if absent. Settings
    /// left at their defaults are dropped.
    pub fn edit_user<R>(&mut self, id: &UserId, edit: impl FnOnce(&mut UserSettings) -> R) -> R {
        let settings = self.users.entry(id.clone()).or_default();
        let before = settings.clone();
        let result = edit(settings);
        let changed = *settings != before;
        if settings.is_default() {
            self.users.remove(id);
        }
        if changed {
            self.changes.notify();
        }
        result
    }

    /// Runs `edit` on the channel's roster, creating it if absent. An empty
    /// roster is dropped.
    pub fn edit_roster<R>(
        &mut self,
        channel: &ChannelId,
        edit: impl FnOnce(&mut ChannelRoster) -> R,
    ) -> R {
        let roster = self.rosters.entry(channel.clone()).or_default();
        let before = roster.clone();
        let result = edit(roster);
        let changed = *roster != before;
        if roster.is_empty() {
            self.rosters.remove(channel);
        }
        if changed {
            self.changes.notify();
        }
        result
    }

    /// Takes a user off a channel's roster along with their filter for that
    /// channel.
    pub fn remove_signup(&mut self, channel: &ChannelId, user: &UserId) -> bool {
        let removed = self.edit_roster(channel, |roster| roster.remove_user(user));
        if removed {
            self.edit_user(user, |settings| settings.remove_channel_filter(channel));
        }
        removed
    }
}
