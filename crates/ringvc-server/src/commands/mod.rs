//! Pure command handlers.
//!
//! A handler takes the model, who invoked it and the parsed arguments, and
//! returns what to tell the invoker. Mutations go through the model's edit
//! methods, so the store hears about exactly the commands that changed
//! something. Handlers never touch the transport.

mod defaults;
mod filter;
mod mode;
mod ring;
mod signup;

use ringvc_shared::{ChannelId, ChannelSnapshot, FilterKind, GroupId, Mode, Scope, UserId};
use ringvc_store::{State, UserSettings};
use serde::Deserialize;

use crate::delivery::Notification;

/// A parsed command, as posted by the platform adapter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Signup {
        channel: Option<ChannelId>,
    },
    #[serde(alias = "quit")]
    Unsignup {
        channel: Option<ChannelId>,
    },
    SignupGroup {
        group: GroupId,
        channel: Option<ChannelId>,
    },
    UnsignupGroup {
        group: GroupId,
        channel: Option<ChannelId>,
    },

    ModeSet {
        mode: Mode,
    },
    ModeGet,

    Block {
        user: UserId,
    },
    Unblock {
        user: UserId,
    },
    Whitelist {
        user: UserId,
    },
    Unwhitelist {
        user: UserId,
    },
    FilterGet {
        channel: Option<ChannelId>,
    },
    FilterReset {
        channel: Option<ChannelId>,
    },
    FilterEditUsers {
        action: EditAction,
        user: UserId,
        channel: Option<ChannelId>,
    },
    FilterEditType {
        kind: FilterKind,
        channel: Option<ChannelId>,
    },

    DefaultRecipientsAdd {
        user: UserId,
        channel: Option<ChannelId>,
    },
    DefaultRecipientsRemove {
        user: UserId,
        channel: Option<ChannelId>,
    },
    DefaultRecipientsList {
        channel: Option<ChannelId>,
    },
    DefaultRecipientsClear {
        channel: Option<ChannelId>,
    },
    AutoRingSet {
        enabled: bool,
        channel: Option<ChannelId>,
    },
    AutoRingUnset {
        channel: ChannelId,
    },
    AutoRingGet {
        channel: Option<ChannelId>,
    },

    Ring {
        user: UserId,
    },
    RingDefaults,

    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    Add,
    Remove,
}

/// Who ran a command, with what the adapter resolved about them.
#[derive(Debug, Clone, Deserialize)]
pub struct Invoker {
    pub user: UserId,
    /// Whether the invoker may sign groups up or off.
    #[serde(default)]
    pub can_manage_groups: bool,
    /// The voice channel the invoker is currently in.
    #[serde(default)]
    pub voice: Option<ChannelSnapshot>,
}

impl Invoker {
    pub fn new(user: impl Into<UserId>) -> Self {
        Self {
            user: user.into(),
            can_manage_groups: false,
            voice: None,
        }
    }

    pub fn in_channel(mut self, voice: ChannelSnapshot) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn with_group_management(mut self) -> Self {
        self.can_manage_groups = true;
        self
    }

    /// The named channel, or the voice channel the invoker is in.
    fn channel_or_current(&self, channel: Option<ChannelId>) -> Option<ChannelId> {
        channel.or_else(|| self.voice.as_ref().map(|voice| voice.id.clone()))
    }
}

/// A message to deliver on the invoker's behalf, plus who it is for so the
/// reply can say whether it went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingRequest {
    pub notification: Notification,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Ring(RingRequest),
}

impl Outcome {
    fn reply(text: impl Into<String>) -> Self {
        Outcome::Reply(text.into())
    }
}

pub fn execute(state: &mut State, invoker: &Invoker, command: Command) -> Outcome {
    match command {
        Command::Signup { channel } => signup::signup(state, invoker, channel),
        Command::Unsignup { channel } => signup::unsignup(state, invoker, channel),
        Command::SignupGroup { group, channel } => {
            signup::signup_group(state, invoker, group, channel)
        }
        Command::UnsignupGroup { group, channel } => {
            signup::unsignup_group(state, invoker, group, channel)
        }

        Command::ModeSet { mode } => mode::set(state, invoker, mode),
        Command::ModeGet => mode::get(state, invoker),

        Command::Block { user } => filter::block(state, invoker, user),
        Command::Unblock { user } => filter::unblock(state, invoker, user),
        Command::Whitelist { user } => filter::whitelist(state, invoker, user),
        Command::Unwhitelist { user } => filter::unwhitelist(state, invoker, user),
        Command::FilterGet { channel } => filter::get(state, invoker, channel.into()),
        Command::FilterReset { channel } => filter::reset(state, invoker, channel.into()),
        Command::FilterEditUsers {
            action,
            user,
            channel,
        } => filter::edit_users(state, invoker, action, user, channel.into()),
        Command::FilterEditType { kind, channel } => {
            filter::edit_type(state, invoker, kind, channel.into())
        }

        Command::DefaultRecipientsAdd { user, channel } => {
            defaults::add(state, invoker, user, channel.into())
        }
        Command::DefaultRecipientsRemove { user, channel } => {
            defaults::remove(state, invoker, user, channel.into())
        }
        Command::DefaultRecipientsList { channel } => defaults::list(state, invoker, channel.into()),
        Command::DefaultRecipientsClear { channel } => {
            defaults::clear(state, invoker, channel.into())
        }
        Command::AutoRingSet { enabled, channel } => {
            defaults::auto_ring_set(state, invoker, enabled, channel.into())
        }
        Command::AutoRingUnset { channel } => defaults::auto_ring_unset(state, invoker, channel),
        Command::AutoRingGet { channel } => defaults::auto_ring_get(state, invoker, channel),

        Command::Ring { user } => ring::ring_user(state, invoker, user),
        Command::RingDefaults => ring::ring_defaults(state, invoker),

        Command::Help => Outcome::reply(HELP),
    }
}

/// Stored settings, or the defaults for a user that has none.
fn settings_of<'a>(state: &'a State, user: &UserId, fallback: &'a UserSettings) -> &'a UserSettings {
    state.user(user).unwrap_or(fallback)
}

/// `" global"` for the global scope, nothing for a channel.
fn global_prefix(scope: &Scope) -> &'static str {
    match scope {
        Scope::Global => " global",
        Scope::Channel(_) => "",
    }
}

/// `" for <#channel>"` for a channel scope, nothing for the global one.
fn channel_suffix(scope: &Scope) -> String {
    match scope {
        Scope::Global => String::new(),
        Scope::Channel(channel) => format!(" for {}", channel.mention()),
    }
}

const HELP: &str = "\
__RingVC__
Get \"rung\" when someone starts a call in a voice channel you care about.

**signup** / **unsignup**: get rung, or stop, for a voice channel
**signup_group** / **unsignup_group**: sign a group up to be pinged for a voice channel
**mode set** / **mode get**: `normal` rings people when you join, `stealth` never does, `auto` is stealth while you appear offline
**block** / **unblock**: stop someone from ringing you, or let them again
**whitelist** / **unwhitelist**: with a whitelist, only listed people can ring you
**filter get | reset | edit users | edit type**: manage your global filter or a channel's filter
**default_recipients add | remove | list | clear**: who `ring defaults` rings
**auto_ring set | unset | get**: ring your default recipients whenever you join a voice channel
**ring** / **ring defaults**: invite someone, or your default recipients, to your voice channel";
