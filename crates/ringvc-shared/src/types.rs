use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// Platform identifiers are opaque snowflake strings; we never parse them.
macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident, $mention:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Markup that renders as a mention on the chat platform.
            pub fn mention(&self) -> String {
                format!($mention, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

snowflake!(
    /// A chat platform user.
    UserId,
    "<@{}>"
);

snowflake!(
    /// A voice channel that presence events happen in.
    ChannelId,
    "<#{}>"
);

snowflake!(
    /// A group of users (a platform role) that can be mentioned at once.
    GroupId,
    "<@&{}>"
);

/// Where a filter or default-recipient list applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Channel(ChannelId),
}

impl Scope {
    pub fn channel(&self) -> Option<&ChannelId> {
        match self {
            Scope::Global => None,
            Scope::Channel(id) => Some(id),
        }
    }
}

impl From<Option<ChannelId>> for Scope {
    fn from(channel: Option<ChannelId>) -> Self {
        channel.map_or(Scope::Global, Scope::Channel)
    }
}

/// The visibility mode a user stores in their settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Stealth,
    /// Stealth while the user's platform presence is offline, normal otherwise.
    Auto,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Stealth => "stealth",
            Mode::Auto => "auto",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Mode::Normal),
            "stealth" => Ok(Mode::Stealth),
            "auto" => Ok(Mode::Auto),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// A mode after `auto` has been resolved against presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveMode {
    Normal,
    Stealth,
}

/// Platform presence status as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Online,
    Idle,
    Dnd,
    Invisible,
    Offline,
}

impl Presence {
    /// Invisible users are reported to other clients as offline.
    pub fn is_offline(&self) -> bool {
        matches!(self, Presence::Offline | Presence::Invisible)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Whitelist,
    Blacklist,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Whitelist => "whitelist",
            FilterKind::Blacklist => "blacklist",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
