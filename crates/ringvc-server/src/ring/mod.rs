//! The ring engine: validation, mode resolution, join fan-out and default
//! recipients, plus the text of the messages they produce.

pub mod defaults;
pub mod fanout;
pub mod mode;
pub mod validate;

use ringvc_shared::{ChannelSnapshot, GroupId, UserId};

use crate::delivery::Notification;

pub use defaults::{auto_ring_targets, default_targets};
pub use fanout::plan_join;
pub use validate::validate_ring;

/// Verb used when announcing a join to the roster.
pub const JOINED: &str = "just joined";

/// Verb used for explicit rings and auto-rings.
pub const WANTS_YOU: &str = "wants you to join";

/// Renders mentions as `a`, `a and b` or `a, b and c`, users before groups.
pub fn mention_list(users: &[UserId], groups: &[GroupId]) -> String {
    let mentions: Vec<String> = users
        .iter()
        .map(UserId::mention)
        .chain(groups.iter().map(GroupId::mention))
        .collect();

    match mentions.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}

/// Builds the message `triggerer` sends into `channel`. Callers make sure
/// there is somebody to mention.
pub fn ring_message(
    channel: &ChannelSnapshot,
    triggerer: &UserId,
    verb: &str,
    users: Vec<UserId>,
    groups: Vec<GroupId>,
) -> Notification {
    let text = format!(
        "`@{}` {} `#{}`, {}",
        channel.display_name(triggerer),
        verb,
        channel.name,
        mention_list(&users, &groups)
    );
    Notification {
        channel: channel.id.clone(),
        text,
        users,
        groups,
    }
}
