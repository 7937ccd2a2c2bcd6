use ringvc_shared::{ChannelId, GroupId};
use ringvc_store::State;

use super::{Invoker, Outcome};

const PICK_A_CHANNEL: &str =
    "Please select a channel, or run this command in the voice channel you want to use";

pub(super) fn signup(state: &mut State, invoker: &Invoker, channel: Option<ChannelId>) -> Outcome {
    let Some(channel) = invoker.channel_or_current(channel) else {
        return Outcome::reply(PICK_A_CHANNEL);
    };
    if state.edit_roster(&channel, |roster| roster.add_user(invoker.user.clone())) {
        Outcome::reply(format!(
            "Signed up for {}. Use /unsignup to unsignup",
            channel.mention()
        ))
    } else {
        Outcome::reply(format!(
            "You are already signed up for {}. Use /unsignup to unsignup",
            channel.mention()
        ))
    }
}

pub(super) fn unsignup(state: &mut State, invoker: &Invoker, channel: Option<ChannelId>) -> Outcome {
    let Some(channel) = invoker.channel_or_current(channel) else {
        return Outcome::reply(PICK_A_CHANNEL);
    };
    if state.remove_signup(&channel, &invoker.user) {
        Outcome::reply(format!(
            "You will no longer be \"rung\" for {}",
            channel.mention()
        ))
    } else {
        Outcome::reply(format!("You aren't signed up for {}", channel.mention()))
    }
}

pub(super) fn signup_group(
    state: &mut State,
    invoker: &Invoker,
    group: GroupId,
    channel: Option<ChannelId>,
) -> Outcome {
    if !invoker.can_manage_groups {
        return Outcome::reply("You need permission to manage roles to sign up roles for voice channels");
    }
    let Some(channel) = invoker.channel_or_current(channel) else {
        return Outcome::reply(PICK_A_CHANNEL);
    };
    if state.edit_roster(&channel, |roster| roster.add_group(group.clone())) {
        Outcome::reply(format!(
            "Signed up {} for {}. Use /unsignup_group to remove it",
            group.mention(),
            channel.mention()
        ))
    } else {
        Outcome::reply(format!(
            "{} is already signed up for {}",
            group.mention(),
            channel.mention()
        ))
    }
}

pub(super) fn unsignup_group(
    state: &mut State,
    invoker: &Invoker,
    group: GroupId,
    channel: Option<ChannelId>,
) -> Outcome {
    if !invoker.can_manage_groups {
        return Outcome::reply("You need permission to manage roles to remove roles from voice channels");
    }
    let Some(channel) = invoker.channel_or_current(channel) else {
        return Outcome::reply(PICK_A_CHANNEL);
    };
    if state.edit_roster(&channel, |roster| roster.remove_group(&group)) {
        Outcome::reply(format!(
            "{} will no longer be pinged for {}",
            group.mention(),
            channel.mention()
        ))
    } else {
        Outcome::reply(format!(
            "{} isn't signed up for {}",
            group.mention(),
            channel.mention()
        ))
    }
}
