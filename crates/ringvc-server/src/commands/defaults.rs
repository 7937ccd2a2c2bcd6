use ringvc_shared::{ChannelId, Scope, UserId};
use ringvc_store::{State, UserSettings};

use super::{channel_suffix, global_prefix, settings_of, Invoker, Outcome};

/// "a global default ring recipient" or "a default ring recipient for <#7>".
fn role(scope: &Scope) -> String {
    format!(
        "a{} default ring recipient{}",
        global_prefix(scope),
        channel_suffix(scope)
    )
}

pub(super) fn add(state: &mut State, invoker: &Invoker, user: UserId, scope: Scope) -> Outcome {
    let mention = user.mention();
    if state.edit_user(&invoker.user, |s| s.add_default_recipient(&scope, user)) {
        Outcome::reply(format!("{mention} is now {}", role(&scope)))
    } else {
        Outcome::reply(format!("{mention} is already {}", role(&scope)))
    }
}

pub(super) fn remove(state: &mut State, invoker: &Invoker, user: UserId, scope: Scope) -> Outcome {
    if state.edit_user(&invoker.user, |s| s.remove_default_recipient(&scope, &user)) {
        Outcome::reply(format!("{} is no longer {}", user.mention(), role(&scope)))
    } else {
        Outcome::reply(format!("{} is not {}", user.mention(), role(&scope)))
    }
}

pub(super) fn list(state: &State, invoker: &Invoker, scope: Scope) -> Outcome {
    let fallback = UserSettings::default();
    let listed = settings_of(state, &invoker.user, &fallback)
        .default_recipients(&scope)
        .filter(|users| !users.is_empty())
        .map_or_else(
            || "None".to_string(),
            |users| users.iter().map(UserId::mention).collect::<Vec<_>>().join("\n"),
        );
    Outcome::reply(format!(
        "__Your{} default ring recipients{}__\n{listed}",
        global_prefix(&scope),
        channel_suffix(&scope)
    ))
}

pub(super) fn clear(state: &mut State, invoker: &Invoker, scope: Scope) -> Outcome {
    if state.edit_user(&invoker.user, |s| s.clear_default_recipients(&scope)) {
        Outcome::reply(format!(
            "Your{} default ring recipients{} have been cleared.",
            global_prefix(&scope),
            channel_suffix(&scope)
        ))
    } else {
        Outcome::reply(format!(
            "You already have no{} default ring recipients{}.",
            global_prefix(&scope),
            channel_suffix(&scope)
        ))
    }
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

pub(super) fn auto_ring_set(state: &mut State, invoker: &Invoker, enabled: bool, scope: Scope) -> Outcome {
    let place = match &scope {
        Scope::Global => "a voice channel".to_string(),
        Scope::Channel(channel) => channel.mention(),
    };
    if !state.edit_user(&invoker.user, |s| s.set_auto_ring(&scope, enabled)) {
        let places = match &scope {
            Scope::Global => "voice channels".to_string(),
            Scope::Channel(channel) => channel.mention(),
        };
        return Outcome::reply(format!(
            "Automatic ringing for {places} is already `{}`.",
            enabled_label(enabled)
        ));
    }

    let mut text = format!(
        "Automatic ringing when you join {place} is now `{}`.",
        enabled_label(enabled)
    );
    if enabled {
        text.push_str(&format!(
            "\n\nWARNING: This will cause you to ring all of your default ring recipients every time you join {place}, even if you are in `stealth` mode."
        ));
    }
    Outcome::reply(text)
}

pub(super) fn auto_ring_unset(state: &mut State, invoker: &Invoker, channel: ChannelId) -> Outcome {
    if state.edit_user(&invoker.user, |s| s.unset_auto_ring(&channel)) {
        Outcome::reply(format!(
            "Automatic ringing override for {} has been unset. Your global automatic ringing setting will now be used.",
            channel.mention()
        ))
    } else {
        Outcome::reply(format!(
            "You do not have an automatic ringing override set for {}.",
            channel.mention()
        ))
    }
}

pub(super) fn auto_ring_get(state: &State, invoker: &Invoker, channel: Option<ChannelId>) -> Outcome {
    let fallback = UserSettings::default();
    let settings = settings_of(state, &invoker.user, &fallback);
    let enabled = settings.auto_ring_enabled(channel.as_ref());
    let will = if enabled { "will" } else { "will not" };

    let text = match &channel {
        Some(channel) => match settings.auto_ring_override(channel) {
            Some(value) => format!(
                "Default ring {will} run automatically for {} because your override for {} is set to `{}`",
                channel.mention(),
                channel.mention(),
                enabled_label(value)
            ),
            None => format!(
                "Default ring {will} run automatically for {} because you have no override for {} and your global auto ring is `{}`",
                channel.mention(),
                channel.mention(),
                enabled_label(settings.global_auto_ring())
            ),
        },
        None => format!(
            "Default ring {will} run automatically globally because your global auto ring is `{}`",
            enabled_label(enabled)
        ),
    };
    Outcome::reply(text)
}
