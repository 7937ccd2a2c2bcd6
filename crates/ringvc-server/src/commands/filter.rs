use ringvc_shared::{FilterKind, Scope, UserId};
use ringvc_store::{Filter, State, UserSettings};

use super::{channel_suffix, settings_of, EditAction, Invoker, Outcome};

/// "global blacklist", "whitelist for <#7>" and so on.
fn describe(scope: &Scope, kind: FilterKind) -> String {
    match scope {
        Scope::Global => format!("global {kind}"),
        Scope::Channel(channel) => format!("{kind} for {}", channel.mention()),
    }
}

/// "global filter" or "filter for <#7>".
fn filter_name(scope: &Scope) -> String {
    match scope {
        Scope::Global => "global filter".to_string(),
        Scope::Channel(_) => format!("filter{}", channel_suffix(scope)),
    }
}

fn global_kind(state: &State, invoker: &Invoker) -> FilterKind {
    state
        .user(&invoker.user)
        .map_or(FilterKind::Blacklist, |s| s.global_filter().kind())
}

fn in_global_filter(state: &State, invoker: &Invoker, user: &UserId) -> bool {
    state
        .user(&invoker.user)
        .is_some_and(|s| s.global_filter().contains(user))
}

pub(super) fn block(state: &mut State, invoker: &Invoker, user: UserId) -> Outcome {
    if global_kind(state, invoker) == FilterKind::Whitelist {
        return Outcome::reply(
            "Your global filter is a whitelist. Either change it to a blacklist or use /unwhitelist instead",
        );
    }
    if in_global_filter(state, invoker, &user) {
        return Outcome::reply(format!("{} is already blocked", user.mention()));
    }
    let mention = user.mention();
    state.edit_user(&invoker.user, |s| s.filter_mut(&Scope::Global).add(user));
    Outcome::reply(format!("{mention} has been blocked"))
}

pub(super) fn unblock(state: &mut State, invoker: &Invoker, user: UserId) -> Outcome {
    if global_kind(state, invoker) == FilterKind::Whitelist {
        return Outcome::reply(
            "Your global filter is a whitelist. Either change it to a blacklist or use /unwhitelist instead",
        );
    }
    if !in_global_filter(state, invoker, &user) {
        return Outcome::reply(format!("{} isn't blocked", user.mention()));
    }
    state.edit_user(&invoker.user, |s| s.filter_mut(&Scope::Global).remove(&user));
    Outcome::reply(format!("{} has been unblocked", user.mention()))
}

pub(super) fn whitelist(state: &mut State, invoker: &Invoker, user: UserId) -> Outcome {
    if global_kind(state, invoker) != FilterKind::Whitelist {
        return Outcome::reply(
            "Your global filter is not a whitelist. Either change it to a whitelist or use /block instead",
        );
    }
    if in_global_filter(state, invoker, &user) {
        return Outcome::reply(format!("{} is already whitelisted", user.mention()));
    }
    let mention = user.mention();
    state.edit_user(&invoker.user, |s| s.filter_mut(&Scope::Global).add(user));
    Outcome::reply(format!("{mention} has been whitelisted"))
}

pub(super) fn unwhitelist(state: &mut State, invoker: &Invoker, user: UserId) -> Outcome {
    if global_kind(state, invoker) != FilterKind::Whitelist {
        return Outcome::reply(
            "Your global filter is not a whitelist. Either change it to a whitelist or use /unblock instead",
        );
    }
    if !in_global_filter(state, invoker, &user) {
        return Outcome::reply(format!("{} isn't whitelisted", user.mention()));
    }
    state.edit_user(&invoker.user, |s| s.filter_mut(&Scope::Global).remove(&user));
    Outcome::reply(format!(
        "{} has been removed from your whitelist",
        user.mention()
    ))
}

pub(super) fn get(state: &State, invoker: &Invoker, scope: Scope) -> Outcome {
    let fallback = UserSettings::default();
    let default_filter = Filter::default();
    let filter = settings_of(state, &invoker.user, &fallback)
        .filter(&scope)
        .unwrap_or(&default_filter);

    let listed = if filter.members().is_empty() {
        "None".to_string()
    } else {
        filter
            .members()
            .iter()
            .map(UserId::mention)
            .collect::<Vec<_>>()
            .join("\n")
    };
    Outcome::reply(format!(
        "__List of people in your {}__\n{listed}",
        describe(&scope, filter.kind())
    ))
}

pub(super) fn reset(state: &mut State, invoker: &Invoker, scope: Scope) -> Outcome {
    let is_default = state
        .user(&invoker.user)
        .and_then(|s| s.filter(&scope))
        .map_or(true, Filter::is_default);
    let name = filter_name(&scope);
    if is_default {
        return Outcome::reply(format!(
            "Your {name} is already the default (blacklist with no users)"
        ));
    }

    state.edit_user(&invoker.user, |s| match &scope {
        Scope::Global => s.filter_mut(&scope).reset(),
        // A default channel filter means the same as none at all.
        Scope::Channel(channel) => s.remove_channel_filter(channel),
    });
    Outcome::reply(format!("Your {name} has been reset and is now a blacklist"))
}

pub(super) fn edit_users(
    state: &mut State,
    invoker: &Invoker,
    action: EditAction,
    user: UserId,
    scope: Scope,
) -> Outcome {
    let mention = user.mention();
    match action {
        EditAction::Add => {
            let (added, kind) = state.edit_user(&invoker.user, |s| {
                let filter = s.filter_mut(&scope);
                (filter.add(user), filter.kind())
            });
            let description = describe(&scope, kind);
            if added {
                Outcome::reply(format!("Added {mention} to your {description}"))
            } else {
                Outcome::reply(format!("{mention} is already in your {description}"))
            }
        }
        EditAction::Remove => {
            let (removed, kind) = state.edit_user(&invoker.user, |s| {
                match s.existing_filter_mut(&scope) {
                    Some(filter) => (filter.remove(&user), filter.kind()),
                    None => (false, FilterKind::Blacklist),
                }
            });
            let description = describe(&scope, kind);
            if removed {
                Outcome::reply(format!("Removed {mention} from your {description}"))
            } else {
                Outcome::reply(format!("{mention} was not in your {description}"))
            }
        }
    }
}

pub(super) fn edit_type(state: &mut State, invoker: &Invoker, kind: FilterKind, scope: Scope) -> Outcome {
    let current = state
        .user(&invoker.user)
        .and_then(|s| s.filter(&scope))
        .map_or(FilterKind::Blacklist, Filter::kind);
    let name = filter_name(&scope);
    if current == kind {
        return Outcome::reply(format!("Your {name} is already a `{kind}`"));
    }

    state.edit_user(&invoker.user, |s| s.filter_mut(&scope).set_kind(kind));
    Outcome::reply(format!("Your {name} was reset and changed to a `{kind}`"))
}
