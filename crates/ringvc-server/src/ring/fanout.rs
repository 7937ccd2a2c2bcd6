//! Who gets notified when someone joins a channel.
//!
//! Nothing is remembered between joins. Instead each join re-scans the
//! people already in the channel: if one of them could have rung a
//! recipient, that recipient was already notified when the room became
//! relevant to them, and this join is not a new trigger.

use std::collections::BTreeSet;

use ringvc_shared::{ChannelSnapshot, EffectiveMode, GroupId, UserId};
use ringvc_store::State;
use tracing::debug;

use super::mode::effective_mode;
use super::validate::validate_ring;

/// Deduplicated targets for one join announcement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPlan {
    pub users: Vec<UserId>,
    pub groups: Vec<GroupId>,
}

impl JoinPlan {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }
}

/// Whether `occupant` is a valid, visible triggerer for `recipient`.
///
/// Used for both the group check and the per-user check so the two agree
/// on who counts.
pub fn could_trigger(
    state: &State,
    channel: &ChannelSnapshot,
    occupant: &UserId,
    recipient: &UserId,
) -> bool {
    validate_ring(state, channel, occupant, recipient).is_ok()
        && effective_mode(state, channel, occupant) == EffectiveMode::Normal
}

/// Computes the roster notifications for `joiner` entering `channel`.
pub fn plan_join(state: &State, channel: &ChannelSnapshot, joiner: &UserId) -> JoinPlan {
    let mut plan = JoinPlan::default();

    if effective_mode(state, channel, joiner) == EffectiveMode::Stealth {
        debug!(user = %joiner, channel = %channel.id, "Joiner is in stealth, not announcing");
        return plan;
    }
    let Some(roster) = state.roster(&channel.id) else {
        return plan;
    };

    let mut covered: BTreeSet<&UserId> = BTreeSet::new();
    for group in roster.groups() {
        let Some(members) = channel.group_members(group) else {
            debug!(group = %group, channel = %channel.id, "Group could not be resolved, skipping");
            continue;
        };
        let already_pingable = channel.others(joiner).any(|occupant| {
            members
                .iter()
                .any(|member| could_trigger(state, channel, occupant, member))
        });
        if already_pingable {
            continue;
        }
        plan.groups.push(group.clone());
        covered.extend(members.iter());
    }

    for recipient in roster.users() {
        if covered.contains(recipient) {
            continue;
        }
        if let Err(reason) = validate_ring(state, channel, joiner, recipient) {
            debug!(recipient = %recipient, reason = %reason, "Not ringing signed-up user");
            continue;
        }
        let only_trigger = !channel
            .others(joiner)
            .any(|occupant| could_trigger(state, channel, occupant, recipient));
        if only_trigger {
            plan.users.push(recipient.clone());
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringvc_shared::{ChannelId, Mode, Presence, Scope};

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    fn chan() -> ChannelId {
        ChannelId::from("c")
    }

    fn signup(state: &mut State, ids: &[&str]) {
        for id in ids {
            state.edit_roster(&chan(), |r| r.add_user(user(id)));
        }
    }

    #[test]
    fn test_first_joiner_rings_everyone_signed_up() {
        let mut state = State::detached();
        signup(&mut state, &["a", "b", "d"]);
        let channel = ChannelSnapshot::new("c", "lounge").with_occupant("a");

        let plan = plan_join(&state, &channel, &user("a"));
        assert_eq!(plan.users, vec![user("b"), user("d")]);
        assert!(plan.groups.is_empty());
    }

    #[test]
    fn test_second_joiner_is_not_a_new_trigger() {
        let mut state = State::detached();
        signup(&mut state, &["b"]);
        let channel = ChannelSnapshot::new("c", "lounge")
            .with_occupant("a")
            .with_occupant("j");

        assert!(plan_join(&state, &channel, &user("j")).is_empty());
    }

    #[test]
    fn test_blocked_occupant_does_not_count_as_trigger() {
        let mut state = State::detached();
        signup(&mut state, &["b"]);
        // b blocked a, so a being in the room never rang b.
        state.edit_user(&user("b"), |s| s.filter_mut(&Scope::Global).add(user("a")));
        let channel = ChannelSnapshot::new("c", "lounge")
            .with_occupant("a")
            .with_occupant("j");

        assert_eq!(plan_join(&state, &channel, &user("j")).users, vec![user("b")]);
    }

    #[test]
    fn test_stealth_occupant_does_not_count_as_trigger() {
        let mut state = State::detached();
        signup(&mut state, &["b"]);
        state.edit_user(&user("a"), |s| s.set_mode(Mode::Auto));
        let channel = ChannelSnapshot::new("c", "lounge")
            .with_occupant("a")
            .with_occupant("j")
            .with_presence("a", Presence::Invisible);

        assert_eq!(plan_join(&state, &channel, &user("j")).users, vec![user("b")]);
    }

    #[test]
    fn test_stealth_joiner_announces_nothing() {
        let mut state = State::detached();
        signup(&mut state, &["b"]);
        state.edit_user(&user("j"), |s| s.set_mode(Mode::Stealth));
        let channel = ChannelSnapshot::new("c", "lounge").with_occupant("j");

        assert!(plan_join(&state, &channel, &user("j")).is_empty());
    }

    #[test]
    fn test_recipient_blocking_joiner_is_left_out() {
        let mut state = State::detached();
        signup(&mut state, &["a", "b"]);
        state.edit_user(&user("b"), |s| s.filter_mut(&Scope::Global).add(user("a")));
        let channel = ChannelSnapshot::new("c", "lounge").with_occupant("a");

        let plan = plan_join(&state, &channel, &user("a"));
        assert!(!plan.users.contains(&user("b")));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_group_covers_its_members() {
        let mut state = State::detached();
        signup(&mut state, &["x"]);
        state.edit_roster(&chan(), |r| r.add_group(GroupId::from("g")));
        let channel = ChannelSnapshot::new("c", "lounge")
            .with_occupant("x")
            .with_group("g", ["x", "y"]);

        let plan = plan_join(&state, &channel, &user("x"));
        assert_eq!(plan.groups, vec![GroupId::from("g")]);
        assert!(plan.users.is_empty());
    }

    #[test]
    fn test_group_is_pinged_once_per_occupancy() {
        let mut state = State::detached();
        state.edit_roster(&chan(), |r| r.add_group(GroupId::from("g")));
        let channel = ChannelSnapshot::new("c", "lounge")
            .with_occupant("a")
            .with_occupant("j")
            .with_group("g", ["y"]);

        assert!(plan_join(&state, &channel, &user("j")).is_empty());
    }

    #[test]
    fn test_unresolved_group_is_skipped() {
        let mut state = State::detached();
        signup(&mut state, &["b"]);
        state.edit_roster(&chan(), |r| r.add_group(GroupId::from("gone")));
        let channel = ChannelSnapshot::new("c", "lounge").with_occupant("a");

        let plan = plan_join(&state, &channel, &user("a"));
        assert!(plan.groups.is_empty());
        assert_eq!(plan.users, vec![user("b")]);
    }
}
