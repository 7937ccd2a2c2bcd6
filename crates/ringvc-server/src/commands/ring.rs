use ringvc_shared::{RingError, UserId};
use ringvc_store::State;

use super::{Invoker, Outcome, RingRequest};
use crate::ring::{default_targets, mention_list, ring_message, validate_ring, WANTS_YOU};

const JOIN_FIRST: &str = "Please join a voice channel first";

pub(super) fn ring_user(state: &State, invoker: &Invoker, user: UserId) -> Outcome {
    let Some(voice) = &invoker.voice else {
        return Outcome::reply(JOIN_FIRST);
    };
    let target = user.mention();
    if let Err(reason) = validate_ring(state, voice, &invoker.user, &user) {
        return Outcome::reply(format!(
            "Can't notify {target} because {}",
            RingError::from(reason)
        ));
    }
    Outcome::Ring(RingRequest {
        notification: ring_message(voice, &invoker.user, WANTS_YOU, vec![user], Vec::new()),
        target,
    })
}

pub(super) fn ring_defaults(state: &State, invoker: &Invoker) -> Outcome {
    let Some(voice) = &invoker.voice else {
        return Outcome::reply(JOIN_FIRST);
    };
    match default_targets(state, voice, &invoker.user) {
        Ok(users) => Outcome::Ring(RingRequest {
            target: mention_list(&users, &[]),
            notification: ring_message(voice, &invoker.user, WANTS_YOU, users, Vec::new()),
        }),
        Err(e) => Outcome::reply(format!("Can't ring your default recipients because {e}")),
    }
}
