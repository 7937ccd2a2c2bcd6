use ringvc_shared::{ChannelSnapshot, Rejection, UserId};
use ringvc_store::State;

/// Decides whether `triggerer` may ring `recipient` into `channel`.
///
/// Rules run in a fixed order and the first one violated is reported: no
/// self-rings, the recipient must be able to join, must not already be
/// there, must pass the triggerer's filters, and the triggerer must pass
/// the recipient's. Users without stored settings filter nobody.
pub fn validate_ring(
    state: &State,
    channel: &ChannelSnapshot,
    triggerer: &UserId,
    recipient: &UserId,
) -> Result<(), Rejection> {
    if triggerer == recipient {
        return Err(Rejection::SelfRing);
    }
    if !channel.can_join(recipient) {
        return Err(Rejection::Unreachable {
            recipient: recipient.clone(),
            channel: channel.id.clone(),
        });
    }
    if channel.is_present(recipient) {
        return Err(Rejection::AlreadyPresent {
            recipient: recipient.clone(),
            channel: channel.id.clone(),
        });
    }
    if let Some(settings) = state.user(triggerer) {
        if !settings.passes_filter(&channel.id, recipient) {
            return Err(Rejection::BlockedByTriggerer {
                recipient: recipient.clone(),
            });
        }
    }
    if let Some(settings) = state.user(recipient) {
        if !settings.passes_filter(&channel.id, triggerer) {
            return Err(Rejection::BlockedByRecipient {
                recipient: recipient.clone(),
            });
        }
    }
    Ok(())
}
