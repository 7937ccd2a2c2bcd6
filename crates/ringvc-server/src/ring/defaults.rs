use ringvc_shared::{ChannelSnapshot, RingError, UserId};
use ringvc_store::State;
use tracing::debug;

use super::validate::validate_ring;

/// The owner's default recipients for `channel` that pass validation.
///
/// An empty configuration and a configuration where nobody passes are
/// reported differently, since the owner fixes them in different ways.
pub fn default_targets(
    state: &State,
    channel: &ChannelSnapshot,
    owner: &UserId,
) -> Result<Vec<UserId>, RingError> {
    let configured = state
        .user(owner)
        .map(|settings| settings.all_default_recipients(Some(&channel.id)))
        .unwrap_or_default();
    if configured.is_empty() {
        return Err(RingError::NoDefaultRecipients);
    }

    let eligible: Vec<UserId> = configured
        .into_iter()
        .filter(|recipient| match validate_ring(state, channel, owner, recipient) {
            Ok(()) => true,
            Err(reason) => {
                debug!(recipient = %recipient, reason = %reason, "Skipping default recipient");
                false
            }
        })
        .collect();

    if eligible.is_empty() {
        Err(RingError::NoEligibleRecipients)
    } else {
        Ok(eligible)
    }
}

/// Default targets for the owner's own join, or `None` when auto-ring is off
/// for this channel. Stealth mode does not suppress auto-ring.
pub fn auto_ring_targets(
    state: &State,
    channel: &ChannelSnapshot,
    joiner: &UserId,
) -> Option<Result<Vec<UserId>, RingError>> {
    let enabled = state
        .user(joiner)
        .is_some_and(|settings| settings.auto_ring_enabled(Some(&channel.id)));
    enabled.then(|| default_targets(state, channel, joiner))
}
