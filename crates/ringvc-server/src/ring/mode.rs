use ringvc_shared::{ChannelSnapshot, EffectiveMode, Mode, UserId};
use ringvc_store::State;

/// Resolves a user's stored mode against their presence in the snapshot.
///
/// `auto` is stealth only while the user shows as offline; a missing
/// presence counts as online.
pub fn effective_mode(state: &State, channel: &ChannelSnapshot, user: &UserId) -> EffectiveMode {
    let mode = state.user(user).map(|s| s.mode()).unwrap_or_default();
    match mode {
        Mode::Normal => EffectiveMode::Normal,
        Mode::Stealth => EffectiveMode::Stealth,
        Mode::Auto => match channel.presence(user) {
            Some(presence) if presence.is_offline() => EffectiveMode::Stealth,
            _ => EffectiveMode::Normal,
        },
    }
}
