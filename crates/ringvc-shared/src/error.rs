use thiserror::Error;

use crate::types::{ChannelId, UserId};

/// Why a single ring from a triggerer to a recipient is not allowed.
///
/// Variants are listed in the order the checks run; the first violated
/// rule wins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("you can't ring yourself")]
    SelfRing,

    #[error("{} can't join {}", .recipient.mention(), .channel.mention())]
    Unreachable {
        recipient: UserId,
        channel: ChannelId,
    },

    #[error("{} is already in {}", .recipient.mention(), .channel.mention())]
    AlreadyPresent {
        recipient: UserId,
        channel: ChannelId,
    },

    #[error("you blocked {}", .recipient.mention())]
    BlockedByTriggerer { recipient: UserId },

    #[error("{} blocked you", .recipient.mention())]
    BlockedByRecipient { recipient: UserId },
}

/// Failure reported by the outbound messaging collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DeliveryError {
    pub message: String,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The owner has not configured any default recipients.
    #[error("no default users to ring")]
    NoDefaultRecipients,

    /// Default recipients exist but every one of them failed validation.
    #[error("no default users for whom you passed each other's filters")]
    NoEligibleRecipients,

    #[error("the ring message failed to send: {0}")]
    Delivery(#[from] DeliveryError),
}
