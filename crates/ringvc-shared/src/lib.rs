//! # ringvc-shared
//!
//! Types shared by the RingVC store and server: platform identifiers, the
//! channel snapshot handed in with every event, and the ring error taxonomy.

pub mod constants;
pub mod error;
pub mod snapshot;
pub mod types;

pub use error::{DeliveryError, Rejection, RingError};
pub use snapshot::{Access, ChannelSnapshot};
pub use types::{ChannelId, EffectiveMode, FilterKind, GroupId, Mode, Presence, Scope, UserId};
