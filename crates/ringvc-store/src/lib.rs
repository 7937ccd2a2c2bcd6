//! # ringvc-store
//!
//! The RingVC data model and its persistence: per-user settings and
//! per-channel rosters held in memory, saved to a single data file on a
//! debounced schedule.

pub mod codec;
pub mod error;
pub mod filter;
pub mod roster;
pub mod settings;
pub mod state;
pub mod store;

pub use error::{Result, StoreError};
pub use filter::Filter;
pub use roster::ChannelRoster;
pub use settings::UserSettings;
pub use state::{ChangeNotifier, State};
pub use store::{DebouncedStore, StorePaths, StoreStatus};
