/// Application name
pub const APP_NAME: &str = "RingVC";

/// Canonical data file, relative to the data directory
pub const DATA_FILE: &str = "data.txt";

/// Temporary file a save is written to before being renamed over `DATA_FILE`
pub const TEMP_DATA_FILE: &str = "data.tmp.txt";

/// Default data directory
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Minimum delay between a mutation and the save it schedules, so that a
/// burst of related edits lands in one snapshot
pub const SAVE_GRACE_MS: u64 = 10;

/// Default HTTP ingress port
pub const DEFAULT_HTTP_PORT: u16 = 8080;
