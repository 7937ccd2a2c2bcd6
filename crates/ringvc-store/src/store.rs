//! Debounced, atomic persistence of the model.
//!
//! Mutations only mark the store dirty. A save is scheduled on the first
//! mark after a save started, no sooner than one cooldown after that start,
//! and never runs concurrently with another save. Each save writes the whole
//! model to a temporary file and renames it over the canonical one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use ringvc_shared::constants::{DATA_FILE, SAVE_GRACE_MS, TEMP_DATA_FILE};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::error::{Result, StoreError};
use crate::state::{ChangeNotifier, State};

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Where the data file and its temporary sibling live.
#[derive(Debug, Clone)]
pub struct StorePaths {
    dir: PathBuf,
    canonical: PathBuf,
    temp: PathBuf,
}

impl StorePaths {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            canonical: dir.join(DATA_FILE),
            temp: dir.join(TEMP_DATA_FILE),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn canonical(&self) -> &Path {
        &self.canonical
    }

    pub fn temp(&self) -> &Path {
        &self.temp
    }

    fn quarantine(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        self.dir.join(format!("data.corrupt-{stamp}.txt"))
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Pure bookkeeping for when the next save may start.
#[derive(Debug)]
struct SaveSchedule {
    cooldown: Duration,
    dirty: bool,
    last_start: Instant,
    due: Option<Instant>,
}

impl SaveSchedule {
    fn new(cooldown: Duration, now: Instant) -> Self {
        Self {
            cooldown,
            dirty: false,
            last_start: now,
            due: None,
        }
    }

    fn delay(&self, now: Instant) -> Duration {
        let since_last = now.saturating_duration_since(self.last_start);
        self.cooldown
            .saturating_sub(since_last)
            .max(Duration::from_millis(SAVE_GRACE_MS))
    }

    /// Records a mutation. Returns the new due time when this mark is the
    /// one that scheduled a save.
    fn mark(&mut self, now: Instant) -> Option<Instant> {
        if self.dirty {
            return None;
        }
        self.dirty = true;
        let due = now + self.delay(now);
        self.due = Some(due);
        Some(due)
    }

    /// A save is starting; it captures every mutation so far.
    fn begin(&mut self, now: Instant) {
        self.dirty = false;
        self.due = None;
        self.last_start = now;
    }

    /// The save that last began did not make it to disk.
    fn failed(&mut self, now: Instant) -> Instant {
        self.dirty = true;
        let due = now + self.delay(now);
        self.due = Some(due);
        due
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn due(&self) -> Option<Instant> {
        self.due
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Snapshot of the store's persistence state.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub dirty: bool,
    pub saving: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub saves: u64,
}

pub struct DebouncedStore {
    paths: StorePaths,
    schedule: SaveSchedule,
    changes: mpsc::UnboundedReceiver<()>,
    in_flight: Option<JoinHandle<Result<()>>>,
    last_saved_at: Option<DateTime<Utc>>,
    saves: u64,
}

impl DebouncedStore {
    /// Loads the model from disk and wires its change signal to the store.
    ///
    /// A missing or empty data file starts from an empty model that is saved
    /// right away. A file that is not valid JSON is moved aside first.
    pub async fn open(paths: StorePaths, cooldown: Duration) -> Result<(Self, State)> {
        tokio::fs::create_dir_all(paths.dir()).await?;

        let mut fresh = true;
        let mut state = match tokio::fs::read_to_string(paths.canonical()).await {
            Ok(text) if !text.trim().is_empty() => match codec::decode(&text) {
                Ok(state) => {
                    fresh = false;
                    info!(
                        path = %paths.canonical().display(),
                        users = state.users().count(),
                        channels = state.rosters().count(),
                        "Data restored"
                    );
                    state
                }
                Err(e) => {
                    let aside = paths.quarantine();
                    warn!(error = %e, moved_to = %aside.display(), "Data file is unreadable, starting empty");
                    tokio::fs::rename(paths.canonical(), &aside).await?;
                    State::default()
                }
            },
            Ok(_) => {
                info!("Data file is empty, starting from defaults");
                State::default()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %paths.canonical().display(), "No data file yet, starting from defaults");
                State::default()
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                let aside = paths.quarantine();
                warn!(error = %e, moved_to = %aside.display(), "Data file is unreadable, starting empty");
                tokio::fs::rename(paths.canonical(), &aside).await?;
                State::default()
            }
            Err(e) => return Err(e.into()),
        };

        let (notifier, changes) = ChangeNotifier::channel();
        state.set_notifier(notifier);

        let mut store = Self {
            paths,
            schedule: SaveSchedule::new(cooldown, Instant::now()),
            changes,
            in_flight: None,
            last_saved_at: None,
            saves: 0,
        };

        if fresh {
            if let Err(e) = store.save_now(&state).await {
                error!(error = %e, "Initial save failed");
            }
        }

        Ok((store, state))
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            dirty: self.schedule.is_dirty(),
            saving: self.in_flight.is_some(),
            last_saved_at: self.last_saved_at,
            saves: self.saves,
        }
    }

    /// Drives the schedule one step: takes a mutation mark, starts a due
    /// save, or collects a finished one. Pending forever when there is
    /// nothing to do, so it is meant to sit in a `select!` loop.
    ///
    /// Cancel safe: every awaited branch can be dropped without losing work.
    pub async fn tick(&mut self, state: &State) {
        let due = self.schedule.due().filter(|_| self.in_flight.is_none());

        tokio::select! {
            Some(()) = self.changes.recv() => self.mark(),
            _ = wait_until(due) => self.begin_save(state),
            result = join_save(&mut self.in_flight) => self.finish_save(result),
        }
    }

    /// Saves immediately, after any in-flight save has finished.
    pub async fn save_now(&mut self, state: &State) -> Result<()> {
        self.await_in_flight().await;

        self.schedule.begin(Instant::now());
        debug!("Saving");
        let result = match codec::encode(state) {
            Ok(text) => write_atomically(&self.paths, text).await,
            Err(e) => Err(e),
        };
        self.record(&result);
        result
    }

    /// Flushes before exit: takes any pending marks, waits for the in-flight
    /// save, then saves once more if anything is still unsaved.
    pub async fn shutdown(&mut self, state: &State) -> Result<()> {
        while self.changes.try_recv().is_ok() {
            self.mark();
        }
        self.await_in_flight().await;

        if !self.schedule.is_dirty() {
            debug!("Nothing to flush");
            return Ok(());
        }
        info!("Flushing unsaved changes");
        self.save_now(state).await
    }

    fn mark(&mut self) {
        let now = Instant::now();
        if let Some(due) = self.schedule.mark(now) {
            debug!(in_ms = (due - now).as_millis() as u64, "Save scheduled");
        }
    }

    fn begin_save(&mut self, state: &State) {
        self.schedule.begin(Instant::now());
        match codec::encode(state) {
            Ok(text) => {
                debug!(bytes = text.len(), "Saving");
                let paths = self.paths.clone();
                self.in_flight = Some(tokio::spawn(async move {
                    write_atomically(&paths, text).await
                }));
            }
            Err(e) => self.record(&Err(e)),
        }
    }

    fn finish_save(&mut self, result: Result<()>) {
        self.in_flight = None;
        self.record(&result);
    }

    async fn await_in_flight(&mut self) {
        if self.in_flight.is_some() {
            let result = join_save(&mut self.in_flight).await;
            self.finish_save(result);
        }
    }

    fn record(&mut self, result: &Result<()>) {
        match result {
            Ok(()) => {
                self.saves += 1;
                self.last_saved_at = Some(Utc::now());
                info!(path = %self.paths.canonical().display(), "Data saved");
            }
            Err(e) => {
                let retry_at = self.schedule.failed(Instant::now());
                let retry_in = retry_at.saturating_duration_since(Instant::now());
                error!(error = %e, retry_in_ms = retry_in.as_millis() as u64, "Save failed");
            }
        }
    }
}

async fn wait_until(due: Option<Instant>) {
    match due {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn join_save(task: &mut Option<JoinHandle<Result<()>>>) -> Result<()> {
    match task {
        Some(handle) => match handle.await {
            Ok(result) => result,
            Err(e) => Err(StoreError::Task(e.to_string())),
        },
        None => std::future::pending().await,
    }
}

/// Writes the temporary file, then renames it over the canonical one. A
/// failed rename leaves the previous canonical file untouched.
async fn write_atomically(paths: &StorePaths, contents: String) -> Result<()> {
    tokio::fs::write(paths.temp(), contents)
        .await
        .map_err(|source| StoreError::Write {
            path: paths.temp().to_path_buf(),
            source,
        })?;
    tokio::fs::rename(paths.temp(), paths.canonical())
        .await
        .map_err(|source| StoreError::Rename {
            path: paths.canonical().to_path_buf(),
            source,
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringvc_shared::{Mode, UserId};
    use tempfile::TempDir;

    #[test]
    fn test_mutations_within_cooldown_coalesce() {
        let start = Instant::now();
        let mut schedule = SaveSchedule::new(Duration::from_secs(5), start);

        let first = start + Duration::from_secs(1);
        let due = schedule.mark(first).unwrap();
        assert!(schedule.mark(start + Duration::from_secs(2)).is_none());

        assert!(due - first >= Duration::from_secs(4));
        assert_eq!(due, start + Duration::from_secs(5));
        assert_eq!(schedule.due(), Some(due));
    }

    #[test]
    fn test_mark_after_cooldown_uses_grace_delay() {
        let start = Instant::now();
        let mut schedule = SaveSchedule::new(Duration::from_secs(5), start);

        let late = start + Duration::from_secs(60);
        let due = schedule.mark(late).unwrap();
        assert_eq!(due - late, Duration::from_millis(SAVE_GRACE_MS));
    }

    #[test]
    fn test_failed_save_retries_one_cooldown_after_start() {
        let start = Instant::now();
        let mut schedule = SaveSchedule::new(Duration::from_secs(5), start);

        schedule.mark(start);
        let began = start + Duration::from_secs(5);
        schedule.begin(began);
        assert!(!schedule.is_dirty());

        let due = schedule.failed(began + Duration::from_millis(100));
        assert!(schedule.is_dirty());
        assert_eq!(due, began + Duration::from_secs(5));
        // Further mutations do not move the retry.
        assert!(schedule.mark(began + Duration::from_secs(1)).is_none());
    }

    async fn read_back(paths: &StorePaths) -> State {
        let text = tokio::fs::read_to_string(paths.canonical()).await.unwrap();
        codec::decode(&text).unwrap()
    }

    #[tokio::test]
    async fn test_open_missing_file_saves_immediately() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(dir.path().join("data"));

        let (store, state) = DebouncedStore::open(paths.clone(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(state.users().count(), 0);
        assert_eq!(store.status().saves, 1);
        assert!(!store.status().dirty);
        assert!(!paths.temp().exists());
        assert_eq!(read_back(&paths).await.users().count(), 0);
    }

    #[tokio::test]
    async fn test_open_empty_file_resets_to_defaults() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(dir.path());
        tokio::fs::write(paths.canonical(), "").await.unwrap();

        let (store, _state) = DebouncedStore::open(paths.clone(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(store.status().saves, 1);
        let text = tokio::fs::read_to_string(paths.canonical()).await.unwrap();
        assert!(!text.is_empty());
    }

    #[tokio::test]
    async fn test_open_restores_without_marking_dirty() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(dir.path());

        let mut seed = State::detached();
        seed.edit_user(&UserId::from("1"), |s| s.set_mode(Mode::Stealth));
        tokio::fs::write(paths.canonical(), codec::encode(&seed).unwrap())
            .await
            .unwrap();

        let (store, state) = DebouncedStore::open(paths, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(
            state.user(&UserId::from("1")).map(|s| s.mode()),
            Some(Mode::Stealth)
        );
        let status = store.status();
        assert!(!status.dirty);
        assert_eq!(status.saves, 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_moved_aside() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(dir.path());
        tokio::fs::write(paths.canonical(), "{oops").await.unwrap();

        let (_store, state) = DebouncedStore::open(paths.clone(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(state.users().count(), 0);
        let kept_aside = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_name().to_string_lossy().starts_with("data.corrupt-"));
        assert!(kept_aside);
        assert_eq!(read_back(&paths).await.users().count(), 0);
    }

    #[tokio::test]
    async fn test_mutation_is_saved_after_cooldown() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(dir.path());
        let (mut store, mut state) = DebouncedStore::open(paths.clone(), Duration::from_millis(50))
            .await
            .unwrap();

        state.edit_user(&UserId::from("1"), |s| s.set_mode(Mode::Auto));
        state.edit_user(&UserId::from("2"), |s| s.set_mode(Mode::Stealth));

        tokio::time::timeout(Duration::from_secs(5), async {
            while store.status().saves < 2 {
                store.tick(&state).await;
            }
        })
        .await
        .expect("save did not happen");

        assert_eq!(store.status().saves, 2);
        assert!(!store.status().dirty);
        assert_eq!(read_back(&paths).await.users().count(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_pending_changes() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(dir.path());
        let (mut store, mut state) = DebouncedStore::open(paths.clone(), Duration::from_secs(3600))
            .await
            .unwrap();

        state.edit_user(&UserId::from("1"), |s| s.set_mode(Mode::Stealth));
        store.shutdown(&state).await.unwrap();

        assert!(!store.status().dirty);
        let restored = read_back(&paths).await;
        assert_eq!(
            restored.user(&UserId::from("1")).map(|s| s.mode()),
            Some(Mode::Stealth)
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_store_dirty() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(dir.path());
        let (mut store, mut state) = DebouncedStore::open(paths.clone(), Duration::from_secs(3600))
            .await
            .unwrap();
        let before = tokio::fs::read_to_string(paths.canonical()).await.unwrap();

        // A directory where the temporary file should go makes the write fail.
        tokio::fs::create_dir(paths.temp()).await.unwrap();
        state.edit_user(&UserId::from("1"), |s| s.set_mode(Mode::Stealth));

        let err = store.shutdown(&state).await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(store.status().dirty);

        let after = tokio::fs::read_to_string(paths.canonical()).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_coalesces_mutations_into_one_save() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(dir.path());
        let (mut store, mut state) = DebouncedStore::open(paths.clone(), Duration::from_secs(2))
            .await
            .unwrap();
        let opened = Instant::now();

        state.edit_user(&UserId::from("1"), |s| s.set_mode(Mode::Stealth));
        store.tick(&state).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        state.edit_user(&UserId::from("2"), |s| s.set_mode(Mode::Auto));
        store.tick(&state).await;
        assert!(store.status().dirty);

        while store.status().saves < 2 {
            store.tick(&state).await;
        }
        assert!(opened.elapsed() >= Duration::from_millis(1500));
        assert!(!store.status().dirty);
        assert_eq!(read_back(&paths).await.users().count(), 2);

        // Nothing left to do: the next tick never completes.
        let idle = tokio::time::timeout(Duration::from_secs(10), store.tick(&state)).await;
        assert!(idle.is_err());
        assert_eq!(store.status().saves, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_is_retried_without_new_mutation() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(dir.path());
        let (mut store, mut state) = DebouncedStore::open(paths.clone(), Duration::from_secs(1))
            .await
            .unwrap();

        tokio::fs::create_dir(paths.temp()).await.unwrap();
        state.edit_user(&UserId::from("1"), |s| s.set_mode(Mode::Stealth));

        // Take the mark, start the save, collect its failure.
        store.tick(&state).await;
        store.tick(&state).await;
        let failed_start = Instant::now();
        store.tick(&state).await;
        let status = store.status();
        assert!(status.dirty);
        assert!(!status.saving);
        assert_eq!(status.saves, 1);

        tokio::fs::remove_dir(paths.temp()).await.unwrap();
        while store.status().saves < 2 {
            store.tick(&state).await;
        }
        assert!(failed_start.elapsed() >= Duration::from_secs(1));
        assert!(!store.status().dirty);
        let restored = read_back(&paths).await;
        assert_eq!(
            restored.user(&UserId::from("1")).map(|s| s.mode()),
            Some(Mode::Stealth)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_rename_keeps_canonical_path() {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(dir.path());
        let (mut store, mut state) = DebouncedStore::open(paths.clone(), Duration::from_millis(100))
            .await
            .unwrap();

        // A non-empty directory cannot be replaced by a rename.
        tokio::fs::remove_file(paths.canonical()).await.unwrap();
        tokio::fs::create_dir(paths.canonical()).await.unwrap();
        let keep = paths.canonical().join("keep.txt");
        tokio::fs::write(&keep, "previous").await.unwrap();

        state.edit_user(&UserId::from("1"), |s| s.set_mode(Mode::Stealth));
        store.tick(&state).await;
        store.tick(&state).await;
        store.tick(&state).await;
        assert!(store.status().dirty);
        assert_eq!(store.status().saves, 1);
        assert_eq!(tokio::fs::read_to_string(&keep).await.unwrap(), "previous");

        let err = store.shutdown(&state).await.unwrap_err();
        assert!(matches!(err, StoreError::Rename { .. }));
        assert!(store.status().dirty);
        assert!(paths.canonical().is_dir());
        assert_eq!(tokio::fs::read_to_string(&keep).await.unwrap(), "previous");
    }
}
