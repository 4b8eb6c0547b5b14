//! Schedule and checkpoint persistence.
//!
//! [`JsonFileStore`] keeps `schedules.json` and `worker_state.json` in one
//! directory. Every write happens under an exclusive lock on a sibling lock
//! file and replaces the target atomically, so concurrent CLI runs never
//! lose an upsert and a crash never leaves a half-written file.

use crate::{Error, Result, Schedule, WorkerState};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Storage collaborator for schedules and the worker checkpoint
///
/// Each call is a single-record transaction from the caller's view.
pub trait ScheduleStore {
    /// Every schedule, active or not
    fn load_schedules(&self) -> Result<Vec<Schedule>>;

    fn load_active_schedules(&self) -> Result<Vec<Schedule>> {
        Ok(self
            .load_schedules()?
            .into_iter()
            .filter(|s| s.active)
            .collect())
    }

    /// Insert or replace by id
    fn save(&mut self, schedule: &Schedule) -> Result<Schedule>;

    /// `Ok(None)` when no checkpoint exists or it cannot be read
    fn load_worker_state(&self) -> Result<Option<WorkerState>>;

    fn save_worker_state(&mut self, state: &WorkerState) -> Result<()>;
}

/// In-memory store for tests and embedding
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pub schedules: Vec<Schedule>,
    pub worker_state: Option<WorkerState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScheduleStore for MemoryStore {
    fn load_schedules(&self) -> Result<Vec<Schedule>> {
        Ok(self.schedules.clone())
    }

    fn save(&mut self, schedule: &Schedule) -> Result<Schedule> {
        upsert(&mut self.schedules, schedule);
        Ok(schedule.clone())
    }

    fn load_worker_state(&self) -> Result<Option<WorkerState>> {
        Ok(self.worker_state)
    }

    fn save_worker_state(&mut self, state: &WorkerState) -> Result<()> {
        self.worker_state = Some(*state);
        Ok(())
    }
}

fn upsert(schedules: &mut Vec<Schedule>, schedule: &Schedule) {
    match schedules.iter_mut().find(|s| s.id == schedule.id) {
        Some(existing) => *existing = schedule.clone(),
        None => schedules.push(schedule.clone()),
    }
}

/// JSON files in a data directory
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn schedules_path(&self) -> PathBuf {
        self.dir.join("schedules.json")
    }

    pub fn worker_state_path(&self) -> PathBuf {
        self.dir.join("worker_state.json")
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(".store.lock")
    }

    /// Take the store-wide writer lock; released when the file is dropped
    fn lock(&self) -> Result<File> {
        std::fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.lock_path())?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn read_schedules(&self) -> Result<Vec<Schedule>> {
        let path = self.schedules_path();
        if !path.exists() {
            tracing::debug!("No schedules file at {:?}, starting empty", path);
            return Ok(Vec::new());
        }

        let mut contents = String::new();
        File::open(&path)?.read_to_string(&mut contents)?;

        // A corrupt schedule file is surfaced, not replaced: defaulting would
        // silently drop every user's cycle
        serde_json::from_str(&contents)
            .map_err(|e| Error::Store(format!("Unreadable schedules file {:?}: {}", path, e)))
    }

    /// Atomically replace `path` with `contents`
    ///
    /// 1. Write to a temp file in the same directory
    /// 2. Sync to disk
    /// 3. Rename over the original
    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        let parent = path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl ScheduleStore for JsonFileStore {
    fn load_schedules(&self) -> Result<Vec<Schedule>> {
        let lock = self.lock()?;
        let schedules = self.read_schedules();
        lock.unlock()?;
        schedules
    }

    fn save(&mut self, schedule: &Schedule) -> Result<Schedule> {
        let lock = self.lock()?;

        let mut schedules = self.read_schedules()?;
        upsert(&mut schedules, schedule);
        self.write_atomic(&self.schedules_path(), &serde_json::to_string_pretty(&schedules)?)?;

        lock.unlock()?;
        tracing::debug!("Saved schedule {} ({})", schedule.id, schedule.peptide_name);
        Ok(schedule.clone())
    }

    fn load_worker_state(&self) -> Result<Option<WorkerState>> {
        let path = self.worker_state_path();
        if !path.exists() {
            tracing::info!("No worker state found at {:?}", path);
            return Ok(None);
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(
                    "Unable to read worker state {:?}: {}. Treating as first run.",
                    path,
                    e
                );
                return Ok(None);
            }
        };

        match serde_json::from_str::<WorkerState>(&contents) {
            Ok(state) => {
                tracing::debug!("Loaded worker state: last run at {}", state.last_run_at);
                Ok(Some(state))
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse worker state {:?}: {}. Treating as first run.",
                    path,
                    e
                );
                Ok(None)
            }
        }
    }

    fn save_worker_state(&mut self, state: &WorkerState) -> Result<()> {
        let lock = self.lock()?;
        self.write_atomic(&self.worker_state_path(), &serde_json::to_string(state)?)?;
        lock.unlock()?;

        tracing::debug!("Advanced checkpoint to {}", state.last_run_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schedule_line;
    use chrono::{DateTime, Utc};

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn schedule(text: &str, owner: i64) -> Schedule {
        Schedule::from_intent(
            parse_schedule_line(text).unwrap(),
            owner,
            at("2026-01-05T08:00:00Z"),
        )
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(temp_dir.path());

        let first = schedule("GHK-Cu 1.5mg daily for 5 weeks", 1);
        let second = schedule("Thymosin 1.2mg twice weekly for 10 weeks", 2);
        store.save(&first).unwrap();
        store.save(&second).unwrap();

        let loaded = store.load_schedules().unwrap();
        assert_eq!(loaded, vec![first, second]);
    }

    #[test]
    fn test_save_replaces_by_id() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(temp_dir.path());

        let mut s = schedule("GHK-Cu 1.5mg daily for 5 weeks", 1);
        store.save(&s).unwrap();
        s.active = false;
        store.save(&s).unwrap();

        assert_eq!(store.load_schedules().unwrap().len(), 1);
        assert!(store.load_active_schedules().unwrap().is_empty());
    }

    #[test]
    fn test_missing_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("fresh"));

        assert!(store.load_schedules().unwrap().is_empty());
        assert_eq!(store.load_worker_state().unwrap(), None);
    }

    #[test]
    fn test_worker_state_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(temp_dir.path());

        let state = WorkerState {
            last_run_at: at("2026-01-07T08:00:00Z"),
        };
        store.save_worker_state(&state).unwrap();

        assert_eq!(store.load_worker_state().unwrap(), Some(state));
    }

    #[test]
    fn test_corrupted_worker_state_is_first_run() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path());
        std::fs::write(store.worker_state_path(), "{ invalid json }").unwrap();

        assert_eq!(store.load_worker_state().unwrap(), None);
    }

    #[test]
    fn test_corrupted_schedules_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(temp_dir.path());
        std::fs::write(store.schedules_path(), "[{ truncated").unwrap();

        assert!(matches!(store.load_schedules(), Err(Error::Store(_))));
        assert!(store
            .save(&schedule("GHK-Cu 1mg daily for 5 days", 1))
            .is_err());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(temp_dir.path());
        store
            .save(&schedule("GHK-Cu 1mg daily for 5 days", 1))
            .unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .filter(|name| name != "schedules.json" && name != ".store.lock")
            .collect();
        assert!(extras.is_empty(), "unexpected files: {:?}", extras);
    }

    #[test]
    fn test_memory_store_upsert() {
        let mut store = MemoryStore::new();
        let mut s = schedule("GHK-Cu 1mg daily for 5 days", 1);
        store.save(&s).unwrap();
        s.completed_at = s.start_date.succ_opt();
        store.save(&s).unwrap();

        assert_eq!(store.load_schedules().unwrap(), vec![s]);
    }
}
