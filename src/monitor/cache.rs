use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{GrabbitError, Result};
use crate::monitor::state::{HostJobState, JobState};

/// Tracks the last-known state of the jobs being monitored.
pub trait JobStatusCache {
    /// All tracked entries. Empty from construction, never absent.
    fn entries(&self) -> &[HostJobState];

    /// Puts the entry, returning the entry it replaces.
    ///
    /// A new `(location, job_id)` key inserts and returns `None`. An existing
    /// key with a different state is replaced. An existing key with the same
    /// state is left untouched, so persistent implementations can skip the
    /// write entirely.
    fn put(&mut self, entry: HostJobState) -> Result<Option<HostJobState>>;

    fn put_state(
        &mut self,
        location: Url,
        job_id: i64,
        state: JobState,
    ) -> Result<Option<HostJobState>> {
        self.put(HostJobState::new(location, job_id, state))
    }
}

/// A transient in-memory [`JobStatusCache`].
#[derive(Debug, Default)]
pub struct MemoryJobStatusCache {
    entries: Vec<HostJobState>,
}

impl MemoryJobStatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared put semantics: the previous entry, and whether the put inserted
    /// or changed anything.
    fn put_entry(&mut self, entry: HostJobState) -> (Option<HostJobState>, bool) {
        match self.entries.iter_mut().find(|e| e.same_key(&entry)) {
            None => {
                self.entries.push(entry);
                (None, true)
            }
            Some(existing) => {
                let previous = existing.clone();
                let changed = previous.state != entry.state;
                if changed {
                    *existing = entry;
                }
                (Some(previous), changed)
            }
        }
    }
}

impl JobStatusCache for MemoryJobStatusCache {
    fn entries(&self) -> &[HostJobState] {
        &self.entries
    }

    fn put(&mut self, entry: HostJobState) -> Result<Option<HostJobState>> {
        Ok(self.put_entry(entry).0)
    }
}

/// A [`JobStatusCache`] persisted to a text file, one `uri,jobId,STATE` line
/// per entry, so monitoring can resume after a restart.
///
/// Every insert or state change rewrites the whole file; no-op puts never
/// touch it. Explicitly NOT designed for concurrent writers or multiple
/// processes.
#[derive(Debug)]
pub struct FileJobStatusCache {
    file: PathBuf,
    inner: MemoryJobStatusCache,
}

impl FileJobStatusCache {
    /// Opens an existing cache file, reading every entry up front. A
    /// malformed line fails the whole read.
    pub fn open(file: impl AsRef<Path>) -> Result<Self> {
        let file = file.as_ref().to_path_buf();
        if !file.exists() {
            return Err(GrabbitError::FileNotFound(file));
        }
        let mut inner = MemoryJobStatusCache::new();
        inner.entries = read_entries(&file)?;
        Ok(Self { file, inner })
    }

    /// Creates an empty cache file, replacing any existing content.
    pub fn create_empty(file: impl AsRef<Path>) -> Result<Self> {
        let file = file.as_ref().to_path_buf();
        std::fs::write(&file, "")?;
        Ok(Self {
            file,
            inner: MemoryJobStatusCache::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    fn write_entries(&self) -> Result<()> {
        let mut content = String::new();
        for entry in self.inner.entries() {
            content.push_str(&format!(
                "{},{},{}\n",
                entry.location, entry.job_id, entry.state
            ));
        }
        std::fs::write(&self.file, content)?;
        Ok(())
    }
}

impl JobStatusCache for FileJobStatusCache {
    fn entries(&self) -> &[HostJobState] {
        self.inner.entries()
    }

    fn put(&mut self, entry: HostJobState) -> Result<Option<HostJobState>> {
        let (previous, changed) = self.inner.put_entry(entry);
        if changed {
            self.write_entries()?;
        }
        Ok(previous)
    }
}

fn read_entries(file: &Path) -> Result<Vec<HostJobState>> {
    let content = std::fs::read_to_string(file)?;
    let mut entries = Vec::new();
    for line in content.lines() {
        let malformed = || GrabbitError::CacheFormat {
            file: file.to_path_buf(),
            line: line.to_string(),
        };

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 3 {
            return Err(malformed());
        }
        let location = Url::parse(fields[0].trim()).map_err(|_| malformed())?;
        let job_id = fields[1].trim().parse().map_err(|_| malformed())?;
        let state = fields[2].trim().parse().map_err(|_| malformed())?;
        entries.push(HostJobState::new(location, job_id, state));
    }
    Ok(entries)
}
