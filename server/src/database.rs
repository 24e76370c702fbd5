//! Whole-file JSON persistence.
//!
//! Every collection lives in one file holding a JSON array. Reads parse the
//! entire file and writes replace it, there is no incremental I/O and no
//! cache between requests.
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed data in {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Load-everything / save-everything access to one collection.
pub trait Store<T>: Send + Sync {
    fn load_all(&self) -> Result<Vec<T>, StoreError>;
    fn save_all(&self, items: &[T]) -> Result<(), StoreError>;
}

pub struct JsonFileStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    #[cfg(test)]
    fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Creates the file as an empty array when it does not exist yet.
    /// Existing files are left untouched, even if corrupt.
    pub fn ensure_exists(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        fs::write(&self.path, "[]").map_err(|source| self.io_error(source))?;
        info!("Created empty store at {}", self.path.display());

        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl<T> Store<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn load_all(&self) -> Result<Vec<T>, StoreError> {
        let data = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;

        serde_json::from_str(&data).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn save_all(&self, items: &[T]) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, data).map_err(|source| self.io_error(source))?;

        debug!("Wrote {} records to {}", items.len(), self.path.display());
        Ok(())
    }
}

/// A store plus the lock that serializes its read-modify-write cycles.
pub struct Collection<T> {
    store: Box<dyn Store<T>>,
    lock: Mutex<()>,
}

impl<T> Collection<T> {
    pub fn new(store: impl Store<T> + 'static) -> Self {
        Self {
            store: Box::new(store),
            lock: Mutex::new(()),
        }
    }

    pub fn read(&self) -> Result<Vec<T>, StoreError> {
        let _guard = self.guard();
        self.store.load_all()
    }

    /// Loads the collection, applies `f`, and saves the result if `f` succeeded.
    /// On error nothing is written.
    pub fn modify<R, E>(&self, f: impl FnOnce(&mut Vec<T>) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let _guard = self.guard();

        let mut items = self.store.load_all()?;
        let outcome = f(&mut items)?;
        self.store.save_all(&items)?;

        Ok(outcome)
    }

    // The guarded data is `()`, so a poisoned lock carries no broken state.
    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u32,
        body: String,
    }

    fn note(id: u32) -> Note {
        Note {
            id,
            body: format!("note {id}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let store: JsonFileStore<Note> = JsonFileStore::new(dir.path().join("absent.json"));

        assert!(matches!(store.load_all(), Err(StoreError::Io { .. })));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(&path, "{ not json").unwrap();
        let store: JsonFileStore<Note> = JsonFileStore::new(&path);

        assert!(matches!(store.load_all(), Err(StoreError::Malformed { .. })));
    }

    #[test]
    fn save_overwrites_whole_file_pretty_printed() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("notes.json"));
        store.ensure_exists().unwrap();

        store.save_all(&[note(1), note(2)]).unwrap();
        store.save_all(&[note(3)]).unwrap();

        assert_eq!(store.load_all().unwrap(), vec![note(3)]);
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  {"));
    }

    #[test]
    fn ensure_exists_creates_parent_and_keeps_existing() {
        let dir = tempdir().unwrap();
        let store: JsonFileStore<Note> = JsonFileStore::new(dir.path().join("data/notes.json"));

        store.ensure_exists().unwrap();
        assert_eq!(store.load_all().unwrap(), vec![]);

        fs::write(store.path(), "garbage").unwrap();
        store.ensure_exists().unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "garbage");
    }

    #[test]
    fn failed_modify_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("notes.json"));
        store.ensure_exists().unwrap();
        store.save_all(&[note(1)]).unwrap();
        let collection = Collection::new(store);

        let result: Result<(), StoreError> = collection.modify(|notes| {
            notes.clear();
            Err(StoreError::Encode(serde_json::from_str::<Note>("x").unwrap_err()))
        });

        assert!(result.is_err());
        assert_eq!(collection.read().unwrap(), vec![note(1)]);
    }

    #[test]
    fn concurrent_modifications_are_all_kept() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("notes.json"));
        store.ensure_exists().unwrap();
        let collection = Collection::new(store);

        std::thread::scope(|scope| {
            for id in 0..8 {
                let collection = &collection;
                scope.spawn(move || {
                    collection
                        .modify(|notes| {
                            notes.push(note(id));
                            Ok::<_, StoreError>(())
                        })
                        .unwrap();
                });
            }
        });

        assert_eq!(collection.read().unwrap().len(), 8);
    }
}
