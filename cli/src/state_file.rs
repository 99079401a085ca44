//! JSON state file backing the CLI's session store.
//!
//! The file holds a flat `{ key: value }` object and is rewritten whole on
//! every change through a sibling temp file and a rename. Once the last key
//! is removed the file itself is deleted, so `logout` leaves nothing behind.

#[cfg(test)]
#[path = "state_file_test.rs"]
mod state_file_test;

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use dsci_auth::AuthError;
use dsci_auth::session::KeyValueStorage;

type Items = BTreeMap<String, String>;

/// File-backed [`KeyValueStorage`].
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

fn storage_error(path: &Path, err: impl std::fmt::Display) -> AuthError {
    AuthError::Storage(format!("{}: {err}", path.display()))
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    fn load(&self) -> Result<Items, AuthError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Items::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| storage_error(&self.path, e)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Items::new()),
            Err(err) => Err(storage_error(&self.path, err)),
        }
    }

    fn persist(&self, items: &Items) -> Result<(), AuthError> {
        if items.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(err) if err.kind() != ErrorKind::NotFound => Err(storage_error(&self.path, err)),
                _ => Ok(()),
            };
        }

        let raw = serde_json::to_string_pretty(items).map_err(|e| storage_error(&self.path, e))?;
        let tmp = self.path.with_extension("tmp");
        write_private(&tmp, &raw)?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, e))
    }

    fn modify(&self, change: impl FnOnce(&mut Items)) -> Result<(), AuthError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut items = self.load()?;
        change(&mut items);
        self.persist(&items)
    }
}

/// Write `raw` to a file created owner-only, so the token is never readable
/// by others, not even between creation and the rename.
fn write_private(path: &Path, raw: &str) -> Result<(), AuthError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(|e| storage_error(path, e))?;
    file.write_all(raw.as_bytes()).map_err(|e| storage_error(path, e))?;
    // `mode` only applies on creation; a stale temp file keeps its old bits.
    restrict_permissions(path)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), AuthError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| storage_error(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), AuthError> {
    Ok(())
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AuthError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.modify(|items| {
            items.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), AuthError> {
        self.modify(|items| {
            items.remove(key);
        })
    }
}
