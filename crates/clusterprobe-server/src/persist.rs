//! Persistence of the registered probe URI set.
//!
//! The probing core keeps no state across restarts; this store remembers
//! which URIs were registered so the server can replay them at startup. Save
//! failures are logged and tolerated, the live registry stays authoritative.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedRegistrations {
    uris: Vec<String>,
}

/// Owned set of registered URIs mirrored to a JSON file.
pub struct RegistrationStore {
    path: PathBuf,
    uris: Mutex<BTreeSet<String>>,
}

impl RegistrationStore {
    /// Open the store, reading any previously saved registrations. A missing
    /// or unreadable file starts the store empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let uris = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<SavedRegistrations>(&contents) {
                Ok(saved) => saved.uris.into_iter().collect(),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "ignoring unreadable registration file");
                    BTreeSet::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no saved registrations");
                BTreeSet::new()
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read registration file");
                BTreeSet::new()
            }
        };

        Self {
            path,
            uris: Mutex::new(uris),
        }
    }

    /// Current URI set, sorted.
    pub fn uris(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    pub fn insert(&self, uri: &str) {
        let mut uris = self.lock();
        if uris.insert(uri.to_string()) {
            self.save(&uris);
        }
    }

    pub fn remove(&self, uri: &str) {
        let mut uris = self.lock();
        if uris.remove(uri) {
            self.save(&uris);
        }
    }

    fn save(&self, uris: &BTreeSet<String>) {
        let saved = SavedRegistrations {
            uris: uris.iter().cloned().collect(),
        };

        let result = serde_json::to_string_pretty(&saved)
            .map_err(std::io::Error::other)
            .and_then(|contents| std::fs::write(&self.path, contents));

        if let Err(err) = result {
            warn!(path = %self.path.display(), error = %err, "failed to save registrations");
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.uris.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
