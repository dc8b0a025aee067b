use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};

use tracing::debug;

use crate::error::{WorldError, WorldResult};

static OPEN_WORLDS: LazyLock<Mutex<HashSet<PathBuf>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Process-wide claim on a world directory, released on drop.
#[derive(Debug)]
pub struct WorldLease {
    path: PathBuf,
}

impl WorldLease {
    /// Claim `path`; fails with `AlreadyOpen` while another lease holds it.
    pub fn acquire(path: &Path) -> WorldResult<Self> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut open = OPEN_WORLDS.lock().unwrap_or_else(PoisonError::into_inner);
        if !open.insert(path.clone()) {
            return Err(WorldError::AlreadyOpen(path));
        }
        debug!(path = %path.display(), "Acquired world lease");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorldLease {
    fn drop(&mut self) {
        OPEN_WORLDS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
        debug!(path = %self.path.display(), "Released world lease");
    }
}
