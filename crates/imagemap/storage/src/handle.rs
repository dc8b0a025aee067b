use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::bedrock::BedrockWorld;
use crate::config::StorageOptions;
use crate::error::WorldResult;
use crate::items::ItemFormat;
use crate::java::JavaWorld;
use crate::lease::WorldLease;
use crate::model::{Edition, MapId, MapRecord, PlayerRecord};
use crate::traits::WorldStorage;

/// An open world: the edition adapter plus the claim on its directory.
///
/// Only one handle per world directory can exist in a process at a time.
/// Dropping the handle releases the world.
pub struct WorldHandle {
    storage: Box<dyn WorldStorage>,
    path: Option<PathBuf>,
    // Declared last so the adapter is closed before the claim is released.
    _lease: Option<WorldLease>,
}

impl WorldHandle {
    /// Open the world at `path` as `edition`.
    ///
    /// Fails with `NotAWorld` if the edition's marker is missing and with
    /// `AlreadyOpen` if this process already holds the world.
    pub fn open(path: &Path, edition: Edition, options: &StorageOptions) -> WorldResult<Self> {
        let lease = WorldLease::acquire(path)?;
        let storage: Box<dyn WorldStorage> = match edition {
            Edition::Java => Box::new(JavaWorld::open(path, options)?),
            Edition::Bedrock => Box::new(BedrockWorld::open(path, options)?),
        };
        info!(path = %path.display(), edition = %edition, "World opened");
        Ok(Self {
            storage,
            path: Some(path.to_path_buf()),
            _lease: Some(lease),
        })
    }

    /// Open the world at `path`, probing its edition first.
    pub fn open_detected(path: &Path, options: &StorageOptions) -> WorldResult<Self> {
        let edition = Edition::detect(path)?;
        Self::open(path, edition, options)
    }

    /// Wrap an already-constructed adapter, e.g. an in-memory world.
    pub fn from_storage(storage: impl WorldStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            path: None,
            _lease: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl WorldStorage for WorldHandle {
    fn edition(&self) -> Edition {
        self.storage.edition()
    }

    fn item_format(&self) -> ItemFormat {
        self.storage.item_format()
    }

    fn list_map_ids(&self) -> WorldResult<BTreeSet<MapId>> {
        self.storage.list_map_ids()
    }

    fn read_map(&self, id: MapId) -> WorldResult<MapRecord> {
        self.storage.read_map(id)
    }

    fn write_map(&mut self, record: &MapRecord) -> WorldResult<()> {
        self.storage.write_map(record)
    }

    fn delete_map(&mut self, id: MapId) -> WorldResult<bool> {
        self.storage.delete_map(id)
    }

    fn map_exists(&self, id: MapId) -> WorldResult<bool> {
        self.storage.map_exists(id)
    }

    fn list_players(&self) -> WorldResult<Vec<String>> {
        self.storage.list_players()
    }

    fn read_player(&self, name: &str) -> WorldResult<PlayerRecord> {
        self.storage.read_player(name)
    }

    fn write_player(&mut self, record: &PlayerRecord) -> WorldResult<()> {
        self.storage.write_player(record)
    }
}

impl Drop for WorldHandle {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            info!(path = %path.display(), "World closed");
        }
    }
}
