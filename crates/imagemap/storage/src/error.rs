use std::path::PathBuf;

use thiserror::Error;

use crate::model::{Edition, MapId};

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

/// Errors raised while opening or mutating a world save.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("{path} is not a {edition} world: missing {marker}")]
    NotAWorld {
        path: PathBuf,
        edition: Edition,
        marker: &'static str,
    },

    #[error("could not tell which edition {0} belongs to")]
    UnknownEdition(PathBuf),

    #[error("world is already open: {0}")]
    AlreadyOpen(PathBuf),

    #[error("map {0} already exists")]
    AlreadyExists(MapId),

    #[error("no empty inventory slot for player {player}")]
    InsufficientSpace { player: String },

    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("map not found: {0}")]
    NotFound(MapId),

    #[error("invalid map id {id}: {reason}")]
    InvalidId { id: MapId, reason: String },

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("{count} items exceed the {capacity}-slot container limit")]
    ContainerOverflow { count: usize, capacity: usize },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage failure on {target}: {reason}")]
    Storage { target: String, reason: String },

    #[error("malformed NBT in {target}: {reason}")]
    Nbt { target: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl WorldError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> WorldError {
        let path = path.into();
        move |source| WorldError::Io { path, source }
    }

    pub(crate) fn nbt(target: impl Into<String>) -> impl FnOnce(String) -> WorldError {
        let target = target.into();
        move |reason| WorldError::Nbt { target, reason }
    }

    /// True for the underlying read/write faults (as opposed to logical
    /// outcomes such as a conflict or a full inventory).
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            WorldError::Io { .. } | WorldError::Storage { .. } | WorldError::Nbt { .. }
        )
    }
}
