use std::collections::BTreeSet;

use crate::error::WorldResult;
use crate::items::ItemFormat;
use crate::model::{Edition, MapId, MapRecord, PlayerRecord};

/// Uniform access to the maps and players of one world save.
///
/// Writes are unconditional at this layer; conflict handling belongs to the
/// caller. Every write is durable when the call returns and replaces the
/// record as a whole.
pub trait WorldStorage {
    fn edition(&self) -> Edition;

    /// Layout used for items written into this world's inventories.
    fn item_format(&self) -> ItemFormat;

    fn list_map_ids(&self) -> WorldResult<BTreeSet<MapId>>;

    /// Fails with `NotFound` when no map has this ID.
    fn read_map(&self, id: MapId) -> WorldResult<MapRecord>;

    fn write_map(&mut self, record: &MapRecord) -> WorldResult<()>;

    /// Remove a map. Returns whether a record was actually removed.
    fn delete_map(&mut self, id: MapId) -> WorldResult<bool>;

    fn map_exists(&self, id: MapId) -> WorldResult<bool> {
        Ok(self.list_map_ids()?.contains(&id))
    }

    /// Player names usable with [`WorldStorage::read_player`], local player first.
    fn list_players(&self) -> WorldResult<Vec<String>>;

    /// Fails with `PlayerNotFound` for unknown names.
    fn read_player(&self, name: &str) -> WorldResult<PlayerRecord>;

    fn write_player(&mut self, record: &PlayerRecord) -> WorldResult<()>;
}
