//! In-memory world adapter.
//!
//! Deterministic and test-friendly. It follows the same contract as the
//! on-disk adapters and can be told to fail specific writes, which lets
//! callers exercise partial-failure paths.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::{WorldError, WorldResult};
use crate::items::ItemFormat;
use crate::model::{Edition, MapId, MapRecord, PlayerRecord, LOCAL_PLAYER};
use crate::traits::WorldStorage;

/// In-memory world of a given edition.
#[derive(Debug)]
pub struct InMemoryWorld {
    edition: Edition,
    item_format: ItemFormat,
    maps: BTreeMap<MapId, MapRecord>,
    players: BTreeMap<String, PlayerRecord>,
    map_writes: usize,
    player_writes: usize,
    fail_map_writes_after: Option<usize>,
    fail_deletes: HashSet<MapId>,
}

impl InMemoryWorld {
    pub fn new(edition: Edition) -> Self {
        let item_format = match edition {
            Edition::Java => ItemFormat::JavaLegacy,
            Edition::Bedrock => ItemFormat::Bedrock,
        };
        Self {
            edition,
            item_format,
            maps: BTreeMap::new(),
            players: BTreeMap::new(),
            map_writes: 0,
            player_writes: 0,
            fail_map_writes_after: None,
            fail_deletes: HashSet::new(),
        }
    }

    /// Override the item layout (e.g. Java component items).
    pub fn with_item_format(mut self, item_format: ItemFormat) -> Self {
        self.item_format = item_format;
        self
    }

    /// Seed a player without counting it as a write.
    pub fn insert_player(&mut self, record: PlayerRecord) {
        self.players.insert(record.name.clone(), record);
    }

    /// Seed a map without counting it as a write.
    pub fn insert_map(&mut self, record: MapRecord) {
        self.maps.insert(record.id, record);
    }

    /// Let `n` more map writes succeed, then fail every following one.
    pub fn fail_map_writes_after(&mut self, n: usize) {
        self.fail_map_writes_after = Some(self.map_writes + n);
    }

    pub fn fail_delete_of(&mut self, id: MapId) {
        self.fail_deletes.insert(id);
    }

    /// Successful map writes so far.
    pub fn map_writes(&self) -> usize {
        self.map_writes
    }

    /// Successful player writes so far.
    pub fn player_writes(&self) -> usize {
        self.player_writes
    }

    fn injected(target: String) -> WorldError {
        WorldError::Storage {
            target,
            reason: "injected failure".to_string(),
        }
    }
}

impl WorldStorage for InMemoryWorld {
    fn edition(&self) -> Edition {
        self.edition
    }

    fn item_format(&self) -> ItemFormat {
        self.item_format
    }

    fn list_map_ids(&self) -> WorldResult<BTreeSet<MapId>> {
        Ok(self.maps.keys().copied().collect())
    }

    fn read_map(&self, id: MapId) -> WorldResult<MapRecord> {
        self.maps.get(&id).cloned().ok_or(WorldError::NotFound(id))
    }

    fn write_map(&mut self, record: &MapRecord) -> WorldResult<()> {
        record.validate(self.edition)?;
        if self
            .fail_map_writes_after
            .is_some_and(|limit| self.map_writes >= limit)
        {
            return Err(Self::injected(format!("map {}", record.id)));
        }
        self.maps.insert(record.id, record.clone());
        self.map_writes += 1;
        Ok(())
    }

    fn delete_map(&mut self, id: MapId) -> WorldResult<bool> {
        if self.fail_deletes.contains(&id) {
            return Err(Self::injected(format!("map {id}")));
        }
        Ok(self.maps.remove(&id).is_some())
    }

    fn map_exists(&self, id: MapId) -> WorldResult<bool> {
        Ok(self.maps.contains_key(&id))
    }

    fn list_players(&self) -> WorldResult<Vec<String>> {
        let mut names: Vec<String> = Vec::with_capacity(self.players.len());
        if self.players.contains_key(LOCAL_PLAYER) {
            names.push(LOCAL_PLAYER.to_string());
        }
        names.extend(
            self.players
                .keys()
                .filter(|name| name.as_str() != LOCAL_PLAYER)
                .cloned(),
        );
        Ok(names)
    }

    fn read_player(&self, name: &str) -> WorldResult<PlayerRecord> {
        self.players
            .get(name)
            .cloned()
            .ok_or_else(|| WorldError::PlayerNotFound(name.to_string()))
    }

    fn write_player(&mut self, record: &PlayerRecord) -> WorldResult<()> {
        let slot = self
            .players
            .get_mut(&record.name)
            .ok_or_else(|| WorldError::PlayerNotFound(record.name.clone()))?;
        *slot = record.clone();
        self.player_writes += 1;
        Ok(())
    }
}
