//! Placing committed maps into a player's inventory inside chest items.

use imagemap_storage::{InventoryItem, MapId, WorldError, WorldResult, WorldStorage, CHEST_SLOTS};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Appearance of the chests the engine builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChestOptions {
    /// Custom display name; the game's default name when unset.
    pub name: Option<String>,
}

/// Outcome of [`add_containers`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChestReport {
    /// Inventory slot and contents of each chest placed.
    pub placed: Vec<(usize, Vec<MapId>)>,
    /// Groups that did not fit in the inventory.
    pub unplaced: Vec<Vec<MapId>>,
}

impl ChestReport {
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }
}

/// Players that can receive chests, local player first.
pub fn destinations(world: &dyn WorldStorage) -> WorldResult<Vec<String>> {
    world.list_players()
}

/// Put one chest holding `map_ids` into the first empty slot of `player`.
///
/// Every ID must belong to a committed map. Fails with `InsufficientSpace`
/// when the inventory is full; the player record is not written in that
/// case. Returns the slot used.
pub fn add_container(
    world: &mut dyn WorldStorage,
    map_ids: &[MapId],
    player: &str,
    options: &ChestOptions,
) -> WorldResult<usize> {
    if map_ids.len() > CHEST_SLOTS {
        return Err(WorldError::ContainerOverflow {
            count: map_ids.len(),
            capacity: CHEST_SLOTS,
        });
    }
    ensure_committed(world, map_ids)?;

    let mut record = world.read_player(player)?;
    let slot = record
        .first_empty_slot()
        .ok_or_else(|| WorldError::InsufficientSpace {
            player: player.to_string(),
        })?;

    record.slots[slot] = Some(build_chest(world, map_ids, options)?);
    world.write_player(&record)?;
    info!(player, slot, maps = map_ids.len(), "Placed map chest");
    Ok(slot)
}

/// Spread `map_ids` over as many chests as needed and place as many as fit,
/// in one player write.
///
/// Fails with `InsufficientSpace`, writing nothing, only when not even the
/// first chest fits.
pub fn add_containers(
    world: &mut dyn WorldStorage,
    map_ids: &[MapId],
    player: &str,
    options: &ChestOptions,
) -> WorldResult<ChestReport> {
    ensure_committed(world, map_ids)?;
    let mut record = world.read_player(player)?;
    let mut report = ChestReport::default();

    for group in map_ids.chunks(CHEST_SLOTS) {
        match record.first_empty_slot() {
            Some(slot) => {
                record.slots[slot] = Some(build_chest(world, group, options)?);
                report.placed.push((slot, group.to_vec()));
            }
            None => report.unplaced.push(group.to_vec()),
        }
    }

    if report.placed.is_empty() {
        if report.unplaced.is_empty() {
            return Ok(report);
        }
        return Err(WorldError::InsufficientSpace {
            player: player.to_string(),
        });
    }

    world.write_player(&record)?;
    info!(
        player,
        chests = report.placed.len(),
        unplaced = report.unplaced.len(),
        "Placed map chests"
    );
    Ok(report)
}

fn ensure_committed(world: &dyn WorldStorage, map_ids: &[MapId]) -> WorldResult<()> {
    let existing = world.list_map_ids()?;
    match map_ids.iter().find(|id| !existing.contains(*id)) {
        Some(missing) => Err(WorldError::NotFound(*missing)),
        None => Ok(()),
    }
}

fn build_chest(
    world: &dyn WorldStorage,
    map_ids: &[MapId],
    options: &ChestOptions,
) -> WorldResult<InventoryItem> {
    let format = world.item_format();
    let maps = map_ids
        .iter()
        .map(|id| format.filled_map(*id))
        .collect::<WorldResult<Vec<_>>>()?;
    Ok(format.container(maps, options.name.as_deref()))
}

/// Number of chests [`add_containers`] would need for `count` maps.
pub fn chests_needed(count: usize) -> usize {
    count.div_ceil(CHEST_SLOTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagemap_storage::{
        Edition, InMemoryWorld, ItemFormat, MapRecord, PlayerRecord, INVENTORY_SLOTS,
        LOCAL_PLAYER,
    };

    fn filler() -> InventoryItem {
        ItemFormat::JavaLegacy.filled_map(MapId(999)).unwrap()
    }

    fn world(maps: i64, free_slots: usize) -> InMemoryWorld {
        let mut world = InMemoryWorld::new(Edition::Java);
        for id in 0..maps {
            world.insert_map(MapRecord::new(
                MapId(id),
                vec![0; Edition::Java.color_buffer_len()],
            ));
        }
        let mut player = PlayerRecord::new(LOCAL_PLAYER);
        for slot in free_slots..INVENTORY_SLOTS {
            player.slots[slot] = Some(filler());
        }
        world.insert_player(player);
        world
    }

    fn ids(range: std::ops::Range<i64>) -> Vec<MapId> {
        range.map(MapId).collect()
    }

    #[test]
    fn chest_lands_in_first_empty_slot() {
        let mut world = world(3, 2);
        let slot =
            add_container(&mut world, &ids(0..3), LOCAL_PLAYER, &ChestOptions::default()).unwrap();
        assert_eq!(slot, 0);

        let player = world.read_player(LOCAL_PLAYER).unwrap();
        assert_eq!(player.slots[0].as_ref().unwrap().item_id(), Some("minecraft:chest"));
        assert_eq!(player.first_empty_slot(), Some(1));
        assert_eq!(world.player_writes(), 1);
    }

    #[test]
    fn full_inventory_is_left_untouched() {
        let mut world = world(1, 0);
        let before = world.read_player(LOCAL_PLAYER).unwrap();
        let err = add_container(&mut world, &ids(0..1), LOCAL_PLAYER, &ChestOptions::default())
            .unwrap_err();
        assert!(matches!(err, WorldError::InsufficientSpace { .. }));
        assert_eq!(world.read_player(LOCAL_PLAYER).unwrap(), before);
        assert_eq!(world.player_writes(), 0);
    }

    #[test]
    fn unknown_player_and_uncommitted_maps_fail() {
        let mut world = world(1, 5);
        assert!(matches!(
            add_container(&mut world, &ids(0..1), "nobody", &ChestOptions::default()),
            Err(WorldError::PlayerNotFound(_))
        ));
        assert!(matches!(
            add_container(&mut world, &ids(0..2), LOCAL_PLAYER, &ChestOptions::default()),
            Err(WorldError::NotFound(MapId(1)))
        ));
    }

    #[test]
    fn single_container_is_capped() {
        let mut world = world(30, 5);
        assert!(matches!(
            add_container(&mut world, &ids(0..28), LOCAL_PLAYER, &ChestOptions::default()),
            Err(WorldError::ContainerOverflow { count: 28, capacity: 27 })
        ));
    }

    #[test]
    fn many_maps_split_across_chests_in_one_write() {
        let mut world = world(60, 2);
        let options = ChestOptions {
            name: Some("Gallery".to_string()),
        };
        let report = add_containers(&mut world, &ids(0..60), LOCAL_PLAYER, &options).unwrap();
        assert_eq!(chests_needed(60), 3);
        assert_eq!(report.placed.len(), 2);
        assert_eq!(report.placed[0].1.len(), 27);
        assert_eq!(report.unplaced, vec![ids(54..60)]);
        assert!(!report.is_complete());
        assert_eq!(world.player_writes(), 1);
    }

    #[test]
    fn no_room_for_any_chest_writes_nothing() {
        let mut world = world(2, 0);
        assert!(matches!(
            add_containers(&mut world, &ids(0..2), LOCAL_PLAYER, &ChestOptions::default()),
            Err(WorldError::InsufficientSpace { .. })
        ));
        assert_eq!(world.player_writes(), 0);
        assert_eq!(destinations(&world).unwrap(), vec![LOCAL_PLAYER.to_string()]);
    }

    #[test]
    fn wide_id_in_java_world_writes_no_chest() {
        let mut world = world(1, 5);
        let wide = MapId(1 << 40);
        world.insert_map(MapRecord::new(wide, vec![0; Edition::Java.color_buffer_len()]));
        let before = world.read_player(LOCAL_PLAYER).unwrap();

        assert!(matches!(
            add_container(&mut world, &[MapId(0), wide], LOCAL_PLAYER, &ChestOptions::default()),
            Err(WorldError::InvalidId { .. })
        ));
        assert!(matches!(
            add_containers(&mut world, &[wide], LOCAL_PLAYER, &ChestOptions::default()),
            Err(WorldError::InvalidId { .. })
        ));
        assert_eq!(world.read_player(LOCAL_PLAYER).unwrap(), before);
        assert_eq!(world.player_writes(), 0);
    }
}
