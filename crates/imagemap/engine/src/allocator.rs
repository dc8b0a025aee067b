//! Map ID allocation and validation of caller-chosen IDs.
//!
//! Allocation is deterministic for a given world state: it always hands out
//! the smallest non-negative IDs not present in the world.

use std::collections::BTreeSet;

use imagemap_storage::{Edition, MapId, WorldError, WorldResult, WorldStorage};

/// Smallest non-negative ID not already used by a committed map.
pub fn next_free_id(world: &dyn WorldStorage) -> WorldResult<MapId> {
    let taken = world.list_map_ids()?;
    Ok(first_free(&taken, MapId(0)))
}

/// The `n` smallest free IDs, ascending.
pub fn allocate_ids(world: &dyn WorldStorage, n: usize) -> WorldResult<Vec<MapId>> {
    let taken = world.list_map_ids()?;
    Ok(free_ids(&taken, n))
}

/// Check a requested ID without touching the world.
///
/// Fails with `InvalidId` when the edition cannot store the ID and with
/// `AlreadyExists` when a committed map already uses it.
pub fn validate_choice(world: &dyn WorldStorage, requested: MapId) -> WorldResult<()> {
    check_range(world.edition(), requested)?;
    if world.map_exists(requested)? {
        return Err(WorldError::AlreadyExists(requested));
    }
    Ok(())
}

/// Java stores map IDs as 32-bit ints; Bedrock uses the full 64 bits.
pub(crate) fn check_range(edition: Edition, id: MapId) -> WorldResult<()> {
    if edition == Edition::Java && i32::try_from(id.0).is_err() {
        return Err(WorldError::InvalidId {
            id,
            reason: "Java map IDs must fit in a 32-bit integer".to_string(),
        });
    }
    Ok(())
}

/// First ID at or above `start` that `taken` does not contain.
pub(crate) fn first_free(taken: &BTreeSet<MapId>, start: MapId) -> MapId {
    let mut candidate = start.0;
    for id in taken.range(start..) {
        if id.0 != candidate {
            break;
        }
        candidate += 1;
    }
    MapId(candidate)
}

pub(crate) fn free_ids(taken: &BTreeSet<MapId>, n: usize) -> Vec<MapId> {
    let mut ids = Vec::with_capacity(n);
    let mut next = MapId(0);
    while ids.len() < n {
        next = first_free(taken, next);
        ids.push(next);
        next = MapId(next.0 + 1);
    }
    ids
}
