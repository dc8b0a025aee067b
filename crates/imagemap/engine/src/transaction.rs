//! Two-phase map injection: a read-only conflict preview, then a commit under
//! a caller-chosen policy.
//!
//! A commit is atomic per map but not per batch. When a write fails the
//! commit stops, and the report says exactly which maps landed, which were
//! skipped and which were never attempted.

use std::collections::{BTreeSet, HashSet};

use imagemap_storage::{MapId, MapRecord, WorldError, WorldResult, WorldStorage};
use tracing::{debug, info, warn};

use crate::allocator::{check_range, first_free};
use crate::pending::PendingMap;

/// Pending IDs that collide with committed maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictReport {
    /// Colliding IDs in batch order.
    pub conflicts: Vec<MapId>,
    /// Size of the batch that was checked.
    pub checked: usize,
}

impl ConflictReport {
    pub fn count(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// What to do with a pending map whose ID is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPolicy {
    /// Overwrite the existing map.
    ReplaceExisting,
    /// Drop the pending map from the batch.
    Skip,
}

/// The write that stopped a commit.
#[derive(Debug)]
pub struct CommitFailure {
    pub id: MapId,
    pub error: WorldError,
}

/// Outcome of a commit.
#[derive(Debug, Default)]
pub struct CommitReport {
    /// IDs written, in write order.
    pub applied: Vec<MapId>,
    /// IDs left alone because of the `Skip` policy.
    pub skipped: Vec<MapId>,
    pub failure: Option<CommitFailure>,
    /// Entries after the failed one that were never attempted.
    pub unattempted: usize,
    /// Maps an interrupted ID change left on a scratch ID, as
    /// `(original, scratch)`. Empty once a commit completes.
    pub parked: Vec<(MapId, MapId)>,
}

impl CommitReport {
    pub fn count_applied(&self) -> usize {
        self.applied.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    fn fail(&mut self, id: MapId, error: WorldError, unattempted: usize) {
        warn!(
            map_id = %id,
            error = %error,
            unattempted,
            parked = self.parked.len(),
            "Commit stopped on write failure"
        );
        self.failure = Some(CommitFailure { id, error });
        self.unattempted = unattempted;
    }
}

/// Report which fixed IDs in `pending` collide with committed maps.
///
/// A fixed ID repeated within the batch counts as a conflict from its second
/// occurrence on. Auto-assigned maps never conflict. Nothing is written or
/// reserved, so repeated calls return the same report until the world
/// changes.
pub fn preview(world: &dyn WorldStorage, pending: &[PendingMap]) -> WorldResult<ConflictReport> {
    let existing = world.list_map_ids()?;
    let mut seen = HashSet::new();
    let mut conflicts = Vec::new();

    for id in pending.iter().filter_map(PendingMap::fixed_id) {
        check_range(world.edition(), id)?;
        if existing.contains(&id) || !seen.insert(id) {
            conflicts.push(id);
        }
    }

    debug!(checked = pending.len(), conflicts = conflicts.len(), "Previewed batch");
    Ok(ConflictReport {
        conflicts,
        checked: pending.len(),
    })
}

/// Write `pending` into the world.
///
/// Auto-assigned maps get the smallest IDs that are free in the world and
/// not claimed by a fixed ID in the same batch. Records are validated before
/// the first write; an invalid record fails the whole call with nothing
/// written.
pub fn commit(
    world: &mut dyn WorldStorage,
    pending: &[PendingMap],
    policy: CommitPolicy,
) -> WorldResult<CommitReport> {
    let edition = world.edition();
    let existing = world.list_map_ids()?;

    let mut reserved: BTreeSet<MapId> = existing.clone();
    for id in pending.iter().filter_map(PendingMap::fixed_id) {
        check_range(edition, id)?;
        reserved.insert(id);
    }

    let mut next_auto = MapId(0);
    let mut records = Vec::with_capacity(pending.len());
    for map in pending {
        let id = match map.fixed_id() {
            Some(id) => id,
            None => {
                let id = first_free(&reserved, next_auto);
                reserved.insert(id);
                next_auto = MapId(id.0 + 1);
                id
            }
        };
        let record = map.to_record(id);
        record.validate(edition)?;
        records.push((record, map.fixed_id().is_some()));
    }

    let mut report = CommitReport::default();
    let mut written = HashSet::new();
    for (index, (record, fixed)) in records.iter().enumerate() {
        let taken = *fixed && (existing.contains(&record.id) || written.contains(&record.id));
        if taken && policy == CommitPolicy::Skip {
            debug!(map_id = %record.id, "Skipped conflicting map");
            report.skipped.push(record.id);
            continue;
        }

        if let Err(error) = world.write_map(record) {
            report.fail(record.id, error, records.len() - index - 1);
            break;
        }
        written.insert(record.id);
        report.applied.push(record.id);
    }

    info!(
        applied = report.count_applied(),
        skipped = report.skipped.len(),
        ?policy,
        "Committed map batch"
    );
    Ok(report)
}

/// A request to move an existing map to another ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdChange {
    pub from: MapId,
    pub to: MapId,
}

/// Map `ids` onto consecutive IDs starting at `first_id`, in the given order.
///
/// Fails with `InvalidId` if the run would pass the end of the ID space.
pub fn plan_id_changes(ids: &[MapId], first_id: MapId) -> WorldResult<Vec<IdChange>> {
    ids.iter()
        .enumerate()
        .map(|(offset, from)| {
            let to = i64::try_from(offset)
                .ok()
                .and_then(|offset| first_id.0.checked_add(offset))
                .ok_or_else(|| WorldError::InvalidId {
                    id: first_id,
                    reason: format!("{} consecutive IDs do not fit after it", ids.len()),
                })?;
            Ok(IdChange {
                from: *from,
                to: MapId(to),
            })
        })
        .collect()
}

fn effective(changes: &[IdChange]) -> Vec<IdChange> {
    changes.iter().copied().filter(|c| c.from != c.to).collect()
}

/// Conflicting targets of `changes`.
///
/// A target conflicts when a map already holds it and no change in the same
/// batch moves that map away, or when an earlier change in the batch already
/// targets it. Fails with `NotFound` if a source map does not exist.
pub fn preview_id_changes(
    world: &dyn WorldStorage,
    changes: &[IdChange],
) -> WorldResult<ConflictReport> {
    let changes = effective(changes);
    let existing = world.list_map_ids()?;
    let vacated: HashSet<MapId> = changes.iter().map(|c| c.from).collect();
    let mut targeted = HashSet::new();
    let mut conflicts = Vec::new();

    for change in &changes {
        if !existing.contains(&change.from) {
            return Err(WorldError::NotFound(change.from));
        }
        check_range(world.edition(), change.to)?;
        let occupied = existing.contains(&change.to) && !vacated.contains(&change.to);
        if occupied || !targeted.insert(change.to) {
            conflicts.push(change.to);
        }
    }

    Ok(ConflictReport {
        conflicts,
        checked: changes.len(),
    })
}

/// Move maps to new IDs: each move writes the record under its new ID, then
/// deletes the old one.
///
/// Moves run in an order where no write lands on an ID whose record another
/// move still has to copy. Cycles are broken through a free scratch ID. With
/// `Skip`, conflicting moves are dropped, along with any move whose target is
/// only free because of a dropped move.
pub fn commit_id_changes(
    world: &mut dyn WorldStorage,
    changes: &[IdChange],
    policy: CommitPolicy,
) -> WorldResult<CommitReport> {
    let edition = world.edition();
    let existing = world.list_map_ids()?;
    let mut report = CommitReport::default();

    let mut moves: Vec<(IdChange, MapRecord)> = Vec::new();
    for change in effective(changes) {
        check_range(edition, change.to)?;
        let record = world.read_map(change.from)?;
        moves.push((change, record));
    }

    if policy == CommitPolicy::Skip {
        loop {
            let vacated: HashSet<MapId> = moves.iter().map(|(c, _)| c.from).collect();
            let mut targeted = HashSet::new();
            let before = moves.len();
            moves.retain(|(change, _)| {
                let occupied = existing.contains(&change.to) && !vacated.contains(&change.to);
                let keep = !occupied && targeted.insert(change.to);
                if !keep {
                    report.skipped.push(change.to);
                }
                keep
            });
            if moves.len() == before {
                break;
            }
        }
    }

    let mut occupied: BTreeSet<MapId> = existing;
    occupied.extend(moves.iter().flat_map(|(c, _)| [c.from, c.to]));

    while !moves.is_empty() {
        let ready = moves
            .iter()
            .position(|(change, _)| !moves.iter().any(|(other, _)| other.from == change.to));

        let index = match ready {
            Some(index) => index,
            None => {
                // Every remaining target is still needed as a source. Park a
                // source that some move targets; the scratch ID is never a
                // target, so each park unblocks at least one move.
                let park = moves
                    .iter()
                    .position(|(change, _)| moves.iter().any(|(other, _)| other.to == change.from))
                    .unwrap_or_default();
                let scratch = first_free(&occupied, MapId(0));
                occupied.insert(scratch);
                let (source, target) = (moves[park].0.from, moves[park].0.to);

                let parked = moves[park].1.clone().with_id(scratch);
                if let Err(error) = world.write_map(&parked) {
                    report.fail(target, error, moves.len() - 1);
                    return Ok(report);
                }
                report.parked.push((source, scratch));
                if let Err(error) = world.delete_map(source) {
                    report.fail(target, error, moves.len() - 1);
                    return Ok(report);
                }
                moves[park].0.from = scratch;
                debug!(map_id = %source, scratch = %scratch, "Parked map to break ID cycle");
                continue;
            }
        };

        let (change, record) = moves.remove(index);
        let moved = record.with_id(change.to);
        if let Err(error) = world.write_map(&moved) {
            report.fail(change.to, error, moves.len());
            return Ok(report);
        }
        report.applied.push(change.to);

        let refilled = moves.iter().any(|(other, _)| other.to == change.from);
        if !refilled {
            if let Err(error) = world.delete_map(change.from) {
                report.fail(change.to, error, moves.len());
                return Ok(report);
            }
        }
        report.parked.retain(|(_, scratch)| *scratch != change.from);
        debug!(from = %change.from, to = %change.to, "Moved map");
    }

    info!(
        applied = report.count_applied(),
        skipped = report.skipped.len(),
        ?policy,
        "Committed ID changes"
    );
    Ok(report)
}
