//! Best-effort removal of map records.
//!
//! Only the map data is removed. Items that still reference a deleted ID
//! (inventories, item frames) are left as they are.

use imagemap_storage::{MapId, WorldError, WorldStorage};
use tracing::{info, warn};

/// Per-ID outcome of [`delete_maps`].
#[derive(Debug, Default)]
pub struct DeletionReport {
    pub deleted: Vec<MapId>,
    /// IDs with no record to delete.
    pub absent: Vec<MapId>,
    pub failed: Vec<(MapId, WorldError)>,
}

impl DeletionReport {
    /// True when no deletion hit a storage fault.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every ID in `ids`; a failure on one ID does not stop the rest.
pub fn delete_maps(world: &mut dyn WorldStorage, ids: &[MapId]) -> DeletionReport {
    let mut report = DeletionReport::default();
    for id in ids {
        match world.delete_map(*id) {
            Ok(true) => report.deleted.push(*id),
            Ok(false) => report.absent.push(*id),
            Err(error) => {
                warn!(map_id = %id, error = %error, "Failed to delete map");
                report.failed.push((*id, error));
            }
        }
    }
    info!(
        deleted = report.deleted.len(),
        absent = report.absent.len(),
        failed = report.failed.len(),
        "Deleted maps"
    );
    report
}
