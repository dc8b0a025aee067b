//! World synchronization engine.
//!
//! Takes in-memory pending maps and puts them into a Java or Bedrock world
//! save through the edition-agnostic [`WorldStorage`] contract:
//! - [`allocator`]: collision-free map IDs
//! - [`transaction`]: conflict preview, then commit under a policy
//! - [`chest`]: chests of maps placed into player inventories
//! - [`deletion`]: best-effort map removal
//!
//! All calls are synchronous and bounded by local file I/O. Mutating calls
//! on one world must be serialized by the caller.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod allocator;
pub mod chest;
pub mod config;
pub mod deletion;
pub mod pending;
pub mod transaction;

pub use allocator::{allocate_ids, next_free_id, validate_choice};
pub use chest::{
    add_container, add_containers, chests_needed, destinations, ChestOptions, ChestReport,
};
pub use config::EngineConfig;
pub use deletion::{delete_maps, DeletionReport};
pub use pending::{MapIdChoice, MapImage, PaletteCodec, PendingMap};
pub use transaction::{
    commit, commit_id_changes, plan_id_changes, preview, preview_id_changes, CommitFailure,
    CommitPolicy, CommitReport, ConflictReport, IdChange,
};

pub use imagemap_storage::{
    Edition, InMemoryWorld, MapDimension, MapId, MapOrigin, MapRecord, PlayerRecord,
    StorageOptions, WorldError, WorldHandle, WorldResult, WorldStorage, CHEST_SLOTS,
    LOCAL_PLAYER,
};
