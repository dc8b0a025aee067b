//! Edition-agnostic access to Minecraft world saves.
//!
//! This crate defines one storage contract over two on-disk layouts:
//! - Java: gzip NBT files (`data/map_<id>.dat`, `level.dat`, `playerdata/`)
//! - Bedrock: little-endian NBT values inside the world's LevelDB
//!
//! An in-memory adapter implements the same contract for tests and
//! dry runs. Conflict handling and ID policy live above this layer.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod bedrock;
mod config;
mod error;
pub mod fsio;
mod handle;
pub mod items;
pub mod java;
mod lease;
pub mod memory;
mod model;
pub mod nbt;
pub mod nbt_le;
mod traits;

pub use bedrock::BedrockWorld;
pub use config::{StorageOptions, DEFAULT_JAVA_DATA_VERSION};
pub use error::{WorldError, WorldResult};
pub use handle::WorldHandle;
pub use items::{ItemFormat, JAVA_COMPONENTS_DATA_VERSION};
pub use java::JavaWorld;
pub use lease::WorldLease;
pub use memory::InMemoryWorld;
pub use model::{
    Edition, InventoryItem, MapDimension, MapId, MapOrigin, MapRecord, PlayerRecord,
    CHEST_SLOTS, INVENTORY_SLOTS, LOCAL_PLAYER, MAP_SIDE,
};
pub use traits::WorldStorage;
