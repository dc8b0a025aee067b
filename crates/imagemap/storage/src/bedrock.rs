//! Bedrock edition adapter: little-endian NBT values in the world's LevelDB.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::Compression;
use quartz_nbt::{NbtCompound, NbtTag};
use rusty_leveldb::compressor::{Compressor, NoneCompressor};
use rusty_leveldb::{CompressorList, LdbIterator, Options, Status, StatusCode, WriteBatch, DB};
use tracing::{debug, info, warn};

use crate::config::StorageOptions;
use crate::error::{WorldError, WorldResult};
use crate::items::{bedrock_empty_slot, ItemFormat};
use crate::model::{
    Edition, MapDimension, MapId, MapOrigin, MapRecord, PlayerRecord, LOCAL_PLAYER, MAP_SIDE,
};
use crate::nbt::{byte_array, compound, flag, get_bytes, get_int};
use crate::nbt_le;
use crate::traits::WorldStorage;

const MAP_PREFIX: &str = "map_";
const LOCAL_PLAYER_KEY: &str = "~local_player";
const PLAYER_PREFIX: &str = "player_server_";

/// Compressor ids from Mojang's LevelDB fork.
const COMPRESSOR_NONE: u8 = 0;
const COMPRESSOR_ZLIB: u8 = 2;
const COMPRESSOR_RAW_ZLIB: u8 = 4;

struct ZlibCompressor {
    level: u32,
    raw: bool,
}

fn compression_status(e: std::io::Error) -> Status {
    Status {
        code: StatusCode::CompressionError,
        err: e.to_string(),
    }
}

impl Compressor for ZlibCompressor {
    fn encode(&self, block: Vec<u8>) -> rusty_leveldb::Result<Vec<u8>> {
        let level = Compression::new(self.level);
        let encoded = if self.raw {
            let mut e = DeflateEncoder::new(Vec::new(), level);
            e.write_all(&block).and_then(|_| e.finish())
        } else {
            let mut e = ZlibEncoder::new(Vec::new(), level);
            e.write_all(&block).and_then(|_| e.finish())
        };
        encoded.map_err(compression_status)
    }

    fn decode(&self, block: Vec<u8>) -> rusty_leveldb::Result<Vec<u8>> {
        let mut out = Vec::new();
        let read = if self.raw {
            DeflateDecoder::new(&block[..]).read_to_end(&mut out)
        } else {
            ZlibDecoder::new(&block[..]).read_to_end(&mut out)
        };
        read.map(|_| out).map_err(compression_status)
    }
}

/// LevelDB options matching the game: zlib and raw-deflate blocks, new
/// blocks written raw.
///
/// Anything that opens a world's `db/` directly, such as a tool seeding a
/// fresh save, needs these to read and write the same blocks the game does.
pub fn leveldb_options(level: u8, create_if_missing: bool) -> Options {
    let level = u32::from(level.min(9));
    let mut list = CompressorList::new();
    list.set_with_id(COMPRESSOR_NONE, NoneCompressor {});
    list.set_with_id(COMPRESSOR_ZLIB, ZlibCompressor { level, raw: false });
    list.set_with_id(COMPRESSOR_RAW_ZLIB, ZlibCompressor { level, raw: true });

    let mut opts = Options::default();
    opts.create_if_missing = create_if_missing;
    opts.compressor_list = Rc::new(list);
    opts.compressor = COMPRESSOR_RAW_ZLIB;
    opts
}

fn backend(target: impl Display) -> impl FnOnce(Status) -> WorldError {
    let target = target.to_string();
    move |status| WorldError::Storage {
        target,
        reason: status.to_string(),
    }
}

pub struct BedrockWorld {
    root: PathBuf,
    db: RefCell<DB>,
}

impl BedrockWorld {
    /// Open the save at `root`. Requires `db/CURRENT`.
    ///
    /// LevelDB's own lock file keeps a second process (including a running
    /// game) from opening the same database.
    pub fn open(root: &Path, options: &StorageOptions) -> WorldResult<Self> {
        if !Edition::Bedrock.has_marker(root) {
            return Err(WorldError::NotAWorld {
                path: root.to_path_buf(),
                edition: Edition::Bedrock,
                marker: Edition::Bedrock.marker(),
            });
        }

        let db_path = root.join("db");
        let db = DB::open(&db_path, leveldb_options(options.bedrock_compression, false))
            .map_err(backend(db_path.display()))?;

        info!(path = %root.display(), "Opened Bedrock world");
        Ok(Self {
            root: root.to_path_buf(),
            db: RefCell::new(db),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.db.borrow_mut().get(key.as_bytes()).map(|v| v.to_vec())
    }

    fn keys_with_prefix(&self, prefix: &str) -> WorldResult<Vec<String>> {
        let mut db = self.db.borrow_mut();
        let mut iter = db.new_iter().map_err(backend("db iterator"))?;
        let mut keys = Vec::new();
        while let Some((key, _)) = iter.next() {
            if key.starts_with(prefix.as_bytes()) {
                keys.push(String::from_utf8_lossy(&key[..]).into_owned());
            }
        }
        Ok(keys)
    }

    /// Apply one synchronous batch; it either lands whole or not at all.
    fn write_batch(&mut self, key: &str, value: Option<&[u8]>) -> WorldResult<()> {
        let mut batch = WriteBatch::default();
        match value {
            Some(value) => batch.put(key.as_bytes(), value),
            None => batch.delete(key.as_bytes()),
        }
        self.db
            .get_mut()
            .write(batch, true)
            .map_err(backend(key))
    }

    fn read_nbt(&self, key: &str) -> WorldResult<Option<NbtCompound>> {
        match self.get(key) {
            Some(bytes) => {
                let (_, root) = nbt_le::read_root(&bytes).map_err(WorldError::nbt(key))?;
                Ok(Some(root))
            }
            None => Ok(None),
        }
    }

    fn write_nbt(&mut self, key: &str, root: &NbtCompound) -> WorldResult<()> {
        let bytes = nbt_le::write_root("", root).map_err(WorldError::nbt(key))?;
        self.write_batch(key, Some(&bytes))
    }

    fn player_key(name: &str) -> String {
        if name == LOCAL_PLAYER {
            LOCAL_PLAYER_KEY.to_string()
        } else {
            format!("{PLAYER_PREFIX}{name}")
        }
    }

    fn encode_map(record: &MapRecord) -> NbtCompound {
        compound(vec![
            ("mapId", NbtTag::Long(record.id.0)),
            ("parentMapId", NbtTag::Long(-1)),
            ("dimension", NbtTag::Byte(record.dimension.bedrock_index())),
            ("fullyExplored", flag(true)),
            ("mapLocked", flag(record.locked)),
            ("scale", NbtTag::Byte(record.scale as i8)),
            ("height", NbtTag::Short(MAP_SIDE as i16)),
            ("width", NbtTag::Short(MAP_SIDE as i16)),
            ("xCenter", NbtTag::Int(record.origin.x)),
            ("zCenter", NbtTag::Int(record.origin.z)),
            ("unlimitedTracking", flag(false)),
            ("colors", byte_array(&record.colors)),
            ("decorations", NbtTag::List(Vec::<NbtTag>::new().into())),
        ])
    }

    fn decode_map(id: MapId, key: &str, root: &NbtCompound) -> WorldResult<MapRecord> {
        let colors =
            get_bytes(root, "colors").ok_or_else(|| WorldError::nbt(key)("missing colors".into()))?;
        Ok(MapRecord {
            id,
            colors,
            scale: get_int(root, "scale").unwrap_or(0) as u8,
            dimension: MapDimension::from_bedrock_index(get_int(root, "dimension").unwrap_or(0)),
            origin: MapOrigin {
                x: get_int(root, "xCenter").unwrap_or(0) as i32,
                z: get_int(root, "zCenter").unwrap_or(0) as i32,
            },
            locked: get_int(root, "mapLocked").unwrap_or(0) != 0,
        })
    }
}

impl Drop for BedrockWorld {
    fn drop(&mut self) {
        if let Err(e) = self.db.get_mut().flush() {
            warn!(path = %self.root.display(), error = %e, "Failed to flush Bedrock database");
        }
    }
}

impl WorldStorage for BedrockWorld {
    fn edition(&self) -> Edition {
        Edition::Bedrock
    }

    fn item_format(&self) -> ItemFormat {
        ItemFormat::Bedrock
    }

    fn list_map_ids(&self) -> WorldResult<BTreeSet<MapId>> {
        Ok(self
            .keys_with_prefix(MAP_PREFIX)?
            .iter()
            .filter_map(|key| key[MAP_PREFIX.len()..].parse::<i64>().ok())
            .map(MapId)
            .collect())
    }

    fn read_map(&self, id: MapId) -> WorldResult<MapRecord> {
        let key = format!("{MAP_PREFIX}{id}");
        let root = self.read_nbt(&key)?.ok_or(WorldError::NotFound(id))?;
        Self::decode_map(id, &key, &root)
    }

    fn write_map(&mut self, record: &MapRecord) -> WorldResult<()> {
        record.validate(Edition::Bedrock)?;
        let key = format!("{MAP_PREFIX}{}", record.id);
        self.write_nbt(&key, &Self::encode_map(record))?;
        debug!(map_id = %record.id, "Wrote Bedrock map");
        Ok(())
    }

    fn delete_map(&mut self, id: MapId) -> WorldResult<bool> {
        let key = format!("{MAP_PREFIX}{id}");
        if self.get(&key).is_none() {
            return Ok(false);
        }
        self.write_batch(&key, None)?;
        debug!(map_id = %id, "Deleted Bedrock map");
        Ok(true)
    }

    fn map_exists(&self, id: MapId) -> WorldResult<bool> {
        Ok(self.get(&format!("{MAP_PREFIX}{id}")).is_some())
    }

    fn list_players(&self) -> WorldResult<Vec<String>> {
        let mut names = Vec::new();
        if self.get(LOCAL_PLAYER_KEY).is_some() {
            names.push(LOCAL_PLAYER.to_string());
        }
        let mut others: Vec<String> = self
            .keys_with_prefix(PLAYER_PREFIX)?
            .into_iter()
            .map(|key| key[PLAYER_PREFIX.len()..].to_string())
            .collect();
        others.sort();
        names.extend(others);
        Ok(names)
    }

    fn read_player(&self, name: &str) -> WorldResult<PlayerRecord> {
        let key = Self::player_key(name);
        let root = self
            .read_nbt(&key)?
            .ok_or_else(|| WorldError::PlayerNotFound(name.to_string()))?;
        Ok(PlayerRecord::from_nbt(name, root))
    }

    fn write_player(&mut self, record: &PlayerRecord) -> WorldResult<()> {
        let key = Self::player_key(&record.name);
        if self.get(&key).is_none() {
            return Err(WorldError::PlayerNotFound(record.name.clone()));
        }
        self.write_nbt(&key, &record.to_nbt(Some(bedrock_empty_slot)))?;
        info!(player = %record.name, "Wrote Bedrock player");
        Ok(())
    }
}
