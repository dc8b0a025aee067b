//! Java edition adapter: one gzip NBT file per map under `data/`, players in
//! `level.dat` and `playerdata/`.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use quartz_nbt::{NbtCompound, NbtTag};
use tracing::{debug, info};

use crate::config::StorageOptions;
use crate::error::{WorldError, WorldResult};
use crate::fsio::{read_gzip_nbt, write_gzip_nbt};
use crate::items::ItemFormat;
use crate::model::{Edition, MapDimension, MapId, MapOrigin, MapRecord, PlayerRecord, LOCAL_PLAYER};
use crate::nbt::{byte_array, compound, flag, get_bytes, get_compound, get_int, get_str};
use crate::traits::WorldStorage;

pub struct JavaWorld {
    root: PathBuf,
    data_version: i32,
    compression: u32,
}

impl JavaWorld {
    /// Open the save at `root`. Requires a `region/` directory.
    pub fn open(root: &Path, options: &StorageOptions) -> WorldResult<Self> {
        if !Edition::Java.has_marker(root) {
            return Err(WorldError::NotAWorld {
                path: root.to_path_buf(),
                edition: Edition::Java,
                marker: Edition::Java.marker(),
            });
        }

        let level = root.join("level.dat");
        let data_version = if level.is_file() {
            let level_root = read_gzip_nbt(&level)?;
            get_compound(&level_root, "Data")
                .and_then(|data| get_int(data, "DataVersion"))
                .map(|v| v as i32)
                .unwrap_or(options.java_data_version)
        } else {
            options.java_data_version
        };

        info!(path = %root.display(), data_version, "Opened Java world");
        Ok(Self {
            root: root.to_path_buf(),
            data_version,
            compression: options.java_compression,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_version(&self) -> i32 {
        self.data_version
    }

    fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    fn map_path(&self, id: MapId) -> PathBuf {
        self.data_dir().join(format!("map_{}.dat", id.0))
    }

    fn level_path(&self) -> PathBuf {
        self.root.join("level.dat")
    }

    fn player_path(&self, name: &str) -> Option<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.root.join("playerdata").join(format!("{name}.dat")))
    }

    /// Highest map ID the game will consider used.
    pub fn map_counter(&self) -> WorldResult<Option<i64>> {
        let path = self.data_dir().join("idcounts.dat");
        if !path.is_file() {
            return Ok(None);
        }
        let root = read_gzip_nbt(&path)?;
        // Pre-1.13 files keep the counter at the root as a short.
        let counter = get_compound(&root, "data")
            .and_then(|data| get_int(data, "map"))
            .or_else(|| get_int(&root, "map"));
        Ok(counter)
    }

    /// Raise `idcounts.dat` so the game's own allocator skips `id`.
    fn bump_map_counter(&self, id: MapId) -> WorldResult<()> {
        if self.map_counter()?.is_some_and(|current| current >= id.0) {
            return Ok(());
        }
        let path = self.data_dir().join("idcounts.dat");
        let mut root = if path.is_file() {
            read_gzip_nbt(&path)?
        } else {
            NbtCompound::new()
        };
        let mut data = get_compound(&root, "data").cloned().unwrap_or_default();
        data.insert("map", NbtTag::Int(id.0 as i32));
        root.insert("data", NbtTag::Compound(data));
        root.insert("DataVersion", NbtTag::Int(self.data_version));
        write_gzip_nbt(&path, &root, self.compression)?;
        debug!(map_id = %id, "Raised Java map counter");
        Ok(())
    }

    fn check_id(id: MapId) -> WorldResult<()> {
        if i32::try_from(id.0).is_err() {
            return Err(WorldError::InvalidId {
                id,
                reason: "Java map IDs are 32-bit".to_string(),
            });
        }
        Ok(())
    }

    fn encode_map(&self, record: &MapRecord) -> NbtCompound {
        let data = compound(vec![
            ("scale", NbtTag::Byte(record.scale as i8)),
            (
                "dimension",
                NbtTag::String(record.dimension.java_name().to_string()),
            ),
            ("xCenter", NbtTag::Int(record.origin.x)),
            ("zCenter", NbtTag::Int(record.origin.z)),
            ("locked", flag(record.locked)),
            ("trackingPosition", flag(false)),
            ("unlimitedTracking", flag(false)),
            ("colors", byte_array(&record.colors)),
            ("banners", NbtTag::List(Vec::<NbtTag>::new().into())),
            ("frames", NbtTag::List(Vec::<NbtTag>::new().into())),
        ]);
        compound(vec![
            ("data", NbtTag::Compound(data)),
            ("DataVersion", NbtTag::Int(self.data_version)),
        ])
    }

    fn decode_map(id: MapId, path: &Path, root: &NbtCompound) -> WorldResult<MapRecord> {
        let target = path.display().to_string();
        let data = get_compound(root, "data")
            .ok_or_else(|| WorldError::nbt(target.clone())("missing data compound".into()))?;
        let colors = get_bytes(data, "colors")
            .ok_or_else(|| WorldError::nbt(target)("missing colors".into()))?;

        let dimension = match get_str(data, "dimension") {
            Some(name) => MapDimension::from_java_name(name),
            None => MapDimension::from_index(get_int(data, "dimension").unwrap_or(0)),
        };

        Ok(MapRecord {
            id,
            colors,
            scale: get_int(data, "scale").unwrap_or(0) as u8,
            dimension,
            origin: MapOrigin {
                x: get_int(data, "xCenter").unwrap_or(0) as i32,
                z: get_int(data, "zCenter").unwrap_or(0) as i32,
            },
            locked: get_int(data, "locked").unwrap_or(0) != 0,
        })
    }
}

fn parse_map_file_name(name: &str) -> Option<MapId> {
    name.strip_prefix("map_")?
        .strip_suffix(".dat")?
        .parse::<i64>()
        .ok()
        .map(MapId)
}

impl WorldStorage for JavaWorld {
    fn edition(&self) -> Edition {
        Edition::Java
    }

    fn item_format(&self) -> ItemFormat {
        ItemFormat::for_java_data_version(self.data_version)
    }

    fn list_map_ids(&self) -> WorldResult<BTreeSet<MapId>> {
        let dir = self.data_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(WorldError::io(&dir)(e)),
        };

        let mut ids = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(WorldError::io(&dir))?;
            if let Some(id) = parse_map_file_name(&entry.file_name().to_string_lossy()) {
                ids.insert(id);
            }
        }
        Ok(ids)
    }

    fn read_map(&self, id: MapId) -> WorldResult<MapRecord> {
        let path = self.map_path(id);
        if !path.is_file() {
            return Err(WorldError::NotFound(id));
        }
        let root = read_gzip_nbt(&path)?;
        Self::decode_map(id, &path, &root)
    }

    fn write_map(&mut self, record: &MapRecord) -> WorldResult<()> {
        Self::check_id(record.id)?;
        record.validate(Edition::Java)?;

        let dir = self.data_dir();
        fs::create_dir_all(&dir).map_err(WorldError::io(&dir))?;
        // The counter goes first so a failed call never leaves the map behind.
        self.bump_map_counter(record.id)?;
        write_gzip_nbt(&self.map_path(record.id), &self.encode_map(record), self.compression)?;
        debug!(map_id = %record.id, "Wrote Java map");
        Ok(())
    }

    fn delete_map(&mut self, id: MapId) -> WorldResult<bool> {
        let path = self.map_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(map_id = %id, "Deleted Java map");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(WorldError::io(path)(e)),
        }
    }

    fn map_exists(&self, id: MapId) -> WorldResult<bool> {
        Ok(self.map_path(id).is_file())
    }

    fn list_players(&self) -> WorldResult<Vec<String>> {
        let mut names = Vec::new();
        let level = self.level_path();
        if level.is_file() {
            let root = read_gzip_nbt(&level)?;
            if get_compound(&root, "Data").is_some_and(|d| get_compound(d, "Player").is_some()) {
                names.push(LOCAL_PLAYER.to_string());
            }
        }

        let dir = self.root.join("playerdata");
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(WorldError::io(&dir)(e)),
        };
        let mut others = Vec::new();
        for entry in entries {
            let entry = entry.map_err(WorldError::io(&dir))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(stem) = file_name.strip_suffix(".dat") {
                others.push(stem.to_string());
            }
        }
        others.sort();
        names.extend(others);
        Ok(names)
    }

    fn read_player(&self, name: &str) -> WorldResult<PlayerRecord> {
        if name == LOCAL_PLAYER {
            let level = self.level_path();
            if !level.is_file() {
                return Err(WorldError::PlayerNotFound(name.to_string()));
            }
            let root = read_gzip_nbt(&level)?;
            let player = get_compound(&root, "Data")
                .and_then(|d| get_compound(d, "Player"))
                .ok_or_else(|| WorldError::PlayerNotFound(name.to_string()))?;
            return Ok(PlayerRecord::from_nbt(name, player.clone()));
        }

        let path = self
            .player_path(name)
            .filter(|p| p.is_file())
            .ok_or_else(|| WorldError::PlayerNotFound(name.to_string()))?;
        Ok(PlayerRecord::from_nbt(name, read_gzip_nbt(&path)?))
    }

    fn write_player(&mut self, record: &PlayerRecord) -> WorldResult<()> {
        let player = record.to_nbt(None);
        if record.name == LOCAL_PLAYER {
            let level = self.level_path();
            if !level.is_file() {
                return Err(WorldError::PlayerNotFound(record.name.clone()));
            }
            let mut root = read_gzip_nbt(&level)?;
            match root.inner_mut().get_mut("Data") {
                Some(NbtTag::Compound(data)) => {
                    data.insert("Player", NbtTag::Compound(player));
                }
                _ => return Err(WorldError::PlayerNotFound(record.name.clone())),
            }
            write_gzip_nbt(&level, &root, self.compression)?;
        } else {
            let path = self
                .player_path(&record.name)
                .filter(|p| p.is_file())
                .ok_or_else(|| WorldError::PlayerNotFound(record.name.clone()))?;
            write_gzip_nbt(&path, &player, self.compression)?;
        }
        info!(player = %record.name, "Wrote Java player");
        Ok(())
    }
}
