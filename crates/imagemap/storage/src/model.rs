use std::fmt;
use std::path::Path;

use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};

use crate::error::{WorldError, WorldResult};
use crate::nbt;

/// Side length in pixels of every map, in both editions.
pub const MAP_SIDE: usize = 128;

/// Main inventory grid size (hotbar plus the three storage rows).
pub const INVENTORY_SLOTS: usize = 36;

/// Items one chest can carry.
pub const CHEST_SLOTS: usize = 27;

/// Reserved player name for the world's own (single-player) player.
pub const LOCAL_PLAYER: &str = "~local";

/// On-disk format family of a world save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edition {
    Java,
    Bedrock,
}

impl Edition {
    /// Marker whose presence identifies a save of this edition.
    pub fn marker(self) -> &'static str {
        match self {
            Edition::Java => "region",
            Edition::Bedrock => "db/CURRENT",
        }
    }

    /// Probe `path` for an edition marker. Bedrock is checked first.
    pub fn detect(path: &Path) -> WorldResult<Edition> {
        if Edition::Bedrock.has_marker(path) {
            Ok(Edition::Bedrock)
        } else if Edition::Java.has_marker(path) {
            Ok(Edition::Java)
        } else {
            Err(WorldError::UnknownEdition(path.to_path_buf()))
        }
    }

    pub fn has_marker(self, path: &Path) -> bool {
        let marker = path.join(self.marker());
        match self {
            Edition::Java => marker.is_dir(),
            Edition::Bedrock => marker.is_file(),
        }
    }

    /// Expected length of a map's color buffer.
    ///
    /// Java stores one palette index per pixel, Bedrock stores RGBA.
    pub fn color_buffer_len(self) -> usize {
        match self {
            Edition::Java => MAP_SIDE * MAP_SIDE,
            Edition::Bedrock => MAP_SIDE * MAP_SIDE * 4,
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edition::Java => write!(f, "Java"),
            Edition::Bedrock => write!(f, "Bedrock"),
        }
    }
}

/// Unique identifier of a map within one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MapId(pub i64);

impl MapId {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MapId {
    fn from(value: i64) -> Self {
        MapId(value)
    }
}

/// Dimension a map was drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapDimension {
    #[default]
    Overworld,
    Nether,
    End,
}

impl MapDimension {
    pub fn java_name(self) -> &'static str {
        match self {
            MapDimension::Overworld => "minecraft:overworld",
            MapDimension::Nether => "minecraft:the_nether",
            MapDimension::End => "minecraft:the_end",
        }
    }

    pub fn from_java_name(name: &str) -> Self {
        match name {
            "minecraft:the_nether" => MapDimension::Nether,
            "minecraft:the_end" => MapDimension::End,
            _ => MapDimension::Overworld,
        }
    }

    /// Numeric form used by Bedrock and by pre-1.16 Java saves.
    pub fn index(self) -> i8 {
        match self {
            MapDimension::Overworld => 0,
            MapDimension::Nether => -1,
            MapDimension::End => 1,
        }
    }

    pub fn from_index(index: i64) -> Self {
        match index {
            -1 => MapDimension::Nether,
            1 => MapDimension::End,
            _ => MapDimension::Overworld,
        }
    }

    pub(crate) fn bedrock_index(self) -> i8 {
        match self {
            MapDimension::Overworld => 0,
            MapDimension::Nether => 1,
            MapDimension::End => 2,
        }
    }

    pub(crate) fn from_bedrock_index(index: i64) -> Self {
        match index {
            1 => MapDimension::Nether,
            2 => MapDimension::End,
            _ => MapDimension::Overworld,
        }
    }
}

/// World coordinate a map is centered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapOrigin {
    pub x: i32,
    pub z: i32,
}

/// One persisted map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRecord {
    pub id: MapId,
    pub colors: Vec<u8>,
    pub scale: u8,
    pub dimension: MapDimension,
    pub origin: MapOrigin,
    pub locked: bool,
}

impl MapRecord {
    pub fn new(id: MapId, colors: Vec<u8>) -> Self {
        Self {
            id,
            colors,
            scale: 0,
            dimension: MapDimension::Overworld,
            origin: MapOrigin::default(),
            locked: true,
        }
    }

    /// Same record under another ID.
    pub fn with_id(mut self, id: MapId) -> Self {
        self.id = id;
        self
    }

    pub fn validate(&self, edition: Edition) -> WorldResult<()> {
        let expected = edition.color_buffer_len();
        if self.colors.len() != expected {
            return Err(WorldError::InvalidRecord(format!(
                "map {} has {} color bytes, {} maps need {}",
                self.id,
                self.colors.len(),
                edition,
                expected
            )));
        }
        Ok(())
    }
}

/// An inventory item in its edition-native NBT shape, without a slot number.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryItem {
    pub nbt: NbtCompound,
}

impl InventoryItem {
    pub fn new(nbt: NbtCompound) -> Self {
        Self { nbt }
    }

    /// Namespaced item id (`id` in Java, `Name` in Bedrock).
    pub fn item_id(&self) -> Option<&str> {
        nbt::get_str(&self.nbt, "id").or_else(|| nbt::get_str(&self.nbt, "Name"))
    }

    pub fn count(&self) -> i64 {
        nbt::get_int(&self.nbt, "Count")
            .or_else(|| nbt::get_int(&self.nbt, "count"))
            .unwrap_or(1)
    }

    /// Bedrock keeps placeholder entries for vacant slots.
    pub fn is_placeholder(&self) -> bool {
        self.item_id().map_or(true, str::is_empty) || self.count() <= 0
    }

    pub(crate) fn into_slotted(self, slot: usize) -> NbtCompound {
        let mut nbt = self.nbt;
        nbt.insert("Slot", NbtTag::Byte(slot as i8));
        nbt
    }
}

/// A player's persisted inventory plus the rest of its record.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub name: String,
    /// Main inventory grid, always [`INVENTORY_SLOTS`] long.
    pub slots: Vec<Option<InventoryItem>>,
    /// Inventory entries outside the main grid (armor, offhand), kept verbatim.
    pub(crate) extra_items: Vec<NbtCompound>,
    /// Every other field of the player compound, kept verbatim.
    pub(crate) data: NbtCompound,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: vec![None; INVENTORY_SLOTS],
            extra_items: Vec::new(),
            data: NbtCompound::new(),
        }
    }

    /// Split a native player compound into slots and passthrough data.
    pub(crate) fn from_nbt(name: &str, mut data: NbtCompound) -> Self {
        let mut record = PlayerRecord::new(name);
        let entries = match data.inner_mut().remove("Inventory") {
            Some(NbtTag::List(list)) => list,
            _ => return PlayerRecord { data, ..record },
        };

        for tag in entries.iter() {
            let NbtTag::Compound(entry) = tag else {
                continue;
            };
            let slot = nbt::get_int(entry, "Slot")
                .filter(|s| (0..INVENTORY_SLOTS as i64).contains(s))
                .map(|s| s as usize);
            match slot {
                Some(slot) if record.slots[slot].is_none() => {
                    let mut item = entry.clone();
                    item.inner_mut().remove("Slot");
                    let item = InventoryItem::new(item);
                    if !item.is_placeholder() {
                        record.slots[slot] = Some(item);
                    }
                }
                _ => record.extra_items.push(entry.clone()),
            }
        }

        record.data = data;
        record
    }

    /// Reassemble the native player compound.
    ///
    /// `placeholder` produces the entry written for a vacant slot, if the
    /// edition stores one.
    pub(crate) fn to_nbt(&self, placeholder: Option<fn() -> NbtCompound>) -> NbtCompound {
        let mut entries = Vec::with_capacity(INVENTORY_SLOTS + self.extra_items.len());
        for (slot, item) in self.slots.iter().enumerate() {
            match (item, placeholder) {
                (Some(item), _) => entries.push(NbtTag::Compound(item.clone().into_slotted(slot))),
                (None, Some(empty)) => {
                    entries.push(NbtTag::Compound(InventoryItem::new(empty()).into_slotted(slot)))
                }
                (None, None) => {}
            }
        }
        entries.extend(self.extra_items.iter().cloned().map(NbtTag::Compound));

        let mut data = self.data.clone();
        data.insert("Inventory", NbtTag::List(entries.into()));
        data
    }

    pub fn first_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn empty_slot_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn java_item(id: &str, slot: i8) -> NbtTag {
        let mut item = NbtCompound::new();
        item.insert("id", NbtTag::String(id.to_string()));
        item.insert("Count", NbtTag::Byte(1));
        item.insert("Slot", NbtTag::Byte(slot));
        NbtTag::Compound(item)
    }

    #[test]
    fn player_nbt_splits_main_grid_from_armor() {
        let mut data = NbtCompound::new();
        data.insert("Health", NbtTag::Float(20.0));
        data.insert(
            "Inventory",
            NbtTag::List(
                vec![
                    java_item("minecraft:stone", 0),
                    java_item("minecraft:iron_helmet", 103),
                    java_item("minecraft:dirt", 35),
                ]
                .into(),
            ),
        );

        let record = PlayerRecord::from_nbt("~local", data);
        assert_eq!(record.slots.len(), INVENTORY_SLOTS);
        assert_eq!(record.slots[0].as_ref().unwrap().item_id(), Some("minecraft:stone"));
        assert_eq!(record.slots[35].as_ref().unwrap().item_id(), Some("minecraft:dirt"));
        assert_eq!(record.extra_items.len(), 1);
        assert_eq!(record.first_empty_slot(), Some(1));
        assert_eq!(record.empty_slot_count(), 34);

        let rebuilt = PlayerRecord::from_nbt("~local", record.to_nbt(None));
        assert_eq!(rebuilt, record);
    }

    #[test]
    fn bedrock_placeholders_read_as_empty() {
        let mut empty = NbtCompound::new();
        empty.insert("Name", NbtTag::String(String::new()));
        empty.insert("Count", NbtTag::Byte(0));
        empty.insert("Slot", NbtTag::Byte(4));
        let mut data = NbtCompound::new();
        data.insert("Inventory", NbtTag::List(vec![NbtTag::Compound(empty)].into()));

        let record = PlayerRecord::from_nbt("~local", data);
        assert!(record.slots.iter().all(Option::is_none));
        assert!(record.extra_items.is_empty());
    }

    #[test]
    fn color_buffer_size_is_checked_per_edition() {
        let record = MapRecord::new(MapId(1), vec![0; 128 * 128]);
        assert!(record.validate(Edition::Java).is_ok());
        assert!(matches!(
            record.validate(Edition::Bedrock),
            Err(WorldError::InvalidRecord(_))
        ));
    }

    #[test]
    fn detect_prefers_bedrock_marker() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Edition::detect(dir.path()),
            Err(WorldError::UnknownEdition(_))
        ));

        std::fs::create_dir(dir.path().join("region")).unwrap();
        assert_eq!(Edition::detect(dir.path()).unwrap(), Edition::Java);

        std::fs::create_dir(dir.path().join("db")).unwrap();
        std::fs::write(dir.path().join("db/CURRENT"), b"MANIFEST-000001\n").unwrap();
        assert_eq!(Edition::detect(dir.path()).unwrap(), Edition::Bedrock);
    }
}
