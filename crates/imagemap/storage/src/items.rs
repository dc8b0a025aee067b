//! Builders for the inventory items the engine places: filled maps and chests.

use quartz_nbt::{NbtCompound, NbtList, NbtTag};

use crate::error::{WorldError, WorldResult};
use crate::model::{InventoryItem, MapId};
use crate::nbt::compound;

/// First Java data version (1.20.5) that stores items as components.
pub const JAVA_COMPONENTS_DATA_VERSION: i32 = 3837;

/// Native item layout of a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFormat {
    /// Java before 1.20.5: `Count` byte and free-form `tag`.
    JavaLegacy,
    /// Java 1.20.5 and later: `count` int and `components`.
    JavaComponents,
    Bedrock,
}

impl ItemFormat {
    pub fn for_java_data_version(data_version: i32) -> Self {
        if data_version >= JAVA_COMPONENTS_DATA_VERSION {
            ItemFormat::JavaComponents
        } else {
            ItemFormat::JavaLegacy
        }
    }

    /// A single filled map pointing at `id`.
    ///
    /// Java items hold a 32-bit ID; a wider one is `InvalidId`.
    pub fn filled_map(self, id: MapId) -> WorldResult<InventoryItem> {
        let java_id = || {
            i32::try_from(id.0).map_err(|_| WorldError::InvalidId {
                id,
                reason: "Java map items hold 32-bit IDs".to_string(),
            })
        };
        let nbt = match self {
            ItemFormat::JavaLegacy => compound(vec![
                ("id", NbtTag::String("minecraft:filled_map".into())),
                ("Count", NbtTag::Byte(1)),
                (
                    "tag",
                    NbtTag::Compound(compound(vec![("map", NbtTag::Int(java_id()?))])),
                ),
            ]),
            ItemFormat::JavaComponents => compound(vec![
                ("id", NbtTag::String("minecraft:filled_map".into())),
                ("count", NbtTag::Int(1)),
                (
                    "components",
                    NbtTag::Compound(compound(vec![(
                        "minecraft:map_id",
                        NbtTag::Int(java_id()?),
                    )])),
                ),
            ]),
            ItemFormat::Bedrock => {
                let mut item = bedrock_base("minecraft:filled_map", 1);
                item.insert(
                    "tag",
                    NbtTag::Compound(compound(vec![("map_uuid", NbtTag::Long(id.0))])),
                );
                item
            }
        };
        Ok(InventoryItem::new(nbt))
    }

    /// A chest holding `contents` in slots `0..contents.len()`.
    ///
    /// Callers enforce the container capacity.
    pub fn container(self, contents: Vec<InventoryItem>, name: Option<&str>) -> InventoryItem {
        let nbt = match self {
            ItemFormat::JavaLegacy => {
                let items: Vec<NbtTag> = contents
                    .into_iter()
                    .enumerate()
                    .map(|(slot, item)| NbtTag::Compound(item.into_slotted(slot)))
                    .collect();
                let mut tag = compound(vec![(
                    "BlockEntityTag",
                    NbtTag::Compound(compound(vec![("Items", NbtTag::List(NbtList::from(items)))])),
                )]);
                if let Some(name) = name {
                    tag.insert(
                        "display",
                        NbtTag::Compound(compound(vec![("Name", json_text(name))])),
                    );
                }
                compound(vec![
                    ("id", NbtTag::String("minecraft:chest".into())),
                    ("Count", NbtTag::Byte(1)),
                    ("tag", NbtTag::Compound(tag)),
                ])
            }
            ItemFormat::JavaComponents => {
                let items: Vec<NbtTag> = contents
                    .into_iter()
                    .enumerate()
                    .map(|(slot, item)| {
                        NbtTag::Compound(compound(vec![
                            ("slot", NbtTag::Int(slot as i32)),
                            ("item", NbtTag::Compound(item.nbt)),
                        ]))
                    })
                    .collect();
                let mut components =
                    compound(vec![("minecraft:container", NbtTag::List(NbtList::from(items)))]);
                if let Some(name) = name {
                    components.insert("minecraft:custom_name", json_text(name));
                }
                compound(vec![
                    ("id", NbtTag::String("minecraft:chest".into())),
                    ("count", NbtTag::Int(1)),
                    ("components", NbtTag::Compound(components)),
                ])
            }
            ItemFormat::Bedrock => {
                let items: Vec<NbtTag> = contents
                    .into_iter()
                    .enumerate()
                    .map(|(slot, item)| NbtTag::Compound(item.into_slotted(slot)))
                    .collect();
                let mut tag = compound(vec![("Items", NbtTag::List(NbtList::from(items)))]);
                if let Some(name) = name {
                    tag.insert(
                        "display",
                        NbtTag::Compound(compound(vec![("Name", NbtTag::String(name.into()))])),
                    );
                }
                let mut item = bedrock_base("minecraft:chest", 1);
                item.insert(
                    "Block",
                    NbtTag::Compound(compound(vec![
                        ("name", NbtTag::String("minecraft:chest".into())),
                        ("states", NbtTag::Compound(NbtCompound::new())),
                    ])),
                );
                item.insert("tag", NbtTag::Compound(tag));
                item
            }
        };
        InventoryItem::new(nbt)
    }
}

fn bedrock_base(name: &str, count: i8) -> NbtCompound {
    compound(vec![
        ("Name", NbtTag::String(name.into())),
        ("Count", NbtTag::Byte(count)),
        ("Damage", NbtTag::Short(0)),
        ("WasPickedUp", NbtTag::Byte(0)),
    ])
}

/// Entry Bedrock writes for a vacant inventory slot.
pub(crate) fn bedrock_empty_slot() -> NbtCompound {
    bedrock_base("", 0)
}

fn json_text(text: &str) -> NbtTag {
    NbtTag::String(serde_json::json!({ "text": text }).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::{get_compound, get_int, get_list, get_str};

    #[test]
    fn data_version_selects_item_layout() {
        assert_eq!(ItemFormat::for_java_data_version(3465), ItemFormat::JavaLegacy);
        assert_eq!(ItemFormat::for_java_data_version(3837), ItemFormat::JavaComponents);
    }

    #[test]
    fn legacy_chest_nests_maps_under_block_entity_tag() {
        let maps = vec![
            ItemFormat::JavaLegacy.filled_map(MapId(4)).unwrap(),
            ItemFormat::JavaLegacy.filled_map(MapId(5)).unwrap(),
        ];
        let chest = ItemFormat::JavaLegacy.container(maps, Some("Maps"));
        assert_eq!(chest.item_id(), Some("minecraft:chest"));

        let tag = get_compound(&chest.nbt, "tag").unwrap();
        let items = get_list(get_compound(tag, "BlockEntityTag").unwrap(), "Items").unwrap();
        assert_eq!(items.len(), 2);
        let second = match items.iter().nth(1) {
            Some(NbtTag::Compound(c)) => c,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(get_int(second, "Slot"), Some(1));
        assert_eq!(get_int(get_compound(second, "tag").unwrap(), "map"), Some(5));
        let name = get_str(get_compound(tag, "display").unwrap(), "Name").unwrap();
        assert_eq!(name, r#"{"text":"Maps"}"#);
    }

    #[test]
    fn component_chest_wraps_each_item() {
        let chest = ItemFormat::JavaComponents
            .container(vec![ItemFormat::JavaComponents.filled_map(MapId(9)).unwrap()], None);
        let components = get_compound(&chest.nbt, "components").unwrap();
        let entries = get_list(components, "minecraft:container").unwrap();
        let entry = match entries.iter().next() {
            Some(NbtTag::Compound(c)) => c,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(get_int(entry, "slot"), Some(0));
        let item = get_compound(entry, "item").unwrap();
        assert_eq!(
            get_int(get_compound(item, "components").unwrap(), "minecraft:map_id"),
            Some(9)
        );
        assert!(components.inner().get("minecraft:custom_name").is_none());
    }

    #[test]
    fn bedrock_map_uses_long_uuid() {
        let item = ItemFormat::Bedrock.filled_map(MapId(-123_456_789_012)).unwrap();
        assert_eq!(item.item_id(), Some("minecraft:filled_map"));
        let tag = get_compound(&item.nbt, "tag").unwrap();
        assert_eq!(get_int(tag, "map_uuid"), Some(-123_456_789_012));
        assert!(InventoryItem::new(bedrock_empty_slot()).is_placeholder());
    }

    #[test]
    fn java_map_item_rejects_wide_ids() {
        for format in [ItemFormat::JavaLegacy, ItemFormat::JavaComponents] {
            assert!(matches!(
                format.filled_map(MapId(1 << 40)),
                Err(WorldError::InvalidId { id: MapId(1_099_511_627_776), .. })
            ));
            assert!(format.filled_map(MapId(i32::MAX as i64)).is_ok());
        }
        assert!(ItemFormat::Bedrock.filled_map(MapId(1 << 40)).is_ok());
    }
}
