//! End-to-end runs of the engine against Bedrock saves on disk.

use std::path::Path;

use imagemap_engine::{
    add_container, commit, delete_maps, next_free_id, preview, ChestOptions, CommitPolicy,
    Edition, EngineConfig, MapId, PendingMap, WorldError, WorldHandle, WorldStorage, LOCAL_PLAYER,
};
use imagemap_storage::bedrock::leveldb_options;
use imagemap_storage::nbt::compound;
use imagemap_storage::nbt_le;
use quartz_nbt::{NbtList, NbtTag};
use rusty_leveldb::DB;

const LOCAL_PLAYER_KEY: &[u8] = b"~local_player";

fn item(name: &str, count: i8, slot: i8) -> NbtTag {
    NbtTag::Compound(compound(vec![
        ("Name", NbtTag::String(name.into())),
        ("Count", NbtTag::Byte(count)),
        ("Damage", NbtTag::Short(0)),
        ("WasPickedUp", NbtTag::Byte(0)),
        ("Slot", NbtTag::Byte(slot)),
    ]))
}

/// A Bedrock save whose local player holds torches in `occupied` slots and
/// empty placeholders everywhere else.
fn bedrock_world(occupied: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DB::open(dir.path().join("db"), leveldb_options(6, true)).unwrap();

    let inventory: Vec<NbtTag> = (0..36i8)
        .map(|slot| {
            if (slot as usize) < occupied {
                item("minecraft:torch", 16, slot)
            } else {
                item("", 0, slot)
            }
        })
        .collect();
    let player = compound(vec![
        ("Inventory", NbtTag::List(NbtList::from(inventory))),
        ("PlayerLevel", NbtTag::Int(30)),
    ]);
    db.put(LOCAL_PLAYER_KEY, &nbt_le::write_root("", &player).unwrap())
        .unwrap();
    db.flush().unwrap();
    drop(db);
    dir
}

/// Raw value stored under `key`, read with the world closed.
fn raw_value(path: &Path, key: &[u8]) -> Option<Vec<u8>> {
    let mut db = DB::open(path.join("db"), leveldb_options(6, false)).unwrap();
    db.get(key)
}

fn open(path: &Path) -> WorldHandle {
    EngineConfig::default().open_world(path, None).unwrap()
}

fn pending(fill: u8) -> PendingMap {
    PendingMap::new(vec![fill; Edition::Bedrock.color_buffer_len()])
}

fn ids(handle: &WorldHandle) -> Vec<MapId> {
    handle.list_map_ids().unwrap().into_iter().collect()
}

#[test]
fn commit_then_delete_round_trip() {
    let dir = bedrock_world(0);
    let mut world = open(dir.path());
    assert_eq!(world.edition(), Edition::Bedrock);

    let batch = vec![
        pending(1),
        pending(2).with_id(MapId(-5_000_000_000)),
        pending(3),
    ];
    assert!(preview(&world, &batch).unwrap().is_clean());
    let report = commit(&mut world, &batch, CommitPolicy::Skip).unwrap();
    assert_eq!(report.count_applied(), 3);
    assert_eq!(ids(&world), vec![MapId(-5_000_000_000), MapId(0), MapId(1)]);
    assert_eq!(world.read_map(MapId(-5_000_000_000)).unwrap().colors[0], 2);
    assert_eq!(next_free_id(&world).unwrap(), MapId(2));

    let again = commit(
        &mut world,
        &[pending(9).with_id(MapId(0))],
        CommitPolicy::Skip,
    )
    .unwrap();
    assert_eq!(again.skipped, vec![MapId(0)]);
    assert_eq!(world.read_map(MapId(0)).unwrap().colors[0], 1);

    let deleted = delete_maps(&mut world, &[MapId(0), MapId(77)]);
    assert_eq!(deleted.deleted, vec![MapId(0)]);
    assert_eq!(deleted.absent, vec![MapId(77)]);
    drop(world);

    assert!(raw_value(dir.path(), b"map_0").is_none());
    assert!(raw_value(dir.path(), b"map_1").is_some());
    assert!(raw_value(dir.path(), b"map_-5000000000").is_some());
}

#[test]
fn full_inventory_leaves_local_player_byte_for_byte() {
    let dir = bedrock_world(36);
    let before = raw_value(dir.path(), LOCAL_PLAYER_KEY).unwrap();

    let mut world = open(dir.path());
    commit(&mut world, &[pending(1)], CommitPolicy::Skip).unwrap();
    let err = add_container(&mut world, &[MapId(0)], LOCAL_PLAYER, &ChestOptions::default())
        .unwrap_err();
    assert!(matches!(err, WorldError::InsufficientSpace { .. }));
    drop(world);

    assert_eq!(raw_value(dir.path(), LOCAL_PLAYER_KEY).unwrap(), before);
}

#[test]
fn chest_survives_reopen() {
    let dir = bedrock_world(2);
    let mut world = open(dir.path());
    let report = commit(&mut world, &[pending(1), pending(2)], CommitPolicy::Skip).unwrap();
    let options = ChestOptions {
        name: Some("Gallery".to_string()),
    };
    let slot = add_container(&mut world, &report.applied, LOCAL_PLAYER, &options).unwrap();
    assert_eq!(slot, 2);
    drop(world);

    let world = open(dir.path());
    let player = world.read_player(LOCAL_PLAYER).unwrap();
    assert_eq!(player.slots[2].as_ref().unwrap().item_id(), Some("minecraft:chest"));
    assert_eq!(player.slots[0].as_ref().unwrap().item_id(), Some("minecraft:torch"));
    assert_eq!(player.first_empty_slot(), Some(3));
}
