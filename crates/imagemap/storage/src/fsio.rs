//! Durable file replacement and gzip NBT files.

use std::fs::{self, File, OpenOptions};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use quartz_nbt::io::Flavor;
use quartz_nbt::NbtCompound;

use crate::error::{WorldError, WorldResult};

/// Replace `path` with `bytes` so that readers see either the old or the new
/// contents, never a mix, and the new contents are on disk on return.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> WorldResult<()> {
    let tmp = tmp_path(path);
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .map_err(WorldError::io(&tmp))?;
    file.write_all(bytes).map_err(WorldError::io(&tmp))?;
    file.sync_all().map_err(WorldError::io(&tmp))?;
    drop(file);

    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(WorldError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    sync_parent(path)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".imagemap-tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> WorldResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => File::open(dir)
            .and_then(|d| d.sync_all())
            .map_err(WorldError::io(dir)),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> WorldResult<()> {
    Ok(())
}

/// Read a gzip-compressed big-endian NBT file.
pub fn read_gzip_nbt(path: &Path) -> WorldResult<NbtCompound> {
    let bytes = fs::read(path).map_err(WorldError::io(path))?;
    let (root, _) = quartz_nbt::io::read_nbt(&mut Cursor::new(bytes), Flavor::GzCompressed)
        .map_err(|e| WorldError::nbt(path.display().to_string())(e.to_string()))?;
    Ok(root)
}

/// Write `root` as a gzip-compressed big-endian NBT file, atomically.
pub fn write_gzip_nbt(path: &Path, root: &NbtCompound, level: u32) -> WorldResult<()> {
    let mut bytes = Vec::new();
    quartz_nbt::io::write_nbt(
        &mut bytes,
        Some(""),
        root,
        Flavor::GzCompressedWith(Compression::new(level)),
    )
    .map_err(|e| WorldError::nbt(path.display().to_string())(e.to_string()))?;
    write_atomic(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quartz_nbt::NbtTag;

    #[test]
    fn atomic_write_replaces_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map_0.dat");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn gzip_nbt_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idcounts.dat");
        let mut root = NbtCompound::new();
        root.insert("DataVersion", NbtTag::Int(3465));

        write_gzip_nbt(&path, &root, 6).unwrap();
        assert_eq!(read_gzip_nbt(&path).unwrap(), root);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.dat");
        match read_gzip_nbt(&path) {
            Err(WorldError::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected {other:?}"),
        }
    }
}
