//! Little-endian NBT as stored in Bedrock's key-value database.
//!
//! Layout matches the big-endian Java flavor except that every multi-byte
//! number (including string and array lengths) is little-endian and strings
//! are plain UTF-8.

use quartz_nbt::{NbtCompound, NbtList, NbtTag};

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

const MAX_DEPTH: usize = 512;

/// Decode a named root compound. Trailing bytes are ignored.
pub fn read_root(bytes: &[u8]) -> Result<(String, NbtCompound), String> {
    let mut reader = Reader { bytes, pos: 0 };
    let tag = reader.u8()?;
    if tag != TAG_COMPOUND {
        return Err(format!("root tag is {tag}, expected a compound"));
    }
    let name = reader.string()?;
    let root = reader.compound(0)?;
    Ok((name, root))
}

/// Encode `root` as a named root compound.
pub fn write_root(name: &str, root: &NbtCompound) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    out.push(TAG_COMPOUND);
    write_string(&mut out, name)?;
    write_compound(&mut out, root)?;
    Ok(out)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| format!("unexpected end of data at offset {}", self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], String> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8, String> {
        Ok(self.array::<1>()?[0])
    }

    fn i16(&mut self) -> Result<i16, String> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32, String> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, String> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn len(&mut self) -> Result<usize, String> {
        let len = self.i32()?;
        usize::try_from(len).map_err(|_| format!("negative length {len} at offset {}", self.pos))
    }

    fn string(&mut self) -> Result<String, String> {
        let len = u16::from_le_bytes(self.array()?) as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|e| e.to_string())
    }

    fn compound(&mut self, depth: usize) -> Result<NbtCompound, String> {
        if depth > MAX_DEPTH {
            return Err("nesting too deep".to_string());
        }
        let mut out = NbtCompound::new();
        loop {
            let tag = self.u8()?;
            if tag == TAG_END {
                return Ok(out);
            }
            let name = self.string()?;
            let value = self.payload(tag, depth + 1)?;
            out.insert(name, value);
        }
    }

    fn payload(&mut self, tag: u8, depth: usize) -> Result<NbtTag, String> {
        Ok(match tag {
            TAG_BYTE => NbtTag::Byte(self.u8()? as i8),
            TAG_SHORT => NbtTag::Short(self.i16()?),
            TAG_INT => NbtTag::Int(self.i32()?),
            TAG_LONG => NbtTag::Long(self.i64()?),
            TAG_FLOAT => NbtTag::Float(f32::from_le_bytes(self.array()?)),
            TAG_DOUBLE => NbtTag::Double(f64::from_le_bytes(self.array()?)),
            TAG_BYTE_ARRAY => {
                let len = self.len()?;
                NbtTag::ByteArray(self.take(len)?.iter().map(|b| *b as i8).collect())
            }
            TAG_STRING => NbtTag::String(self.string()?),
            TAG_LIST => {
                let element = self.u8()?;
                let len = self.len()?;
                if element == TAG_END && len > 0 {
                    return Err("list of end tags with non-zero length".to_string());
                }
                let mut items = Vec::with_capacity(len.min(4096));
                for _ in 0..len {
                    items.push(self.payload(element, depth + 1)?);
                }
                NbtTag::List(NbtList::from(items))
            }
            TAG_COMPOUND => NbtTag::Compound(self.compound(depth)?),
            TAG_INT_ARRAY => {
                let len = self.len()?;
                let mut items = Vec::with_capacity(len.min(4096));
                for _ in 0..len {
                    items.push(self.i32()?);
                }
                NbtTag::IntArray(items)
            }
            TAG_LONG_ARRAY => {
                let len = self.len()?;
                let mut items = Vec::with_capacity(len.min(4096));
                for _ in 0..len {
                    items.push(self.i64()?);
                }
                NbtTag::LongArray(items)
            }
            other => return Err(format!("unknown tag type {other}")),
        })
    }
}

fn tag_id(tag: &NbtTag) -> u8 {
    match tag {
        NbtTag::Byte(_) => TAG_BYTE,
        NbtTag::Short(_) => TAG_SHORT,
        NbtTag::Int(_) => TAG_INT,
        NbtTag::Long(_) => TAG_LONG,
        NbtTag::Float(_) => TAG_FLOAT,
        NbtTag::Double(_) => TAG_DOUBLE,
        NbtTag::ByteArray(_) => TAG_BYTE_ARRAY,
        NbtTag::String(_) => TAG_STRING,
        NbtTag::List(_) => TAG_LIST,
        NbtTag::Compound(_) => TAG_COMPOUND,
        NbtTag::IntArray(_) => TAG_INT_ARRAY,
        NbtTag::LongArray(_) => TAG_LONG_ARRAY,
    }
}

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<(), String> {
    let len = i32::try_from(len).map_err(|_| format!("length {len} does not fit in NBT"))?;
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn write_string(out: &mut Vec<u8>, value: &str) -> Result<(), String> {
    let len = u16::try_from(value.len())
        .map_err(|_| format!("string of {} bytes is too long for NBT", value.len()))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

fn write_compound(out: &mut Vec<u8>, compound: &NbtCompound) -> Result<(), String> {
    for (name, value) in compound.inner().iter() {
        out.push(tag_id(value));
        write_string(out, name)?;
        write_payload(out, value)?;
    }
    out.push(TAG_END);
    Ok(())
}

fn write_payload(out: &mut Vec<u8>, tag: &NbtTag) -> Result<(), String> {
    match tag {
        NbtTag::Byte(v) => out.push(*v as u8),
        NbtTag::Short(v) => out.extend_from_slice(&v.to_le_bytes()),
        NbtTag::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
        NbtTag::Long(v) => out.extend_from_slice(&v.to_le_bytes()),
        NbtTag::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
        NbtTag::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
        NbtTag::ByteArray(v) => {
            write_len(out, v.len())?;
            out.extend(v.iter().map(|b| *b as u8));
        }
        NbtTag::String(v) => write_string(out, v)?,
        NbtTag::List(list) => {
            let element = list.iter().next().map_or(TAG_END, tag_id);
            if list.iter().any(|item| tag_id(item) != element) {
                return Err("list elements do not share one tag type".to_string());
            }
            out.push(element);
            write_len(out, list.len())?;
            for item in list.iter() {
                write_payload(out, item)?;
            }
        }
        NbtTag::Compound(v) => write_compound(out, v)?,
        NbtTag::IntArray(v) => {
            write_len(out, v.len())?;
            for item in v {
                out.extend_from_slice(&item.to_le_bytes());
            }
        }
        NbtTag::LongArray(v) => {
            write_len(out, v.len())?;
            for item in v {
                out.extend_from_slice(&item.to_le_bytes());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hand_built_little_endian_bytes() {
        // compound "" { short "width": 128, list "d": [] }
        let mut bytes = vec![TAG_COMPOUND, 0, 0];
        bytes.extend_from_slice(&[TAG_SHORT, 5, 0]);
        bytes.extend_from_slice(b"width");
        bytes.extend_from_slice(&128i16.to_le_bytes());
        bytes.extend_from_slice(&[TAG_LIST, 1, 0, b'd', TAG_END, 0, 0, 0, 0]);
        bytes.push(TAG_END);

        let (name, root) = read_root(&bytes).unwrap();
        assert_eq!(name, "");
        assert!(matches!(root.inner().get("width"), Some(NbtTag::Short(128))));
        assert!(matches!(root.inner().get("d"), Some(NbtTag::List(l)) if l.len() == 0));

        assert_eq!(write_root("", &root).unwrap().len(), bytes.len());
    }

    #[test]
    fn nested_values_survive_encoding() {
        let mut inner = NbtCompound::new();
        inner.insert("map_uuid", NbtTag::Long(-7_000_000_000));
        let mut root = NbtCompound::new();
        root.insert("Name", NbtTag::String("minecraft:filled_map".into()));
        root.insert("tag", NbtTag::Compound(inner));
        root.insert("colors", NbtTag::ByteArray(vec![-1, 0, 1]));
        root.insert("ints", NbtTag::IntArray(vec![1, -2]));

        let bytes = write_root("", &root).unwrap();
        let (_, decoded) = read_root(&bytes).unwrap();
        assert_eq!(decoded, root);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut root = NbtCompound::new();
        root.insert("x", NbtTag::Int(1));
        let bytes = write_root("", &root).unwrap();
        assert!(read_root(&bytes[..bytes.len() - 3]).is_err());
        assert!(read_root(&[TAG_INT, 0, 0]).is_err());
    }

    #[test]
    fn mixed_lists_are_rejected() {
        let mut root = NbtCompound::new();
        root.insert(
            "bad",
            NbtTag::List(NbtList::from(vec![NbtTag::Int(1), NbtTag::Byte(1)])),
        );
        assert!(write_root("", &root).is_err());
    }
}
