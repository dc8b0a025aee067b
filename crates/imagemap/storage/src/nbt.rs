//! Lenient accessors over `quartz_nbt` compounds.
//!
//! Saves written by different game versions disagree on the numeric width of
//! several fields, so integer reads accept any integral tag.

use quartz_nbt::{NbtCompound, NbtList, NbtTag};

pub fn get_int(compound: &NbtCompound, key: &str) -> Option<i64> {
    match compound.inner().get(key)? {
        NbtTag::Byte(v) => Some(i64::from(*v)),
        NbtTag::Short(v) => Some(i64::from(*v)),
        NbtTag::Int(v) => Some(i64::from(*v)),
        NbtTag::Long(v) => Some(*v),
        _ => None,
    }
}

pub fn get_str<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a str> {
    match compound.inner().get(key)? {
        NbtTag::String(v) => Some(v.as_str()),
        _ => None,
    }
}

pub fn get_compound<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a NbtCompound> {
    match compound.inner().get(key)? {
        NbtTag::Compound(v) => Some(v),
        _ => None,
    }
}

pub fn get_list<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a NbtList> {
    match compound.inner().get(key)? {
        NbtTag::List(v) => Some(v),
        _ => None,
    }
}

pub fn get_bytes(compound: &NbtCompound, key: &str) -> Option<Vec<u8>> {
    match compound.inner().get(key)? {
        NbtTag::ByteArray(v) => Some(v.iter().map(|b| *b as u8).collect()),
        _ => None,
    }
}

pub fn byte_array(bytes: &[u8]) -> NbtTag {
    NbtTag::ByteArray(bytes.iter().map(|b| *b as i8).collect())
}

pub fn flag(value: bool) -> NbtTag {
    NbtTag::Byte(i8::from(value))
}

pub fn compound(entries: Vec<(&str, NbtTag)>) -> NbtCompound {
    let mut out = NbtCompound::new();
    for (key, value) in entries {
        out.insert(key, value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_reads_accept_any_width() {
        let c = compound(vec![
            ("a", NbtTag::Byte(-3)),
            ("b", NbtTag::Short(300)),
            ("c", NbtTag::Long(1 << 40)),
            ("s", NbtTag::String("x".into())),
        ]);
        assert_eq!(get_int(&c, "a"), Some(-3));
        assert_eq!(get_int(&c, "b"), Some(300));
        assert_eq!(get_int(&c, "c"), Some(1 << 40));
        assert_eq!(get_int(&c, "s"), None);
        assert_eq!(get_str(&c, "s"), Some("x"));
        assert_eq!(get_int(&c, "missing"), None);
    }

    #[test]
    fn byte_arrays_keep_high_bit_values() {
        let c = compound(vec![("colors", byte_array(&[0, 127, 128, 255]))]);
        assert_eq!(get_bytes(&c, "colors"), Some(vec![0, 127, 128, 255]));
    }
}
