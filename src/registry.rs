//! Codec registry (spec §9): a mapping from name/MIME/extension to a codec
//! factory, replacing the source's interface-per-codec-plus-reflection
//! enumeration. No reflection is used — the list below is the single place
//! that knows about every format module under [`crate::formats`].

use crate::codec::{Codec, DynCodec, FormatInfo};
use crate::formats::{
    aklz::Aklz, blz::Blz, clz0::Clz0, cnx2::Cnx2, ecd::Ecd, huf20::Huf20, hwgz::Hwgz,
    lz10::Lz10, lz11::Lz11, lz40::Lz40, lz4frame::Lz4Frame, lzo::Lzo, lzss::Lzss, mio0::Mio0,
    wflz::Wflz, yay0::Yay0, yaz0::Yaz0,
};

/// One entry in the registry: the codec's static info plus a factory that
/// produces a fresh boxed instance. A factory (rather than a shared
/// instance) matches spec §3's `CodecConfig` invariant that no mutable
/// state is shared between instances.
pub struct Entry {
    pub info: FormatInfo,
    pub make: fn() -> Box<dyn DynCodec>,
}

/// Every format in the library, in no particular order. Used by tests that
/// sweep all codecs (spec §8 scenario 3) and by any consumer that wants to
/// enumerate or look codecs up by name/MIME/extension without a reflection
/// facility.
pub fn all() -> Vec<Entry> {
    vec![
        Entry { info: Lzss.info(), make: || Box::new(Lzss) },
        Entry { info: Lz10.info(), make: || Box::new(Lz10) },
        Entry { info: Lz11.info(), make: || Box::new(Lz11) },
        Entry { info: Lz40.info(), make: || Box::new(Lz40) },
        Entry { info: Mio0.info(), make: || Box::new(Mio0) },
        Entry { info: Yay0.info(), make: || Box::new(Yay0) },
        Entry { info: Yaz0.info(), make: || Box::new(Yaz0) },
        Entry { info: Clz0.info(), make: || Box::new(Clz0) },
        Entry { info: Aklz.info(), make: || Box::new(Aklz) },
        Entry { info: Blz.info(), make: || Box::new(Blz) },
        Entry { info: Cnx2.info(), make: || Box::new(Cnx2) },
        Entry { info: Wflz.info(), make: || Box::new(Wflz) },
        Entry { info: Huf20.info(), make: || Box::new(Huf20) },
        Entry { info: Lzo.info(), make: || Box::new(Lzo) },
        Entry { info: Lz4Frame.info(), make: || Box::new(Lz4Frame) },
        Entry { info: Hwgz.info(), make: || Box::new(Hwgz) },
        Entry { info: Ecd.info(), make: || Box::new(Ecd) },
    ]
}

/// Look up a codec by its [`FormatInfo::name`] (case-sensitive, matches the
/// name as declared by the codec itself).
pub fn by_name(name: &str) -> Option<Entry> {
    all().into_iter().find(|e| e.info.name == name)
}

/// Look up a codec by file extension, without the leading dot, matched
/// case-insensitively against [`FormatInfo::extension_hint`].
pub fn by_extension(ext: &str) -> Option<Entry> {
    let ext = ext.trim_start_matches('.');
    all()
        .into_iter()
        .find(|e| e.info.extension_hint.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Level;
    use std::io::Cursor;

    #[test]
    fn registry_lists_every_format() {
        let names: Vec<&str> = all().iter().map(|e| e.info.name).collect();
        assert_eq!(names.len(), 17);
        assert!(names.contains(&"LZ10"));
        assert!(names.contains(&"BLZ"));
        assert!(names.contains(&"HWGZ"));
    }

    #[test]
    fn by_name_round_trips_through_dyn_codec() {
        let entry = by_name("LZ10").expect("LZ10 registered");
        let codec = (entry.make)();
        let data = b"ABABABAB".to_vec();

        let mut compressed = Cursor::new(Vec::new());
        codec.compress_dyn(&data, &mut compressed, Level::Optimal).unwrap();

        let mut input = Cursor::new(compressed.into_inner());
        let mut out = Cursor::new(Vec::new());
        codec.decompress_dyn(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn by_extension_is_case_insensitive() {
        assert!(by_extension(".LZ10").is_some());
        assert!(by_extension("lz10").is_some());
        assert!(by_extension("nonexistent").is_none());
    }
}
