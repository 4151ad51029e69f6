//! Codec kernel contract (spec §4.5, §6): the uniform surface every wire
//! format in `crate::formats` implements. Re-architected from the source's
//! interface-per-codec-plus-reflection design into a single trait plus an
//! enum-free registry of boxed trait objects (spec §9's "runtime
//! polymorphism" redesign note) — no reflection is needed to enumerate
//! codecs, see `crate::registry`.

use std::io::{Read, Seek, Write};

use crate::error::Result;
pub use crate::matchfinder::Level;

/// Display name, media type, and identification hints for a codec.
#[derive(Clone, Debug)]
pub struct FormatInfo {
    pub name: &'static str,
    pub media_type: &'static str,
    pub extension_hint: &'static str,
    pub magic: Option<&'static [u8]>,
    /// per-codec default for the match-finder's look-ahead flag (spec §9
    /// open question: defaults vary, e.g. LZ10: true, MIO0: false).
    pub default_look_ahead: bool,
}

/// The uniform contract every wire format implements.
///
/// `is_match` must be non-destructive: it reads a bounded prefix and
/// restores the stream position, and must never consume input when it
/// returns `false`.
pub trait Codec {
    fn info(&self) -> FormatInfo;

    fn is_match(&self, stream: &mut (impl Read + Seek), filename_hint: Option<&str>) -> bool;

    fn decompressed_size(&self, stream: &mut (impl Read + Seek)) -> Result<u32>;

    fn decompress(&self, source: &mut (impl Read + Seek), destination: &mut (impl Write + Seek)) -> Result<()>;

    fn compress(&self, source: &[u8], destination: &mut (impl Write + Seek), level: Level) -> Result<()>;
}

/// Object-safe counterpart of [`Codec`], used by the registry so codecs of
/// different concrete types can be stored together. Blanket-implemented for
/// any `Codec` operating over the crate's standard `Read + Seek` /
/// `Write + Seek` stream objects.
pub trait DynCodec: Send + Sync {
    fn info(&self) -> FormatInfo;
    fn is_match_dyn(&self, stream: &mut dyn ReadSeek, filename_hint: Option<&str>) -> bool;
    fn decompressed_size_dyn(&self, stream: &mut dyn ReadSeek) -> Result<u32>;
    fn decompress_dyn(&self, source: &mut dyn ReadSeek, destination: &mut dyn WriteSeek) -> Result<()>;
    fn compress_dyn(&self, source: &[u8], destination: &mut dyn WriteSeek, level: Level) -> Result<()>;
}

/// Object-safe `Read + Seek`.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Object-safe `Write + Seek`.
pub trait WriteSeek: Write + Seek {}
impl<T: Write + Seek> WriteSeek for T {}

impl<C: Codec + Send + Sync> DynCodec for C {
    fn info(&self) -> FormatInfo {
        Codec::info(self)
    }
    fn is_match_dyn(&self, stream: &mut dyn ReadSeek, filename_hint: Option<&str>) -> bool {
        Codec::is_match(self, stream, filename_hint)
    }
    fn decompressed_size_dyn(&self, stream: &mut dyn ReadSeek) -> Result<u32> {
        Codec::decompressed_size(self, stream)
    }
    fn decompress_dyn(&self, source: &mut dyn ReadSeek, destination: &mut dyn WriteSeek) -> Result<()> {
        Codec::decompress(self, source, destination)
    }
    fn compress_dyn(&self, source: &[u8], destination: &mut dyn WriteSeek, level: Level) -> Result<()> {
        Codec::compress(self, source, destination, level)
    }
}

/// Read `n` bytes from `stream` at the current position without permanently
/// moving it; restores the original position on return. Used by `is_match`
/// implementations, which must not consume input on a `false` verdict.
pub fn peek<R: Read + Seek>(stream: &mut R, n: usize) -> std::io::Result<Vec<u8>> {
    let start = stream.stream_position()?;
    let mut buf = vec![0u8; n];
    let read = stream.read(&mut buf)?;
    buf.truncate(read);
    stream.seek(std::io::SeekFrom::Start(start))?;
    Ok(buf)
}

/// Header-placeholder helper (spec §4.5): remember the current position,
/// write a zero placeholder of `width` bytes, and return the offset to
/// patch later with [`patch_u32_le`]/[`patch_u32_be`].
pub fn write_placeholder<W: Write + Seek>(dest: &mut W, width: usize) -> std::io::Result<u64> {
    let at = dest.stream_position()?;
    dest.write_all(&vec![0u8; width])?;
    Ok(at)
}

pub fn patch_u32_le<W: Write + Seek>(dest: &mut W, at: u64, value: u32) -> std::io::Result<()> {
    let cur = dest.stream_position()?;
    dest.seek(std::io::SeekFrom::Start(at))?;
    dest.write_all(&value.to_le_bytes())?;
    dest.seek(std::io::SeekFrom::Start(cur))?;
    Ok(())
}

pub fn patch_u32_be<W: Write + Seek>(dest: &mut W, at: u64, value: u32) -> std::io::Result<()> {
    let cur = dest.stream_position()?;
    dest.seek(std::io::SeekFrom::Start(at))?;
    dest.write_all(&value.to_be_bytes())?;
    dest.seek(std::io::SeekFrom::Start(cur))?;
    Ok(())
}

pub fn patch_u24_le<W: Write + Seek>(dest: &mut W, at: u64, value: u32) -> std::io::Result<()> {
    let cur = dest.stream_position()?;
    dest.seek(std::io::SeekFrom::Start(at))?;
    dest.write_all(&value.to_le_bytes()[..3])?;
    dest.seek(std::io::SeekFrom::Start(cur))?;
    Ok(())
}

pub fn patch_u24_be<W: Write + Seek>(dest: &mut W, at: u64, value: u32) -> std::io::Result<()> {
    let cur = dest.stream_position()?;
    dest.seek(std::io::SeekFrom::Start(at))?;
    let bytes = value.to_be_bytes();
    dest.write_all(&bytes[1..4])?;
    dest.seek(std::io::SeekFrom::Start(cur))?;
    Ok(())
}
