//! Classic LZSS (spec §1, §4.5 "Shape A"): a header-less flag/literal/match
//! stream with a 12-bit offset + 4-bit length token, the base shape the
//! header-only subclasses spec §1 calls out (FCMP, GCLZ, GCZ, LZ01,
//! LZSega, Level5LZSS, SDPC, MDF0, ZLB-family) wrap with a fixed header.
//!
//! Grounded on the PS1-era LZSS layout in the pack's `psxutils::formats::lzss`
//! reference file: flag bits consumed LSB-first, `1` = literal, `0` = match,
//! token = `(offset << 4) | (offset >> 8)` big/little nibble pack with the
//! low nibble of the second byte giving `length - min_match_len`. Unlike
//! that reference (decode-only), this module also implements `compress`,
//! driven by `crate::matchfinder`.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{peek, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "LZSS";
const WINDOW_SIZE: usize = 4096;
const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 18; // 2 + 2^4
const PRECURSOR: u8 = 0;

/// Header-less classic LZSS. Because there is no size field, `decompress`
/// runs until the source is exhausted rather than until a target count is
/// reached (spec §4.5's Shape A loop condition is relaxed here to "while
/// bytes remain").
pub struct Lzss;

fn lz_properties() -> LzProperties {
    LzProperties::new(WINDOW_SIZE, MIN_MATCH, MAX_MATCH, 1)
}

impl Codec for Lzss {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "LZSS",
            media_type: "application/x-lzss",
            extension_hint: "lzs",
            magic: None,
            default_look_ahead: true,
        }
    }

    fn is_match(&self, _stream: &mut (impl Read + Seek), filename_hint: Option<&str>) -> bool {
        // LZSS has no magic; best-effort identification by extension only,
        // matching spec §9's note about LZ02-style best-effort detection.
        matches!(filename_hint, Some(h) if h.to_ascii_lowercase().ends_with(".lzs"))
    }

    fn decompressed_size(&self, stream: &mut (impl Read + Seek)) -> Result<u32> {
        let cur = stream.stream_position()?;
        let end = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(cur))?;
        // worst case every token is a literal behind a flag bit
        Ok((end - cur) as u32 * 8)
    }

    fn decompress(&self, source: &mut (impl Read + Seek), destination: &mut (impl Write + Seek)) -> Result<()> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        let mut reader = FlagReader::new(&data, CODEC, FlagWordSize::One, BitOrder::Little, ByteOrder::Little);
        let mut window = LzWindows::new(WINDOW_SIZE, destination);
        window.prefill(PRECURSOR, WINDOW_SIZE);
        let mut pos_counter: usize = WINDOW_SIZE; // mirrors compress()'s `next_written`

        loop {
            let is_literal = match reader.read_bit() {
                Ok(b) => b,
                Err(Error::UnexpectedEnd { .. }) => break,
                Err(e) => return Err(e),
            };
            if is_literal {
                let b = match reader.read_byte() {
                    Ok(b) => b,
                    Err(Error::UnexpectedEnd { .. }) => break,
                    Err(e) => return Err(e),
                };
                window.write_byte(b)?;
                pos_counter += 1;
            } else {
                let b0 = reader.read_byte()?;
                let b1 = reader.read_byte()?;
                let offset = ((b0 as usize) << 4) | ((b1 as usize) >> 4);
                let length = (b1 & 0x0F) as usize + MIN_MATCH;
                let distance = (pos_counter - offset).rem_euclid(WINDOW_SIZE);
                let distance = if distance == 0 { WINDOW_SIZE } else { distance };
                window.back_copy(distance, length)?;
                pos_counter += length;
            }
        }
        Ok(())
    }

    fn compress(&self, source: &[u8], destination: &mut (impl Write + Seek), level: Level) -> Result<()> {
        let props = lz_properties();
        let matches = find_matches(source, &props, true, level);
        let mut writer = FlagWriter::new(FlagWordSize::One, BitOrder::Little, ByteOrder::Little);

        let mut pos = 0usize;
        let mut next_written = WINDOW_SIZE; // position counter mirroring decode's window.total_written
        let mut mi = 0usize;
        while pos < source.len() {
            if mi < matches.len() && matches[mi].offset == pos {
                let m = matches[mi];
                writer.write_bit(false);
                let offset = (next_written - m.distance).rem_euclid(WINDOW_SIZE);
                let b0 = (offset >> 4) as u8;
                let b1 = (((offset & 0xF) << 4) | (m.length - MIN_MATCH)) as u8;
                writer.write_byte(b0);
                writer.write_byte(b1);
                pos += m.length;
                next_written += m.length;
                mi += 1;
            } else {
                writer.write_bit(true);
                writer.write_byte(source[pos]);
                pos += 1;
                next_written += 1;
            }
        }
        let bytes = writer.finish();
        destination.write_all(&bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_small() {
        let data = b"ABABABABABABABAB this is a test of the lzss codec ABABABABABABABAB".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Lzss.compress(&data, &mut compressed, Level::Optimal).unwrap();

        let mut input = Cursor::new(compressed.into_inner());
        let mut out = Cursor::new(Vec::new());
        Lzss.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner()[..data.len()], data[..]);
    }

    #[test]
    fn no_compression_round_trips() {
        let data = b"just some literal bytes, nothing repeats here".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Lzss.compress(&data, &mut compressed, Level::NoCompression).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        let mut out = Cursor::new(Vec::new());
        Lzss.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner()[..data.len()], data[..]);
    }
}
