//! MIO0 (spec §6): 4-byte magic `MIO0`, 4-byte decompressed size
//! (endian-dependent, auto-detected at decode per spec §9), and two 4-byte
//! offsets pointing at the match-token and literal-byte sub-streams. The
//! flag-bit sub-stream begins immediately after the 16-byte header. One
//! flag bit per token: `1` = literal (next byte from the literal stream),
//! `0` = match (next 2-byte big-endian token from the token stream:
//! `length-3` in the high nibble, `distance-1` in the low 12 bits).

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{peek, write_placeholder, patch_u32_le, patch_u32_be, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "MIO0";
pub const MAGIC: &[u8; 4] = b"MIO0";
const WINDOW_SIZE: usize = 0x1000;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 18;
const HEADER_SIZE: u32 = 16;

pub struct Mio0;

fn lz_properties() -> LzProperties {
    LzProperties::new(WINDOW_SIZE, MIN_LENGTH, MAX_LENGTH, 1)
}

/// Decode the header honoring spec §9's endian-auto-detection heuristic:
/// the declared decompressed size is tested in both byte orders and the
/// order consistent with a plausible size wins.
fn read_header(hdr: &[u8; 16]) -> Result<(u32, u32, u32, bool)> {
    if &hdr[0..4] != MAGIC {
        return Err(Error::InvalidIdentifier { codec: CODEC });
    }
    let size_le = u32::from_le_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]);
    let size_be = u32::from_be_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]);
    // heuristic: prefer whichever order is not absurdly large
    let big_endian = size_be <= size_le || size_le > 0x1000_0000;
    let (size, token_off, lit_off) = if big_endian {
        (
            size_be,
            u32::from_be_bytes([hdr[8], hdr[9], hdr[10], hdr[11]]),
            u32::from_be_bytes([hdr[12], hdr[13], hdr[14], hdr[15]]),
        )
    } else {
        (
            size_le,
            u32::from_le_bytes([hdr[8], hdr[9], hdr[10], hdr[11]]),
            u32::from_le_bytes([hdr[12], hdr[13], hdr[14], hdr[15]]),
        )
    };
    Ok((size, token_off, lit_off, big_endian))
}

impl Codec for Mio0 {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "MIO0",
            media_type: "application/x-mio0",
            extension_hint: "mio0",
            magic: Some(MAGIC),
            default_look_ahead: false,
        }
    }

    fn is_match(&self, stream: &mut (impl Read + Seek), _filename_hint: Option<&str>) -> bool {
        match peek(stream, 4) {
            Ok(buf) => buf == MAGIC,
            _ => false,
        }
    }

    fn decompressed_size(&self, stream: &mut (impl Read + Seek)) -> Result<u32> {
        let cur = stream.stream_position()?;
        let mut hdr = [0u8; 16];
        stream.read_exact(&mut hdr)?;
        stream.seek(SeekFrom::Start(cur))?;
        let (size, _, _, _) = read_header(&hdr)?;
        Ok(size)
    }

    fn decompress(&self, source: &mut (impl Read + Seek), destination: &mut (impl Write + Seek)) -> Result<()> {
        let mut hdr = [0u8; 16];
        source.read_exact(&mut hdr)?;
        let (decompressed_size, token_off, lit_off, _big_endian) = read_header(&hdr)?;

        let mut rest = Vec::new();
        source.read_to_end(&mut rest)?;
        // offsets are relative to the start of the file (header included)
        let flags = &rest[0..(token_off as usize - 16)];
        let tokens = &rest[(token_off as usize - 16)..(lit_off as usize - 16)];
        let literals = &rest[(lit_off as usize - 16)..];

        let mut flag_reader = FlagReader::new(flags, CODEC, FlagWordSize::One, BitOrder::Big, ByteOrder::Big);
        let mut lit_pos = 0usize;
        let mut tok_pos = 0usize;
        let mut window = LzWindows::new(WINDOW_SIZE, destination);

        while window.total_written() < decompressed_size as u64 {
            let is_literal = flag_reader.read_bit()?;
            if is_literal {
                if lit_pos >= literals.len() {
                    return Err(Error::UnexpectedEnd { codec: CODEC });
                }
                window.write_byte(literals[lit_pos])?;
                lit_pos += 1;
            } else {
                if tok_pos + 2 > tokens.len() {
                    return Err(Error::UnexpectedEnd { codec: CODEC });
                }
                let token = u16::from_be_bytes([tokens[tok_pos], tokens[tok_pos + 1]]) as u32;
                tok_pos += 2;
                let length = (token >> 12) as usize + 3;
                let distance = (token & 0xFFF) as usize + 1;
                window.back_copy(distance, length)?;
            }
        }
        if window.total_written() != decompressed_size as u64 {
            return Err(Error::DecompressedSizeMismatch {
                codec: CODEC,
                expected: decompressed_size as u64,
                actual: window.total_written(),
            });
        }
        Ok(())
    }

    fn compress(&self, source: &[u8], destination: &mut (impl Write + Seek), level: Level) -> Result<()> {
        destination.write_all(MAGIC)?;
        destination.write_all(&(source.len() as u32).to_be_bytes())?;
        let token_off_at = write_placeholder(destination, 4)?;
        let lit_off_at = write_placeholder(destination, 4)?;

        let props = lz_properties();
        let matches = find_matches(source, &props, false, level);
        let mut flag_writer = FlagWriter::new(FlagWordSize::One, BitOrder::Big, ByteOrder::Big);
        let mut tokens = Vec::new();
        let mut literals = Vec::new();

        let mut pos = 0usize;
        let mut mi = 0usize;
        while pos < source.len() {
            if mi < matches.len() && matches[mi].offset == pos {
                let m = matches[mi];
                flag_writer.write_bit(false);
                let token = (((m.length - 3) as u32) << 12) | ((m.distance - 1) as u32 & 0xFFF);
                tokens.push((token >> 8) as u8);
                tokens.push(token as u8);
                pos += m.length;
                mi += 1;
            } else {
                flag_writer.write_bit(true);
                literals.push(source[pos]);
                pos += 1;
            }
        }
        let flag_bytes = flag_writer.finish();
        destination.write_all(&flag_bytes)?;

        let start = HEADER_SIZE as u64 + flag_bytes.len() as u64;
        patch_u32_be(destination, token_off_at, start as u32)?;
        destination.write_all(&tokens)?;

        let lit_start = start + tokens.len() as u64;
        patch_u32_be(destination, lit_off_at, lit_start as u32)?;
        destination.write_all(&literals)?;
        let _ = patch_u32_le; // reserved for little-endian-configured encodes
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip() {
        let data = b"MIO0 test buffer with repeats repeats repeats and more text".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Mio0.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(&bytes[0..4], MAGIC);

        let mut input = Cursor::new(bytes.clone());
        assert_eq!(Mio0.decompressed_size(&mut input).unwrap(), data.len() as u32);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Mio0.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn no_compression_round_trips() {
        let data = b"no repeats anywhere in this particular buffer at all".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Mio0.compress(&data, &mut compressed, Level::NoCompression).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        let mut out = Cursor::new(Vec::new());
        Mio0.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }
}
