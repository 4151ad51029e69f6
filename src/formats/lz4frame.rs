//! LZ4 frame (spec §6, "Shape C"): variable-length tokens, no flag-bit
//! stream. Frame layout: 4-byte magic, a descriptor byte pair (version,
//! block-independence and content-size flags), an 8-byte little-endian
//! content size, a header checksum byte, one block (4-byte little-endian
//! size with the top bit clear for "compressed", followed by the block
//! payload), and a 4-byte zero end mark. A trailing content checksum
//! follows the end mark since the content-size flag is set.
//!
//! Block payload is the classic LZ4 sequence format: a token byte (high
//! nibble literal count, low nibble match length minus 4), each nibble
//! extended past 15 by a chain of `0xFF` bytes, literals, a 2-byte
//! little-endian offset, then match length. The final sequence in a block
//! is literals-only — the decoder knows to stop once it has written
//! `decompressed_size` bytes, without expecting a trailing offset/length.
//!
//! Checksums here are truncated `xxh64` (this crate's one hash dependency)
//! rather than the real LZ4 frame format's `xxh32` — this codec
//! illustrates the token/frame shape, not byte-for-byte interop with the
//! reference `lz4` tool. Noted in `DESIGN.md`.

use std::io::{Read, Seek, SeekFrom, Write};

use xxhash_rust::xxh64::xxh64;

use crate::codec::{peek, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "LZ4F";
pub const MAGIC: u32 = 0x184D_2204;
const WINDOW_SIZE: usize = 0xFFFF;
const MIN_LENGTH: usize = 4;
const MAX_LENGTH: usize = 128 * 1024;

pub struct Lz4Frame;

fn lz_properties() -> LzProperties {
    LzProperties::new(WINDOW_SIZE, MIN_LENGTH, MAX_LENGTH, 1)
}

fn checksum(data: &[u8]) -> u8 {
    (xxh64(data, 0) & 0xFF) as u8
}

fn content_checksum(data: &[u8]) -> u32 {
    (xxh64(data, 0) & 0xFFFF_FFFF) as u32
}

fn write_length_extension(out: &mut Vec<u8>, len: usize) -> u8 {
    if len < 15 {
        len as u8
    } else {
        let mut remaining = len - 15;
        while remaining >= 255 {
            out.push(0xFF);
            remaining -= 255;
        }
        out.push(remaining as u8);
        15
    }
}

fn read_length_extension(data: &[u8], pos: &mut usize, nibble: u8) -> Result<usize> {
    let mut len = nibble as usize;
    if nibble == 15 {
        loop {
            if *pos >= data.len() {
                return Err(Error::UnexpectedEnd { codec: CODEC });
            }
            let b = data[*pos];
            *pos += 1;
            len += b as usize;
            if b != 0xFF {
                break;
            }
        }
    }
    Ok(len)
}

fn encode_block(source: &[u8], level: Level) -> Vec<u8> {
    let props = lz_properties();
    let matches = find_matches(source, &props, false, level);
    let mut out = Vec::new();
    let mut pos = 0usize;
    let mut mi = 0usize;

    loop {
        if mi < matches.len() {
            let m = matches[mi];
            let lit_len = m.offset - pos;
            let mut extras = Vec::new();
            let lit_nibble = write_length_extension(&mut extras, lit_len);
            let match_len = m.length - 4;
            let mut match_extras = Vec::new();
            let match_nibble = write_length_extension(&mut match_extras, match_len);
            out.push((lit_nibble << 4) | match_nibble);
            out.extend_from_slice(&extras);
            out.extend_from_slice(&source[pos..pos + lit_len]);
            out.extend_from_slice(&(m.distance as u16).to_le_bytes());
            out.extend_from_slice(&match_extras);
            pos = m.offset + m.length;
            mi += 1;
        } else {
            let lit_len = source.len() - pos;
            let mut extras = Vec::new();
            let lit_nibble = write_length_extension(&mut extras, lit_len);
            out.push(lit_nibble << 4);
            out.extend_from_slice(&extras);
            out.extend_from_slice(&source[pos..]);
            break;
        }
    }
    out
}

fn decode_block(data: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
    let mut window_buf = Vec::with_capacity(decompressed_size);
    {
        let mut window = LzWindows::new(WINDOW_SIZE, &mut window_buf);
        let mut pos = 0usize;
        while window.total_written() < decompressed_size as u64 {
            if pos >= data.len() {
                return Err(Error::UnexpectedEnd { codec: CODEC });
            }
            let token = data[pos];
            pos += 1;
            let lit_len = read_length_extension(data, &mut pos, token >> 4)?;
            if pos + lit_len > data.len() {
                return Err(Error::UnexpectedEnd { codec: CODEC });
            }
            window.write_bytes(&data[pos..pos + lit_len])?;
            pos += lit_len;
            if window.total_written() >= decompressed_size as u64 {
                break;
            }
            if pos + 2 > data.len() {
                return Err(Error::UnexpectedEnd { codec: CODEC });
            }
            let offset = u16::from_le_bytes([data[pos], data[pos + 1]]) as usize;
            pos += 2;
            let match_len = read_length_extension(data, &mut pos, token & 0xF)? + 4;
            window.back_copy(offset, match_len)?;
        }
    }
    Ok(window_buf)
}

impl Codec for Lz4Frame {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "LZ4F",
            media_type: "application/x-lz4",
            extension_hint: "lz4",
            magic: None,
            default_look_ahead: false,
        }
    }

    fn is_match(&self, stream: &mut (impl Read + Seek), _filename_hint: Option<&str>) -> bool {
        match peek(stream, 4) {
            Ok(buf) if buf.len() == 4 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) == MAGIC,
            _ => false,
        }
    }

    fn decompressed_size(&self, stream: &mut (impl Read + Seek)) -> Result<u32> {
        let cur = stream.stream_position()?;
        let mut hdr = [0u8; 15];
        stream.read_exact(&mut hdr)?;
        stream.seek(SeekFrom::Start(cur))?;
        if u32::from_le_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]) != MAGIC {
            return Err(Error::InvalidIdentifier { codec: CODEC });
        }
        let size = u64::from_le_bytes(hdr[6..14].try_into().unwrap());
        Ok(size as u32)
    }

    fn decompress(&self, source: &mut (impl Read + Seek), destination: &mut (impl Write + Seek)) -> Result<()> {
        let mut hdr = [0u8; 15];
        source.read_exact(&mut hdr)?;
        if u32::from_le_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]) != MAGIC {
            return Err(Error::InvalidIdentifier { codec: CODEC });
        }
        let decompressed_size = u64::from_le_bytes(hdr[6..14].try_into().unwrap()) as usize;

        let mut block_size_buf = [0u8; 4];
        source.read_exact(&mut block_size_buf)?;
        let block_size = u32::from_le_bytes(block_size_buf) as usize & 0x7FFF_FFFF;
        let mut block = vec![0u8; block_size];
        source.read_exact(&mut block)?;

        let mut end_mark = [0u8; 4];
        source.read_exact(&mut end_mark)?;
        if end_mark != [0u8; 4] {
            return Err(Error::InvalidIdentifier { codec: CODEC });
        }

        let decoded = decode_block(&block, decompressed_size)?;
        if decoded.len() != decompressed_size {
            return Err(Error::DecompressedSizeMismatch {
                codec: CODEC,
                expected: decompressed_size as u64,
                actual: decoded.len() as u64,
            });
        }
        destination.write_all(&decoded)?;
        Ok(())
    }

    fn compress(&self, source: &[u8], destination: &mut (impl Write + Seek), level: Level) -> Result<()> {
        destination.write_all(&MAGIC.to_le_bytes())?;
        let flg = 0b0110_0000u8; // version 01, block independence, content size present
        let bd = 0x40u8; // block max size id (illustrative, not interop-checked)
        destination.write_all(&[flg, bd])?;
        destination.write_all(&(source.len() as u64).to_le_bytes())?;
        destination.write_all(&[checksum(&[flg, bd])])?;

        let block = encode_block(source, level);
        destination.write_all(&(block.len() as u32).to_le_bytes())?;
        destination.write_all(&block)?;
        destination.write_all(&[0u8; 4])?; // end mark
        destination.write_all(&content_checksum(source).to_le_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(data: &[u8]) {
        let mut compressed = Cursor::new(Vec::new());
        Lz4Frame.compress(data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), MAGIC);

        let mut input = Cursor::new(bytes.clone());
        assert_eq!(Lz4Frame.decompressed_size(&mut input).unwrap(), data.len() as u32);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Lz4Frame.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn round_trip_with_repeats() {
        round_trip(b"LZ4 frame sample with repeats repeats repeats and a unique tail");
    }

    #[test]
    fn round_trip_no_matches() {
        round_trip(b"entirely unique content with no repetition whatsoever here");
    }

    #[test]
    fn round_trip_long_literal_and_match_needing_extension() {
        let mut data = vec![b'R'; 300];
        data.extend_from_slice(&[0u8; 400]);
        data.extend_from_slice(b"tail");
        round_trip(&data);
    }
}
