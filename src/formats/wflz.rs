//! WFLZ (spec §6): 4-byte `WFLZ` magic, 4-byte big-endian compressed size,
//! 4-byte big-endian decompressed size. The body is a sequence of 4-byte
//! block headers — `distance: u16` (big-endian), `length: u8`,
//! `literal_count: u8` — each followed by `literal_count` raw bytes. A
//! block with `length == 0` has no back-reference, just the literal run
//! that follows; the stream terminates at a block with both `length` and
//! `literal_count` zero.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::codec::{peek, write_placeholder, patch_u32_be, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "WFLZ";
pub const MAGIC: &[u8; 4] = b"WFLZ";
const WINDOW_SIZE: usize = 0xFFFF;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 255;
const MAX_LITERAL_RUN: usize = 255;

pub struct Wflz;

fn lz_properties() -> LzProperties {
    LzProperties::new(WINDOW_SIZE, MIN_LENGTH, MAX_LENGTH, 1)
}

fn read_header(stream: &mut (impl Read + Seek)) -> Result<(u32, u32)> {
    let mut hdr = [0u8; 12];
    stream.read_exact(&mut hdr)?;
    if &hdr[0..4] != MAGIC {
        return Err(Error::InvalidIdentifier { codec: CODEC });
    }
    let compressed_size = u32::from_be_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]);
    let decompressed_size = u32::from_be_bytes([hdr[8], hdr[9], hdr[10], hdr[11]]);
    Ok((compressed_size, decompressed_size))
}

impl Codec for Wflz {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "WFLZ",
            media_type: "application/x-wflz",
            extension_hint: "wflz",
            magic: Some(MAGIC),
            default_look_ahead: true,
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
        let (_, decompressed_size) = read_header(stream)?;
        stream.seek(SeekFrom::Start(cur))?;
        Ok(decompressed_size)
    }

    fn decompress(&self, source: &mut (impl Read + Seek), destination: &mut (impl Write + Seek)) -> Result<()> {
        let (compressed_size, decompressed_size) = read_header(source)?;
        let body_start = source.stream_position()?;
        let mut window = LzWindows::new(WINDOW_SIZE, destination);

        loop {
            let mut hdr = [0u8; 4];
            source.read_exact(&mut hdr)?;
            let distance = u16::from_be_bytes([hdr[0], hdr[1]]) as usize;
            let length = hdr[2] as usize;
            let literal_count = hdr[3] as usize;
            if length == 0 && literal_count == 0 {
                break;
            }
            if length > 0 {
                window.back_copy(distance, length)?;
            }
            for _ in 0..literal_count {
                let mut b = [0u8; 1];
                source.read_exact(&mut b)?;
                window.write_byte(b[0])?;
            }
        }
        if window.total_written() != decompressed_size as u64 {
            return Err(Error::DecompressedSizeMismatch {
                codec: CODEC,
                expected: decompressed_size as u64,
                actual: window.total_written(),
            });
        }

        // many game files pad the body past the declared compressed size
        // (alignment, trailing junk); non-fatal, trace and keep going.
        let consumed = source.stream_position()? - body_start;
        if consumed != compressed_size as u64 {
            log::trace!(
                "{}",
                Error::CompressedSizeMismatch {
                    codec: CODEC,
                    expected: compressed_size as u64,
                    actual: consumed,
                }
            );
        }
        Ok(())
    }

    fn compress(&self, source: &[u8], destination: &mut (impl Write + Seek), level: Level) -> Result<()> {
        destination.write_all(MAGIC)?;
        let compressed_size_at = write_placeholder(destination, 4)?;
        destination.write_all(&(source.len() as u32).to_be_bytes())?;

        let body_start = destination.stream_position()?;
        let props = lz_properties();
        let matches = find_matches(source, &props, true, level);

        let mut pos = 0usize;
        let mut mi = 0usize;
        while pos < source.len() {
            if mi < matches.len() && matches[mi].offset == pos {
                let m = matches[mi];
                destination.write_all(&(m.distance as u16).to_be_bytes())?;
                destination.write_all(&[m.length as u8, 0u8])?;
                pos += m.length;
                mi += 1;
            } else {
                let next_match = matches.get(mi).map(|m| m.offset).unwrap_or(source.len());
                let run_end = next_match.min(pos + MAX_LITERAL_RUN);
                let count = run_end - pos;
                destination.write_all(&[0u8, 0u8, 0u8, count as u8])?;
                destination.write_all(&source[pos..run_end])?;
                pos = run_end;
            }
        }
        destination.write_all(&[0u8; 4])?; // terminator

        let compressed_size = (destination.stream_position()? - body_start) as u32;
        patch_u32_be(destination, compressed_size_at, compressed_size)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(data: &[u8]) {
        let mut compressed = Cursor::new(Vec::new());
        Wflz.compress(data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(&bytes[0..4], MAGIC);

        let mut input = Cursor::new(bytes.clone());
        assert_eq!(Wflz.decompressed_size(&mut input).unwrap(), data.len() as u32);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Wflz.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn round_trip_with_matches() {
        round_trip(b"WFLZ sample data with repeats repeats repeats and a tail");
    }

    #[test]
    fn round_trip_long_literal_run() {
        let mut data = vec![0u8; 0];
        for i in 0..300u32 {
            data.push((i % 251) as u8);
        }
        round_trip(&data);
    }

    #[test]
    fn terminator_block_is_all_zero() {
        let data = b"short".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Wflz.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(&bytes[bytes.len() - 4..], &[0u8; 4]);
    }
}
