//! Yaz0 (spec §6): 16-byte header (`Yaz0` magic, 4-byte BE decompressed
//! size, 4-byte alignment hint, 4 bytes of zero padding), followed by a
//! single interleaved stream — unlike MIO0/Yay0's three parallel
//! sub-streams. One flag byte covers the next 8 tokens, MSB first: `1`
//! copies one literal byte, `0` reads a 2-byte big-endian code where the
//! top nibble is the length (add 2), or if that nibble is 0, one more byte
//! is read and added to 0x12 for the length; the low 12 bits plus 1 is the
//! look-back distance.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::codec::{peek, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "Yaz0";
pub const MAGIC: &[u8; 4] = b"Yaz0";
const WINDOW_SIZE: usize = 0x1000;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 0x111; // 0xFF + 0x12

pub struct Yaz0;

fn lz_properties() -> LzProperties {
    LzProperties::new(WINDOW_SIZE, MIN_LENGTH, MAX_LENGTH, 1)
}

fn read_header(stream: &mut (impl Read + Seek)) -> Result<u32> {
    let mut hdr = [0u8; 16];
    stream.read_exact(&mut hdr)?;
    if &hdr[0..4] != MAGIC {
        return Err(Error::InvalidIdentifier { codec: CODEC });
    }
    Ok(u32::from_be_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]))
}

impl Codec for Yaz0 {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "Yaz0",
            media_type: "application/x-yaz0",
            extension_hint: "yaz0",
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
        let size = read_header(stream)?;
        stream.seek(SeekFrom::Start(cur))?;
        Ok(size)
    }

    fn decompress(&self, source: &mut (impl Read + Seek), destination: &mut (impl Write + Seek)) -> Result<()> {
        let decompressed_size = read_header(source)? as u64;
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        let mut pos = 0usize;
        let mut mask = 0u8;
        let mut flags = 0u8;
        let mut window = LzWindows::new(WINDOW_SIZE, destination);

        let mut next_byte = || -> Result<u8> {
            if pos >= data.len() {
                return Err(Error::UnexpectedEnd { codec: CODEC });
            }
            let b = data[pos];
            pos += 1;
            Ok(b)
        };

        while window.total_written() < decompressed_size {
            if mask == 0 {
                flags = next_byte()?;
                mask = 0x80;
            }
            if flags & mask != 0 {
                window.write_byte(next_byte()?)?;
            } else {
                let b0 = next_byte()? as u32;
                let b1 = next_byte()? as u32;
                let code = (b0 << 8) | b1;
                let distance = (code & 0xFFF) as usize + 1;
                let length = match code >> 12 {
                    0 => next_byte()? as usize + 0x12,
                    n => n as usize + 2,
                };
                window.back_copy(distance, length)?;
            }
            mask >>= 1;
        }
        if window.total_written() != decompressed_size {
            return Err(Error::DecompressedSizeMismatch {
                codec: CODEC,
                expected: decompressed_size,
                actual: window.total_written(),
            });
        }
        Ok(())
    }

    fn compress(&self, source: &[u8], destination: &mut (impl Write + Seek), level: Level) -> Result<()> {
        destination.write_all(MAGIC)?;
        destination.write_all(&(source.len() as u32).to_be_bytes())?;
        destination.write_all(&[0u8; 8])?; // alignment + padding, always 0 here

        let props = lz_properties();
        let matches = find_matches(source, &props, false, level);

        let mut pos = 0usize;
        let mut mi = 0usize;
        let mut group = Vec::new();
        let mut flags = 0u8;
        let mut mask = 0x80u8;
        let mut body = Vec::new();

        while pos < source.len() {
            if mi < matches.len() && matches[mi].offset == pos {
                let m = matches[mi];
                flags |= 0; // match bit stays 0
                let distance_minus_1 = (m.distance - 1) as u32;
                if m.length >= 0x12 {
                    group.push((distance_minus_1 >> 8) as u8);
                    group.push(distance_minus_1 as u8);
                    group.push((m.length - 0x12) as u8);
                } else {
                    group.push((((m.length - 2) as u32) << 4 | (distance_minus_1 >> 8)) as u8);
                    group.push(distance_minus_1 as u8);
                }
                pos += m.length;
                mi += 1;
            } else {
                flags |= mask;
                group.push(source[pos]);
                pos += 1;
            }
            mask >>= 1;
            if mask == 0 {
                body.push(flags);
                body.extend_from_slice(&group);
                group.clear();
                flags = 0;
                mask = 0x80;
            }
        }
        if mask != 0x80 {
            body.push(flags);
            body.extend_from_slice(&group);
        }
        destination.write_all(&body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(data: &[u8]) {
        let mut compressed = Cursor::new(Vec::new());
        Yaz0.compress(data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(&bytes[12..16], &[0u8; 4]);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Yaz0.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn round_trip_with_repeats() {
        round_trip(b"Yaz0 sample text with repeats repeats repeats and a tail");
    }

    #[test]
    fn round_trip_long_match_needs_third_byte() {
        let mut data = vec![b'M'; 80];
        data.extend_from_slice(b"non repeating tail section of data");
        round_trip(&data);
    }

    #[test]
    fn decompressed_size_reads_header() {
        let data = b"header probe".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Yaz0.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        assert_eq!(Yaz0.decompressed_size(&mut input).unwrap(), data.len() as u32);
    }
}
