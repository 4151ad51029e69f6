//! LZ11 (spec §6): same 4-byte header as LZ10 but type `0x11`; match tokens
//! are variable width: 2 bytes for lengths 3..16, 3 bytes with an extended
//! length field for 17..272, 4 bytes for up to 65808.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{peek, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "LZ11";
pub const TYPE_BYTE: u8 = 0x11;
const WINDOW_SIZE: usize = 0x1000;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 0xFFFF + 273; // 65808, per spec's "up to 65808"

pub struct Lz11;

fn lz_properties() -> LzProperties {
    LzProperties::new(WINDOW_SIZE, MIN_LENGTH, MAX_LENGTH, 1)
}

fn read_header(stream: &mut (impl Read + Seek)) -> Result<u32> {
    let mut hdr = [0u8; 4];
    stream.read_exact(&mut hdr)?;
    if hdr[0] != TYPE_BYTE {
        return Err(Error::InvalidIdentifier { codec: CODEC });
    }
    Ok(u32::from_le_bytes([hdr[1], hdr[2], hdr[3], 0]))
}

/// Token layout, read MSB-first two bytes at a time until the whole token
/// (2, 3 or 4 bytes) is consumed.
fn read_token(reader: &mut FlagReader) -> Result<(usize, usize)> {
    let b0 = reader.read_byte()? as u32;
    let indicator = b0 >> 4;
    if indicator == 0 {
        // 3-byte token: length-17 in 12 bits after the indicator nibble, then distance
        let b1 = reader.read_byte()? as u32;
        let b2 = reader.read_byte()? as u32;
        let length = (((b0 & 0xF) << 4) | (b1 >> 4)) as usize + 17;
        let distance = ((b1 & 0xF) << 8 | b2) as usize + 1;
        Ok((distance, length))
    } else if indicator == 1 {
        // 4-byte token: 16-bit length field, then 12-bit distance
        let b1 = reader.read_byte()? as u32;
        let b2 = reader.read_byte()? as u32;
        let b3 = reader.read_byte()? as u32;
        let length = (((b0 & 0xF) << 12) | (b1 << 4) | (b2 >> 4)) as usize + 273;
        let distance = (((b2 & 0xF) << 8) | b3) as usize + 1;
        Ok((distance, length))
    } else {
        // 2-byte token: indicator is length-1 (3..16), then 12-bit distance
        let b1 = reader.read_byte()? as u32;
        let length = indicator as usize + 1;
        let distance = (((b0 & 0xF) << 8) | b1) as usize + 1;
        Ok((distance, length))
    }
}

fn write_token(writer: &mut FlagWriter, distance: usize, length: usize) {
    let dist_minus_1 = (distance - 1) as u32;
    if length <= 16 {
        let indicator = (length - 1) as u32;
        let b0 = ((indicator << 4) | (dist_minus_1 >> 8)) as u8;
        let b1 = dist_minus_1 as u8;
        writer.write_byte(b0);
        writer.write_byte(b1);
    } else if length <= 272 {
        let l = (length - 17) as u32;
        let b0 = (l >> 4) as u8; // indicator nibble is 0
        let b1 = (((l & 0xF) << 4) | (dist_minus_1 >> 8)) as u8;
        let b2 = dist_minus_1 as u8;
        writer.write_byte(b0);
        writer.write_byte(b1);
        writer.write_byte(b2);
    } else {
        let l = (length - 273) as u32;
        let b0 = 0x10 | ((l >> 12) & 0xF) as u8;
        let b1 = (l >> 4) as u8;
        let b2 = (((l & 0xF) << 4) | (dist_minus_1 >> 8)) as u8;
        let b3 = dist_minus_1 as u8;
        writer.write_byte(b0);
        writer.write_byte(b1);
        writer.write_byte(b2);
        writer.write_byte(b3);
    }
}

impl Codec for Lz11 {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "LZ11",
            media_type: "application/x-lz11",
            extension_hint: "lz11",
            magic: Some(&[TYPE_BYTE]),
            default_look_ahead: true,
        }
    }

    fn is_match(&self, stream: &mut (impl Read + Seek), _filename_hint: Option<&str>) -> bool {
        match peek(stream, 4) {
            Ok(buf) if buf.len() == 4 => buf[0] == TYPE_BYTE,
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
        let mut reader = FlagReader::new(&data, CODEC, FlagWordSize::One, BitOrder::Big, ByteOrder::Big);
        let mut window = LzWindows::new(WINDOW_SIZE, destination);

        while window.total_written() < decompressed_size {
            let is_match = reader.read_bit()?;
            if !is_match {
                let b = reader.read_byte()?;
                window.write_byte(b)?;
            } else {
                let (distance, length) = read_token(&mut reader)?;
                window.back_copy(distance, length)?;
            }
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
        if source.len() > 0xFF_FFFF {
            return Err(Error::InvalidArgument {
                codec: CODEC,
                message: "input exceeds 24-bit size field".into(),
            });
        }
        destination.write_all(&[TYPE_BYTE])?;
        destination.write_all(&(source.len() as u32).to_le_bytes()[..3])?;

        let props = lz_properties();
        let matches = find_matches(source, &props, true, level);
        let mut writer = FlagWriter::new(FlagWordSize::One, BitOrder::Big, ByteOrder::Big);

        let mut pos = 0usize;
        let mut mi = 0usize;
        while pos < source.len() {
            if mi < matches.len() && matches[mi].offset == pos {
                let m = matches[mi];
                writer.write_bit(true);
                write_token(&mut writer, m.distance, m.length);
                pos += m.length;
                mi += 1;
            } else {
                writer.write_bit(false);
                writer.write_byte(source[pos]);
                pos += 1;
            }
        }
        destination.write_all(&writer.finish())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(data: &[u8], level: Level) {
        let mut compressed = Cursor::new(Vec::new());
        Lz11.compress(data, &mut compressed, level).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        let mut out = Cursor::new(Vec::new());
        Lz11.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn round_trip_short_match() {
        round_trip(b"ABABABABABABABAB and some extra filler text here", Level::Optimal);
    }

    #[test]
    fn round_trip_long_match_needs_3_byte_token() {
        let mut data = vec![b'Z'; 40];
        data.extend_from_slice(b"the rest of the buffer has no repeats at all here");
        data.extend(vec![b'Z'; 40]);
        round_trip(&data, Level::Optimal);
    }

    #[test]
    fn round_trip_very_long_match_needs_4_byte_token() {
        let mut data = vec![b'Q'; 400];
        data.extend_from_slice(b"unique tail");
        round_trip(&data, Level::Optimal);
    }

    #[test]
    fn header_type_byte_is_0x11() {
        let data = b"hello".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Lz11.compress(&data, &mut compressed, Level::Optimal).unwrap();
        assert_eq!(compressed.into_inner()[0], 0x11);
    }
}
