//! LZ10 (spec §6): 1-byte type `0x10`, 3-byte little-endian decompressed
//! size, body is a big-bit-order, 1-byte flag word stream where `1` = match
//! (2-byte big-endian token: `length-3` in the high nibble, `distance-1` in
//! the low 12 bits), `0` = literal byte.
//!
//! This is the Nintendo GBA/DS "LZ10" container also used (with different
//! type bytes) by LZ11/LZ40; see `lz11.rs`/`lz40.rs`.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{peek, write_placeholder, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "LZ10";
pub const TYPE_BYTE: u8 = 0x10;
const WINDOW_SIZE: usize = 0x1000;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 18; // 3 + 0xF

pub struct Lz10;

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

impl Codec for Lz10 {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "LZ10",
            media_type: "application/x-lz10",
            extension_hint: "lz10",
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
                let b0 = reader.read_byte()? as u32;
                let b1 = reader.read_byte()? as u32;
                let token = (b0 << 8) | b1;
                let length = (token >> 12) as usize + 3;
                let distance = (token & 0xFFF) as usize + 1;
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
        let size = source.len() as u32;
        destination.write_all(&size.to_le_bytes()[..3])?;

        let props = lz_properties();
        let matches = find_matches(source, &props, true, level);
        let mut writer = FlagWriter::new(FlagWordSize::One, BitOrder::Big, ByteOrder::Big);

        let mut pos = 0usize;
        let mut mi = 0usize;
        while pos < source.len() {
            if mi < matches.len() && matches[mi].offset == pos {
                let m = matches[mi];
                writer.write_bit(true);
                let token = (((m.length - 3) as u32) << 12) | ((m.distance - 1) as u32 & 0xFFF);
                writer.write_byte((token >> 8) as u8);
                writer.write_byte(token as u8);
                pos += m.length;
                mi += 1;
            } else {
                writer.write_bit(false);
                writer.write_byte(source[pos]);
                pos += 1;
            }
        }
        let bytes = writer.finish();
        destination.write_all(&bytes)?;
        let _ = write_placeholder; // placeholder helper unused here: size is known up front
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_scenario_ababababab() {
        let data = b"ABABABAB".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Lz10.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(&bytes[0..4], &[0x10, 0x08, 0x00, 0x00]);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Lz10.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn round_trip_repeated_bytes() {
        let data = (0..=255u8).collect::<Vec<u8>>().repeat(16);
        let mut compressed = Cursor::new(Vec::new());
        Lz10.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();

        let mut input = Cursor::new(bytes.clone());
        assert_eq!(Lz10.decompressed_size(&mut input).unwrap(), 4096);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Lz10.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn no_compression_emits_valid_file() {
        let data = b"no repeats whatsoever in this buffer".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Lz10.compress(&data, &mut compressed, Level::NoCompression).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        let mut out = Cursor::new(Vec::new());
        Lz10.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn invalid_identifier_is_rejected() {
        let bad = vec![0x11, 0x00, 0x00, 0x00];
        let mut input = Cursor::new(bad);
        assert!(matches!(
            Lz10.decompressed_size(&mut input),
            Err(Error::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn is_match_does_not_consume_input() {
        let data = b"ABABABAB".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Lz10.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        assert!(Lz10.is_match(&mut input, None));
        assert_eq!(input.stream_position().unwrap(), 0);
    }
}
