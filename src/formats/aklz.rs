//! AKLZ: another magic-prefixed LZSS-family variant in spec §1's list,
//! without byte-exact detail in the spec. Modeled as `AKLZ` magic + 4-byte
//! big-endian decompressed size + 4-byte big-endian header size (always 12
//! here), then the same Shape A token stream as CLZ0/LZ10. Recorded in
//! `DESIGN.md` alongside the CLZ0 header-shape decision.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{peek, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "AKLZ";
pub const MAGIC: &[u8; 4] = b"AKLZ";
const HEADER_SIZE: u32 = 12;
const WINDOW_SIZE: usize = 0x1000;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 18;

pub struct Aklz;

fn lz_properties() -> LzProperties {
    LzProperties::new(WINDOW_SIZE, MIN_LENGTH, MAX_LENGTH, 1)
}

fn read_header(stream: &mut (impl Read + Seek)) -> Result<u32> {
    let mut hdr = [0u8; 12];
    stream.read_exact(&mut hdr)?;
    if &hdr[0..4] != MAGIC {
        return Err(Error::InvalidIdentifier { codec: CODEC });
    }
    Ok(u32::from_be_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]))
}

impl Codec for Aklz {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "AKLZ",
            media_type: "application/x-aklz",
            extension_hint: "aklz",
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
            if reader.read_bit()? {
                let b0 = reader.read_byte()? as u32;
                let b1 = reader.read_byte()? as u32;
                let token = (b0 << 8) | b1;
                let length = (token >> 12) as usize + 3;
                let distance = (token & 0xFFF) as usize + 1;
                window.back_copy(distance, length)?;
            } else {
                window.write_byte(reader.read_byte()?)?;
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
        destination.write_all(MAGIC)?;
        destination.write_all(&(source.len() as u32).to_be_bytes())?;
        destination.write_all(&HEADER_SIZE.to_be_bytes())?;

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
        destination.write_all(&writer.finish())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_with_magic_and_header_size() {
        let data = b"AKLZ round trip test data, repeats repeats repeats".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Aklz.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), 12);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Aklz.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }
}
