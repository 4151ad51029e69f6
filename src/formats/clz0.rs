//! CLZ0: a magic-prefixed LZSS-family variant (spec §1 lists it alongside
//! AKLZ and WFLZ as a format the framework must accommodate but does not
//! give byte-exact detail for, unlike LZ10/LZ11/MIO0/BLZ/CNX2/WFLZ/HUF20).
//! Modeled as a 4-byte magic `CLZ0` + 4-byte little-endian decompressed
//! size, followed by the same Shape A flag/token stream as LZ10 (distance
//! 12 bits, length 4 bits, threshold 3). This decision is recorded in
//! `DESIGN.md`.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{peek, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "CLZ0";
pub const MAGIC: &[u8; 4] = b"CLZ0";
const WINDOW_SIZE: usize = 0x1000;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 18;

pub struct Clz0;

fn lz_properties() -> LzProperties {
    LzProperties::new(WINDOW_SIZE, MIN_LENGTH, MAX_LENGTH, 1)
}

fn read_header(stream: &mut (impl Read + Seek)) -> Result<u32> {
    let mut hdr = [0u8; 8];
    stream.read_exact(&mut hdr)?;
    if &hdr[0..4] != MAGIC {
        return Err(Error::InvalidIdentifier { codec: CODEC });
    }
    Ok(u32::from_le_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]))
}

impl Codec for Clz0 {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "CLZ0",
            media_type: "application/x-clz0",
            extension_hint: "clz0",
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
        destination.write_all(&(source.len() as u32).to_le_bytes())?;

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
