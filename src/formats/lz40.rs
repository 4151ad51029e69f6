//! LZ40: a thin header variant of LZ10 (spec §1's "thin algorithm subclass"
//! treatment) using type byte `0x40` instead of `0x10`. Token grammar and
//! window constraints are identical to LZ10; only the magic differs.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{peek, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "LZ40";
pub const TYPE_BYTE: u8 = 0x40;
const WINDOW_SIZE: usize = 0x1000;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 18;

pub struct Lz40;

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

impl Codec for Lz40 {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "LZ40",
            media_type: "application/x-lz40",
            extension_hint: "lz40",
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
                window.write_byte(reader.read_byte()?)?;
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
