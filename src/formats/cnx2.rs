//! CNX2 (spec §6, "Shape B"): 4-byte magic `CNX\x02`, a 16-byte extension
//! string, 4-byte big-endian compressed size, 4-byte big-endian
//! decompressed size. The body is aligned to 0x800 boundaries and driven
//! by 2-bit flags (four per byte, MSB-first) rather than Shape A's single
//! flag bit: `00` skips the reader forward to the next 0x800 boundary
//! (used to resynchronise before an aligned block), `01` is a single
//! literal byte, `10` is a 2-byte match token (`length-3` in the high
//! nibble, `distance-1` in the low 12 bits, same shape as LZ10), and `11`
//! is an N-byte literal block (1-byte count followed by that many bytes).

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{peek, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "CNX2";
pub const MAGIC: &[u8; 4] = b"CNX\x02";
const EXTENSION_LEN: usize = 16;
const HEADER_SIZE: usize = 4 + EXTENSION_LEN + 4 + 4;
const ALIGNMENT: usize = 0x800;
const WINDOW_SIZE: usize = 0x1000;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 18;

pub struct Cnx2;

fn lz_properties() -> LzProperties {
    LzProperties::new(WINDOW_SIZE, MIN_LENGTH, MAX_LENGTH, 1)
}

fn read_header(stream: &mut (impl Read + Seek)) -> Result<(u32, u32)> {
    let mut hdr = [0u8; HEADER_SIZE];
    stream.read_exact(&mut hdr)?;
    if &hdr[0..4] != MAGIC {
        return Err(Error::InvalidIdentifier { codec: CODEC });
    }
    let o = 4 + EXTENSION_LEN;
    let compressed_size = u32::from_be_bytes([hdr[o], hdr[o + 1], hdr[o + 2], hdr[o + 3]]);
    let decompressed_size = u32::from_be_bytes([hdr[o + 4], hdr[o + 5], hdr[o + 6], hdr[o + 7]]);
    Ok((compressed_size, decompressed_size))
}

impl Codec for Cnx2 {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "CNX2",
            media_type: "application/x-cnx2",
            extension_hint: "cnx2",
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
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        let mut reader = FlagReader::new(&data, CODEC, FlagWordSize::One, BitOrder::Big, ByteOrder::Big);
        let mut window = LzWindows::new(WINDOW_SIZE, destination);

        while window.total_written() < decompressed_size as u64 {
            let hi = reader.read_bit()? as u32;
            let lo = reader.read_bit()? as u32;
            match (hi, lo) {
                (0, 0) => {
                    let consumed = reader.bytes_read();
                    let target = (consumed + ALIGNMENT - 1) / ALIGNMENT * ALIGNMENT;
                    while reader.bytes_read() < target {
                        reader.read_byte()?;
                    }
                    reader.reset();
                }
                (0, 1) => {
                    window.write_byte(reader.read_byte()?)?;
                }
                (1, 0) => {
                    let b0 = reader.read_byte()? as u32;
                    let b1 = reader.read_byte()? as u32;
                    let token = (b0 << 8) | b1;
                    let length = (token >> 12) as usize + 3;
                    let distance = (token & 0xFFF) as usize + 1;
                    window.back_copy(distance, length)?;
                }
                _ => {
                    let count = reader.read_byte()? as usize;
                    for _ in 0..count {
                        window.write_byte(reader.read_byte()?)?;
                    }
                }
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
        let consumed = reader.bytes_read() as u64;
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
        destination.write_all(&[0u8; EXTENSION_LEN])?;
        let compressed_size_at = {
            let at = destination.stream_position()?;
            destination.write_all(&[0u8; 4])?;
            at
        };
        destination.write_all(&(source.len() as u32).to_be_bytes())?;

        let body_start = destination.stream_position()?;
        let props = lz_properties();
        let matches = find_matches(source, &props, true, level);
        let mut writer = FlagWriter::new(FlagWordSize::One, BitOrder::Big, ByteOrder::Big);

        let mut pos = 0usize;
        let mut mi = 0usize;
        while pos < source.len() {
            if mi < matches.len() && matches[mi].offset == pos {
                let m = matches[mi];
                writer.write_bit(true);
                writer.write_bit(false);
                let token = (((m.length - 3) as u32) << 12) | ((m.distance - 1) as u32 & 0xFFF);
                writer.write_byte((token >> 8) as u8);
                writer.write_byte(token as u8);
                pos += m.length;
                mi += 1;
            } else {
                writer.write_bit(false);
                writer.write_bit(true);
                writer.write_byte(source[pos]);
                pos += 1;
            }
        }
        let body = writer.finish();
        destination.write_all(&body)?;

        let compressed_size = (destination.stream_position()? - body_start) as u32;
        let cur = destination.stream_position()?;
        destination.seek(SeekFrom::Start(compressed_size_at))?;
        destination.write_all(&compressed_size.to_be_bytes())?;
        destination.seek(SeekFrom::Start(cur))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_and_header() {
        let data = b"CNX2 test payload with repeats repeats repeats and a tail".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Cnx2.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(&bytes[0..4], MAGIC);

        let mut input = Cursor::new(bytes.clone());
        assert_eq!(Cnx2.decompressed_size(&mut input).unwrap(), data.len() as u32);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Cnx2.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn round_trip_no_compression_uses_literal_blocks() {
        let data = b"no matches anywhere in this buffer of text at all".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Cnx2.compress(&data, &mut compressed, Level::NoCompression).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        let mut out = Cursor::new(Vec::new());
        Cnx2.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }
}
