//! ECD (spec §4.5, §9): a raw-or-compressed envelope. Header is a 4-byte
//! `ECD\x00` magic, a 1-byte mode flag (`0` = verbatim copy, `1` = LZ10-style
//! body), a 4-byte little-endian `PlainSize` that the source copies
//! verbatim ahead of the LZ body for reasons the original format never
//! explains (spec §9's open question — preserved here unchanged at its
//! default of 4, not otherwise interpreted), and a 4-byte little-endian
//! decompressed size.
//!
//! `compress` always tries the LZ10-style body first and only falls back to
//! the verbatim copy (spec §4.5's "fallback-to-raw") when the compressed
//! body would not have been smaller than the input — the same rule BLZ
//! uses, applied here at the envelope level instead of via reversed
//! streams.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{peek, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "ECD";
pub const MAGIC: &[u8; 4] = b"ECD\x00";
const DEFAULT_PLAIN_SIZE: u32 = 4;
const WINDOW_SIZE: usize = 0x1000;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 18;
const HEADER_SIZE: u64 = 13; // magic(4) + mode(1) + plain_size(4) + decompressed_size(4)

const MODE_RAW: u8 = 0;
const MODE_COMPRESSED: u8 = 1;

pub struct Ecd;

fn lz_properties() -> LzProperties {
    LzProperties::new(WINDOW_SIZE, MIN_LENGTH, MAX_LENGTH, 1)
}

struct Header {
    mode: u8,
    plain_size: u32,
    decompressed_size: u32,
}

fn read_header(stream: &mut (impl Read + Seek)) -> Result<Header> {
    let mut hdr = [0u8; HEADER_SIZE as usize];
    stream.read_exact(&mut hdr)?;
    if &hdr[0..4] != MAGIC {
        return Err(Error::InvalidIdentifier { codec: CODEC });
    }
    let mode = hdr[4];
    if mode != MODE_RAW && mode != MODE_COMPRESSED {
        return Err(Error::InvalidIdentifier { codec: CODEC });
    }
    let plain_size = u32::from_le_bytes([hdr[5], hdr[6], hdr[7], hdr[8]]);
    let decompressed_size = u32::from_le_bytes([hdr[9], hdr[10], hdr[11], hdr[12]]);
    Ok(Header { mode, plain_size, decompressed_size })
}

fn encode_lz10_body(source: &[u8], level: Level) -> Vec<u8> {
    let props = lz_properties();
    let matches = find_matches(source, &props, true, level);
    let mut writer = FlagWriter::new(FlagWordSize::One, BitOrder::Big, ByteOrder::Big);

    let mut pos = 0usize;
    let mut mi = 0usize;
    while pos < source.len() {
        if mi < matches.len() && matches[mi].offset == pos {
            let m = matches[mi];
            writer.write_bit(true);
            let token = (((m.length - 3) as u32) << 12) | ((m.distance - 1) as u32);
            writer.write_int(token, 16, true);
            pos += m.length;
            mi += 1;
        } else {
            writer.write_bit(false);
            writer.write_byte(source[pos]);
            pos += 1;
        }
    }
    writer.finish()
}

fn decode_lz10_body(data: &[u8], decompressed_size: u64, destination: &mut impl Write) -> Result<()> {
    let mut reader = FlagReader::new(data, CODEC, FlagWordSize::One, BitOrder::Big, ByteOrder::Big);
    let mut window = LzWindows::new(WINDOW_SIZE, destination);
    while window.total_written() < decompressed_size {
        let is_match = reader.read_bit()?;
        if !is_match {
            window.write_byte(reader.read_byte()?)?;
        } else {
            let token = reader.read_int(16, true)?;
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

impl Codec for Ecd {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "ECD",
            media_type: "application/x-ecd",
            extension_hint: "ecd",
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
        let header = read_header(stream)?;
        stream.seek(SeekFrom::Start(cur))?;
        Ok(header.decompressed_size)
    }

    fn decompress(&self, source: &mut (impl Read + Seek), destination: &mut (impl Write + Seek)) -> Result<()> {
        let header = read_header(source)?;
        let _ = header.plain_size; // copied verbatim on encode, not otherwise interpreted
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;

        match header.mode {
            MODE_RAW => {
                if data.len() as u32 != header.decompressed_size {
                    return Err(Error::DecompressedSizeMismatch {
                        codec: CODEC,
                        expected: header.decompressed_size as u64,
                        actual: data.len() as u64,
                    });
                }
                destination.write_all(&data)?;
                Ok(())
            }
            MODE_COMPRESSED => decode_lz10_body(&data, header.decompressed_size as u64, destination),
            _ => unreachable!("validated in read_header"),
        }
    }

    fn compress(&self, source: &[u8], destination: &mut (impl Write + Seek), level: Level) -> Result<()> {
        let compressed_body = encode_lz10_body(source, level);
        let use_raw = compressed_body.len() >= source.len();

        destination.write_all(MAGIC)?;
        destination.write_all(&[if use_raw { MODE_RAW } else { MODE_COMPRESSED }])?;
        destination.write_all(&DEFAULT_PLAIN_SIZE.to_le_bytes())?;
        destination.write_all(&(source.len() as u32).to_le_bytes())?;

        if use_raw {
            destination.write_all(source)?;
        } else {
            destination.write_all(&compressed_body)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(data: &[u8]) {
        let mut compressed = Cursor::new(Vec::new());
        Ecd.compress(data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(&bytes[0..4], MAGIC);

        let mut input = Cursor::new(bytes.clone());
        assert_eq!(Ecd.decompressed_size(&mut input).unwrap(), data.len() as u32);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Ecd.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn round_trip_compressible_uses_lz_body() {
        let data = b"ECD sample with repeats repeats repeats and a unique tail".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Ecd.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(bytes[4], MODE_COMPRESSED);
        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Ecd.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn round_trip_incompressible_falls_back_to_raw() {
        let data: Vec<u8> = (0u32..64).map(|i| (i * 197 % 251) as u8).collect();
        let mut compressed = Cursor::new(Vec::new());
        Ecd.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(bytes[4], MODE_RAW);
        assert_eq!(&bytes[HEADER_SIZE as usize..], &data[..]);
        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Ecd.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn plain_size_defaults_to_four() {
        let data = b"anything".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Ecd.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        let plain_size = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
        assert_eq!(plain_size, DEFAULT_PLAIN_SIZE);
    }
}
