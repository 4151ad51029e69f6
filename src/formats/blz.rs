//! BLZ (spec §6, "Shape D"): footer-based reverse-stream LZ77. An 8-byte
//! trailer sits at end-of-file: 3-byte little-endian compressed size,
//! 1-byte header size (always ≥8 here), 4-byte little-endian decompressed
//! delta (`decompressed_size = compressed_size + delta`). The payload
//! itself is a forward LZ77 stream (1-byte big-order flag word, 2-byte
//! big-endian tokens: `length-3` in the high nibble, `distance-3` in the
//! low 12 bits) that was run on the *reversed* source; the decoder
//! reverses the payload, runs the ordinary forward decoder into a scratch
//! buffer, then reverses that scratch buffer to recover the source (spec
//! §4's Shape D recipe).

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};

const CODEC: &str = "BLZ";
const FOOTER_SIZE: usize = 8;
const HEADER_SIZE: u8 = 8;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 3 + 15;
const MIN_DISTANCE: usize = 3;
const MAX_DISTANCE: usize = 3 + 4095;

pub struct Blz;

fn lz_properties() -> LzProperties {
    LzProperties::new(MAX_DISTANCE, MIN_LENGTH, MAX_LENGTH, MIN_DISTANCE)
}

fn read_footer(data: &[u8]) -> Result<(u32, u8, i32)> {
    if data.len() < FOOTER_SIZE {
        return Err(Error::UnexpectedEnd { codec: CODEC });
    }
    let footer = &data[data.len() - FOOTER_SIZE..];
    let compressed_size = u32::from_le_bytes([footer[0], footer[1], footer[2], 0]);
    let header_size = footer[3];
    let delta = i32::from_le_bytes([footer[4], footer[5], footer[6], footer[7]]);
    Ok((compressed_size, header_size, delta))
}

/// Forward decode a Shape-A flag/token stream (LZ10-like tokens, but
/// `length-3`/`distance-3` rather than `length-3`/`distance-1`) into `out`.
fn forward_decode(data: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let mut reader = FlagReader::new(data, CODEC, FlagWordSize::One, BitOrder::Big, ByteOrder::Big);
    while reader.bytes_read() < data.len() {
        if reader.read_bit()? {
            let b0 = reader.read_byte()? as u32;
            let b1 = reader.read_byte()? as u32;
            let token = (b0 << 8) | b1;
            let length = (token >> 12) as usize + 3;
            let distance = (token & 0xFFF) as usize + 3;
            if distance > out.len() {
                return Err(Error::UnexpectedEnd { codec: CODEC });
            }
            for _ in 0..length {
                let b = out[out.len() - distance];
                out.push(b);
            }
        } else {
            out.push(reader.read_byte()?);
        }
    }
    Ok(())
}

fn forward_encode(source: &[u8], level: Level) -> Vec<u8> {
    let props = lz_properties();
    let matches = find_matches(source, &props, false, level);
    let mut writer = FlagWriter::new(FlagWordSize::One, BitOrder::Big, ByteOrder::Big);
    let mut pos = 0usize;
    let mut mi = 0usize;
    while pos < source.len() {
        if mi < matches.len() && matches[mi].offset == pos {
            let m = matches[mi];
            writer.write_bit(true);
            let token = (((m.length - 3) as u32) << 12) | ((m.distance - 3) as u32 & 0xFFF);
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
    writer.finish()
}

impl Codec for Blz {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "BLZ",
            media_type: "application/x-blz",
            extension_hint: "blz",
            magic: None,
            default_look_ahead: false,
        }
    }

    fn is_match(&self, stream: &mut (impl Read + Seek), _filename_hint: Option<&str>) -> bool {
        let cur = match stream.stream_position() {
            Ok(c) => c,
            Err(_) => return false,
        };
        let len = match stream.seek(SeekFrom::End(0)) {
            Ok(l) => l,
            Err(_) => return false,
        };
        let _ = stream.seek(SeekFrom::Start(cur));
        len >= FOOTER_SIZE as u64
    }

    fn decompressed_size(&self, stream: &mut (impl Read + Seek)) -> Result<u32> {
        let cur = stream.stream_position()?;
        let mut data = Vec::new();
        stream.seek(SeekFrom::Start(0))?;
        stream.read_to_end(&mut data)?;
        stream.seek(SeekFrom::Start(cur))?;
        let (compressed_size, _, delta) = read_footer(&data)?;
        Ok((compressed_size as i64 + delta as i64) as u32)
    }

    fn decompress(&self, source: &mut (impl Read + Seek), destination: &mut (impl Write + Seek)) -> Result<()> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        let (compressed_size, _header_size, delta) = read_footer(&data)?;
        let decompressed_size = (compressed_size as i64 + delta as i64) as u64;

        let payload = &data[0..data.len() - FOOTER_SIZE];
        let mut reversed_payload = payload.to_vec();
        reversed_payload.reverse();

        let mut reversed_output = Vec::with_capacity(decompressed_size as usize);
        forward_decode(&reversed_payload, &mut reversed_output)?;
        reversed_output.reverse();

        if reversed_output.len() as u64 != decompressed_size {
            return Err(Error::DecompressedSizeMismatch {
                codec: CODEC,
                expected: decompressed_size,
                actual: reversed_output.len() as u64,
            });
        }
        destination.write_all(&reversed_output)?;
        Ok(())
    }

    fn compress(&self, source: &[u8], destination: &mut (impl Write + Seek), level: Level) -> Result<()> {
        let mut reversed_source = source.to_vec();
        reversed_source.reverse();

        let reversed_payload = forward_encode(&reversed_source, level);
        let mut payload = reversed_payload;
        payload.reverse();

        destination.write_all(&payload)?;

        let compressed_size = payload.len() as u32;
        let delta = source.len() as i64 - compressed_size as i64;
        destination.write_all(&compressed_size.to_le_bytes()[..3])?;
        destination.write_all(&[HEADER_SIZE])?;
        destination.write_all(&(delta as i32).to_le_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(data: &[u8]) {
        let mut compressed = Cursor::new(Vec::new());
        Blz.compress(data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();

        let mut input = Cursor::new(bytes.clone());
        assert_eq!(Blz.decompressed_size(&mut input).unwrap(), data.len() as u32);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Blz.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn round_trip_with_repeats() {
        round_trip(b"BLZ sample data with repeats repeats repeats and a tail section");
    }

    #[test]
    fn round_trip_no_compression() {
        let data = b"entirely unique byte sequence with no repeats whatsoever".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Blz.compress(&data, &mut compressed, Level::NoCompression).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        let mut out = Cursor::new(Vec::new());
        Blz.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn footer_layout() {
        let data = b"XYZXYZXYZXYZ tail data here".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Blz.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        let footer = &bytes[bytes.len() - FOOTER_SIZE..];
        assert_eq!(footer[3], HEADER_SIZE);
    }
}
