//! HWGZ (spec §6): a chunked zlib container, delegating the per-chunk
//! payload codec to `flate2` rather than reimplementing DEFLATE (spec §1's
//! explicit non-goal). Header is four fields — `chunk_size` (the nominal
//! per-chunk decompressed size), `chunk_count`, `decompressed_size`, and a
//! `chunk_sizes[chunk_count]` table where `chunk_sizes[i] = payload_size +
//! 4` — in an endian that is auto-detected at decode (spec §9): both
//! orders are tried and whichever makes the chunk-size table fit inside
//! the remaining file length wins. Each chunk on the wire is `[u32
//! payload_size][zlib data][pad to a 128-byte boundary]`.
//!
//! No magic bytes are defined for this format, so [`Codec::is_match`] can
//! only ever return `false` — same open question as the plain LZO stream.

use std::io::{Read, Seek, SeekFrom, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::codec::{Codec, FormatInfo, Level};
use crate::error::{Error, Result};

const CODEC: &str = "HWGZ";
const CHUNK_ALIGN: usize = 128;
const HEADER_FIELDS: usize = 12; // chunk_size, chunk_count, decompressed_size

pub struct Hwgz;

fn parse_u32s(bytes: &[u8; 12], big_endian: bool) -> (u32, u32, u32) {
    if big_endian {
        (
            u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        )
    } else {
        (
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        )
    }
}

/// Try both byte orders and keep whichever makes the chunk-size table fit
/// in the remaining data (spec §9's auto-detection heuristic).
fn read_header(data: &[u8]) -> Result<(u32, u32, u32, bool)> {
    if data.len() < HEADER_FIELDS {
        return Err(Error::UnexpectedEnd { codec: CODEC });
    }
    let fields: [u8; 12] = data[0..12].try_into().unwrap();
    for &big_endian in &[true, false] {
        let (chunk_size, chunk_count, decompressed_size) = parse_u32s(&fields, big_endian);
        let table_bytes = chunk_count as usize * 4;
        if HEADER_FIELDS + table_bytes <= data.len() && chunk_size > 0 && chunk_count < 1_000_000 {
            return Ok((chunk_size, chunk_count, decompressed_size, big_endian));
        }
    }
    Err(Error::InvalidIdentifier { codec: CODEC })
}

fn pad_len(len: usize) -> usize {
    (CHUNK_ALIGN - (len % CHUNK_ALIGN)) % CHUNK_ALIGN
}

impl Codec for Hwgz {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "HWGZ",
            media_type: "application/x-hwgz",
            extension_hint: "hwgz",
            magic: None,
            default_look_ahead: false,
        }
    }

    fn is_match(&self, _stream: &mut (impl Read + Seek), _filename_hint: Option<&str>) -> bool {
        false
    }

    fn decompressed_size(&self, stream: &mut (impl Read + Seek)) -> Result<u32> {
        let cur = stream.stream_position()?;
        let mut data = Vec::new();
        stream.seek(SeekFrom::Start(0))?;
        stream.read_to_end(&mut data)?;
        stream.seek(SeekFrom::Start(cur))?;
        let (_, _, decompressed_size, _) = read_header(&data)?;
        Ok(decompressed_size)
    }

    fn decompress(&self, source: &mut (impl Read + Seek), destination: &mut (impl Write + Seek)) -> Result<()> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        let (_chunk_size, chunk_count, decompressed_size, big_endian) = read_header(&data)?;

        let mut chunk_sizes = Vec::with_capacity(chunk_count as usize);
        let mut pos = HEADER_FIELDS;
        for _ in 0..chunk_count {
            let raw = &data[pos..pos + 4];
            let v = if big_endian {
                u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])
            } else {
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
            };
            chunk_sizes.push(v);
            pos += 4;
        }

        let mut out = Vec::with_capacity(decompressed_size as usize);
        for size_plus_4 in chunk_sizes {
            let payload_size = size_plus_4 as usize - 4;
            let raw = &data[pos..pos + 4];
            let declared = if big_endian {
                u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])
            } else {
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
            } as usize;
            pos += 4;
            if declared != payload_size {
                return Err(Error::DecompressedSizeMismatch {
                    codec: CODEC,
                    expected: payload_size as u64,
                    actual: declared as u64,
                });
            }
            let zlib_data = &data[pos..pos + payload_size];
            let mut decoder = ZlibDecoder::new(zlib_data);
            decoder.read_to_end(&mut out)?;
            pos += payload_size;
            pos += pad_len(payload_size + 4);
        }

        if out.len() as u64 != decompressed_size as u64 {
            return Err(Error::DecompressedSizeMismatch {
                codec: CODEC,
                expected: decompressed_size as u64,
                actual: out.len() as u64,
            });
        }
        destination.write_all(&out)?;
        Ok(())
    }

    fn compress(&self, source: &[u8], destination: &mut (impl Write + Seek), level: Level) -> Result<()> {
        let chunk_size = 0x10000usize; // 64 KiB nominal chunk
        let chunk_count = source.len().div_ceil(chunk_size).max(1);
        let compression = match level {
            Level::NoCompression => Compression::none(),
            Level::Fastest => Compression::fast(),
            Level::Optimal => Compression::default(),
            Level::SmallestSize => Compression::best(),
        };

        let mut chunks = Vec::with_capacity(chunk_count);
        for chunk in source.chunks(chunk_size) {
            let mut encoder = ZlibEncoder::new(Vec::new(), compression);
            encoder.write_all(chunk)?;
            chunks.push(encoder.finish()?);
        }

        destination.write_all(&(chunk_size as u32).to_be_bytes())?;
        destination.write_all(&(chunks.len() as u32).to_be_bytes())?;
        destination.write_all(&(source.len() as u32).to_be_bytes())?;
        for chunk in &chunks {
            destination.write_all(&((chunk.len() + 4) as u32).to_be_bytes())?;
        }
        for chunk in &chunks {
            destination.write_all(&(chunk.len() as u32).to_be_bytes())?;
            destination.write_all(chunk)?;
            destination.write_all(&vec![0u8; pad_len(chunk.len() + 4)])?;
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
        Hwgz.compress(data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();

        let mut input = Cursor::new(bytes.clone());
        assert_eq!(Hwgz.decompressed_size(&mut input).unwrap(), data.len() as u32);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Hwgz.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn round_trip_single_chunk() {
        round_trip(b"HWGZ sample payload with repeats repeats repeats and a tail");
    }

    #[test]
    fn round_trip_multiple_chunks() {
        let data = vec![b'Q'; 0x10000 + 500];
        round_trip(&data);
    }

    #[test]
    fn round_trip_no_compression_level() {
        let data = b"not really compressible at NoCompression level but still round trips".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Hwgz.compress(&data, &mut compressed, Level::NoCompression).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        let mut out = Cursor::new(Vec::new());
        Hwgz.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }
}
