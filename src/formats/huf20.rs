//! HUF20 (spec §6): a 1-byte symbol-mode flag (0 = 4-bit nibbles, 1 = 8-bit
//! bytes), a 3-byte little-endian decompressed size, a serialized code
//! table (symbol/length pairs sufficient to rebuild canonical codes — spec
//! §3's `HuffmanNode` tree is only a build-time structure, not part of the
//! wire format), then the bit-packed, MSB-first symbol codes.
//!
//! Unlike the LZ-family codecs, HUF20 has no back-references: it is a pure
//! entropy coder over [`crate::huffman`]'s static table builder.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::huffman::{build_table, count_frequencies, HuffmanCode, SymbolMode};

const CODEC: &str = "HUF20";

pub struct Huf20;

/// Re-derive canonical `(code, length)` pairs from a list of `(symbol,
/// length)` pairs sorted by `(length, symbol)`, per the standard canonical
/// Huffman assignment. This is what the wire table actually stores — codes
/// themselves are never serialized, only lengths, since they are
/// reconstructible and therefore redundant.
fn canonicalize(mut entries: Vec<(u16, u8)>) -> Vec<(u16, HuffmanCode)> {
    entries.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    let mut out = Vec::with_capacity(entries.len());
    let mut code: u32 = 0;
    let mut prev_len: u8 = 0;
    for (symbol, len) in entries {
        if prev_len != 0 {
            code <<= len - prev_len;
        }
        out.push((symbol, HuffmanCode { code, length: len }));
        code += 1;
        prev_len = len;
    }
    out
}

fn mode_from_flag(flag: u8) -> Result<SymbolMode> {
    match flag {
        0 => Ok(SymbolMode::Nibble),
        1 => Ok(SymbolMode::Byte),
        _ => Err(Error::InvalidIdentifier { codec: CODEC }),
    }
}

impl Codec for Huf20 {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "HUF20",
            media_type: "application/x-huf20",
            extension_hint: "huf20",
            magic: None,
            default_look_ahead: false,
        }
    }

    fn is_match(&self, stream: &mut (impl Read + Seek), _filename_hint: Option<&str>) -> bool {
        let cur = match stream.stream_position() {
            Ok(c) => c,
            Err(_) => return false,
        };
        let mut flag = [0u8; 1];
        let ok = stream.read_exact(&mut flag).is_ok() && (flag[0] == 0 || flag[0] == 1);
        let _ = stream.seek(SeekFrom::Start(cur));
        ok
    }

    fn decompressed_size(&self, stream: &mut (impl Read + Seek)) -> Result<u32> {
        let cur = stream.stream_position()?;
        let mut hdr = [0u8; 4];
        stream.read_exact(&mut hdr)?;
        stream.seek(SeekFrom::Start(cur))?;
        mode_from_flag(hdr[0])?;
        Ok(u32::from_le_bytes([hdr[1], hdr[2], hdr[3], 0]))
    }

    fn decompress(&self, source: &mut (impl Read + Seek), destination: &mut (impl Write + Seek)) -> Result<()> {
        let mut hdr = [0u8; 4];
        source.read_exact(&mut hdr)?;
        let mode = mode_from_flag(hdr[0])?;
        let decompressed_size = u32::from_le_bytes([hdr[1], hdr[2], hdr[3], 0]) as u64;

        let mut count_buf = [0u8; 2];
        source.read_exact(&mut count_buf)?;
        let entry_count = u16::from_le_bytes(count_buf) as usize;
        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let mut e = [0u8; 3];
            source.read_exact(&mut e)?;
            let symbol = u16::from_le_bytes([e[0], e[1]]);
            let length = e[2];
            entries.push((symbol, length));
        }
        let canonical = canonicalize(entries);

        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        let mut reader = FlagReader::new(&data, CODEC, FlagWordSize::One, BitOrder::Big, ByteOrder::Big);

        let mut out = Vec::new();
        match mode {
            SymbolMode::Byte => {
                while (out.len() as u64) < decompressed_size {
                    out.push(decode_one(&mut reader, &canonical)? as u8);
                }
            }
            SymbolMode::Nibble => {
                while (out.len() as u64) < decompressed_size {
                    let hi = decode_one(&mut reader, &canonical)?;
                    let lo = decode_one(&mut reader, &canonical)?;
                    out.push(((hi << 4) | lo) as u8);
                }
            }
        }
        if out.len() as u64 != decompressed_size {
            return Err(Error::DecompressedSizeMismatch {
                codec: CODEC,
                expected: decompressed_size,
                actual: out.len() as u64,
            });
        }
        destination.write_all(&out)?;
        Ok(())
    }

    fn compress(&self, source: &[u8], destination: &mut (impl Write + Seek), _level: Level) -> Result<()> {
        if source.len() > 0xFF_FFFF {
            return Err(Error::InvalidArgument {
                codec: CODEC,
                message: "input exceeds 24-bit size field".into(),
            });
        }
        let mode = SymbolMode::Byte;
        let freq = count_frequencies(source, mode);
        let table = build_table(&freq);
        let length_entries: Vec<(u16, u8)> = table
            .iter()
            .enumerate()
            .filter_map(|(symbol, c)| c.map(|code| (symbol as u16, code.length)))
            .collect();
        let canonical = canonicalize(length_entries.clone());
        let mut lookup = vec![None; freq.len()];
        for (symbol, code) in &canonical {
            lookup[*symbol as usize] = Some(*code);
        }

        destination.write_all(&[1u8])?; // mode flag: byte
        destination.write_all(&(source.len() as u32).to_le_bytes()[..3])?;
        destination.write_all(&(length_entries.len() as u16).to_le_bytes())?;
        for (symbol, length) in &length_entries {
            destination.write_all(&symbol.to_le_bytes())?;
            destination.write_all(&[*length])?;
        }

        let mut writer = FlagWriter::new(FlagWordSize::One, BitOrder::Big, ByteOrder::Big);
        for &b in source {
            let code = lookup[b as usize].expect("every source byte has a code");
            writer.write_int(code.code, code.length as u32, true);
        }
        destination.write_all(&writer.finish())?;
        Ok(())
    }
}

fn decode_one(reader: &mut FlagReader, canonical: &[(u16, HuffmanCode)]) -> Result<u16> {
    let mut code: u32 = 0;
    let mut length: u8 = 0;
    loop {
        code = (code << 1) | reader.read_bit()? as u32;
        length += 1;
        if let Some((symbol, _)) = canonical.iter().find(|(_, c)| c.code == code && c.length == length) {
            return Ok(*symbol);
        }
        if length > 24 {
            return Err(Error::UnexpectedEnd { codec: CODEC });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(data: &[u8]) {
        let mut compressed = Cursor::new(Vec::new());
        Huf20.compress(data, &mut compressed, Level::Optimal).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        let mut out = Cursor::new(Vec::new());
        Huf20.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn round_trip_skewed_distribution() {
        round_trip(b"aaaaaaaaaaaaaaaaaaaabbbbbbbbccccd");
    }

    #[test]
    fn round_trip_single_symbol() {
        round_trip(&[0x42u8; 20]);
    }

    #[test]
    fn decompressed_size_reads_header() {
        let data = b"some sample bytes for huffman coding".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Huf20.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        assert_eq!(Huf20.decompressed_size(&mut input).unwrap(), data.len() as u32);
    }
}
