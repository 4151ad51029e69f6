//! Yay0 (spec §6): sibling of MIO0 sharing its three-sub-stream layout
//! (flag bits, match tokens, literal bytes) behind a 16-byte header, but
//! Yay0's match token always carries a plain 12-bit distance, and a length
//! of 0 in the 4-bit length field means "read an extra count byte from the
//! literal stream and add 18" rather than MIO0's flat 4-bit length field.
//! This mirrors Nintendo's real Yay0/MIO0 split, where Yay0 supports longer
//! matches at the cost of stealing bytes from the literal stream for the
//! overflow count.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bitstream::{BitOrder, ByteOrder, FlagReader, FlagWriter, FlagWordSize};
use crate::codec::{peek, write_placeholder, patch_u32_be, Codec, FormatInfo, Level};
use crate::error::{Error, Result};
use crate::matchfinder::{find_matches, LzProperties};
use crate::window::LzWindows;

const CODEC: &str = "Yay0";
pub const MAGIC: &[u8; 4] = b"Yay0";
const WINDOW_SIZE: usize = 0x1000;
const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 18 + 255;
const HEADER_SIZE: u32 = 16;

pub struct Yay0;

fn lz_properties() -> LzProperties {
    LzProperties::new(WINDOW_SIZE, MIN_LENGTH, MAX_LENGTH, 1)
}

fn read_header(hdr: &[u8; 16]) -> Result<(u32, u32, u32)> {
    if &hdr[0..4] != MAGIC {
        return Err(Error::InvalidIdentifier { codec: CODEC });
    }
    let size = u32::from_be_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]);
    let token_off = u32::from_be_bytes([hdr[8], hdr[9], hdr[10], hdr[11]]);
    let lit_off = u32::from_be_bytes([hdr[12], hdr[13], hdr[14], hdr[15]]);
    Ok((size, token_off, lit_off))
}

impl Codec for Yay0 {
    fn info(&self) -> FormatInfo {
        FormatInfo {
            name: "Yay0",
            media_type: "application/x-yay0",
            extension_hint: "yay0",
            magic: Some(MAGIC),
            default_look_ahead: false,
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
        let mut hdr = [0u8; 16];
        stream.read_exact(&mut hdr)?;
        stream.seek(SeekFrom::Start(cur))?;
        let (size, _, _) = read_header(&hdr)?;
        Ok(size)
    }

    fn decompress(&self, source: &mut (impl Read + Seek), destination: &mut (impl Write + Seek)) -> Result<()> {
        let mut hdr = [0u8; 16];
        source.read_exact(&mut hdr)?;
        let (decompressed_size, token_off, lit_off) = read_header(&hdr)?;

        let mut rest = Vec::new();
        source.read_to_end(&mut rest)?;
        let flags = &rest[0..(token_off as usize - 16)];
        let tokens = &rest[(token_off as usize - 16)..(lit_off as usize - 16)];
        let literals = &rest[(lit_off as usize - 16)..];

        let mut flag_reader = FlagReader::new(flags, CODEC, FlagWordSize::One, BitOrder::Big, ByteOrder::Big);
        let mut lit_pos = 0usize;
        let mut tok_pos = 0usize;
        let mut window = LzWindows::new(WINDOW_SIZE, destination);

        while window.total_written() < decompressed_size as u64 {
            if flag_reader.read_bit()? {
                if lit_pos >= literals.len() {
                    return Err(Error::UnexpectedEnd { codec: CODEC });
                }
                window.write_byte(literals[lit_pos])?;
                lit_pos += 1;
            } else {
                if tok_pos + 2 > tokens.len() {
                    return Err(Error::UnexpectedEnd { codec: CODEC });
                }
                let token = u16::from_be_bytes([tokens[tok_pos], tokens[tok_pos + 1]]) as u32;
                tok_pos += 2;
                let nibble = token >> 12;
                let distance = (token & 0xFFF) as usize + 1;
                let length = if nibble == 0 {
                    if lit_pos >= literals.len() {
                        return Err(Error::UnexpectedEnd { codec: CODEC });
                    }
                    let extra = literals[lit_pos] as usize;
                    lit_pos += 1;
                    extra + 18
                } else {
                    nibble as usize + 2
                };
                window.back_copy(distance, length)?;
            }
        }
        if window.total_written() != decompressed_size as u64 {
            return Err(Error::DecompressedSizeMismatch {
                codec: CODEC,
                expected: decompressed_size as u64,
                actual: window.total_written(),
            });
        }
        Ok(())
    }

    fn compress(&self, source: &[u8], destination: &mut (impl Write + Seek), level: Level) -> Result<()> {
        destination.write_all(MAGIC)?;
        destination.write_all(&(source.len() as u32).to_be_bytes())?;
        let token_off_at = write_placeholder(destination, 4)?;
        let lit_off_at = write_placeholder(destination, 4)?;

        let props = lz_properties();
        let matches = find_matches(source, &props, false, level);
        let mut flag_writer = FlagWriter::new(FlagWordSize::One, BitOrder::Big, ByteOrder::Big);
        let mut tokens = Vec::new();
        let mut literals = Vec::new();

        let mut pos = 0usize;
        let mut mi = 0usize;
        while pos < source.len() {
            if mi < matches.len() && matches[mi].offset == pos {
                let m = matches[mi];
                flag_writer.write_bit(false);
                let (nibble, extra) = if m.length <= 17 {
                    ((m.length - 2) as u32, None)
                } else {
                    (0u32, Some((m.length - 18) as u8))
                };
                let token = (nibble << 12) | ((m.distance - 1) as u32 & 0xFFF);
                tokens.push((token >> 8) as u8);
                tokens.push(token as u8);
                if let Some(e) = extra {
                    literals.push(e);
                }
                pos += m.length;
                mi += 1;
            } else {
                flag_writer.write_bit(true);
                literals.push(source[pos]);
                pos += 1;
            }
        }
        let flag_bytes = flag_writer.finish();
        destination.write_all(&flag_bytes)?;

        let start = HEADER_SIZE as u64 + flag_bytes.len() as u64;
        patch_u32_be(destination, token_off_at, start as u32)?;
        destination.write_all(&tokens)?;

        let lit_start = start + tokens.len() as u64;
        patch_u32_be(destination, lit_off_at, lit_start as u32)?;
        destination.write_all(&literals)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_short_and_long_matches() {
        let mut data = b"Yay0 test buffer repeats repeats repeats ".to_vec();
        data.extend(vec![b'Q'; 60]);
        data.extend_from_slice(b"tail");

        let mut compressed = Cursor::new(Vec::new());
        Yay0.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let bytes = compressed.into_inner();
        assert_eq!(&bytes[0..4], MAGIC);

        let mut input = Cursor::new(bytes);
        let mut out = Cursor::new(Vec::new());
        Yay0.decompress(&mut input, &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn decompressed_size_matches_header() {
        let data = b"small Yay0 sample".to_vec();
        let mut compressed = Cursor::new(Vec::new());
        Yay0.compress(&data, &mut compressed, Level::Optimal).unwrap();
        let mut input = Cursor::new(compressed.into_inner());
        assert_eq!(Yay0.decompressed_size(&mut input).unwrap(), data.len() as u32);
    }
}
