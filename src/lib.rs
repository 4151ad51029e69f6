//! # gamecomp
//!
//! Encoders/decoders for a family of game-industry LZ77/LZSS/Huffman
//! compression formats, byte-exact with the pre-existing files they were
//! reverse-engineered from.
//!
//! The core is three tightly coupled subsystems, each its own module:
//! * [`bitstream`] — `FlagReader`/`FlagWriter`, the variable-width bit-field
//!   I/O shared by every flag-token format.
//! * [`window`] — `LzWindows`, the decompression sliding-window ring buffer.
//! * [`matchfinder`] — the parallel LZ77 match finder every encoder drives.
//!
//! On top of those, [`huffman`] builds HUF20's code tables, [`codec`] defines
//! the uniform codec contract every wire format implements, and
//! [`registry`] enumerates the codecs by name/MIME/extension. The formats
//! themselves live under [`formats`], one module per wire grammar.
//!
//! ## Buffer example
//!
//! ```
//! use gamecomp::formats::lz10::Lz10;
//! use gamecomp::codec::{Codec, Level};
//! use std::io::Cursor;
//!
//! let data = b"ABABABAB".to_vec();
//! let mut compressed = Cursor::new(Vec::new());
//! Lz10.compress(&data, &mut compressed, Level::Optimal).expect("compress failed");
//!
//! let mut input = Cursor::new(compressed.into_inner());
//! let mut out = Cursor::new(Vec::new());
//! Lz10.decompress(&mut input, &mut out).expect("decompress failed");
//! assert_eq!(out.into_inner(), data);
//! ```

pub mod bitstream;
pub mod codec;
pub mod error;
pub mod formats;
pub mod huffman;
pub mod matchfinder;
pub mod registry;
pub mod window;

/// Alias for callers who want to compose this crate's errors with their own,
/// matching the teacher crate's `DYNERR` convention.
pub type DYNERR = Box<dyn std::error::Error + Send + Sync + 'static>;
