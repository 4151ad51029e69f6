//! Wire format implementations (spec §4.5, §6). Each module owns one
//! codec's header shape and bit-stream grammar, built on the shared
//! framework in `crate::{bitstream, window, matchfinder, huffman, codec}`.

pub mod aklz;
pub mod blz;
pub mod clz0;
pub mod cnx2;
pub mod ecd;
pub mod huf20;
pub mod hwgz;
pub mod lz10;
pub mod lz11;
pub mod lz40;
pub mod lz4frame;
pub mod lzo;
pub mod lzss;
pub mod mio0;
pub mod wflz;
pub mod yay0;
pub mod yaz0;
