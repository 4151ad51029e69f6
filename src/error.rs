//! Crate-wide error type.
//!
//! Decoders fail fast on structural errors; encoders only fail on invalid
//! configuration or I/O, never on input content (any byte sequence is
//! compressible). See the module-level docs in `lib.rs` for the policy.

/// Errors surfaced by codec `is_match`/`decompressed_size`/`decompress`/`compress`.
///
/// `CompressedSizeMismatch` is deliberately non-fatal: it is logged at
/// `trace` level by the codec that notices it and execution continues,
/// because many game files carry trailing alignment padding after the
/// declared compressed size.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// a magic or sanity byte does not match what the codec expects
    #[error("{codec}: invalid identifier")]
    InvalidIdentifier { codec: &'static str },

    /// produced bytes did not match the declared decompressed size
    #[error("{codec}: decompressed size mismatch, expected {expected}, got {actual}")]
    DecompressedSizeMismatch {
        codec: &'static str,
        expected: u64,
        actual: u64,
    },

    /// bytes consumed from the body did not match the declared compressed
    /// size; non-fatal, codecs log this at `trace` and keep the decoded
    /// output rather than returning the error.
    #[error("{codec}: compressed size mismatch, expected {expected}, got {actual}")]
    CompressedSizeMismatch {
        codec: &'static str,
        expected: u64,
        actual: u64,
    },

    /// source exhausted mid-token
    #[error("{codec}: unexpected end of input")]
    UnexpectedEnd { codec: &'static str },

    /// a recognised feature is not implemented
    #[error("{codec}: not supported: {what}")]
    NotSupported {
        codec: &'static str,
        what: &'static str,
    },

    /// a configuration combination was rejected
    #[error("{codec}: invalid argument: {message}")]
    InvalidArgument {
        codec: &'static str,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias matching the teacher crate's `DYNERR`, for callers who
/// want to compose this crate's errors with their own.
pub type DynErr = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;
