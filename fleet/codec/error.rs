use thiserror::Error;

/// Errors from explicit single-record decoding.
///
/// Whole-message decoding never surfaces these; it stops instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The tag byte is zero or not in the table.
    #[error("unknown tag {0:#04x}")]
    UnknownTag(u8),
    /// Fewer payload bytes remain than the tag declares.
    #[error("tag {tag:#04x} needs {needed} payload bytes, {available} available")]
    Truncated {
        /// Tag byte.
        tag: u8,
        /// Declared payload length.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },
}
