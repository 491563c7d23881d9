//! Error types that can be emitted from this library

use displaydoc::Display;
use thiserror::Error;

use std::io;

/// Generic result type with [`Error`] as its error variant
pub type ZipResult<T> = Result<T, Error>;

/// Error type for archive parsing and extraction.
///
/// The set is deliberately flat: every failure in the pipeline maps to
/// exactly one of these kinds, and nothing is retried below this layer.
#[derive(Debug, Display, Error)]
#[non_exhaustive]
pub enum Error {
    /// i/o error: {0}
    Io(#[from] io::Error),

    /// missing or corrupt signature
    InvalidMagic,

    /// unsupported compression method {0}
    UnsupportedMethod(u16),

    /// malformed gzip header
    InvalidHeader,

    /// checksum mismatch: expected {expected:08x}, computed {actual:08x}
    InvalidChecksum {
        /// CRC-32 recorded in the container.
        expected: u32,
        /// CRC-32 computed over the decompressed bytes.
        actual: u32,
    },

    /// decompressed length does not match the stream trailer
    InvalidSize,

    /// malformed deflate block
    InvalidBlock,

    /// invalid huffman code
    InvalidHuffmanCode,

    /// back-reference distance out of range
    InvalidDistance,

    /// unexpected end of input
    UnexpectedEof,

    /// out of memory: the arena could not reserve or commit
    OutOfMemory,
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        let kind = match &err {
            Error::Io(err) => err.kind(),
            Error::UnexpectedEof => io::ErrorKind::UnexpectedEof,
            Error::UnsupportedMethod(_) => io::ErrorKind::Unsupported,
            Error::OutOfMemory => io::ErrorKind::OutOfMemory,
            _ => io::ErrorKind::InvalidData,
        };

        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn io_error_kind_mapping() {
        let err: io::Error = Error::UnexpectedEof.into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err: io::Error = Error::UnsupportedMethod(12).into();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(err.to_string().contains("12"));

        let err: io::Error = Error::InvalidMagic.into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn checksum_message_carries_both_values() {
        let msg = Error::InvalidChecksum {
            expected: 0xD893_2AAC,
            actual: 0x0000_BEEF,
        }
        .to_string();
        assert!(msg.contains("d8932aac"));
        assert!(msg.contains("0000beef"));
    }
}
