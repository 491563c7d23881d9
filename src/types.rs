//! Types that describe what is contained in an archive.

use std::borrow::Cow;
use std::fmt;

/// Compression method of a stored entry.
///
/// Only STORED (0) and DEFLATE (8) can be extracted; anything else is
/// carried through so the caller can name it in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Method 0: the data is stored without compression.
    Stored,
    /// Method 8: the data is a raw DEFLATE stream.
    Deflated,
    /// Any other method identifier.
    Unsupported(u16),
}

impl CompressionMethod {
    pub(crate) fn from_u16(method: u16) -> Self {
        match method {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflated,
            other => CompressionMethod::Unsupported(other),
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMethod::Stored => f.write_str("stored"),
            CompressionMethod::Deflated => f.write_str("deflated"),
            CompressionMethod::Unsupported(id) => write!(f, "unsupported({id})"),
        }
    }
}

/// Metadata of one archive entry, as recorded in the central directory.
/// The name borrows from the archive bytes; nothing is owned.
#[derive(Clone, Debug)]
pub struct ZipEntry<'a> {
    pub(crate) file_name: &'a [u8],
    pub(crate) compression_method: CompressionMethod,
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u32,
    pub(crate) uncompressed_size: u32,
    pub(crate) local_header_offset: u32,
}

impl<'a> ZipEntry<'a> {
    /// The stored name, lossily decoded for display. ZIP names use forward
    /// slashes regardless of platform.
    pub fn name(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.file_name)
    }

    /// The stored name bytes, untouched.
    pub fn name_raw(&self) -> &'a [u8] {
        self.file_name
    }

    /// Whether this entry denotes a directory (stored name ends in `/`).
    pub fn is_dir(&self) -> bool {
        self.file_name.ends_with(b"/")
    }

    /// How the entry data is stored.
    pub fn compression_method(&self) -> CompressionMethod {
        self.compression_method
    }

    /// CRC-32 of the uncompressed data, from the central directory.
    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    /// Stored (possibly compressed) size in bytes.
    pub fn compressed_size(&self) -> u32 {
        self.compressed_size
    }

    /// Size after decompression, as recorded by the archiver.
    pub fn uncompressed_size(&self) -> u32 {
        self.uncompressed_size
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn method_mapping() {
        assert_eq!(CompressionMethod::from_u16(0), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from_u16(8), CompressionMethod::Deflated);
        assert_eq!(
            CompressionMethod::from_u16(12),
            CompressionMethod::Unsupported(12)
        );
        assert_eq!(CompressionMethod::Unsupported(12).to_string(), "unsupported(12)");
    }

    #[test]
    fn directory_detection_and_lossy_name() {
        let entry = ZipEntry {
            file_name: b"docs/",
            compression_method: CompressionMethod::Stored,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            local_header_offset: 0,
        };
        assert!(entry.is_dir());
        assert_eq!(entry.name(), "docs/");

        let entry = ZipEntry {
            file_name: &[b'a', 0xFF, b'b'],
            ..entry
        };
        assert!(!entry.is_dir());
        assert_eq!(entry.name(), "a\u{FFFD}b");
    }
}
