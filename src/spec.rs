//! Low-level ZIP wire format: signatures and fixed-size header records.
//!
//! Everything here reads from the in-memory archive slice at fixed offsets;
//! any read that would run off the slice is reported as [`Error::InvalidMagic`],
//! the same as a missing signature, since both mean the structure is not
//! where the container said it would be.

use memchr::memmem::FinderRev;

use crate::result::{Error, ZipResult};

/// A four-byte record signature.
pub type Magic = u32;

/// `PK\x03\x04`
pub const LOCAL_FILE_HEADER_SIGNATURE: Magic = 0x04034b50;
/// `PK\x01\x02`
pub const CENTRAL_DIRECTORY_HEADER_SIGNATURE: Magic = 0x02014b50;
/// `PK\x05\x06`
pub const CENTRAL_DIRECTORY_END_SIGNATURE: Magic = 0x06054b50;

/// Fixed portion of the end-of-central-directory record.
pub const EOCD_SIZE: usize = 22;
/// Fixed portion of a central directory header.
pub const CENTRAL_HEADER_SIZE: usize = 46;
/// Fixed portion of a local file header.
pub const LOCAL_HEADER_SIZE: usize = 30;
/// The EOCD plus the largest comment it can carry: the whole search space
/// for locating the record from the end of an archive.
pub const EOCD_SEARCH_WINDOW: usize = EOCD_SIZE + u16::MAX as usize;

pub(crate) fn read_u16(data: &[u8], offset: usize) -> ZipResult<u16> {
    match data.get(offset..offset + 2) {
        Some(b) => Ok(u16::from_le_bytes([b[0], b[1]])),
        None => Err(Error::InvalidMagic),
    }
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> ZipResult<u32> {
    match data.get(offset..offset + 4) {
        Some(b) => Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        None => Err(Error::InvalidMagic),
    }
}

fn check_magic(data: &[u8], offset: usize, magic: Magic) -> ZipResult<()> {
    if read_u32(data, offset)? == magic {
        Ok(())
    } else {
        Err(Error::InvalidMagic)
    }
}

/// The end-of-central-directory record.
#[derive(Debug)]
pub struct EndOfCentralDirectory {
    /// Total number of central directory entries.
    pub number_of_files: u16,
    /// Size in bytes of the central directory.
    pub central_directory_size: u32,
    /// Offset of the central directory from the start of the archive.
    pub central_directory_offset: u32,
    /// Length of the archive comment that follows the fixed record.
    pub comment_length: u16,
}

impl EndOfCentralDirectory {
    /// Parse the record at `offset`, verifying its signature.
    pub fn parse(data: &[u8], offset: usize) -> ZipResult<Self> {
        check_magic(data, offset, CENTRAL_DIRECTORY_END_SIGNATURE)?;
        Ok(EndOfCentralDirectory {
            number_of_files: read_u16(data, offset + 10)?,
            central_directory_size: read_u32(data, offset + 12)?,
            central_directory_offset: read_u32(data, offset + 16)?,
            comment_length: read_u16(data, offset + 20)?,
        })
    }

    /// Locate and parse the record by scanning backwards from the archive
    /// tail, looking at most one maximal comment length deep.
    pub fn find_and_parse(data: &[u8]) -> ZipResult<(Self, usize)> {
        let window_start = data.len().saturating_sub(EOCD_SEARCH_WINDOW);
        let window = &data[window_start..];

        let signature = CENTRAL_DIRECTORY_END_SIGNATURE.to_le_bytes();
        let finder = FinderRev::new(&signature);
        for offset in finder.rfind_iter(window) {
            let pos = window_start + offset;
            if let Ok(eocd) = Self::parse(data, pos) {
                return Ok((eocd, pos));
            }
        }
        Err(Error::InvalidMagic)
    }

    /// The comment bytes trailing the record at `pos`, clamped to the
    /// archive end.
    pub fn comment<'a>(&self, data: &'a [u8], pos: usize) -> &'a [u8] {
        let start = (pos + EOCD_SIZE).min(data.len());
        let end = (start + usize::from(self.comment_length)).min(data.len());
        &data[start..end]
    }
}

/// The fixed fields of one central directory header.
#[derive(Debug)]
pub struct CentralDirectoryHeader {
    /// Compression method identifier.
    pub compression_method: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Size of the stored (possibly compressed) data.
    pub compressed_size: u32,
    /// Size after decompression.
    pub uncompressed_size: u32,
    /// Length of the file name that follows the fixed fields.
    pub file_name_length: u16,
    /// Length of the extra field after the name. Skipped; ZIP64 and other
    /// extensions live here and are deliberately ignored.
    pub extra_field_length: u16,
    /// Length of the per-entry comment after the extra field.
    pub file_comment_length: u16,
    /// Offset of the entry's local header from the start of the archive.
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader {
    /// Parse the header at `offset`, verifying its signature.
    pub fn parse(data: &[u8], offset: usize) -> ZipResult<Self> {
        check_magic(data, offset, CENTRAL_DIRECTORY_HEADER_SIGNATURE)?;
        Ok(CentralDirectoryHeader {
            compression_method: read_u16(data, offset + 10)?,
            crc32: read_u32(data, offset + 16)?,
            compressed_size: read_u32(data, offset + 20)?,
            uncompressed_size: read_u32(data, offset + 24)?,
            file_name_length: read_u16(data, offset + 28)?,
            extra_field_length: read_u16(data, offset + 30)?,
            file_comment_length: read_u16(data, offset + 32)?,
            local_header_offset: read_u32(data, offset + 42)?,
        })
    }

    /// Total on-disk length of this header including its variable tail.
    pub fn total_len(&self) -> usize {
        CENTRAL_HEADER_SIZE
            + usize::from(self.file_name_length)
            + usize::from(self.extra_field_length)
            + usize::from(self.file_comment_length)
    }
}

/// The variable-length fields of a local file header. The rest repeats the
/// central directory and is not consulted.
#[derive(Debug)]
pub struct LocalFileHeader {
    /// Length of the (repeated) file name.
    pub file_name_length: u16,
    /// Length of the (possibly different) extra field.
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    /// Parse the header at `offset`, verifying its signature.
    pub fn parse(data: &[u8], offset: usize) -> ZipResult<Self> {
        check_magic(data, offset, LOCAL_FILE_HEADER_SIGNATURE)?;
        Ok(LocalFileHeader {
            file_name_length: read_u16(data, offset + 26)?,
            extra_field_length: read_u16(data, offset + 28)?,
        })
    }

    /// Offset of the entry's stored data, given the header's own offset.
    pub fn data_start(&self, header_offset: usize) -> usize {
        header_offset
            + LOCAL_HEADER_SIZE
            + usize::from(self.file_name_length)
            + usize::from(self.extra_field_length)
    }
}
