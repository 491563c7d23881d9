//! Reading ZIP archives: locating the central directory and materializing
//! entries through the DEFLATE engine.

use indexmap::IndexMap;

use crate::crc32::crc32;
use crate::inflate::{self, BitReader};
use crate::mem::{Arena, ArenaBuf};
use crate::result::{Error, ZipResult};
use crate::spec::{
    CentralDirectoryHeader, EndOfCentralDirectory, LocalFileHeader, CENTRAL_HEADER_SIZE,
};
use crate::types::{CompressionMethod, ZipEntry};

/// A parsed, memory-resident ZIP archive.
///
/// Parsing walks the central directory once and keeps borrowed metadata for
/// every entry; nothing is decompressed until [`extract`](Self::extract) is
/// called. The archive borrows the input bytes and is independent of any
/// arena — arenas come into play per extraction.
pub struct ZipArchive<'a> {
    data: &'a [u8],
    /// Correction applied to every stored offset when the archive is
    /// preceded by foreign bytes (a self-extractor stub, for instance).
    base_offset: usize,
    entries: Vec<ZipEntry<'a>>,
    index: IndexMap<&'a [u8], usize>,
    comment: &'a [u8],
}

impl<'a> ZipArchive<'a> {
    /// Parse the archive held in `data`.
    pub fn new(data: &'a [u8]) -> ZipResult<ZipArchive<'a>> {
        let (eocd, eocd_pos) = EndOfCentralDirectory::find_and_parse(data)?;
        let comment = eocd.comment(data, eocd_pos);

        // If the central directory does not end at the EOCD, everything in
        // the file is shifted by the same amount; offsets stored in the
        // archive are relative to its true start.
        let directory_size = eocd.central_directory_size as usize;
        let nominal_offset = eocd.central_directory_offset as usize;
        let base_offset = eocd_pos
            .checked_sub(directory_size)
            .and_then(|pos| pos.checked_sub(nominal_offset))
            .ok_or(Error::InvalidMagic)?;

        let mut entries = Vec::with_capacity(usize::from(eocd.number_of_files));
        let mut index = IndexMap::with_capacity(usize::from(eocd.number_of_files));
        let mut offset = base_offset + nominal_offset;
        for _ in 0..eocd.number_of_files {
            let header = CentralDirectoryHeader::parse(data, offset)?;
            let name_start = offset + CENTRAL_HEADER_SIZE;
            let file_name = data
                .get(name_start..name_start + usize::from(header.file_name_length))
                .ok_or(Error::InvalidMagic)?;

            index.insert(file_name, entries.len());
            entries.push(ZipEntry {
                file_name,
                compression_method: CompressionMethod::from_u16(header.compression_method),
                crc32: header.crc32,
                compressed_size: header.compressed_size,
                uncompressed_size: header.uncompressed_size,
                local_header_offset: header.local_header_offset,
            });
            offset += header.total_len();
        }

        log::debug!(
            "parsed central directory: {} entries, base offset {}",
            entries.len(),
            base_offset
        );
        Ok(ZipArchive {
            data,
            base_offset,
            entries,
            index,
            comment,
        })
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The archive comment (empty if none).
    pub fn comment(&self) -> &'a [u8] {
        self.comment
    }

    /// All entries, in central directory order.
    pub fn entries(&self) -> &[ZipEntry<'a>] {
        &self.entries
    }

    /// The entry at `index`, in central directory order.
    pub fn by_index(&self, index: usize) -> Option<&ZipEntry<'a>> {
        self.entries.get(index)
    }

    /// Look an entry up by its exact stored name. When an archive stores
    /// the same name twice, the later entry wins.
    pub fn by_name(&self, name: &str) -> Option<&ZipEntry<'a>> {
        let index = *self.index.get(name.as_bytes())?;
        self.entries.get(index)
    }

    /// Decompress `entry` into `arena` and verify its CRC-32.
    ///
    /// The returned bytes live in the arena, directly above the position it
    /// held on entry; transient decode state is reclaimed before returning.
    /// A header/stream disagreement on the uncompressed size is only
    /// logged — the checksum is the integrity arbiter.
    pub fn extract<'ar>(&self, entry: &ZipEntry<'a>, arena: &'ar Arena) -> ZipResult<&'ar [u8]> {
        let checkpoint = arena.pos();
        match self.extract_to(entry, arena) {
            Ok(out) => out.settle(checkpoint),
            Err(err) => {
                // Nothing handed out above the checkpoint survives failure.
                unsafe { arena.rewind_unchecked(checkpoint) };
                Err(err)
            }
        }
    }

    fn extract_to<'ar>(
        &self,
        entry: &ZipEntry<'a>,
        arena: &'ar Arena,
    ) -> ZipResult<ArenaBuf<'ar>> {
        let header_offset = self.base_offset + entry.local_header_offset as usize;
        let local = LocalFileHeader::parse(self.data, header_offset)?;
        let data_start = local.data_start(header_offset);
        let payload = self
            .data
            .get(data_start..data_start + entry.compressed_size as usize)
            .ok_or(Error::InvalidMagic)?;

        let out = match entry.compression_method {
            CompressionMethod::Stored => {
                let mut out = ArenaBuf::with_capacity(arena, payload.len())?;
                out.extend_from_slice(payload)?;
                out
            }
            CompressionMethod::Deflated => {
                let mut out = ArenaBuf::with_capacity(arena, entry.uncompressed_size as usize)?;
                let mut br = BitReader::new(payload);
                inflate::inflate(&mut br, &mut out)?;
                out
            }
            CompressionMethod::Unsupported(method) => {
                return Err(Error::UnsupportedMethod(method))
            }
        };

        let actual = crc32(out.as_slice());
        if actual != entry.crc32 {
            return Err(Error::InvalidChecksum {
                expected: entry.crc32,
                actual,
            });
        }
        if out.len() as u32 != entry.uncompressed_size {
            log::warn!(
                "{}: uncompressed size mismatch (directory says {}, stream produced {})",
                entry.name(),
                entry.uncompressed_size,
                out.len()
            );
        }
        Ok(out)
    }
}
