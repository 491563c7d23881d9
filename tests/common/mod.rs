//! Hand-rolled ZIP writer used to produce test archives.
//!
//! Kept independent of the crate under test: checksums come from
//! `crc32fast` and DEFLATE payloads from `flate2`.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

pub const METHOD_STORED: u16 = 0;
pub const METHOD_DEFLATED: u16 = 8;

#[derive(Default)]
pub struct ZipBuilder {
    data: Vec<u8>,
    central: Vec<u8>,
    entries: u16,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry with caller-controlled fields, valid or not.
    pub fn add_entry_raw(
        &mut self,
        name: &str,
        method: u16,
        stored: &[u8],
        crc32: u32,
        uncompressed_size: u32,
    ) -> &mut Self {
        let offset = self.data.len() as u32;
        let name = name.as_bytes();

        // Local file header.
        self.data.extend_from_slice(&0x04034b50u32.to_le_bytes());
        self.data.extend_from_slice(&20u16.to_le_bytes()); // version needed
        self.data.extend_from_slice(&0u16.to_le_bytes()); // flags
        self.data.extend_from_slice(&method.to_le_bytes());
        self.data.extend_from_slice(&0u32.to_le_bytes()); // dos time+date
        self.data.extend_from_slice(&crc32.to_le_bytes());
        self.data
            .extend_from_slice(&(stored.len() as u32).to_le_bytes());
        self.data.extend_from_slice(&uncompressed_size.to_le_bytes());
        self.data
            .extend_from_slice(&(name.len() as u16).to_le_bytes());
        self.data.extend_from_slice(&0u16.to_le_bytes()); // extra len
        self.data.extend_from_slice(name);
        self.data.extend_from_slice(stored);

        // Matching central directory header.
        self.central.extend_from_slice(&0x02014b50u32.to_le_bytes());
        self.central.extend_from_slice(&20u16.to_le_bytes()); // made by
        self.central.extend_from_slice(&20u16.to_le_bytes()); // needed
        self.central.extend_from_slice(&0u16.to_le_bytes()); // flags
        self.central.extend_from_slice(&method.to_le_bytes());
        self.central.extend_from_slice(&0u32.to_le_bytes()); // dos time+date
        self.central.extend_from_slice(&crc32.to_le_bytes());
        self.central
            .extend_from_slice(&(stored.len() as u32).to_le_bytes());
        self.central
            .extend_from_slice(&uncompressed_size.to_le_bytes());
        self.central
            .extend_from_slice(&(name.len() as u16).to_le_bytes());
        self.central.extend_from_slice(&0u16.to_le_bytes()); // extra len
        self.central.extend_from_slice(&0u16.to_le_bytes()); // comment len
        self.central.extend_from_slice(&0u16.to_le_bytes()); // disk start
        self.central.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        self.central.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        self.central.extend_from_slice(&offset.to_le_bytes());
        self.central.extend_from_slice(name);

        self.entries += 1;
        self
    }

    /// Append an uncompressed entry.
    pub fn add_stored(&mut self, name: &str, data: &[u8]) -> &mut Self {
        self.add_entry_raw(
            name,
            METHOD_STORED,
            data,
            crc32fast::hash(data),
            data.len() as u32,
        )
    }

    /// Append a directory entry (name must end in `/`).
    pub fn add_dir(&mut self, name: &str) -> &mut Self {
        assert!(name.ends_with('/'));
        self.add_stored(name, b"")
    }

    /// Append a DEFLATE-compressed entry.
    pub fn add_deflated(&mut self, name: &str, data: &[u8]) -> &mut Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();
        self.add_entry_raw(
            name,
            METHOD_DEFLATED,
            &compressed,
            crc32fast::hash(data),
            data.len() as u32,
        )
    }

    pub fn finish(self) -> Vec<u8> {
        self.finish_with_comment(b"")
    }

    pub fn finish_with_comment(mut self, comment: &[u8]) -> Vec<u8> {
        let directory_offset = self.data.len() as u32;
        let directory_size = self.central.len() as u32;
        self.data.extend_from_slice(&self.central);

        self.data.extend_from_slice(&0x06054b50u32.to_le_bytes());
        self.data.extend_from_slice(&0u16.to_le_bytes()); // disk
        self.data.extend_from_slice(&0u16.to_le_bytes()); // directory disk
        self.data.extend_from_slice(&self.entries.to_le_bytes());
        self.data.extend_from_slice(&self.entries.to_le_bytes());
        self.data.extend_from_slice(&directory_size.to_le_bytes());
        self.data.extend_from_slice(&directory_offset.to_le_bytes());
        self.data
            .extend_from_slice(&(comment.len() as u16).to_le_bytes());
        self.data.extend_from_slice(comment);
        self.data
    }
}

/// Deterministic byte soup with enough structure to compress.
pub fn sample_data(len: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(len);
    let mut x = 0x9E37_79B9u32;
    while data.len() < len {
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        // Alternate noise with a repetitive phrase so matches exist.
        if x % 3 == 0 {
            data.extend_from_slice(b"the quick brown fox jumps over the lazy dog. ");
        } else {
            data.push(x as u8);
        }
    }
    data.truncate(len);
    data
}
