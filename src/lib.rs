//! Arena-backed ZIP and GZIP extraction.
//!
//! The crate decompresses memory-resident archives: a ZIP container reader
//! and an RFC 1952 GZIP envelope, both backed by the same RFC 1951 DEFLATE
//! decoder (stored, fixed-huffman and dynamic-huffman blocks). Decompressed
//! output and all transient decode state live in an [`Arena`] — a chained
//! reserve/commit bump allocator with LIFO checkpoints — so extracting many
//! entries reuses the same pages instead of round-tripping the system
//! allocator.
//!
//! ```no_run
//! use zipflate::{Arena, ZipArchive};
//!
//! let data = std::fs::read("example.zip")?;
//! let archive = ZipArchive::new(&data)?;
//! let mut arena = Arena::with_capacity(256 << 20, 1 << 20)?;
//! for entry in archive.entries() {
//!     let scratch = arena.scratch();
//!     let bytes = archive.extract(entry, &scratch)?;
//!     println!("{}: {} bytes", entry.name(), bytes.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Out of scope: ZIP64, encryption, multi-disk archives, and compression
//! methods other than STORED and DEFLATE.

#![warn(missing_docs)]

pub mod bytes;
pub mod crc32;
pub mod extract;
pub mod gzip;
pub mod inflate;
pub mod mem;
pub mod read;
pub mod result;
pub mod spec;
pub mod types;

pub use crate::mem::{Arena, Scratch, ARENA_HEADER_SIZE};
pub use crate::read::ZipArchive;
pub use crate::result::{Error, ZipResult};
pub use crate::types::{CompressionMethod, ZipEntry};
