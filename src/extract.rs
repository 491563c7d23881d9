//! Bulk extraction of an archive into a destination directory.

use std::cmp::Ordering;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::bytes;
use crate::mem::Arena;
use crate::read::ZipArchive;
use crate::result::ZipResult;
use crate::types::ZipEntry;

/// Entries per progress report. A reporting boundary only — extraction is
/// strictly sequential.
const BATCH: usize = 64;

/// What a bulk extraction did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Regular files written.
    pub files: usize,
    /// Directory entries created.
    pub dirs: usize,
    /// Entries skipped after a logged error.
    pub failed: usize,
}

/// Extract every entry of `archive` under `dest`, creating intermediate
/// directories as needed.
///
/// Entries are processed shallowest-first, directories before files at equal
/// depth, then in name order, so a directory entry always exists before its
/// children. Per-entry failures (bad data, unsafe names, filesystem errors)
/// are logged and counted but do not stop the run; only a failure to create
/// `dest` itself is fatal.
pub fn extract_all(
    archive: &ZipArchive<'_>,
    arena: &mut Arena,
    dest: &Path,
) -> ZipResult<ExtractSummary> {
    let mut order: Vec<usize> = (0..archive.len()).collect();
    order.sort_by(|&a, &b| {
        let a = &archive.entries()[a];
        let b = &archive.entries()[b];
        entry_order(a, b)
    });

    fs::create_dir_all(dest)?;

    let mut summary = ExtractSummary::default();
    for (batch, chunk) in order.chunks(BATCH).enumerate() {
        log::debug!(
            "batch {}: entries {}..{}",
            batch,
            batch * BATCH,
            batch * BATCH + chunk.len()
        );
        for &index in chunk {
            let entry = &archive.entries()[index];
            match extract_one(archive, arena, dest, entry) {
                Ok(true) => summary.dirs += 1,
                Ok(false) => summary.files += 1,
                Err(err) => {
                    log::error!("{}: {}", entry.name(), err);
                    summary.failed += 1;
                }
            }
        }
    }
    Ok(summary)
}

/// Extract a single entry. Returns whether it was a directory.
fn extract_one(
    archive: &ZipArchive<'_>,
    arena: &mut Arena,
    dest: &Path,
    entry: &ZipEntry<'_>,
) -> ZipResult<bool> {
    let path = match sanitized_path(dest, &entry.name()) {
        Some(path) => path,
        None => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "entry name escapes the destination directory",
            )
            .into())
        }
    };

    if entry.is_dir() {
        fs::create_dir_all(&path)?;
        return Ok(true);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let scratch = arena.scratch();
    let data = archive.extract(entry, &scratch)?;
    fs::write(&path, data)?;
    Ok(false)
}

/// Shallow entries first, directories before files at equal depth, names in
/// byte order as the final tie-break.
fn entry_order(a: &ZipEntry<'_>, b: &ZipEntry<'_>) -> Ordering {
    depth(a.name_raw())
        .cmp(&depth(b.name_raw()))
        .then_with(|| b.is_dir().cmp(&a.is_dir()))
        .then_with(|| bytes::compare(a.name_raw(), b.name_raw()))
}

/// Number of path components in a stored name.
fn depth(name: &[u8]) -> usize {
    name.split(|&b| b == b'/').filter(|c| !c.is_empty()).count()
}

/// Join a stored name onto `dest`, refusing anything that would land
/// outside it: absolute names, rootless prefixes, or `..` that climbs past
/// the destination. Returns `None` for such names and for empty ones.
fn sanitized_path(dest: &Path, name: &str) -> Option<PathBuf> {
    let mut components = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return None,
            Component::ParentDir => {
                components.pop()?;
            }
            Component::Normal(part) => components.push(part),
            Component::CurDir => (),
        }
    }
    if components.is_empty() {
        return None;
    }
    let mut path = dest.to_path_buf();
    path.extend(components);
    Some(path)
}
