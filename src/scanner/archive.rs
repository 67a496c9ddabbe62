// Archive member enumeration
// Recovers stored per-member CRC32 values from container metadata; member
// bytes are never decompressed

use std::fmt;
use std::fs::File;
use std::path::Path;

use crate::error::RomCheckError;

/// Enumerate a zip-family archive's central directory.
/// Returns (member path, crc32 hex) pairs for every digestible member.
pub fn list_zip_members(path: &Path) -> Result<Vec<(String, String)>, RomCheckError> {
    let file = File::open(path).map_err(|e| {
        RomCheckError::from_io_error(e, "opening archive", Some(path.to_path_buf()))
    })?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| archive_error(path, e))?;

    let mut members = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let member = archive
            .by_index_raw(index)
            .map_err(|e| archive_error(path, e))?;

        // A stored CRC32 of zero marks a directory entry or an empty
        // member; there is nothing to match
        if member.crc32() == 0 {
            continue;
        }

        members.push((member.name().to_string(), format!("{:x}", member.crc32())));
    }

    Ok(members)
}

/// Enumerate a 7z-family archive's index, same semantics as zip
pub fn list_sevenz_members(path: &Path) -> Result<Vec<(String, String)>, RomCheckError> {
    let reader = sevenz_rust::SevenZReader::open(path, sevenz_rust::Password::empty())
        .map_err(|e| archive_error(path, e))?;

    let mut members = Vec::new();
    for entry in &reader.archive().files {
        if entry.is_directory() {
            continue;
        }
        if !entry.has_crc || entry.crc == 0 {
            continue;
        }
        members.push((entry.name().to_string(), format!("{:x}", entry.crc as u32)));
    }

    Ok(members)
}

fn archive_error(path: &Path, err: impl fmt::Display) -> RomCheckError {
    RomCheckError::ArchiveFormat {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
