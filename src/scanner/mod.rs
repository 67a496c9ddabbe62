// Directory scanning module
// Walks a root path and yields digestible items with their container kind

pub mod archive;

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::digest::{Algorithm, DigestComputer};
use crate::error::RomCheckError;

/// One local, verifiable unit of content: a plain file or a single
/// archive member. Directories and zero-CRC members never produce one.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScannedItem {
    /// Base file name, or the archive member's base name
    pub name: String,
    /// Digest, recomputed from bytes or recovered from archive metadata
    pub crc32: String,
    /// Path of the containing file on disk
    pub source_path: PathBuf,
    /// Path within the archive, empty for plain files
    pub member_path: String,
    pub container_kind: ContainerKind,
}

/// Container family a scanned item was read from, selected by content
/// signature rather than file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Plain,
    Zip,
    SevenZip,
}

impl ContainerKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContainerKind::Plain => "plain",
            ContainerKind::Zip => "zip",
            ContainerKind::SevenZip => "7z",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A path that could not be scanned, with the error that stopped it.
/// Failures never abort the surrounding scan.
#[derive(Debug)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: RomCheckError,
}

/// Everything one scan pass produced
#[derive(Debug)]
pub struct ScanReport {
    pub items: Vec<ScannedItem>,
    pub failures: Vec<ScanFailure>,
}

/// Engine for scanning a file tree into digest-bearing items
pub struct ScanEngine {
    computer: DigestComputer,
}

impl ScanEngine {
    /// Create a new ScanEngine with default digest settings
    pub fn new() -> Self {
        Self {
            computer: DigestComputer::new(),
        }
    }

    /// Create a new ScanEngine with a custom digest computer
    pub fn with_computer(computer: DigestComputer) -> Self {
        Self { computer }
    }

    /// Scan a root path recursively.
    ///
    /// The root may be a single file, which behaves like a one-item
    /// directory. A missing or unreadable root is fatal; every failure
    /// below the root is recorded in the report and the scan continues.
    pub fn scan(&self, root: &Path) -> Result<ScanReport, RomCheckError> {
        let metadata = fs::metadata(root).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RomCheckError::RootNotFound {
                path: root.to_path_buf(),
            },
            _ => RomCheckError::from_io_error(e, "reading scan root", Some(root.to_path_buf())),
        })?;

        let mut files = Vec::new();
        let mut failures = Vec::new();
        if metadata.is_dir() {
            walk_tree(root, &mut files, &mut failures);
        } else {
            files.push(root.to_path_buf());
        }

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) | {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );

        let mut items = Vec::new();
        for path in &files {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown");
            pb.set_message(file_name.to_string());

            match self.scan_file(path) {
                Ok(mut found) => items.append(&mut found),
                Err(error) => {
                    tracing::warn!("skipping {}: {}", path.display(), error);
                    failures.push(ScanFailure {
                        path: path.clone(),
                        error,
                    });
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        tracing::debug!(
            "scan of {} produced {} items, {} failures",
            root.display(),
            items.len(),
            failures.len()
        );

        Ok(ScanReport { items, failures })
    }

    /// Classify one file by signature and turn it into scanned items.
    /// Archive and file handles live only as long as this call.
    pub fn scan_file(&self, path: &Path) -> Result<Vec<ScannedItem>, RomCheckError> {
        match sniff_container(path)? {
            ContainerKind::Zip => {
                let members = archive::list_zip_members(path)?;
                Ok(member_items(path, ContainerKind::Zip, members))
            }
            ContainerKind::SevenZip => {
                let members = archive::list_sevenz_members(path)?;
                Ok(member_items(path, ContainerKind::SevenZip, members))
            }
            ContainerKind::Plain => {
                let crc32 = self.computer.digest_file(path, Algorithm::Crc32)?;
                Ok(vec![ScannedItem {
                    name: base_name(path),
                    crc32,
                    source_path: path.to_path_buf(),
                    member_path: String::new(),
                    container_kind: ContainerKind::Plain,
                }])
            }
        }
    }
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively collect regular files under a root.
/// Unreadable subdirectories are logged and skipped; a missing root is an
/// error for the invocation.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>, RomCheckError> {
    let metadata = fs::metadata(root).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RomCheckError::RootNotFound {
            path: root.to_path_buf(),
        },
        _ => RomCheckError::from_io_error(e, "reading", Some(root.to_path_buf())),
    })?;

    let mut files = Vec::new();
    if metadata.is_dir() {
        let mut failures = Vec::new();
        walk_tree(root, &mut files, &mut failures);
    } else {
        files.push(root.to_path_buf());
    }
    Ok(files)
}

fn walk_tree(dir: &Path, files: &mut Vec<PathBuf>, failures: &mut Vec<ScanFailure>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            // Abort this subtree only; the rest of the scan continues
            tracing::warn!("cannot read directory {}: {}", dir.display(), e);
            failures.push(ScanFailure {
                path: dir.to_path_buf(),
                error: RomCheckError::from_io_error(
                    e,
                    "reading directory",
                    Some(dir.to_path_buf()),
                ),
            });
            return;
        }
    };

    for entry_result in entries {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("cannot read directory entry in {}: {}", dir.display(), e);
                failures.push(ScanFailure {
                    path: dir.to_path_buf(),
                    error: RomCheckError::from_io_error(
                        e,
                        "reading directory entry",
                        Some(dir.to_path_buf()),
                    ),
                });
                continue;
            }
        };

        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                tracing::warn!("cannot read metadata for {}: {}", path.display(), e);
                failures.push(ScanFailure {
                    path: path.clone(),
                    error: RomCheckError::from_io_error(e, "reading metadata", Some(path)),
                });
                continue;
            }
        };

        if file_type.is_dir() {
            walk_tree(&path, files, failures);
        } else if file_type.is_file() {
            files.push(path);
        }
        // Symlinks and other special files are left alone, which also keeps
        // traversal finite on cyclic symlink trees
    }
}

fn member_items(
    path: &Path,
    kind: ContainerKind,
    members: Vec<(String, String)>,
) -> Vec<ScannedItem> {
    members
        .into_iter()
        .map(|(member_path, crc32)| ScannedItem {
            name: member_base_name(&member_path),
            crc32,
            source_path: path.to_path_buf(),
            member_path,
            container_kind: kind,
        })
        .collect()
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

fn member_base_name(member: &str) -> String {
    member
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(member)
        .to_string()
}

const SEVENZ_MAGIC: [u8; 6] = [0x37, 0x7a, 0xbc, 0xaf, 0x27, 0x1c];

/// Decide a file's container kind from its leading bytes
fn sniff_container(path: &Path) -> Result<ContainerKind, RomCheckError> {
    let mut file = File::open(path)
        .map_err(|e| RomCheckError::from_io_error(e, "opening", Some(path.to_path_buf())))?;

    let mut magic = [0u8; 6];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(RomCheckError::from_io_error(
                    e,
                    "reading signature of",
                    Some(path.to_path_buf()),
                ))
            }
        }
    }

    Ok(classify_magic(&magic[..filled]))
}

/// Classify leading bytes into a container kind
pub fn classify_magic(header: &[u8]) -> ContainerKind {
    if is_zip_magic(header) {
        ContainerKind::Zip
    } else if header.len() >= SEVENZ_MAGIC.len() && header[..SEVENZ_MAGIC.len()] == SEVENZ_MAGIC {
        ContainerKind::SevenZip
    } else {
        ContainerKind::Plain
    }
}

/// ZIP signatures are `PK..`: local file header, central directory,
/// end of central directory (empty archive), data descriptor.
fn is_zip_magic(header: &[u8]) -> bool {
    if header.len() < 4 {
        return false;
    }
    if header[0] != b'P' || header[1] != b'K' {
        return false;
    }
    matches!((header[2], header[3]), (1, 2) | (3, 4) | (5, 6) | (7, 8))
}
