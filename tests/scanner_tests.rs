// Tests for the scanner module

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use romcheck::{ContainerKind, RomCheckError, ScanEngine};
use tempfile::tempdir;

fn write_zip(path: &Path, members: &[(&str, &[u8])], method: zip::CompressionMethod) {
    let file = File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default().compression_method(method);
    for (name, data) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn test_scan_plain_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("rom.bin"), b"hello world").unwrap();

    let report = ScanEngine::new().scan(dir.path()).unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.items.len(), 1);
    let item = &report.items[0];
    assert_eq!(item.name, "rom.bin");
    assert_eq!(item.crc32, "d4a1185");
    assert_eq!(item.container_kind, ContainerKind::Plain);
    assert!(item.member_path.is_empty());
}

#[test]
fn test_scan_single_file_root() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rom.bin");
    fs::write(&path, b"hello world").unwrap();

    let report = ScanEngine::new().scan(&path).unwrap();

    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].crc32, "d4a1185");
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a/b")).unwrap();
    fs::write(dir.path().join("root.bin"), b"root").unwrap();
    fs::write(dir.path().join("a/mid.bin"), b"mid").unwrap();
    fs::write(dir.path().join("a/b/deep.bin"), b"deep").unwrap();

    let report = ScanEngine::new().scan(dir.path()).unwrap();

    assert_eq!(report.items.len(), 3);
    let mut names: Vec<_> = report.items.iter().map(|i| i.name.as_str()).collect();
    names.sort();
    assert_eq!(names, ["deep.bin", "mid.bin", "root.bin"]);
}

#[test]
fn test_zip_member_digest_matches_plain_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("plain.bin"), b"hello world").unwrap();
    write_zip(
        &dir.path().join("archive.zip"),
        &[("inner.bin", b"hello world")],
        zip::CompressionMethod::Stored,
    );

    let report = ScanEngine::new().scan(dir.path()).unwrap();

    assert_eq!(report.items.len(), 2);
    let plain = report
        .items
        .iter()
        .find(|i| i.container_kind == ContainerKind::Plain)
        .unwrap();
    let zipped = report
        .items
        .iter()
        .find(|i| i.container_kind == ContainerKind::Zip)
        .unwrap();

    // Same content, same digest, different container kind
    assert_eq!(plain.crc32, zipped.crc32);
    assert_eq!(zipped.name, "inner.bin");
    assert_eq!(zipped.member_path, "inner.bin");
}

#[test]
fn test_deflated_member_keeps_stored_digest() {
    let dir = tempdir().unwrap();
    write_zip(
        &dir.path().join("archive.zip"),
        &[("inner.bin", b"hello world")],
        zip::CompressionMethod::Deflated,
    );

    let report = ScanEngine::new().scan(dir.path()).unwrap();

    assert_eq!(report.items.len(), 1);
    // The stored CRC is of the uncompressed content
    assert_eq!(report.items[0].crc32, "d4a1185");
}

#[test]
fn test_zip_directories_and_empty_members_are_skipped() {
    let dir = tempdir().unwrap();
    let zip_path = dir.path().join("archive.zip");
    let file = File::create(&zip_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.add_directory("sub/", options).unwrap();
    writer.start_file("empty.bin", options).unwrap();
    writer.start_file("real.bin", options).unwrap();
    writer.write_all(b"hello world").unwrap();
    writer.finish().unwrap();

    let report = ScanEngine::new().scan(dir.path()).unwrap();

    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].name, "real.bin");
}

#[test]
fn test_member_names_keep_archive_paths() {
    let dir = tempdir().unwrap();
    write_zip(
        &dir.path().join("archive.zip"),
        &[("games/disc1/track.bin", b"hello world")],
        zip::CompressionMethod::Stored,
    );

    let report = ScanEngine::new().scan(dir.path()).unwrap();

    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].name, "track.bin");
    assert_eq!(report.items[0].member_path, "games/disc1/track.bin");
}

#[test]
fn test_corrupt_zip_is_reported_but_not_fatal() {
    let dir = tempdir().unwrap();
    // Correct signature, garbage body
    fs::write(dir.path().join("broken.zip"), b"PK\x03\x04 not really a zip").unwrap();
    fs::write(dir.path().join("fine.bin"), b"hello world").unwrap();

    let report = ScanEngine::new().scan(dir.path()).unwrap();

    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].name, "fine.bin");
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        RomCheckError::ArchiveFormat { .. }
    ));
}

#[test]
fn test_sevenz_member_digest_matches_plain_file() {
    let dir = tempdir().unwrap();
    let payload = dir.path().join("payload");
    fs::create_dir_all(&payload).unwrap();
    fs::write(payload.join("inner.bin"), b"hello world").unwrap();

    let scan_root = dir.path().join("roms");
    fs::create_dir_all(&scan_root).unwrap();
    sevenz_rust::compress_to_path(&payload, scan_root.join("archive.7z")).unwrap();

    let report = ScanEngine::new().scan(&scan_root).unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.items.len(), 1);
    let item = &report.items[0];
    assert_eq!(item.container_kind, ContainerKind::SevenZip);
    assert_eq!(item.name, "inner.bin");
    assert_eq!(item.crc32, "d4a1185");
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let result = ScanEngine::new().scan(&dir.path().join("nope"));
    assert!(matches!(result, Err(RomCheckError::RootNotFound { .. })));
}
