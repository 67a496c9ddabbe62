// Tests for the datasheet parsing module

use std::fs;
use std::path::PathBuf;

use romcheck::{DatasheetReader, EntryTag, RomCheckError};
use tempfile::tempdir;

fn write_sheet(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sheet.dat");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

const BASIC_DAT: &str = r#"<?xml version="1.0"?>
<datafile>
  <header>
    <name>Test System</name>
    <description>Test System reference set</description>
    <category>TOSEC</category>
    <homepage>redump.org</homepage>
  </header>
  <game name="Cool Game (USA)">
    <description>Cool Game (USA)</description>
    <rom name="Cool Game (USA).bin" size="11" crc="0D4A1185" md5="ffff"/>
    <rom name="Cool Game (USA).cue" size="2" crc="FE11BCAF"/>
  </game>
  <game name="Broken Dump">
    <description>Broken Dump</description>
    <rom name="Broken Dump.bin" size="4"/>
  </game>
</datafile>
"#;

#[test]
fn test_header_prefers_homepage_over_category() {
    let (_dir, path) = write_sheet(BASIC_DAT);

    let reader = DatasheetReader::open(&path, EntryTag::Game).unwrap();
    assert_eq!(reader.header().group, "Test System");
    assert_eq!(reader.header().category, "redump.org");
}

#[test]
fn test_header_falls_back_to_category() {
    let (_dir, path) = write_sheet(
        r#"<?xml version="1.0"?>
<datafile>
  <header>
    <name>Old System</name>
    <category>TOSEC</category>
  </header>
  <game name="A">
    <description>A</description>
    <rom name="a.rom" crc="11223344"/>
  </game>
</datafile>
"#,
    );

    let reader = DatasheetReader::open(&path, EntryTag::Game).unwrap();
    assert_eq!(reader.header().category, "TOSEC");
}

#[test]
fn test_entries_are_extracted_with_lowercase_digests() {
    let (_dir, path) = write_sheet(BASIC_DAT);

    let entries = DatasheetReader::open(&path, EntryTag::Game)
        .unwrap()
        .collect_entries()
        .unwrap();

    // The crc-less rom is skipped without failing the document
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].file_name, "Cool Game (USA).bin");
    assert_eq!(entries[0].crc32, "0d4a1185");
    assert_eq!(entries[0].game_name, "Cool Game (USA)");
    assert_eq!(entries[0].group, "Test System");
    assert_eq!(entries[0].category, "redump.org");

    assert_eq!(entries[1].file_name, "Cool Game (USA).cue");
    assert_eq!(entries[1].crc32, "fe11bcaf");
    assert_eq!(entries[1].game_name, "Cool Game (USA)");
}

#[test]
fn test_entries_stream_lazily() {
    let (_dir, path) = write_sheet(BASIC_DAT);

    let mut reader = DatasheetReader::open(&path, EntryTag::Game).unwrap();
    let first = reader.next().unwrap().unwrap();
    assert_eq!(first.crc32, "0d4a1185");

    // The rest of the document is still unread at this point
    let remaining: Vec<_> = reader.map(Result::unwrap).collect();
    assert_eq!(remaining.len(), 1);
}

#[test]
fn test_missing_header_fails_document() {
    let (_dir, path) = write_sheet(
        r#"<?xml version="1.0"?>
<datafile>
  <game name="A">
    <description>A</description>
    <rom name="a.rom" crc="11223344"/>
  </game>
</datafile>
"#,
    );

    let result = DatasheetReader::open(&path, EntryTag::Game);
    assert!(matches!(
        result,
        Err(RomCheckError::DatasheetStructure { .. })
    ));
}

#[test]
fn test_header_without_name_fails_document() {
    let (_dir, path) = write_sheet(
        r#"<?xml version="1.0"?>
<datafile>
  <header>
    <homepage>somewhere.org</homepage>
  </header>
</datafile>
"#,
    );

    let result = DatasheetReader::open(&path, EntryTag::Game);
    assert!(matches!(
        result,
        Err(RomCheckError::DatasheetStructure { .. })
    ));
}

#[test]
fn test_machine_tag_uses_fixed_provenance() {
    let (_dir, path) = write_sheet(
        r#"<?xml version="1.0"?>
<mame build="0.250">
  <machine name="puckman">
    <description>PuckMan (Japan set 1)</description>
    <rom name="pm1_prg1.6e" size="2048" crc="F36E88AB"/>
    <rom name="pm1_prg2.6k" size="2048" crc="618BD9B3"/>
  </machine>
  <machine name="nodump">
    <description>No Dump</description>
    <rom name="missing.bin" size="2048"/>
  </machine>
</mame>
"#,
    );

    let reader = DatasheetReader::open(&path, EntryTag::Machine).unwrap();
    assert_eq!(reader.header().group, "MAME");
    assert_eq!(reader.header().category, "mamedev");

    let entries = reader.collect_entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].crc32, "f36e88ab");
    assert_eq!(entries[0].game_name, "PuckMan (Japan set 1)");
    assert_eq!(entries[0].group, "MAME");
    assert_eq!(entries[0].category, "mamedev");
}

#[test]
fn test_game_elements_ignored_when_streaming_machines() {
    let (_dir, path) = write_sheet(
        r#"<?xml version="1.0"?>
<mame build="0.250">
  <game name="not-a-machine">
    <description>Should Not Appear</description>
    <rom name="x.bin" crc="deadbeef"/>
  </game>
  <machine name="real">
    <description>Real Machine</description>
    <rom name="r.bin" crc="00112233"/>
  </machine>
</mame>
"#,
    );

    let entries = DatasheetReader::open(&path, EntryTag::Machine)
        .unwrap()
        .collect_entries()
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].game_name, "Real Machine");
}

#[test]
fn test_missing_file_reports_io_error() {
    let dir = tempdir().unwrap();
    let result = DatasheetReader::open(dir.path().join("absent.dat"), EntryTag::Game);
    assert!(matches!(result, Err(RomCheckError::Io { .. })));
}
