// Datasheet parsing module
// Streams catalog documents into digest-bearing entries without building a DOM

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::RomCheckError;

/// One reference file record from a catalog document.
/// Immutable once produced; `crc32` is lower-cased on ingestion and
/// normalized to the fixed 8-character key when accepted into an index.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CatalogEntry {
    pub file_name: String,
    pub crc32: String,
    pub game_name: String,
    pub group: String,
    pub category: String,
}

/// Document-level metadata captured once per datasheet and applied
/// uniformly to every entry it yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasheetHeader {
    /// Provenance label, usually the console or system name
    pub group: String,
    /// Catalog family label, e.g. "redump.org" or "TOSEC"
    pub category: String,
}

/// Element tag a datasheet streams its entries on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTag {
    /// Generic "game" elements, used by disk and cartridge catalogs
    Game,
    /// "machine" elements, used by the arcade catalog family
    Machine,
}

impl EntryTag {
    fn element(self) -> &'static [u8] {
        match self {
            EntryTag::Game => b"game",
            EntryTag::Machine => b"machine",
        }
    }
}

/// Streaming reader over one datasheet document.
///
/// Works as a single forward pass: the header is captured on open, then
/// entries are yielded one at a time while the event buffer is cleared
/// between events. The largest catalogs run to hundreds of thousands of
/// entries, so the document is never held in memory as a whole.
pub struct DatasheetReader {
    reader: Reader<BufReader<File>>,
    path: PathBuf,
    tag: EntryTag,
    header: DatasheetHeader,
    buf: Vec<u8>,
    in_entry: bool,
    in_description: bool,
    game_name: Option<String>,
    entry_name: Option<String>,
    done: bool,
}

impl DatasheetReader {
    /// Open a datasheet and capture its header.
    ///
    /// The arcade family carries fixed `MAME`/`mamedev` provenance and its
    /// documents have no header element, so none is required for
    /// [`EntryTag::Machine`]. A `Game` document with no parseable header is
    /// a failure for that document only.
    pub fn open(path: impl AsRef<Path>, tag: EntryTag) -> Result<Self, RomCheckError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .map_err(|e| RomCheckError::from_io_error(e, "opening datasheet", Some(path.clone())))?;
        let mut reader = Reader::from_reader(BufReader::new(file));

        let header = match tag {
            EntryTag::Machine => DatasheetHeader {
                group: "MAME".to_string(),
                category: "mamedev".to_string(),
            },
            EntryTag::Game => read_header(&mut reader, &path)?,
        };

        tracing::debug!(
            "opened datasheet {} (group {:?}, category {:?})",
            path.display(),
            header.group,
            header.category
        );

        Ok(Self {
            reader,
            path,
            tag,
            header,
            buf: Vec::new(),
            in_entry: false,
            in_description: false,
            game_name: None,
            entry_name: None,
            done: false,
        })
    }

    pub fn header(&self) -> &DatasheetHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain the reader into a vector, stopping at the first structural error
    pub fn collect_entries(self) -> Result<Vec<CatalogEntry>, RomCheckError> {
        self.collect()
    }
}

impl Iterator for DatasheetReader {
    type Item = Result<CatalogEntry, RomCheckError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(err) => {
                    self.done = true;
                    return Some(Err(RomCheckError::DatasheetStructure {
                        path: self.path.clone(),
                        reason: format!("malformed document: {}", err),
                    }));
                }
            };

            match event {
                // Rom children carry the digest; everything else about the
                // element (size, md5, sha1, status) is discarded
                Event::Start(ref e) | Event::Empty(ref e)
                    if self.in_entry && e.name().as_ref() == b"rom" =>
                {
                    let (file_name, crc32) = rom_attributes(e);
                    match (file_name, crc32) {
                        (Some(file_name), Some(crc32)) => {
                            let game_name = self
                                .game_name
                                .clone()
                                .or_else(|| self.entry_name.clone())
                                .unwrap_or_default();
                            return Some(Ok(CatalogEntry {
                                file_name,
                                crc32,
                                game_name,
                                group: self.header.group.clone(),
                                category: self.header.category.clone(),
                            }));
                        }
                        (file_name, _) => {
                            // Not an error for the document, the entry just
                            // cannot take part in digest matching
                            tracing::debug!(
                                "rom entry {:?} in {} has no usable digest, skipping",
                                file_name.as_deref().unwrap_or("<unnamed>"),
                                self.path.display()
                            );
                        }
                    }
                }
                Event::Start(ref e) if e.name().as_ref() == self.tag.element() => {
                    self.in_entry = true;
                    self.in_description = false;
                    self.game_name = None;
                    // Fallback title in case a rom precedes the description
                    self.entry_name = attribute_value(e, b"name");
                }
                Event::Start(ref e) if self.in_entry && e.name().as_ref() == b"description" => {
                    self.in_description = true;
                }
                Event::Text(ref e) if self.in_description => {
                    if let Ok(text) = e.unescape() {
                        let text = text.trim();
                        if !text.is_empty() {
                            match &mut self.game_name {
                                Some(existing) => existing.push_str(text),
                                None => self.game_name = Some(text.to_string()),
                            }
                        }
                    }
                }
                Event::End(ref e) => {
                    if e.name().as_ref() == self.tag.element() {
                        // Entry fully read; its state is released before the
                        // next sibling is touched
                        self.in_entry = false;
                        self.in_description = false;
                        self.game_name = None;
                        self.entry_name = None;
                    } else if e.name().as_ref() == b"description" {
                        self.in_description = false;
                    }
                }
                Event::Eof => {
                    self.done = true;
                    return None;
                }
                _ => {}
            }
        }
    }
}

/// Scan forward to the end of the header element and capture its fields.
/// Catalogs are inconsistent about which field carries the family label:
/// `homepage` is preferred when present, `category` is the fallback.
fn read_header(
    reader: &mut Reader<BufReader<File>>,
    path: &Path,
) -> Result<DatasheetHeader, RomCheckError> {
    #[derive(Clone, Copy)]
    enum HeaderField {
        Name,
        Homepage,
        Category,
    }

    let mut buf = Vec::new();
    let mut in_header = false;
    let mut field: Option<HeaderField> = None;
    let mut name: Option<String> = None;
    let mut homepage: Option<String> = None;
    let mut category: Option<String> = None;

    loop {
        buf.clear();
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(err) => {
                return Err(structure_error(path, format!("malformed document: {}", err)))
            }
        };

        match event {
            Event::Start(ref e) => {
                if e.name().as_ref() == b"header" {
                    in_header = true;
                } else if in_header {
                    field = match e.name().as_ref() {
                        b"name" => Some(HeaderField::Name),
                        b"homepage" => Some(HeaderField::Homepage),
                        b"category" => Some(HeaderField::Category),
                        _ => None,
                    };
                }
            }
            Event::Text(ref e) if in_header => {
                if let (Some(field), Ok(text)) = (field, e.unescape()) {
                    let text = text.trim();
                    if !text.is_empty() {
                        match field {
                            HeaderField::Name => name = Some(text.to_string()),
                            HeaderField::Homepage => homepage = Some(text.to_string()),
                            HeaderField::Category => category = Some(text.to_string()),
                        }
                    }
                }
            }
            Event::End(ref e) => {
                if e.name().as_ref() == b"header" {
                    break;
                }
                if in_header {
                    field = None;
                }
            }
            Event::Eof => return Err(structure_error(path, "no header element found".to_string())),
            _ => {}
        }
    }

    let group = name.ok_or_else(|| structure_error(path, "header has no name".to_string()))?;
    let category = homepage.or(category).ok_or_else(|| {
        structure_error(path, "header has neither homepage nor category".to_string())
    })?;

    Ok(DatasheetHeader { group, category })
}

fn structure_error(path: &Path, reason: String) -> RomCheckError {
    RomCheckError::DatasheetStructure {
        path: path.to_path_buf(),
        reason,
    }
}

/// Pull the `name` and `crc` attributes out of a rom element.
/// `crc` is lower-cased here, catalogs disagree about hex case.
fn rom_attributes(e: &BytesStart) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut crc = None;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"name" => name = attr.unescape_value().ok().map(|v| v.into_owned()),
            b"crc" => crc = attr.unescape_value().ok().map(|v| v.to_ascii_lowercase()),
            _ => {}
        }
    }

    (name, crc)
}

fn attribute_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|v| v.into_owned())
}
