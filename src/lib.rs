// romcheck library
// Reference integrity matching engine for console ROM collections

pub mod catalog;
pub mod config;
pub mod digest;
pub mod error;
pub mod matcher;
pub mod scanner;

// Re-export commonly used types for convenience
pub use catalog::{CatalogEntry, DatasheetHeader, DatasheetReader, EntryTag};
pub use digest::{Algorithm, DigestComputer, DEFAULT_CHUNK_SIZE};
pub use error::RomCheckError;
pub use matcher::{DigestIndex, KnownMatch, MatchReport};
pub use scanner::{ContainerKind, ScanEngine, ScanFailure, ScanReport, ScannedItem};
