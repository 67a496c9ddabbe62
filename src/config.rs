// Default configuration values, to refer to from other modules

use std::path::{Path, PathBuf};

pub const TOOL_NAME: &str = "romcheck";

// Catalog family prefixes; datasheet subdirectories are named after these
pub const NOINTRO_PREFIX: &str = "nointro";
pub const REDUMP_PREFIX: &str = "redump";
pub const TOSEC_PREFIX: &str = "tosec";
pub const MAME_PREFIX: &str = "mame";

pub const CATALOG_PREFIXES: [&str; 4] =
    [NOINTRO_PREFIX, REDUMP_PREFIX, TOSEC_PREFIX, MAME_PREFIX];

/// Directory the retrieval subsystem extracts datasheets into, one
/// subdirectory per catalog family
pub fn default_datasheets_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(data) => data.join(TOOL_NAME).join("datasheets"),
        None => PathBuf::from("Datasheets"),
    }
}

/// Whether a datasheet path belongs to the arcade-machine catalog family.
/// Those documents stream on the "machine" tag instead of "game".
pub fn is_mame_path(path: &Path) -> bool {
    path.components()
        .any(|component| component.as_os_str().eq_ignore_ascii_case(MAME_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mame_path_detection() {
        assert!(is_mame_path(Path::new("Datasheets/mame/mame0250.xml")));
        assert!(is_mame_path(Path::new("Datasheets/MAME/listing.xml")));
        assert!(!is_mame_path(Path::new("Datasheets/redump/psx.dat")));
        assert!(!is_mame_path(Path::new("mamestuff/listing.xml")));
    }
}
