// Matching engine module
// Indexes catalog entries by digest and reconciles scanned items against them

use std::collections::{HashMap, HashSet};

use crate::catalog::CatalogEntry;
use crate::scanner::ScannedItem;

/// Normalize a digest string to the index's fixed key form: lowercase,
/// left-padded with zeros to 8 hex characters. The digest provider renders
/// CRC32 at natural hex width, catalogs pad to 8; padding here makes both
/// sides join. Returns None when the input cannot be a CRC32 digest.
pub fn normalize_digest(digest: &str) -> Option<String> {
    let digest = digest.trim();
    if digest.is_empty() || digest.len() > 8 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("{:0>8}", digest.to_ascii_lowercase()))
}

/// Digest-keyed lookup table over catalog entries.
///
/// Built once, then read-only. A digest shared by several entries keeps the
/// full set; ambiguity is surfaced to the caller, never resolved by picking
/// one.
#[derive(Debug, Default)]
pub struct DigestIndex {
    map: HashMap<String, Vec<CatalogEntry>>,
}

impl DigestIndex {
    /// Build an index from a stream of catalog entries.
    /// Entries whose digest cannot be normalized are dropped with a log
    /// line; a bad entry is never fatal to the batch.
    pub fn build(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut map: HashMap<String, Vec<CatalogEntry>> = HashMap::new();
        let mut dropped = 0usize;

        for mut entry in entries {
            let Some(key) = normalize_digest(&entry.crc32) else {
                tracing::debug!(
                    "dropping entry {:?} from {}: unusable digest {:?}",
                    entry.file_name,
                    entry.group,
                    entry.crc32
                );
                dropped += 1;
                continue;
            };
            entry.crc32 = key.clone();
            map.entry(key).or_default().push(entry);
        }

        if dropped > 0 {
            tracing::debug!("dropped {} catalog entries without usable digests", dropped);
        }

        Self { map }
    }

    /// Number of distinct digests in the index
    pub fn digest_count(&self) -> usize {
        self.map.len()
    }

    /// Total number of entries held by the index
    pub fn entry_count(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Look up the candidate set for a digest, in any accepted width
    pub fn lookup(&self, digest: &str) -> Option<&[CatalogEntry]> {
        let key = normalize_digest(digest)?;
        self.map.get(&key).map(Vec::as_slice)
    }

    /// Reconcile scanned items against the index in one pass.
    ///
    /// Every item classifies as `Known` (with the full candidate set
    /// attached) or `Unknown`. With `full` set, a second walk over the index
    /// reports every entry whose digest was never seen as `Missing`.
    pub fn reconcile(&self, items: Vec<ScannedItem>, full: bool) -> MatchReport {
        let mut known = Vec::new();
        let mut unknown = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for item in items {
            let hit = normalize_digest(&item.crc32)
                .and_then(|key| self.map.get(&key).map(|entries| (key, entries)));
            match hit {
                Some((key, entries)) => {
                    seen.insert(key);
                    known.push(KnownMatch {
                        item,
                        entries: entries.clone(),
                    });
                }
                None => unknown.push(item),
            }
        }

        let mut missing = Vec::new();
        if full {
            for (key, entries) in &self.map {
                if !seen.contains(key) {
                    missing.extend(entries.iter().cloned());
                }
            }
        }

        MatchReport {
            known,
            unknown,
            missing,
        }
    }
}

/// A scanned item whose digest is present in the index, together with
/// every catalog entry sharing that digest
#[derive(Debug, Clone, serde::Serialize)]
pub struct KnownMatch {
    pub item: ScannedItem,
    pub entries: Vec<CatalogEntry>,
}

impl KnownMatch {
    /// Pick the candidate whose declared file name matches the scanned
    /// name, falling back to the first candidate
    pub fn best_entry(&self) -> &CatalogEntry {
        self.entries
            .iter()
            .find(|entry| entry.file_name == self.item.name)
            .unwrap_or(&self.entries[0])
    }
}

/// Outcome of reconciling one digest index against one scan
#[derive(Debug, Clone, serde::Serialize)]
pub struct MatchReport {
    pub known: Vec<KnownMatch>,
    pub unknown: Vec<ScannedItem>,
    pub missing: Vec<CatalogEntry>,
}

impl MatchReport {
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty() && self.missing.is_empty()
    }

    /// Display a detailed report of reconciliation results
    pub fn display(&self) {
        println!("\n================================================================");
        if self.is_clean() {
            println!("                      COLLECTION VERIFIED                       ");
        } else {
            println!("                   UNMATCHED CONTENT DETECTED                   ");
        }
        println!("================================================================\n");

        println!("Match Summary:");
        println!("  Known:    {}", self.known.len());
        println!("  Unknown:  {}", self.unknown.len());
        println!("  Missing:  {}", self.missing.len());

        if !self.known.is_empty() {
            println!("\n--- Known Files ({}) ---", self.known.len());
            for matched in &self.known {
                let entry = matched.best_entry();
                println!(
                    "  {}  =>  {} [{} / {}]",
                    matched.item.name, entry.game_name, entry.group, entry.category
                );
                if matched.entries.len() > 1 {
                    println!(
                        "      ({} catalog entries share this digest)",
                        matched.entries.len()
                    );
                }
            }
        }

        if !self.unknown.is_empty() {
            println!("\n--- Unknown Files ({}) ---", self.unknown.len());
            println!("(found on disk but absent from every catalog)");
            for item in &self.unknown {
                if item.member_path.is_empty() {
                    println!("  + {}", item.source_path.display());
                } else {
                    println!(
                        "  + {} ({})",
                        item.source_path.display(),
                        item.member_path
                    );
                }
            }
        }

        if !self.missing.is_empty() {
            println!("\n--- Missing Entries ({}) ---", self.missing.len());
            println!("(in the catalogs but never seen during the scan)");
            for entry in &self.missing {
                println!(
                    "  - {} ({}, {})",
                    entry.file_name, entry.game_name, entry.group
                );
            }
        }

        println!("\n================================================================");
        println!("Total files scanned:       {}", self.known.len() + self.unknown.len());
        println!(
            "Total catalog entries hit: {}",
            self.known.len()
        );
        println!("================================================================");
    }
}
