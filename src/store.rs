//! Shared AST store.
//!
//! The store is the only resource mutated by multiple workers concurrently.
//! Every operation is atomic per key; callers must not rely on any cross-key
//! atomicity. Bulk iteration (`module_qualifiers`) is only valid between
//! batches, when no workers are writing.

use crate::core::{Handle, ModuleRecord, ParsedSource, Qualifier};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Outcome of a module registration attempt.
#[derive(Clone, Debug)]
pub enum Registration {
    /// The qualifier was free (or re-registered by the same file).
    Registered,
    /// Another file already claims the qualifier. The record with the
    /// smaller discovery index is kept regardless of arrival order, so the
    /// winner is stable under any worker interleaving.
    Conflict {
        winner: ModuleRecord,
        loser: ModuleRecord,
    },
}

/// Handle-addressed store of parse results, plus the qualifier-keyed module
/// registrations from the first pass and a content fingerprint per path.
#[derive(Debug, Default)]
pub struct AstStore {
    sources: DashMap<Handle, ParsedSource>,
    modules: DashMap<Qualifier, ModuleRecord>,
    path_hashes: DashMap<PathBuf, String>,
}

impl AstStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parse result. Overwrite semantics: the last write for a
    /// given handle wins.
    pub fn add(&self, handle: Handle, source: ParsedSource) {
        self.sources.insert(handle, source);
    }

    pub fn get(&self, handle: &Handle) -> Option<ParsedSource> {
        self.sources.get(handle).map(|entry| entry.clone())
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Register a first-pass module record. On a qualifier collision the
    /// record with the smaller discovery index wins; a re-registration by
    /// the same file simply refreshes the record.
    pub fn register_module(&self, record: ModuleRecord) -> Registration {
        match self.modules.entry(record.qualifier.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(record);
                Registration::Registered
            }
            Entry::Occupied(mut occupied) => {
                if occupied.get().path == record.path {
                    occupied.insert(record);
                    return Registration::Registered;
                }
                if record.discovery_index < occupied.get().discovery_index {
                    let loser = occupied.insert(record);
                    Registration::Conflict {
                        winner: occupied.get().clone(),
                        loser,
                    }
                } else {
                    Registration::Conflict {
                        winner: occupied.get().clone(),
                        loser: record,
                    }
                }
            }
        }
    }

    pub fn module(&self, qualifier: &Qualifier) -> Option<ModuleRecord> {
        self.modules.get(qualifier).map(|entry| entry.clone())
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// All registered qualifiers, sorted. Only call between batches.
    pub fn module_qualifiers(&self) -> Vec<Qualifier> {
        let mut qualifiers: Vec<Qualifier> =
            self.modules.iter().map(|entry| entry.key().clone()).collect();
        qualifiers.sort();
        qualifiers
    }

    /// Bulk-evict module registrations, used to clear entries for files no
    /// longer discovered by the current catalog scan.
    pub fn remove_modules(&self, qualifiers: &[Qualifier]) {
        for qualifier in qualifiers {
            self.modules.remove(qualifier);
        }
    }

    /// Record a content fingerprint for later change detection.
    pub fn add_path_hash(&self, path: &Path, content: &str) {
        self.path_hashes
            .insert(path.to_path_buf(), calculate_hash(content));
    }

    pub fn path_hash(&self, path: &Path) -> Option<String> {
        self.path_hashes.get(path).map(|entry| entry.clone())
    }
}

fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
