//! Candidate file enumeration per root.
//!
//! Stub discovery unions the project root, every top-level subdirectory of
//! the typeshed root (one logical stub package per subdirectory), and every
//! search-path root; search-path roots additionally contribute plain `.py`
//! modules to the same pass. Source discovery covers the project root only,
//! excluding qualifiers already claimed by a stub.
//!
//! Non-fatal conditions (unreadable directory, missing typeshed) degrade to
//! a warning and an empty result for that root. Symlinked files keep their
//! link location; nothing here canonicalizes paths.

use crate::config::ModmapConfig;
use crate::core::Qualifier;
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// One root's worth of candidate files, in sorted order.
#[derive(Clone, Debug)]
pub struct RootBatch {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    pub is_stub: bool,
}

pub struct PathCatalog {
    ignore_patterns: Vec<glob::Pattern>,
}

impl PathCatalog {
    pub fn new(config: &ModmapConfig) -> Self {
        let ignore_patterns = config
            .ignore_patterns
            .iter()
            .filter_map(|pattern| match glob::Pattern::new(pattern) {
                Ok(compiled) => Some(compiled),
                Err(err) => {
                    log::warn!("Ignoring invalid exclude pattern {pattern:?}: {err}");
                    None
                }
            })
            .collect();
        Self { ignore_patterns }
    }

    /// The top-level subdirectories of a typeshed root, sorted. Each one is
    /// treated as an independent stub package root.
    pub fn typeshed_package_roots(typeshed: &Path) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(typeshed) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("Could not list typeshed root {}: {err}", typeshed.display());
                return Vec::new();
            }
        };
        let mut roots: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    let path = entry.path();
                    path.is_dir().then_some(path)
                }
                Err(err) => {
                    log::warn!(
                        "Skipping unreadable typeshed entry under {}: {err}",
                        typeshed.display()
                    );
                    None
                }
            })
            .collect();
        roots.sort();
        roots
    }

    /// All stub-pass batches, in deterministic root order: project stubs,
    /// typeshed packages, search-path stubs, then search-path modules.
    pub fn stub_batches(&self, config: &ModmapConfig) -> Vec<RootBatch> {
        let mut batches = vec![RootBatch {
            root: config.source_root.clone(),
            files: self.stub_files(&config.source_root),
            is_stub: true,
        }];
        if let Some(typeshed) = &config.typeshed {
            for package_root in Self::typeshed_package_roots(typeshed) {
                let files = self.stub_files(&package_root);
                batches.push(RootBatch {
                    root: package_root,
                    files,
                    is_stub: true,
                });
            }
        }
        for root in &config.search_paths {
            batches.push(RootBatch {
                root: root.clone(),
                files: self.stub_files(root),
                is_stub: true,
            });
        }
        for root in &config.search_paths {
            batches.push(RootBatch {
                root: root.clone(),
                files: self.module_files(root),
                is_stub: false,
            });
        }
        batches
    }

    /// The source-pass batch: project `.py` files whose qualifier is not
    /// already claimed by a stub. Qualifiers are derived from the path as
    /// discovered, so a symlink is attributed to its link location.
    pub fn source_batch(
        &self,
        config: &ModmapConfig,
        known_stubs: &HashSet<Qualifier>,
    ) -> RootBatch {
        let root = config.source_root.clone();
        let files = self.walk(&root, |path| {
            if !has_extension(path, "py") {
                return false;
            }
            match path.strip_prefix(&root) {
                Ok(relative) => !known_stubs.contains(&Qualifier::from_relative(relative)),
                Err(_) => true,
            }
        });
        RootBatch {
            root,
            files,
            is_stub: false,
        }
    }

    fn stub_files(&self, root: &Path) -> Vec<PathBuf> {
        self.walk(root, |path| {
            has_extension(path, "pyi") && !in_legacy_version_tree(path, root)
        })
    }

    fn module_files(&self, root: &Path) -> Vec<PathBuf> {
        self.walk(root, |path| has_extension(path, "py"))
    }

    fn walk<F>(&self, root: &Path, predicate: F) -> Vec<PathBuf>
    where
        F: Fn(&Path) -> bool,
    {
        log::info!("Scanning {}", root.display());
        let mut files = Vec::new();
        let walker = WalkBuilder::new(root).hidden(false).git_ignore(true).build();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Error listing under {}: {err}", root.display());
                    continue;
                }
            };
            let path = entry.path();
            if path.is_file() && predicate(path) && !self.is_ignored(path) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        files
    }

    fn is_ignored(&self, path: &Path) -> bool {
        if self.ignore_patterns.is_empty() {
            return false;
        }
        let path_str = path.to_string_lossy();
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches(&path_str))
    }
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension().map(|ext| ext == wanted).unwrap_or(false)
}

/// Whether any directory between `root` and the file names a legacy Python 2
/// version (`2`, `2.7`, ...). Such subtrees carry stubs for interpreters the
/// analysis does not target.
fn in_legacy_version_tree(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|component| {
        matches!(component, Component::Normal(name) if is_legacy_version_dir(&name.to_string_lossy()))
    })
}

fn is_legacy_version_dir(name: &str) -> bool {
    let mut parts = name.split('.');
    if parts.next() != Some("2") {
        return false;
    }
    parts.all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}
