pub mod errors;

use rustpython_parser::ast::Stmt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Stable per-file key into the AST store, derived from the root-relative
/// path. Two files with the same relative path produce the same handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    pub fn from_relative(relative: &Path) -> Self {
        let parts: Vec<String> = normal_components(relative);
        Handle(parts.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical module name derived from a root-relative path: separators become
/// dots, the extension is stripped, and a trailing `__init__` segment is
/// dropped so a package resolves to its directory qualifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qualifier(String);

impl Qualifier {
    pub fn from_relative(relative: &Path) -> Self {
        let mut parts = normal_components(relative);
        if let Some(last) = parts.last_mut() {
            let stem = Path::new(last.as_str())
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned());
            if let Some(stem) = stem {
                *last = stem;
            }
        }
        if parts.last().map(|part| part == "__init__").unwrap_or(false) {
            parts.pop();
        }
        Qualifier(parts.join("."))
    }

    pub fn from_name(name: impl Into<String>) -> Self {
        Qualifier(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normal_components(relative: &Path) -> Vec<String> {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Declared analysis mode for a file, independent of its AST.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMode {
    #[default]
    Default,
    Strict,
    Unchecked,
}

/// Per-file facts extracted by a line-level scan before full parsing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub mode: AnalysisMode,
}

impl Metadata {
    /// Scan the leading comment block for mode directives. The scan stops at
    /// the first non-comment, non-blank line; no parse is required.
    pub fn from_source(content: &str) -> Self {
        let mut mode = AnalysisMode::Default;
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some(comment) = trimmed.strip_prefix('#') else {
                break;
            };
            match comment.trim() {
                "modmap: strict" => mode = AnalysisMode::Strict,
                "modmap: unchecked" => mode = AnalysisMode::Unchecked,
                _ => {}
            }
        }
        Metadata { mode }
    }
}

/// A file discovered by the catalog, tagged with the root it was found under
/// and its position in the deterministic discovery order.
#[derive(Clone, Debug)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub root: PathBuf,
    pub is_stub: bool,
    pub discovery_index: usize,
}

/// Lightweight first-pass registration: enough to answer "does qualifier X
/// exist" without holding a full parse.
#[derive(Clone, Debug)]
pub struct ModuleRecord {
    pub qualifier: Qualifier,
    pub handle: Handle,
    pub path: PathBuf,
    pub mode: AnalysisMode,
    pub is_stub: bool,
    pub discovery_index: usize,
    pub statement_count: usize,
}

/// Full parse result for one file. Immutable once constructed; stored by
/// handle in the AST store.
#[derive(Clone, Debug)]
pub struct ParsedSource {
    pub handle: Handle,
    pub qualifier: Qualifier,
    pub path: PathBuf,
    pub docstring: Option<String>,
    pub metadata: Metadata,
    pub statements: Vec<Stmt>,
}

/// Per-file result of the full parse pass. Threaded through the reduction as
/// a value; never crosses the batch boundary as a control-flow error.
#[derive(Clone, Debug)]
pub enum ParseOutcome {
    Parsed(Handle),
    SyntaxError { path: PathBuf, message: String },
    PathNotResolved { path: PathBuf },
    Preempted { path: PathBuf, qualifier: Qualifier },
}

/// Counters for one parse batch. `discovered` must always reconcile exactly
/// against the outcome buckets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub discovered: usize,
    pub parsed: usize,
    pub syntax_errors: usize,
    pub path_failures: usize,
    pub preempted: usize,
}

impl BatchStats {
    pub fn record(&mut self, outcome: &ParseOutcome) {
        self.discovered += 1;
        match outcome {
            ParseOutcome::Parsed(_) => self.parsed += 1,
            ParseOutcome::SyntaxError { .. } => self.syntax_errors += 1,
            ParseOutcome::PathNotResolved { .. } => self.path_failures += 1,
            ParseOutcome::Preempted { .. } => self.preempted += 1,
        }
    }

    pub fn merge(&mut self, other: BatchStats) {
        self.discovered += other.discovered;
        self.parsed += other.parsed;
        self.syntax_errors += other.syntax_errors;
        self.path_failures += other.path_failures;
        self.preempted += other.preempted;
    }

    /// Files that genuinely failed, excluding duplicates pre-empted by an
    /// earlier registration.
    pub fn unparsed(&self) -> usize {
        self.syntax_errors + self.path_failures
    }

    pub fn reconciles(&self) -> bool {
        self.discovered == self.parsed + self.syntax_errors + self.path_failures + self.preempted
    }
}

/// Final output of a full ingestion run. Handle ordering is deterministic and
/// identical under sequential and parallel scheduling.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ResultSet {
    pub stubs: Vec<Handle>,
    pub sources: Vec<Handle>,
    pub stub_stats: BatchStats,
    pub source_stats: BatchStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn qualifier_from_nested_path() {
        let qualifier = Qualifier::from_relative(Path::new("pkg/sub/util.py"));
        assert_eq!(qualifier.as_str(), "pkg.sub.util");
    }

    #[test]
    fn qualifier_strips_stub_extension() {
        let qualifier = Qualifier::from_relative(Path::new("pkg/util.pyi"));
        assert_eq!(qualifier.as_str(), "pkg.util");
    }

    #[test]
    fn qualifier_drops_trailing_init() {
        let qualifier = Qualifier::from_relative(Path::new("pkg/__init__.py"));
        assert_eq!(qualifier.as_str(), "pkg");

        let root = Qualifier::from_relative(Path::new("__init__.py"));
        assert!(root.is_empty());
    }

    #[test]
    fn handle_keeps_extension_and_normalizes_separators() {
        let stub = Handle::from_relative(Path::new("pkg/util.pyi"));
        let source = Handle::from_relative(Path::new("pkg/util.py"));
        assert_eq!(stub.as_str(), "pkg/util.pyi");
        assert_ne!(stub, source);
    }

    #[test]
    fn same_relative_path_same_handle() {
        let first = Handle::from_relative(Path::new("a/b.py"));
        let second = Handle::from_relative(Path::new("a/b.py"));
        assert_eq!(first, second);
    }

    #[test]
    fn metadata_reads_strict_directive() {
        let content = "# modmap: strict\nimport os\n";
        assert_eq!(Metadata::from_source(content).mode, AnalysisMode::Strict);
    }

    #[test]
    fn metadata_reads_unchecked_directive_after_blank_comment_lines() {
        let content = "# copyright\n\n#   modmap: unchecked\ndef f():\n    pass\n";
        assert_eq!(Metadata::from_source(content).mode, AnalysisMode::Unchecked);
    }

    #[test]
    fn metadata_scan_stops_at_first_code_line() {
        let content = "import os\n# modmap: strict\n";
        assert_eq!(Metadata::from_source(content).mode, AnalysisMode::Default);
    }

    #[test]
    fn batch_stats_reconcile() {
        let mut stats = BatchStats::default();
        stats.record(&ParseOutcome::Parsed(Handle::from_relative(Path::new(
            "a.py",
        ))));
        stats.record(&ParseOutcome::SyntaxError {
            path: PathBuf::from("b.py"),
            message: "invalid syntax".to_string(),
        });
        stats.record(&ParseOutcome::PathNotResolved {
            path: PathBuf::from("/outside/c.py"),
        });
        stats.record(&ParseOutcome::Preempted {
            path: PathBuf::from("d.pyi"),
            qualifier: Qualifier::from_name("d"),
        });

        assert_eq!(stats.discovered, 4);
        assert!(stats.reconciles());
        assert_eq!(stats.unparsed(), 2);

        let mut combined = BatchStats::default();
        combined.merge(stats);
        combined.merge(stats);
        assert_eq!(combined.discovered, 8);
        assert!(combined.reconciles());
    }
}
