//! Per-file parse frontend.
//!
//! Turns one candidate file into either a lightweight module record (first
//! pass) or a finished, preprocessed source published to the store (second
//! pass). Every failure is isolated to the file that caused it: the first
//! pass stays silent, the second reports through the outcome value and the
//! log, and neither ever aborts the surrounding batch.

use crate::core::{
    FileCandidate, Handle, Metadata, ModuleRecord, ParseOutcome, ParsedSource, Qualifier,
};
use crate::parser::{Extension, Grammar, ParseFailure, Preprocessor, RustPythonGrammar};
use crate::store::AstStore;
use rustpython_parser::ast::{self, Stmt};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct ParseFrontend {
    roots: Vec<PathBuf>,
    grammar: Arc<dyn Grammar>,
    preprocessors: Vec<Arc<dyn Preprocessor>>,
    extensions: Vec<Arc<dyn Extension>>,
}

impl ParseFrontend {
    /// `roots` is the ordered list used for relative-path resolution; more
    /// specific roots (typeshed packages, search paths) must come before the
    /// project root so nested roots resolve against their own tree.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            grammar: Arc::new(RustPythonGrammar),
            preprocessors: Vec::new(),
            extensions: Vec::new(),
        }
    }

    pub fn with_grammar(mut self, grammar: Arc<dyn Grammar>) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn add_preprocessor(&mut self, preprocessor: Arc<dyn Preprocessor>) {
        self.preprocessors.push(preprocessor);
    }

    pub fn add_extension(&mut self, extension: Arc<dyn Extension>) {
        self.extensions.push(extension);
    }

    /// Express `path` relative to the first configured root containing it.
    /// Paths are compared as given; symlinks are not followed, so a linked
    /// file resolves against its link location.
    pub fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        self.roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok().map(Path::to_path_buf))
    }

    /// First pass: parse with error reporting suppressed and produce only
    /// the lightweight module record. Returns `None` on any failure.
    pub fn parse_module(&self, candidate: &FileCandidate) -> Option<ModuleRecord> {
        let relative = self.relative_path(&candidate.path)?;
        let content = fs::read_to_string(&candidate.path).ok()?;
        let statements = self.grammar.parse(&candidate.path, &content).ok()?;
        let metadata = Metadata::from_source(&content);
        Some(ModuleRecord {
            qualifier: Qualifier::from_relative(&relative),
            handle: Handle::from_relative(&relative),
            path: candidate.path.clone(),
            mode: metadata.mode,
            is_stub: candidate.is_stub,
            discovery_index: candidate.discovery_index,
            statement_count: statements.len(),
        })
    }

    /// Second pass: full parse with error visibility, extension and
    /// preprocessing transforms, content fingerprint, and store publication.
    pub fn parse_source(&self, candidate: &FileCandidate, store: &AstStore) -> ParseOutcome {
        let path = &candidate.path;
        let Some(relative) = self.relative_path(path) else {
            return ParseOutcome::PathNotResolved { path: path.clone() };
        };

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                log::warn!("Failed to read {}: {err}", path.display());
                return ParseOutcome::PathNotResolved { path: path.clone() };
            }
        };

        let qualifier = Qualifier::from_relative(&relative);
        if let Some(registered) = store.module(&qualifier) {
            if registered.path != *path {
                return ParseOutcome::Preempted {
                    path: path.clone(),
                    qualifier,
                };
            }
        }

        let statements = match self.grammar.parse(path, &content) {
            Ok(statements) => statements,
            Err(ParseFailure::Syntax { message }) => {
                log::debug!("Syntax error in {}: {message}", path.display());
                return ParseOutcome::SyntaxError {
                    path: path.clone(),
                    message,
                };
            }
            Err(ParseFailure::Unexpected(message)) => {
                log::error!("Unexpected failure parsing {}: {message}", path.display());
                return ParseOutcome::SyntaxError {
                    path: path.clone(),
                    message,
                };
            }
        };

        let docstring = leading_docstring(&statements);
        let statements = self
            .extensions
            .iter()
            .fold(statements, |statements, extension| {
                extension.apply(statements)
            });

        let handle = Handle::from_relative(&relative);
        let source = ParsedSource {
            handle: handle.clone(),
            qualifier,
            path: path.clone(),
            docstring,
            metadata: Metadata::from_source(&content),
            statements,
        };
        let source = self
            .preprocessors
            .iter()
            .fold(source, |source, preprocessor| {
                preprocessor.preprocess(source)
            });

        store.add_path_hash(path, &content);
        store.add(handle.clone(), source);
        ParseOutcome::Parsed(handle)
    }
}

/// Extract the module docstring: a leading expression statement holding a
/// string constant.
fn leading_docstring(statements: &[Stmt]) -> Option<String> {
    match statements.first()? {
        Stmt::Expr(expr) => match expr.value.as_ref() {
            ast::Expr::Constant(constant) => match &constant.value {
                ast::Constant::Str(docstring) => Some(docstring.clone()),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}
