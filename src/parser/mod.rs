//! Grammar and transform collaborators.
//!
//! The token-level grammar is an external collaborator with a narrow
//! contract: text in, top-level statements or a structured failure out. The
//! default implementation is backed by `rustpython-parser`.

pub mod frontend;

use crate::core::ParsedSource;
use rustpython_parser::ast::{self, Stmt};
use rustpython_parser::Mode;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ParseFailure {
    /// The grammar rejected the file with a human-readable message.
    #[error("{message}")]
    Syntax { message: String },

    /// Any other fault inside the grammar.
    #[error("unexpected parser fault: {0}")]
    Unexpected(String),
}

pub trait Grammar: Send + Sync {
    fn parse(&self, path: &Path, content: &str) -> Result<Vec<Stmt>, ParseFailure>;
}

/// Pure transform applied to a finished source before store insertion.
pub trait Preprocessor: Send + Sync {
    fn preprocess(&self, source: ParsedSource) -> ParsedSource;
}

/// Pure transform applied to the statement list right after a successful
/// parse, before the source is assembled.
pub trait Extension: Send + Sync {
    fn apply(&self, statements: Vec<Stmt>) -> Vec<Stmt>;
}

/// Default grammar backed by rustpython-parser.
#[derive(Debug, Default)]
pub struct RustPythonGrammar;

impl Grammar for RustPythonGrammar {
    fn parse(&self, path: &Path, content: &str) -> Result<Vec<Stmt>, ParseFailure> {
        let source_path = path.to_string_lossy();
        let parsed = rustpython_parser::parse(content, Mode::Module, &source_path)
            .map_err(|err| ParseFailure::Syntax {
                message: err.to_string(),
            })?;
        match parsed {
            ast::Mod::Module(module) => Ok(module.body),
            other => Err(ParseFailure::Unexpected(format!(
                "module-mode parse produced a non-module AST: {other:?}"
            ))),
        }
    }
}
