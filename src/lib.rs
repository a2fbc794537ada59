// Export modules for library usage
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod observability;
pub mod parser;
pub mod pipeline;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use crate::config::{ModmapConfig, ParallelConfig};
pub use crate::core::{
    AnalysisMode, BatchStats, FileCandidate, Handle, Metadata, ModuleRecord, ParseOutcome,
    ParsedSource, Qualifier, ResultSet,
};
pub use crate::io::catalog::{PathCatalog, RootBatch};
pub use crate::observability::{LogSink, MetricsSink, NullSink};
pub use crate::parser::frontend::ParseFrontend;
pub use crate::parser::{Extension, Grammar, ParseFailure, Preprocessor, RustPythonGrammar};
pub use crate::pipeline::Ingestor;
pub use crate::scheduler::Scheduler;
pub use crate::store::{AstStore, Registration};
