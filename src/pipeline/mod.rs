//! Ingestion orchestration.
//!
//! `Ingestor` sequences the catalog, the scheduler-backed two-pass parse,
//! the shared store, and stub precedence into the two top-level operations:
//! [`Ingestor::parse_stubs`] and [`Ingestor::parse_all`].
//!
//! Each batch runs pass 1 (module registration, side effects through
//! `Scheduler::iter`) to completion before pass 2 (full parse through
//! `Scheduler::map_reduce`) starts; pass 2's qualifier filtering depends on
//! pass 1's registrations. Batches themselves are folded in a fixed root
//! order, so the final handle lists are deterministic in both scheduling
//! modes.

use crate::config::ModmapConfig;
use crate::core::errors::Result;
use crate::core::{
    BatchStats, FileCandidate, Handle, ParseOutcome, Qualifier, ResultSet,
};
use crate::io::catalog::{PathCatalog, RootBatch};
use crate::observability::{LogSink, MetricsSink};
use crate::parser::frontend::ParseFrontend;
use crate::parser::{Extension, Grammar, Preprocessor};
use crate::scheduler::Scheduler;
use crate::store::{AstStore, Registration};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub struct Ingestor {
    config: ModmapConfig,
    scheduler: Scheduler,
    store: Arc<AstStore>,
    frontend: ParseFrontend,
    metrics: Arc<dyn MetricsSink>,
    discovery_counter: AtomicUsize,
}

impl Ingestor {
    pub fn new(config: ModmapConfig) -> Result<Self> {
        config.validate()?;
        let scheduler = Scheduler::new(&config.parallel)?;
        let frontend = ParseFrontend::new(resolution_roots(&config));
        Ok(Self {
            config,
            scheduler,
            store: Arc::new(AstStore::new()),
            frontend,
            metrics: Arc::new(LogSink),
            discovery_counter: AtomicUsize::new(0),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_grammar(mut self, grammar: Arc<dyn Grammar>) -> Self {
        self.frontend = self.frontend.with_grammar(grammar);
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn Preprocessor>) -> Self {
        self.frontend.add_preprocessor(preprocessor);
        self
    }

    pub fn with_extension(mut self, extension: Arc<dyn Extension>) -> Self {
        self.frontend.add_extension(extension);
        self
    }

    pub fn store(&self) -> Arc<AstStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &ModmapConfig {
        &self.config
    }

    /// Parse every stub candidate: project stubs, typeshed packages,
    /// search-path stubs, and search-path modules, folded in that order.
    pub fn parse_stubs(&self) -> (Vec<Handle>, BatchStats) {
        let started = Instant::now();
        let catalog = PathCatalog::new(&self.config);
        let mut handles = Vec::new();
        let mut stats = BatchStats::default();
        for batch in catalog.stub_batches(&self.config) {
            let candidates = self.candidates(batch);
            let (batch_handles, batch_stats) = self.parse_batch(&candidates);
            handles.extend(batch_handles);
            stats.merge(batch_stats);
        }
        self.warn_unparsed(&stats);
        log::info!(
            "Parsed {} of {} stub candidates",
            stats.parsed,
            stats.discovered
        );
        self.metrics.record_performance(
            "parse stubs",
            started.elapsed(),
            &[
                ("discovered", stats.discovered as i64),
                ("parsed", stats.parsed as i64),
            ],
            &[],
        );
        (handles, stats)
    }

    /// The full run: stubs first, then project sources filtered against the
    /// qualifiers the stub pass claimed.
    pub fn parse_all(&self) -> Result<ResultSet> {
        let started = Instant::now();
        let (stub_handles, stub_stats) = self.parse_stubs();

        let known_stubs: HashSet<Qualifier> = stub_handles
            .iter()
            .filter_map(|handle| self.store.get(handle))
            .map(|source| source.qualifier)
            .collect();

        let catalog = PathCatalog::new(&self.config);
        let batch = catalog.source_batch(&self.config, &known_stubs);
        let mut live: HashSet<Qualifier> = known_stubs;
        for path in &batch.files {
            if let Ok(relative) = path.strip_prefix(&batch.root) {
                live.insert(Qualifier::from_relative(relative));
            }
        }

        let candidates = self.candidates(batch);
        let (source_handles, source_stats) = self.parse_batch(&candidates);
        self.warn_unparsed(&source_stats);
        log::info!(
            "Parsed {} of {} source candidates",
            source_stats.parsed,
            source_stats.discovered
        );

        self.evict_stale_modules(&live);

        self.metrics.record_performance(
            "parse all",
            started.elapsed(),
            &[
                ("stubs", stub_stats.discovered as i64),
                ("sources", source_stats.discovered as i64),
            ],
            &[],
        );
        Ok(ResultSet {
            stubs: stub_handles,
            sources: source_handles,
            stub_stats,
            source_stats,
        })
    }

    /// Run one candidate batch through both passes. Pass 1 registers module
    /// records with errors suppressed; once every partition has finished,
    /// pass 2 re-parses with full visibility and publishes sources.
    pub fn parse_batch(&self, candidates: &[FileCandidate]) -> (Vec<Handle>, BatchStats) {
        self.scheduler.iter(candidates, |chunk| {
            for candidate in chunk {
                let Some(record) = self.frontend.parse_module(candidate) else {
                    continue;
                };
                if let Registration::Conflict { winner, loser } =
                    self.store.register_module(record)
                {
                    if winner.is_stub && loser.is_stub {
                        log::debug!(
                            "Interfering stub for {}: keeping {}, ignoring {}",
                            winner.qualifier,
                            winner.path.display(),
                            loser.path.display()
                        );
                        let qualifier = winner.qualifier.to_string();
                        let winner_path = winner.path.display().to_string();
                        let loser_path = loser.path.display().to_string();
                        self.metrics.record_event(
                            "interfering stub",
                            &[],
                            &[
                                ("qualifier", &qualifier),
                                ("winner", &winner_path),
                                ("loser", &loser_path),
                            ],
                        );
                    } else {
                        log::debug!(
                            "Duplicate module {}: keeping {}, ignoring {}",
                            winner.qualifier,
                            winner.path.display(),
                            loser.path.display()
                        );
                    }
                }
            }
        });

        self.scheduler.map_reduce(
            candidates,
            (Vec::new(), BatchStats::default()),
            |chunk| {
                let mut handles = Vec::new();
                let mut stats = BatchStats::default();
                for candidate in chunk {
                    let outcome = self.frontend.parse_source(candidate, &self.store);
                    stats.record(&outcome);
                    if let ParseOutcome::Parsed(handle) = outcome {
                        handles.push(handle);
                    }
                }
                (handles, stats)
            },
            |(mut handles, mut stats), (partial_handles, partial_stats)| {
                handles.extend(partial_handles);
                stats.merge(partial_stats);
                (handles, stats)
            },
        )
    }

    fn candidates(&self, batch: RootBatch) -> Vec<FileCandidate> {
        let RootBatch {
            root,
            files,
            is_stub,
        } = batch;
        files
            .into_iter()
            .map(|path| FileCandidate {
                path,
                root: root.clone(),
                is_stub,
                discovery_index: self.discovery_counter.fetch_add(1, Ordering::Relaxed),
            })
            .collect()
    }

    fn warn_unparsed(&self, stats: &BatchStats) {
        let unparsed = stats.unparsed();
        if unparsed > 0 {
            let plural = if unparsed == 1 { "" } else { "s" };
            log::warn!(
                "{unparsed} file{plural} could not be parsed due to syntax errors; \
                 set RUST_LOG=debug for per-file diagnostics"
            );
            self.metrics
                .record_event("parse errors", &[("count", unparsed as i64)], &[]);
        }
    }

    fn evict_stale_modules(&self, live: &HashSet<Qualifier>) {
        let stale: Vec<Qualifier> = self
            .store
            .module_qualifiers()
            .into_iter()
            .filter(|qualifier| !live.contains(qualifier))
            .collect();
        if !stale.is_empty() {
            log::info!("Evicting {} stale module registration(s)", stale.len());
            self.store.remove_modules(&stale);
        }
    }
}

/// Roots for relative-path resolution, most specific first: typeshed
/// packages, then search paths, then the project root (which may contain
/// the others as subdirectories).
fn resolution_roots(config: &ModmapConfig) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(typeshed) = &config.typeshed {
        roots.extend(PathCatalog::typeshed_package_roots(typeshed));
    }
    roots.extend(config.search_paths.iter().cloned());
    roots.push(config.source_root.clone());
    roots
}
