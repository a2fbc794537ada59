//! Configuration for ingestion runs.
//!
//! A run is described by a project source root, an optional typeshed-style
//! stub root, and an ordered list of additional search-path roots, plus the
//! parallelism settings for the scheduler. Values can come from a TOML file,
//! from the CLI, or from both (CLI flags override file values).

use crate::core::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default value for parallel processing enabled
fn default_enabled() -> bool {
    true
}

/// Default partition size for chunked processing
fn default_batch_size() -> usize {
    100
}

fn default_batch_size_option() -> Option<usize> {
    Some(default_batch_size())
}

/// Configuration for the scheduler's execution mode.
///
/// When enabled, bulk jobs are partitioned and run across rayon workers.
/// Call sites observe identical results in either mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParallelConfig {
    /// Enable parallel processing (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum worker threads (default: all available cores)
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Partition size for chunked processing (default: 100)
    #[serde(default = "default_batch_size_option")]
    pub batch_size: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_concurrency: None,
            batch_size: Some(default_batch_size()),
        }
    }
}

impl ParallelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config with parallel processing disabled.
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Get the effective worker count.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(num_cpus)
    }

    /// Get the effective partition size.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(default_batch_size()).max(1)
    }
}

/// Returns the number of available CPU cores.
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

/// Top-level configuration for an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModmapConfig {
    /// Project source root; must exist. The only fatal configuration input.
    pub source_root: PathBuf,

    /// Typeshed-style root: each top-level subdirectory is one logical stub
    /// package. Missing or unreadable trees degrade to a warning.
    #[serde(default)]
    pub typeshed: Option<PathBuf>,

    /// Additional search-path roots, in precedence order.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Glob patterns excluded from every scan.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Scheduler settings.
    #[serde(default)]
    pub parallel: ParallelConfig,
}

impl ModmapConfig {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            ..Default::default()
        }
    }

    pub fn with_typeshed(mut self, typeshed: impl Into<PathBuf>) -> Self {
        self.typeshed = Some(typeshed.into());
        self
    }

    pub fn with_search_path(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_paths.push(root.into());
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = ParallelConfig::sequential();
        self
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            Error::file_system(format!("Failed to read config file: {err}"), path)
        })?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration. An entirely missing or invalid source
    /// root is the one fatal input; everything else degrades at scan time.
    pub fn validate(&self) -> Result<()> {
        if self.source_root.as_os_str().is_empty() {
            return Err(Error::configuration("source root is not set"));
        }
        if !self.source_root.is_dir() {
            return Err(Error::configuration(format!(
                "source root {} does not exist or is not a directory",
                self.source_root.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn parallel_config_default() {
        let config = ParallelConfig::default();
        assert!(config.enabled);
        assert!(config.max_concurrency.is_none());
        assert_eq!(config.batch_size, Some(100));
    }

    #[test]
    fn parallel_config_sequential() {
        let config = ParallelConfig::sequential();
        assert!(!config.enabled);
    }

    #[test]
    fn effective_batch_size_never_zero() {
        let config = ParallelConfig {
            batch_size: Some(0),
            ..Default::default()
        };
        assert_eq!(config.effective_batch_size(), 1);

        let config = ParallelConfig {
            batch_size: None,
            ..Default::default()
        };
        assert_eq!(config.effective_batch_size(), 100);
    }

    #[test]
    fn effective_concurrency() {
        let config = ParallelConfig {
            max_concurrency: Some(4),
            ..Default::default()
        };
        assert_eq!(config.effective_concurrency(), 4);

        let config = ParallelConfig::default();
        assert!(config.effective_concurrency() >= 1);
    }

    #[test]
    fn validate_rejects_missing_source_root() {
        let config = ModmapConfig::new("/definitely/not/a/real/dir");
        assert!(config.validate().is_err());

        let empty = ModmapConfig::default();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn validate_accepts_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config = ModmapConfig::new(temp_dir.path());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("modmap.toml");
        std::fs::write(
            &config_path,
            r#"
source_root = "/project/src"
typeshed = "/project/typeshed"
search_paths = ["/project/vendor"]
ignore_patterns = ["**/generated/**"]

[parallel]
enabled = false
batch_size = 10
"#,
        )
        .unwrap();

        let config = ModmapConfig::from_file(&config_path).unwrap();
        assert_eq!(config.source_root, PathBuf::from("/project/src"));
        assert_eq!(config.typeshed, Some(PathBuf::from("/project/typeshed")));
        assert_eq!(config.search_paths, vec![PathBuf::from("/project/vendor")]);
        assert_eq!(config.ignore_patterns, vec!["**/generated/**".to_string()]);
        assert!(!config.parallel.enabled);
        assert_eq!(config.parallel.batch_size, Some(10));
    }

    #[test]
    fn builder_methods() {
        let config = ModmapConfig::new("/src")
            .with_typeshed("/typeshed")
            .with_search_path("/vendor")
            .sequential();
        assert_eq!(config.typeshed, Some(PathBuf::from("/typeshed")));
        assert_eq!(config.search_paths.len(), 1);
        assert!(!config.parallel.enabled);
    }
}
