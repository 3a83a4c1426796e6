use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::OpsbenchError;
use crate::types::BenchmarkSpec;

/// Config file picked up from the root directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "opsbench.toml";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Placeholders substituted into toolchain arguments.
pub const SOURCE_PLACEHOLDER: &str = "{source}";
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// External compiler invocation. Each argument may contain `{source}` and
/// `{output}`, replaced with the benchmark's source and executable paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Toolchain {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain {
            program: "g++".to_string(),
            args: [SOURCE_PLACEHOLDER, "-o", OUTPUT_PLACEHOLDER, "-std=c++17", "-O2"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Toolchain {
    /// Arguments with placeholders filled in for one build.
    pub fn expand_args(&self, source: &Path, output: &Path) -> Vec<String> {
        let source = source.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(SOURCE_PLACEHOLDER, &source)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }
}

/// The benchmark suite: what to build, how, and where results go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    /// Relative to the suite root.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub toolchain: Toolchain,
    /// Work directories are relative to the suite root.
    #[serde(default, rename = "benchmark")]
    pub benchmarks: Vec<BenchmarkSpec>,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for SuiteConfig {
    fn default() -> Self {
        let bench = |name: &str, source: &str, work_dir: &str| BenchmarkSpec {
            name: name.to_string(),
            source: PathBuf::from(source),
            executable: PathBuf::from("main"),
            work_dir: PathBuf::from(work_dir),
        };

        SuiteConfig {
            results_dir: default_results_dir(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            toolchain: Toolchain::default(),
            benchmarks: vec![
                bench("Hash Table", "measure.cpp", "standart/hash"),
                bench("Vector", "measure.cpp", "standart/vector"),
                bench("AVL Tree", "measure.cpp", "standart/avl"),
                bench("Optimized", "measure_optimized.cpp", "optimized"),
            ],
        }
    }
}

impl SuiteConfig {
    /// Parse and validate a TOML suite file.
    pub fn load(path: &Path) -> Result<Self, OpsbenchError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| OpsbenchError::ReadError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml(&content, path)
    }

    /// `origin` is only used in error messages.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, OpsbenchError> {
        let config: SuiteConfig =
            toml::from_str(content).map_err(|e| OpsbenchError::ConfigParseError {
                path: origin.to_path_buf(),
                detail: e.message().to_string(),
            })?;
        config.validate(origin)?;
        Ok(config)
    }

    /// Use `explicit` if given, else `<root>/opsbench.toml` if it exists,
    /// else the built-in suite.
    pub fn discover(explicit: Option<&Path>, root: &Path) -> Result<Self, OpsbenchError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = root.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using suite file from root");
            return Self::load(&candidate);
        }
        tracing::debug!("no suite file found, using built-in suite");
        Ok(Self::default())
    }

    pub fn to_toml(&self) -> Result<String, OpsbenchError> {
        toml::to_string_pretty(self).map_err(|e| OpsbenchError::ConfigParseError {
            path: PathBuf::from(DEFAULT_CONFIG_FILE),
            detail: e.to_string(),
        })
    }

    fn validate(&self, origin: &Path) -> Result<(), OpsbenchError> {
        let invalid = |detail: String| OpsbenchError::ConfigParseError {
            path: origin.to_path_buf(),
            detail,
        };

        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs must be greater than zero".to_string()));
        }
        if self.toolchain.program.trim().is_empty() {
            return Err(invalid("toolchain.program must not be empty".to_string()));
        }
        for (i, bench) in self.benchmarks.iter().enumerate() {
            if bench.name.trim().is_empty() {
                return Err(invalid(format!("benchmark #{} has an empty name", i + 1)));
            }
            if self.benchmarks[..i].iter().any(|b| b.name == bench.name) {
                return Err(invalid(format!("duplicate benchmark name '{}'", bench.name)));
            }
        }
        Ok(())
    }

    /// Keep only the named benchmarks, in configured order.
    pub fn retain_only(&mut self, names: &[String]) -> Result<(), OpsbenchError> {
        if names.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = names
            .iter()
            .find(|name| !self.benchmarks.iter().any(|b| &b.name == *name))
        {
            let available = self
                .benchmarks
                .iter()
                .map(|b| b.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(OpsbenchError::UnknownBenchmark {
                name: unknown.clone(),
                available,
            });
        }
        self.benchmarks.retain(|b| names.contains(&b.name));
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn results_path(&self, root: &Path) -> PathBuf {
        root.join(&self.results_dir)
    }

    /// Benchmarks with work directories resolved against `root`.
    pub fn resolved_specs(&self, root: &Path) -> Vec<BenchmarkSpec> {
        self.benchmarks
            .iter()
            .map(|bench| BenchmarkSpec {
                work_dir: root.join(&bench.work_dir),
                ..bench.clone()
            })
            .collect()
    }
}
