use std::path::PathBuf;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum OpsbenchError {
    #[error("Build failed for {name}: {detail}")]
    BuildFailed { name: String, detail: String },

    #[error("Execution failed for {name}: {detail}")]
    ExecutionFailed { name: String, detail: String },

    #[error("Execution timed out for {name} after {timeout:?}")]
    ExecutionTimedOut { name: String, timeout: Duration },

    #[error("No metrics could be extracted from the output of {name}")]
    NothingExtracted { name: String },

    #[error("Output of {name} has no operations-per-second figure")]
    MissingThroughput { name: String },

    #[error("Speedup is undefined: slowest implementation {worst} reported zero throughput")]
    DivisionUndefined { worst: String },

    #[error("Speedup of {best} over {worst} is not representable")]
    SpeedupUnrepresentable { best: String, worst: String },

    #[error("No results collected. Please check the diagnostics above.")]
    NoResultsCollected,

    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid suite configuration in {path}: {detail}")]
    ConfigParseError { path: PathBuf, detail: String },

    #[error("Unknown benchmark '{name}'. Configured: {available}")]
    UnknownBenchmark { name: String, available: String },

    #[error("Failed to serialize results: {0}")]
    SerializeError(#[from] serde_json::Error),

    #[error("Malformed results file {path}: {detail}")]
    ResultsParseError { path: PathBuf, detail: String },
}
