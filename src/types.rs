use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One implementation under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkSpec {
    pub name: String,
    /// Source file handed to the toolchain, relative to `work_dir`.
    pub source: PathBuf,
    /// Executable produced by the build, relative to `work_dir`.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    /// Directory the benchmark is built and run in.
    pub work_dir: PathBuf,
}

fn default_executable() -> PathBuf {
    PathBuf::from("main")
}

impl BenchmarkSpec {
    pub fn source_path(&self) -> PathBuf {
        self.work_dir.join(&self.source)
    }

    pub fn executable_path(&self) -> PathBuf {
        self.work_dir.join(&self.executable)
    }
}

/// Parsed counters from one benchmark's output.
///
/// Every field is optional: a field is `Some` only when the benchmark reported
/// it. `None` means "not reported", which is distinct from a reported zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_operations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ops_per_second: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op1_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op2_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op3_count: Option<u64>,
}

impl MetricRecord {
    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }

    /// Number of fields that were reported.
    pub fn field_count(&self) -> usize {
        [
            self.duration_ms.is_some(),
            self.total_operations.is_some(),
            self.ops_per_second.is_some(),
            self.op1_count.is_some(),
            self.op2_count.is_some(),
            self.op3_count.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    /// Per-category counts in ordinal order, `None` where not reported.
    pub fn op_counts(&self) -> [Option<u64>; 3] {
        [self.op1_count, self.op2_count, self.op3_count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_empty() {
        let record = MetricRecord::default();
        assert!(record.is_empty());
        assert_eq!(record.field_count(), 0);
    }

    #[test]
    fn zero_counts_as_present() {
        let record = MetricRecord {
            op2_count: Some(0),
            ..Default::default()
        };
        assert!(!record.is_empty());
        assert_eq!(record.field_count(), 1);
        assert_eq!(record.op_counts(), [None, Some(0), None]);
    }

    #[test]
    fn absent_fields_not_serialized() {
        let record = MetricRecord {
            duration_ms: Some(500),
            ops_per_second: Some(2000.0),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"duration_ms":500,"ops_per_second":2000.0}"#);
    }

    #[test]
    fn paths_resolve_against_work_dir() {
        let spec = BenchmarkSpec {
            name: "Vector".to_string(),
            source: PathBuf::from("measure.cpp"),
            executable: PathBuf::from("main"),
            work_dir: PathBuf::from("/bench/standart/vector"),
        };
        assert_eq!(
            spec.source_path(),
            PathBuf::from("/bench/standart/vector/measure.cpp")
        );
        assert_eq!(
            spec.executable_path(),
            PathBuf::from("/bench/standart/vector/main")
        );
    }
}
