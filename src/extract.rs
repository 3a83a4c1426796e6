use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::MetricRecord;

/// Prefix of the structured metrics line a benchmark may print instead of
/// (or alongside) the free-form summary.
pub const STRUCTURED_PREFIX: &str = "OPSBENCH-METRICS";

/// Structured line versions this extractor understands.
pub const SUPPORTED_VERSIONS: &[&str] = &["v1"];

struct Patterns {
    duration: Regex,
    total_operations: Regex,
    ops_per_second: Regex,
    op_counts: [Regex; 3],
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |pattern: &str| {
            Regex::new(pattern).expect("Failed to compile metric extraction pattern")
        };
        Patterns {
            duration: compile(r"Duration:\s*(\d+)\s*ms"),
            total_operations: compile(r"Total operations:\s*(\d+)"),
            // Accepts exponent notation such as 3.08928e+06.
            ops_per_second: compile(r"Operations per second:\s*([\d.eE+\-]+)"),
            op_counts: [
                compile(r"Operation 1.*?:\s*(\d+)"),
                compile(r"Operation 2.*?:\s*(\d+)"),
                compile(r"Operation 3.*?:\s*(\d+)"),
            ],
        }
    })
}

/// Parse captured benchmark output into a `MetricRecord`.
///
/// Returns `None` when the output is absent, empty, or contains no
/// recognizable field at all. Otherwise every field is extracted on its own;
/// a field that is missing or fails to parse is simply left out.
///
/// A supported `OPSBENCH-METRICS <version> {json}` line takes precedence over
/// the textual patterns when present.
pub fn extract_metrics(output: Option<&str>) -> Option<MetricRecord> {
    let text = output?;
    if text.trim().is_empty() {
        return None;
    }

    let record = extract_structured(text).unwrap_or_else(|| extract_textual(text));

    if record.is_empty() { None } else { Some(record) }
}

/// Scan free-form text with the fixed per-field patterns.
pub fn extract_textual(text: &str) -> MetricRecord {
    let p = patterns();
    let [op1, op2, op3] = &p.op_counts;

    MetricRecord {
        duration_ms: capture(&p.duration, text),
        total_operations: capture(&p.total_operations, text),
        ops_per_second: capture(&p.ops_per_second, text).filter(is_valid_throughput),
        op1_count: capture(op1, text),
        op2_count: capture(op2, text),
        op3_count: capture(op3, text),
    }
}

/// Find the first supported structured metrics line and decode it.
///
/// Lines with an unknown version or a JSON payload that does not fit the
/// record schema are skipped.
pub fn extract_structured(text: &str) -> Option<MetricRecord> {
    text.lines().find_map(|line| {
        let rest = line.trim().strip_prefix(STRUCTURED_PREFIX)?;
        let (version, payload) = rest.trim_start().split_once(char::is_whitespace)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            tracing::debug!(version, "ignoring structured metrics line with unknown version");
            return None;
        }
        match serde_json::from_str::<MetricRecord>(payload.trim()) {
            Ok(mut record) => {
                record.ops_per_second = record.ops_per_second.filter(is_valid_throughput);
                Some(record)
            }
            Err(err) => {
                tracing::debug!(%err, "ignoring malformed structured metrics line");
                None
            }
        }
    })
}

/// Throughput must be a finite, non-negative rate.
fn is_valid_throughput(value: &f64) -> bool {
    value.is_finite() && *value >= 0.0
}

fn capture<T: FromStr>(re: &Regex, text: &str) -> Option<T> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_OUTPUT: &str = "\
Loading students from CSV...
Loaded 12000 students

Starting benchmark (10 seconds)...
Operation ratio - Op1:Op2:Op3 = 5:1:100

=== BENCHMARK RESULTS ===
Duration: 10000 ms
Total operations: 30892800
Operations per second: 3.08928e+06

Operation 1 (Find group with most students): 1454978
Operation 2 (Change student group): 291035
Operation 3 (Find group with highest rating): 29146787

Actual ratio: 1454978:291035:29146787
";

    #[test]
    fn absent_input_yields_nothing() {
        assert_eq!(extract_metrics(None), None);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(extract_metrics(Some("")), None);
        assert_eq!(extract_metrics(Some("  \n\t\n")), None);
    }

    #[test]
    fn unrelated_text_yields_nothing() {
        assert_eq!(extract_metrics(Some("Segmentation fault\n")), None);
    }

    #[test]
    fn full_output_extracts_every_field() {
        let record = extract_metrics(Some(FULL_OUTPUT)).unwrap();
        assert_eq!(record.duration_ms, Some(10000));
        assert_eq!(record.total_operations, Some(30892800));
        assert_eq!(record.ops_per_second, Some(3_089_280.0));
        assert_eq!(record.op1_count, Some(1454978));
        assert_eq!(record.op2_count, Some(291035));
        assert_eq!(record.op3_count, Some(29146787));
    }

    #[test]
    fn scientific_notation_throughput() {
        let record = extract_metrics(Some("Operations per second: 3.08928e+06")).unwrap();
        assert_eq!(record.ops_per_second, Some(3089280.0));

        let record = extract_metrics(Some("Operations per second: 1.5E-3")).unwrap();
        assert_eq!(record.ops_per_second, Some(0.0015));
    }

    #[test]
    fn missing_op_categories_are_absent() {
        let text = "Duration: 500 ms\nTotal operations: 1000\nOperations per second: 2000.0";
        let record = extract_metrics(Some(text)).unwrap();
        assert_eq!(
            record,
            MetricRecord {
                duration_ms: Some(500),
                total_operations: Some(1000),
                ops_per_second: Some(2000.0),
                ..Default::default()
            }
        );
        assert_eq!(record.op_counts(), [None, None, None]);
    }

    #[test]
    fn field_order_does_not_matter() {
        let forward = "Duration: 7 ms\nOperation 2 (b): 3\nOperations per second: 42.5\n";
        let reversed = "Operations per second: 42.5\nOperation 2 (b): 3\nDuration: 7 ms\n";
        assert_eq!(extract_metrics(Some(forward)), extract_metrics(Some(reversed)));
    }

    #[test]
    fn extraction_is_deterministic() {
        let first = extract_metrics(Some(FULL_OUTPUT));
        let second = extract_metrics(Some(FULL_OUTPUT));
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_field_is_absent_not_fatal() {
        let text = "Duration: 99999999999999999999999 ms\nOperations per second: 1.2.3\nTotal operations: 12";
        let record = extract_metrics(Some(text)).unwrap();
        assert_eq!(record.duration_ms, None);
        assert_eq!(record.ops_per_second, None);
        assert_eq!(record.total_operations, Some(12));
    }

    #[test]
    fn op_label_matches_regardless_of_description() {
        let text = "Operation 1: 10\nOperation 2 - change group: 20\nOperation 3 (x): 30";
        let record = extract_metrics(Some(text)).unwrap();
        assert_eq!(record.op_counts(), [Some(10), Some(20), Some(30)]);
    }

    #[test]
    fn ratio_line_is_not_an_op_count() {
        let record = extract_metrics(Some("Operation ratio - Op1:Op2:Op3 = 5:1:100\n"));
        assert_eq!(record, None);
    }

    #[test]
    fn first_occurrence_wins() {
        let text = "Duration: 10 ms\nDuration: 20 ms\n";
        let record = extract_metrics(Some(text)).unwrap();
        assert_eq!(record.duration_ms, Some(10));
    }

    #[test]
    fn zero_value_is_present() {
        let record = extract_metrics(Some("Operations per second: 0")).unwrap();
        assert_eq!(record.ops_per_second, Some(0.0));
    }

    #[test]
    fn negative_throughput_is_absent() {
        let text = "Operations per second: -5\nTotal operations: 10\n";
        let record = extract_metrics(Some(text)).unwrap();
        assert_eq!(record.ops_per_second, None);
        assert_eq!(record.total_operations, Some(10));

        let record = extract_metrics(Some("OPSBENCH-METRICS v1 {\"ops_per_second\": -2.5}"));
        assert_eq!(record, None);
    }

    // --- structured line ---

    #[test]
    fn structured_line_takes_precedence() {
        let text = "\
Duration: 1 ms
OPSBENCH-METRICS v1 {\"duration_ms\": 250, \"ops_per_second\": 8000}
";
        let record = extract_metrics(Some(text)).unwrap();
        assert_eq!(record.duration_ms, Some(250));
        assert_eq!(record.ops_per_second, Some(8000.0));
        assert_eq!(record.total_operations, None);
    }

    #[test]
    fn unknown_version_falls_back_to_patterns() {
        let text = "OPSBENCH-METRICS v9 {\"duration_ms\": 250}\nDuration: 5 ms\n";
        let record = extract_metrics(Some(text)).unwrap();
        assert_eq!(record.duration_ms, Some(5));
    }

    #[test]
    fn malformed_structured_payload_falls_back() {
        let text = "OPSBENCH-METRICS v1 {not json}\nTotal operations: 77\n";
        let record = extract_metrics(Some(text)).unwrap();
        assert_eq!(record.total_operations, Some(77));
    }

    #[test]
    fn structured_payload_ignores_unknown_fields() {
        let record =
            extract_structured("OPSBENCH-METRICS v1 {\"op3_count\": 4, \"cache\": true}").unwrap();
        assert_eq!(record.op3_count, Some(4));
        assert_eq!(record.field_count(), 1);
    }
}
