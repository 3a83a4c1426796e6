use std::path::Path;

use chrono::{DateTime, Local};
use owo_colors::{OwoColorize, Stream, Style};

use crate::errors::OpsbenchError;
use crate::types::{BenchmarkSpec, MetricRecord};

const BANNER_WIDTH: usize = 63;

// Style constants
fn style_heading() -> Style {
    Style::new().cyan().bold()
}

fn style_ok() -> Style {
    Style::new().green()
}

fn style_fail() -> Style {
    Style::new().red()
}

/// Boxed title shown once at startup.
pub fn format_banner() -> String {
    let title = "Data Structures Performance Measurement & Analysis Tool";
    let inner = BANNER_WIDTH;
    let top = format!("╔{}╗", "═".repeat(inner));
    let middle = format!("║{:^inner$}║", title);
    let bottom = format!("╚{}╝", "═".repeat(inner));
    let style = style_heading();

    let mut out = String::new();
    for line in [top, middle, bottom] {
        out.push_str(
            &line
                .if_supports_color(Stream::Stdout, |s| s.style(style))
                .to_string(),
        );
        out.push('\n');
    }
    out
}

/// `[1/2] Running all measurements...`
pub fn format_phase(step: usize, total: usize, label: &str) -> String {
    let tag = format!("[{step}/{total}]");
    format!(
        "\n{} {}\n",
        tag.if_supports_color(Stream::Stdout, |s| s.style(style_heading())),
        label
    )
}

/// Header line printed before a benchmark is built.
pub fn format_started(spec: &BenchmarkSpec, index: usize, total: usize) -> String {
    let rule = "=".repeat(60);
    format!(
        "\n{}\n{} {} ({})\n{}\n",
        rule.if_supports_color(Stream::Stdout, |s| s.dimmed()),
        format!("[{}/{}]", index + 1, total)
            .if_supports_color(Stream::Stdout, |s| s.style(style_heading())),
        spec.name,
        spec.work_dir.display(),
        rule.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    )
}

/// Echo of a benchmark's stdout under a `--- Output for <name> ---` header.
pub fn format_captured(spec: &BenchmarkSpec, output: &str) -> String {
    let header = format!("--- Output for {} ---", spec.name);
    let mut out = format!(
        "\n{}\n{}",
        header.if_supports_color(Stream::Stdout, |s| s.dimmed()),
        output
    );
    if !output.ends_with('\n') {
        out.push('\n');
    }
    out
}

pub fn format_collected(spec: &BenchmarkSpec, record: &MetricRecord) -> String {
    let fields = record.field_count();
    let plural = if fields == 1 { "" } else { "s" };
    format!(
        "{} Data collected for {} ({fields} field{plural})\n",
        "✓".if_supports_color(Stream::Stdout, |s| s.style(style_ok())),
        spec.name,
    )
}

pub fn format_skipped(reason: &OpsbenchError) -> String {
    format!(
        "{} {}\n",
        "✗".if_supports_color(Stream::Stdout, |s| s.style(style_fail())),
        reason
    )
}

/// One line per skipped benchmark, or nothing when every benchmark ran.
pub fn format_skip_summary(skipped: &[OpsbenchError]) -> String {
    if skipped.is_empty() {
        return String::new();
    }

    let mut out = format!(
        "\n{}\n",
        format!("Skipped {} benchmark(s):", skipped.len())
            .if_supports_color(Stream::Stdout, |s| s.yellow())
    );
    for reason in skipped {
        // Build diagnostics may span several lines; keep the summary compact.
        let first_line = reason.to_string();
        let first_line = first_line.lines().next().unwrap_or_default();
        out.push_str(&format!("  - {first_line}\n"));
    }
    out
}

pub fn format_saved(what: &str, path: &Path) -> String {
    format!(
        "{} {what} saved to {}\n",
        "✓".if_supports_color(Stream::Stdout, |s| s.style(style_ok())),
        path.display()
    )
}

/// Closing banner. The timestamp lives here rather than in the report so
/// that reports stay reproducible.
pub fn format_completion(results_dir: &Path, finished: DateTime<Local>) -> String {
    let rule = "=".repeat(70);
    let check = "✓".if_supports_color(Stream::Stdout, |s| s.style(style_ok()));
    format!(
        "\n{rule}\n{check} All tasks completed successfully!\n{check} Results saved in: {}\n  Finished: {}\n{rule}\n",
        results_dir.display(),
        finished.format("%Y-%m-%d %H:%M:%S"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use std::time::Duration;

    fn spec() -> BenchmarkSpec {
        BenchmarkSpec {
            name: "AVL Tree".to_string(),
            source: PathBuf::from("measure.cpp"),
            executable: PathBuf::from("main"),
            work_dir: PathBuf::from("/suite/standart/avl"),
        }
    }

    #[test]
    fn banner_is_three_lines_with_title() {
        let banner = format_banner();
        assert_eq!(banner.lines().count(), 3);
        assert!(banner.contains("Performance Measurement & Analysis Tool"));
    }

    #[test]
    fn started_shows_position_and_dir() {
        let line = format_started(&spec(), 2, 4);
        assert!(line.contains("[3/4]"));
        assert!(line.contains("AVL Tree (/suite/standart/avl)"));
    }

    #[test]
    fn captured_output_is_echoed_under_header() {
        let text = format_captured(&spec(), "Duration: 5 ms\nOperations per second: 2");
        assert!(text.contains("--- Output for AVL Tree ---"));
        assert!(text.ends_with("\nDuration: 5 ms\nOperations per second: 2\n"));

        let text = format_captured(&spec(), "Total operations: 1\n");
        assert!(text.ends_with("\nTotal operations: 1\n"));
        assert!(!text.ends_with("\n\n"));
    }

    #[test]
    fn collected_counts_fields() {
        let record = MetricRecord {
            ops_per_second: Some(1.0),
            ..Default::default()
        };
        assert!(format_collected(&spec(), &record).contains("Data collected for AVL Tree (1 field)"));

        let record = MetricRecord {
            ops_per_second: Some(1.0),
            duration_ms: Some(2),
            ..Default::default()
        };
        assert!(format_collected(&spec(), &record).contains("(2 fields)"));
    }

    #[test]
    fn skip_summary_empty_when_nothing_skipped() {
        assert_eq!(format_skip_summary(&[]), "");
    }

    #[test]
    fn skip_summary_lists_first_line_of_each_reason() {
        let skipped = vec![
            OpsbenchError::BuildFailed {
                name: "Vector".to_string(),
                detail: "toolchain exit status: 1\nmeasure.cpp:3: error".to_string(),
            },
            OpsbenchError::ExecutionTimedOut {
                name: "AVL Tree".to_string(),
                timeout: Duration::from_secs(30),
            },
        ];
        let summary = format_skip_summary(&skipped);
        assert!(summary.contains("Skipped 2 benchmark(s):"));
        assert!(summary.contains("  - Build failed for Vector: toolchain exit status: 1\n"));
        assert!(!summary.contains("measure.cpp:3"));
        assert!(summary.contains("  - Execution timed out for AVL Tree after 30s\n"));
    }

    #[test]
    fn completion_includes_timestamp() {
        let finished = Local.with_ymd_and_hms(2026, 2, 18, 9, 30, 0).unwrap();
        let text = format_completion(Path::new("/suite/results"), finished);
        assert!(text.contains("All tasks completed successfully!"));
        assert!(text.contains("Results saved in: /suite/results"));
        assert!(text.contains("Finished: 2026-02-18 09:30:00"));
    }
}
