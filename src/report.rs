use std::path::Path;

use crate::errors::OpsbenchError;
use crate::store::ResultStore;
use crate::types::MetricRecord;

/// File name of the text report inside the results directory.
pub const REPORT_FILE: &str = "performance_report.txt";

const RULE_WIDTH: usize = 70;

/// One store entry in ranked position.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry<'a> {
    pub name: &'a str,
    pub record: &'a MetricRecord,
    pub throughput: f64,
    /// Throughput relative to the slowest entry; `None` when that is zero.
    pub ratio_to_slowest: Option<f64>,
}

/// Ranked comparison derived from a `ResultStore`. Never cached: build a
/// fresh one from the store whenever a report is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct Report<'a> {
    pub ranking: Vec<RankedEntry<'a>>,
    pub best: &'a str,
    pub worst: &'a str,
    pub best_throughput: f64,
    pub worst_throughput: f64,
    /// `None` when the slowest entry reported zero throughput.
    pub speedup: Option<f64>,
}

impl<'a> Report<'a> {
    /// Rank the store by throughput, highest first.
    ///
    /// Returns `None` for an empty store. Ties keep insertion order; on a tie
    /// for best or worst the earliest inserted entry is chosen.
    pub fn from_store(store: &'a ResultStore) -> Option<Self> {
        let mut ranking: Vec<RankedEntry<'a>> = store
            .iter()
            .filter_map(|(name, record)| {
                record.ops_per_second.map(|throughput| RankedEntry {
                    name,
                    record,
                    throughput,
                    ratio_to_slowest: None,
                })
            })
            .collect();

        let (worst, worst_throughput) = ranking.iter().fold(None, |min, entry| match min {
            Some((_, lowest)) if entry.throughput >= lowest => min,
            _ => Some((entry.name, entry.throughput)),
        })?;

        // Vec::sort_by is stable, which preserves insertion order among ties.
        ranking.sort_by(|a, b| b.throughput.total_cmp(&a.throughput));

        for entry in &mut ranking {
            entry.ratio_to_slowest = speedup(entry.throughput, worst_throughput, entry.name, worst).ok();
        }

        let best = ranking.first()?;
        let (best_name, best_throughput) = (best.name, best.throughput);

        let speedup = match speedup(best_throughput, worst_throughput, best_name, worst) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("{err}");
                None
            }
        };

        Some(Report {
            ranking,
            best: best_name,
            worst,
            best_throughput,
            worst_throughput,
            speedup,
        })
    }

    /// Render the plain-text report. Contains no timestamps, so the same
    /// store always renders to the same text.
    pub fn render(&self) -> String {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);
        let mut out = String::new();

        out.push_str(&format!("{heavy}\nPERFORMANCE ANALYSIS REPORT\n{heavy}\n\n"));

        out.push_str(&format!("SUMMARY\n{light}\n"));
        out.push_str(&format!("Best Implementation: {}\n", self.best));
        out.push_str(&format!(
            "  Operations/second: {}\n",
            format_decimal(self.best_throughput)
        ));
        out.push_str(&format!("\nWorst Implementation: {}\n", self.worst));
        out.push_str(&format!(
            "  Operations/second: {}\n",
            format_decimal(self.worst_throughput)
        ));
        match self.speedup {
            Some(value) => out.push_str(&format!("\nSpeedup: {value:.2}x\n")),
            None if self.worst_throughput == 0.0 => out.push_str(&format!(
                "\nSpeedup: undefined ({} reported zero throughput)\n",
                self.worst
            )),
            None => out.push_str(&format!(
                "\nSpeedup: not representable ({} over {} overflows)\n",
                self.best, self.worst
            )),
        }
        out.push('\n');

        out.push_str(&format!("RANKING\n{light}\n"));
        let name_width = self
            .ranking
            .iter()
            .map(|entry| entry.name.chars().count())
            .max()
            .unwrap_or(0);
        let position_width = self.ranking.len().to_string().len();
        for (i, entry) in self.ranking.iter().enumerate() {
            let position = format!("{:>width$}.", i + 1, width = position_width);
            let mut line = format!(
                "  {position} {:<name_width$}  {} ops/s",
                entry.name,
                format_decimal(entry.throughput)
            );
            if let Some(ratio) = entry.ratio_to_slowest {
                line.push_str(&format!("  ({ratio:.2}x)"));
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out.push('\n');

        out.push_str(&format!("DETAILED RESULTS\n{light}\n"));
        for entry in &self.ranking {
            out.push_str(&format!("\n{}:\n", entry.name));
            out.push_str(&format_details(entry.record));
        }

        out.push_str(&format!("\n{heavy}\n"));
        out
    }
}

/// Detail lines for every field the record carries. Absent fields produce no
/// line at all, so a missing count never reads as zero.
pub fn format_details(record: &MetricRecord) -> String {
    let mut out = String::new();
    if let Some(v) = record.ops_per_second {
        out.push_str(&format!("  Operations per second: {}\n", format_decimal(v)));
    }
    if let Some(v) = record.total_operations {
        out.push_str(&format!("  Total operations: {}\n", format_thousands(v)));
    }
    if let Some(v) = record.duration_ms {
        out.push_str(&format!("  Duration: {} ms\n", format_thousands(v)));
    }
    for (i, count) in record.op_counts().iter().enumerate() {
        if let Some(v) = count {
            out.push_str(&format!(
                "  Operation {} count: {}\n",
                i + 1,
                format_thousands(*v)
            ));
        }
    }
    out
}

/// `best / worst`, refusing to divide by a zero throughput or to return a
/// ratio that overflows `f64`.
pub fn speedup(
    best: f64,
    worst: f64,
    best_name: &str,
    worst_name: &str,
) -> Result<f64, OpsbenchError> {
    if worst == 0.0 {
        return Err(OpsbenchError::DivisionUndefined {
            worst: worst_name.to_string(),
        });
    }
    let ratio = best / worst;
    if ratio.is_finite() {
        Ok(ratio)
    } else {
        Err(OpsbenchError::SpeedupUnrepresentable {
            best: best_name.to_string(),
            worst: worst_name.to_string(),
        })
    }
}

/// Integer with comma thousands separators: `1234567` -> `1,234,567`.
pub fn format_thousands(value: u64) -> String {
    group_digits(&value.to_string())
}

/// Two-decimal float with thousands separators: `3089280.0` -> `3,089,280.00`.
pub fn format_decimal(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{}.{fraction}", group_digits(whole))
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Write the rendered report to `path`, replacing any previous report.
pub fn write_report(text: &str, path: &Path) -> Result<(), OpsbenchError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| OpsbenchError::WriteError {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, text).map_err(|source| OpsbenchError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}
