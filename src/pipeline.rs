use crate::errors::OpsbenchError;
use crate::extract::extract_metrics;
use crate::runner::OutputSource;
use crate::store::ResultStore;
use crate::types::{BenchmarkSpec, MetricRecord};

/// Progress notifications emitted while the suite runs.
#[derive(Debug)]
pub enum Event<'a> {
    Started {
        spec: &'a BenchmarkSpec,
        index: usize,
        total: usize,
    },
    /// Raw stdout of a successful execution, before extraction.
    Captured {
        spec: &'a BenchmarkSpec,
        output: &'a str,
    },
    Collected {
        spec: &'a BenchmarkSpec,
        record: &'a MetricRecord,
    },
    Skipped {
        spec: &'a BenchmarkSpec,
        reason: &'a OpsbenchError,
    },
}

/// Run every benchmark in order, one at a time, inserting each usable record
/// into `store`.
///
/// A failing benchmark never stops the loop: its failure is returned in the
/// list of skip diagnostics, in configured order, and the store gains no
/// entry for it.
pub fn run_suite<S: OutputSource + ?Sized>(
    specs: &[BenchmarkSpec],
    source: &S,
    store: &mut ResultStore,
    mut on_event: impl FnMut(Event<'_>),
) -> Vec<OpsbenchError> {
    let mut skipped = Vec::new();

    for (index, spec) in specs.iter().enumerate() {
        on_event(Event::Started {
            spec,
            index,
            total: specs.len(),
        });

        match collect_one(spec, source, store, &mut on_event) {
            Ok(()) => {
                if let Some(record) = store.get(&spec.name) {
                    on_event(Event::Collected { spec, record });
                }
            }
            Err(reason) => {
                tracing::debug!(benchmark = %spec.name, %reason, "skipping benchmark");
                on_event(Event::Skipped {
                    spec,
                    reason: &reason,
                });
                skipped.push(reason);
            }
        }
    }

    skipped
}

fn collect_one<S: OutputSource + ?Sized>(
    spec: &BenchmarkSpec,
    source: &S,
    store: &mut ResultStore,
    on_event: &mut impl FnMut(Event<'_>),
) -> Result<(), OpsbenchError> {
    let output = source.capture(spec)?;
    tracing::debug!(benchmark = %spec.name, bytes = output.len(), "captured output");
    on_event(Event::Captured {
        spec,
        output: &output,
    });

    let record =
        extract_metrics(Some(output.as_str())).ok_or_else(|| OpsbenchError::NothingExtracted {
            name: spec.name.clone(),
        })?;
    store.put(&spec.name, record)
}
