use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::OpsbenchError;
use crate::types::MetricRecord;

/// File name of the persisted results inside the results directory.
pub const RESULTS_FILE: &str = "measurement_results.json";

/// Insertion-ordered mapping from implementation name to its metrics.
///
/// Every stored record carries `ops_per_second`; `put` rejects anything else,
/// so ranking never has to deal with a missing throughput.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultStore {
    entries: Vec<(String, MetricRecord)>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `name`.
    ///
    /// A replaced record keeps the position of the original insertion.
    pub fn put(&mut self, name: &str, record: MetricRecord) -> Result<(), OpsbenchError> {
        if record.ops_per_second.is_none() {
            return Err(OpsbenchError::MissingThroughput {
                name: name.to_string(),
            });
        }

        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = record,
            None => self.entries.push((name.to_string(), record)),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MetricRecord> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, record)| record)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricRecord)> {
        self.entries
            .iter()
            .map(|(name, record)| (name.as_str(), record))
    }

    /// Pretty-printed JSON document, keyed by implementation name.
    pub fn to_json(&self) -> Result<String, OpsbenchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the whole store to `path`, replacing any previous file.
    pub fn persist(&self, path: &Path) -> Result<(), OpsbenchError> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| OpsbenchError::WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json + "\n").map_err(|source| OpsbenchError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), entries = self.len(), "persisted results");
        Ok(())
    }

    /// Read a store previously written by `persist`, keeping document order.
    ///
    /// Entries without a throughput figure are skipped with a warning.
    pub fn load(path: &Path) -> Result<Self, OpsbenchError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| OpsbenchError::ReadError {
                path: path.to_path_buf(),
                source,
            })?;

        let OrderedEntries(entries) =
            serde_json::from_str(&content).map_err(|e| OpsbenchError::ResultsParseError {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        let mut store = ResultStore::new();
        for (name, record) in entries {
            if let Err(err) = store.put(&name, record) {
                tracing::warn!(path = %path.display(), "skipping stored entry: {err}");
            }
        }
        Ok(store)
    }
}

impl Serialize for ResultStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, record) in &self.entries {
            map.serialize_entry(name, record)?;
        }
        map.end()
    }
}

/// JSON object decoded as a list of pairs so key order survives.
struct OrderedEntries(Vec<(String, MetricRecord)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping implementation names to metric records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, record)) = access.next_entry::<String, MetricRecord>()? {
                    entries.push((name, record));
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
