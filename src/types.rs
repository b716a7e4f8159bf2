//! Statistics record model.
//!
//! One [`SimRecord`] per simulator run, parsed from the JSON document the
//! simulator prints with `--json`. Parsing is all-or-nothing: a record either
//! has every required field with the right type, or it is rejected with a
//! [`SchemaError`] naming the offending field.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;

/// Cache geometry the run was simulated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    /// Bytes per cache line.
    pub block_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associativity: Option<u64>,
}

/// Statistics of one simulator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimRecord {
    /// Display name (source file name without extension).
    #[serde(skip)]
    pub name: String,
    /// Source file name the record was parsed from.
    #[serde(skip)]
    pub file: String,
    pub per_core_loads: Vec<u64>,
    pub per_core_stores: Vec<u64>,
    pub per_core_hits: Vec<u64>,
    pub per_core_misses: Vec<u64>,
    pub bus_data_traffic_bytes: u64,
    pub bus_invalidations_or_updates: u64,
    pub private_accesses: Vec<u64>,
    pub shared_accesses: Vec<u64>,
    pub overall_execution_cycles: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_core_execution_cycles: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub config: CacheConfig,
}

impl SimRecord {
    /// Parses a record from the JSON text of `file`.
    ///
    /// The record name is the file name with its extension stripped.
    pub fn from_json(file: &str, content: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(content).map_err(|e| SchemaError::InvalidJson {
            file: file.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_value(file, &value)
    }

    /// Builds a record from an already parsed JSON document.
    pub fn from_value(file: &str, value: &Value) -> Result<Self, SchemaError> {
        let root = Fields::object(file, "", value)?;
        let config = Fields::object(file, "config", root.member("config")?)?;

        let record = Self {
            name: record_name(file),
            file: file.to_string(),
            per_core_loads: root.required(&["per_core_loads"])?,
            per_core_stores: root.required(&["per_core_stores"])?,
            per_core_hits: root.required(&["per_core_hits"])?,
            per_core_misses: root.required(&["per_core_misses"])?,
            bus_data_traffic_bytes: root.required(&["bus_data_traffic_bytes"])?,
            bus_invalidations_or_updates: root.required(&["bus_invalidations_or_updates"])?,
            private_accesses: root.required(&["private_accesses", "per_core_private_accesses"])?,
            shared_accesses: root.required(&["shared_accesses", "per_core_shared_accesses"])?,
            overall_execution_cycles: root.required(&["overall_execution_cycles"])?,
            per_core_execution_cycles: root.optional(&["per_core_execution_cycles"])?,
            protocol: root.optional(&["protocol"])?,
            config: CacheConfig {
                block_size: config.positive(&["block_size"])?,
                cache_size: config.optional_positive(&["cache_size"])?,
                associativity: config.optional_positive(&["associativity"])?,
            },
        };

        record.check_core_counts()?;
        Ok(record)
    }

    /// Number of simulated cores.
    pub fn num_cores(&self) -> usize {
        self.per_core_loads.len()
    }

    /// Loads plus stores issued by core `core`.
    ///
    /// `core` must be below [`Self::num_cores`] on a record that passed
    /// [`Self::check_core_counts`].
    pub fn core_accesses(&self, core: usize) -> u128 {
        u128::from(self.per_core_loads[core]) + u128::from(self.per_core_stores[core])
    }

    /// Hits plus misses observed by core `core`.
    pub fn core_outcomes(&self, core: usize) -> u128 {
        u128::from(self.per_core_hits[core]) + u128::from(self.per_core_misses[core])
    }

    /// Verifies every per-core sequence has one entry per core.
    ///
    /// Parsed records always pass; records assembled by hand may not.
    pub fn check_core_counts(&self) -> Result<(), SchemaError> {
        let cores = self.num_cores();
        if cores == 0 {
            return Err(SchemaError::NoCores {
                file: self.file.clone(),
                field: "per_core_loads".to_string(),
            });
        }

        let columns = [
            ("per_core_stores", Some(&self.per_core_stores)),
            ("per_core_hits", Some(&self.per_core_hits)),
            ("per_core_misses", Some(&self.per_core_misses)),
            ("private_accesses", Some(&self.private_accesses)),
            ("shared_accesses", Some(&self.shared_accesses)),
            (
                "per_core_execution_cycles",
                self.per_core_execution_cycles.as_ref(),
            ),
        ];

        for (field, column) in columns {
            let Some(column) = column else { continue };
            if column.len() != cores {
                return Err(SchemaError::CoreCountMismatch {
                    file: self.file.clone(),
                    field: field.to_string(),
                    expected: cores,
                    found: column.len(),
                });
            }
        }

        Ok(())
    }
}

/// Record name for a result file: the base name without extension.
pub fn record_name(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map_or_else(|| file.to_string(), |s| s.to_string_lossy().into_owned())
}

/// Typed access to the members of one JSON object.
struct Fields<'a> {
    file: &'a str,
    prefix: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn object(file: &'a str, prefix: &'a str, value: &'a Value) -> Result<Self, SchemaError> {
        let map = value.as_object().ok_or_else(|| SchemaError::MalformedField {
            file: file.to_string(),
            field: (if prefix.is_empty() { "<root>" } else { prefix }).to_string(),
            reason: "expected a JSON object".to_string(),
        })?;
        Ok(Self { file, prefix, map })
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.prefix)
        }
    }

    /// First of `keys` present in the object; later keys are aliases.
    fn find(&self, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
        keys.iter()
            .find_map(|&key| self.map.get(key).map(|value| (key, value)))
    }

    fn member(&self, key: &'static str) -> Result<&'a Value, SchemaError> {
        self.find(&[key])
            .map(|(_, value)| value)
            .ok_or_else(|| SchemaError::MissingField {
                file: self.file.to_string(),
                field: self.path(key),
            })
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, value: &Value) -> Result<T, SchemaError> {
        T::deserialize(value).map_err(|e| SchemaError::MalformedField {
            file: self.file.to_string(),
            field: self.path(key),
            reason: e.to_string(),
        })
    }

    fn required<T: DeserializeOwned>(&self, keys: &[&'static str]) -> Result<T, SchemaError> {
        let (key, value) = self.find(keys).ok_or_else(|| SchemaError::MissingField {
            file: self.file.to_string(),
            field: self.path(keys[0]),
        })?;
        self.decode(key, value)
    }

    fn optional<T: DeserializeOwned>(
        &self,
        keys: &[&'static str],
    ) -> Result<Option<T>, SchemaError> {
        match self.find(keys) {
            Some((key, value)) => self.decode::<Option<T>>(key, value),
            None => Ok(None),
        }
    }

    fn positive(&self, keys: &[&'static str]) -> Result<u64, SchemaError> {
        let value: u64 = self.required(keys)?;
        self.ensure_positive(keys[0], value)
    }

    fn optional_positive(&self, keys: &[&'static str]) -> Result<Option<u64>, SchemaError> {
        self.optional::<u64>(keys)?
            .map(|value| self.ensure_positive(keys[0], value))
            .transpose()
    }

    fn ensure_positive(&self, key: &str, value: u64) -> Result<u64, SchemaError> {
        if value == 0 {
            return Err(SchemaError::MalformedField {
                file: self.file.to_string(),
                field: self.path(key),
                reason: "must be a positive integer".to_string(),
            });
        }
        Ok(value)
    }
}
