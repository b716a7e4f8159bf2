//! Invariant checker for simulator statistics.
//!
//! Evaluates the fixed rule set against a [`SimRecord`] and reports every
//! violation found. Checking is pure: a record's result never depends on any
//! other record in the batch.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::SchemaError;
use crate::loader::LoadedRun;
use crate::types::SimRecord;

/// Which invariant set to apply on top of the general rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// Rules that hold for any core count.
    General,
    /// Exactly one simulated core; no coherence traffic is possible.
    #[default]
    SingleCore,
    /// Several cores sharing a bus; adds cross-checks on access classification.
    MultiCore,
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::SingleCore => write!(f, "single-core"),
            Self::MultiCore => write!(f, "multi-core"),
        }
    }
}

/// A single rule of the invariant set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Invariant {
    /// `hits[i] + misses[i] == loads[i] + stores[i]` for every core.
    HitsMissesBalance,
    /// `bus_data_traffic_bytes % block_size == 0`.
    BusTrafficAligned,
    /// Single core: `private_accesses[0] == loads[0] + stores[0]`.
    PrivateAccessesMatch,
    /// Single core: `bus_invalidations_or_updates == 0`.
    NoCoherenceTraffic,
    /// Single core: `shared_accesses[0] == 0`.
    NoSharedAccesses,
    /// Multi core: `private_accesses[i] + shared_accesses[i] <= hits[i]`.
    ClassifiedWithinHits,
    /// Multi core: `overall_execution_cycles == max(per_core_execution_cycles)`.
    OverallCyclesMax,
}

impl Invariant {
    /// Stable identifier used in machine-readable reports.
    pub const fn id(self) -> &'static str {
        match self {
            Self::HitsMissesBalance => "hits-misses-balance",
            Self::BusTrafficAligned => "bus-traffic-aligned",
            Self::PrivateAccessesMatch => "private-accesses-match",
            Self::NoCoherenceTraffic => "no-coherence-traffic",
            Self::NoSharedAccesses => "no-shared-accesses",
            Self::ClassifiedWithinHits => "classified-within-hits",
            Self::OverallCyclesMax => "overall-cycles-max",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::HitsMissesBalance => "expected hits + misses == loads + stores",
            Self::BusTrafficAligned => "bus_data_traffic_bytes % block_size == 0",
            Self::PrivateAccessesMatch => "private_accesses == loads + stores",
            Self::NoCoherenceTraffic => "bus_invalidations_or_updates == 0",
            Self::NoSharedAccesses => "shared_accesses == 0",
            Self::ClassifiedWithinHits => "private_accesses + shared_accesses <= hits",
            Self::OverallCyclesMax => {
                "overall_execution_cycles == max(per_core_execution_cycles)"
            }
        }
    }
}

/// One failed invariant on one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub record: String,
    pub invariant: Invariant,
    /// Core index for per-core rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core: Option<usize>,
    /// The offending values.
    pub details: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "test failed for {}: {} ({})",
            self.record,
            self.invariant.description(),
            self.details
        )
    }
}

/// Checks `record` against the rules of `mode`.
///
/// Returns every violation found, in rule order and ascending core order.
/// An empty list means the record is valid. Per-core sequences of unequal
/// length, a single-core check of a record without exactly one core, and a
/// multi-core check of a record with fewer than two cores are structural
/// errors, not violations.
pub fn check(record: &SimRecord, mode: ValidationMode) -> Result<Vec<Violation>, SchemaError> {
    record.check_core_counts()?;
    if record.config.block_size == 0 {
        return Err(SchemaError::MalformedField {
            file: record.file.clone(),
            field: "config.block_size".to_string(),
            reason: "must be a positive integer".to_string(),
        });
    }

    let cores = record.num_cores();
    match mode {
        ValidationMode::SingleCore if cores != 1 => {
            return Err(SchemaError::NotSingleCore {
                file: record.file.clone(),
                cores,
            });
        }
        ValidationMode::MultiCore if cores < 2 => {
            return Err(SchemaError::NotMultiCore {
                file: record.file.clone(),
                cores,
            });
        }
        _ => {}
    }

    log::debug!("checking {} ({cores} cores, {mode} mode)", record.name);

    let mut violations = Vec::new();
    let mut fail = |invariant: Invariant, core: Option<usize>, details: String| {
        violations.push(Violation {
            record: record.name.clone(),
            invariant,
            core,
            details,
        });
    };

    for core in 0..cores {
        if record.core_outcomes(core) != record.core_accesses(core) {
            fail(
                Invariant::HitsMissesBalance,
                Some(core),
                format!(
                    "core {core}: hits {} + misses {} != loads {} + stores {}",
                    record.per_core_hits[core],
                    record.per_core_misses[core],
                    record.per_core_loads[core],
                    record.per_core_stores[core]
                ),
            );
        }
    }

    let block_size = record.config.block_size;
    let remainder = record.bus_data_traffic_bytes % block_size;
    if remainder != 0 {
        fail(
            Invariant::BusTrafficAligned,
            None,
            format!(
                "{} % {block_size} = {remainder}",
                record.bus_data_traffic_bytes
            ),
        );
    }

    match mode {
        ValidationMode::General => {}
        ValidationMode::SingleCore => {
            let private = record.private_accesses[0];
            if u128::from(private) != record.core_accesses(0) {
                fail(
                    Invariant::PrivateAccessesMatch,
                    Some(0),
                    format!(
                        "private_accesses {private} != loads {} + stores {}",
                        record.per_core_loads[0], record.per_core_stores[0]
                    ),
                );
            }
            if record.bus_invalidations_or_updates != 0 {
                fail(
                    Invariant::NoCoherenceTraffic,
                    None,
                    format!(
                        "bus_invalidations_or_updates = {}",
                        record.bus_invalidations_or_updates
                    ),
                );
            }
            if record.shared_accesses[0] != 0 {
                fail(
                    Invariant::NoSharedAccesses,
                    Some(0),
                    format!("shared_accesses = {}", record.shared_accesses[0]),
                );
            }
        }
        ValidationMode::MultiCore => {
            for core in 0..cores {
                let private = record.private_accesses[core];
                let shared = record.shared_accesses[core];
                let hits = record.per_core_hits[core];
                if u128::from(private) + u128::from(shared) > u128::from(hits) {
                    fail(
                        Invariant::ClassifiedWithinHits,
                        Some(core),
                        format!("core {core}: private {private} + shared {shared} > hits {hits}"),
                    );
                }
            }
            if let Some(per_core) = &record.per_core_execution_cycles {
                let slowest = per_core.iter().copied().max().unwrap_or_default();
                if record.overall_execution_cycles != slowest {
                    fail(
                        Invariant::OverallCyclesMax,
                        None,
                        format!(
                            "overall {} != slowest core {slowest}",
                            record.overall_execution_cycles
                        ),
                    );
                }
            }
        }
    }

    Ok(violations)
}

/// A diagnostic attributable to one result file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Finding {
    /// The record parsed but broke an invariant.
    Violation(Violation),
    /// The record could not be checked at all.
    Schema { record: String, error: String },
}

impl Finding {
    pub fn record(&self) -> &str {
        match self {
            Self::Violation(v) => &v.record,
            Self::Schema { record, .. } => record,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Violation(v) => v.fmt(f),
            Self::Schema { record, error } => write!(f, "test failed for {record}: {error}"),
        }
    }
}

/// Outcome of checking a whole batch of runs.
///
/// Serializes as `{ "mode", "records", "failures", "diagnostics" }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub mode: ValidationMode,
    /// Number of result files examined.
    pub records: usize,
    /// Findings in record-name order.
    pub findings: Vec<Finding>,
}

impl BatchReport {
    pub fn failures(&self) -> usize {
        self.findings.len()
    }

    pub fn is_pass(&self) -> bool {
        self.findings.is_empty()
    }

    /// Final line of the validator output.
    pub fn summary_line(&self) -> String {
        if self.is_pass() {
            "All tests passed!".to_string()
        } else {
            format!("{} tests failed!", self.failures())
        }
    }
}

impl Serialize for BatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut report = serializer.serialize_struct("BatchReport", 4)?;
        report.serialize_field("mode", &self.mode)?;
        report.serialize_field("records", &self.records)?;
        report.serialize_field("failures", &self.failures())?;
        report.serialize_field("diagnostics", &self.findings)?;
        report.end()
    }
}

/// Checks every run, continuing past records that fail to parse.
///
/// Schema failures are tallied as failures alongside invariant violations so
/// one bad file never hides problems in the rest of the batch.
pub fn check_batch(runs: &[LoadedRun], mode: ValidationMode) -> BatchReport {
    let mut ordered: Vec<&LoadedRun> = runs.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));

    let mut findings = Vec::new();
    for run in ordered {
        let outcome = run
            .record
            .as_ref()
            .map_err(Clone::clone)
            .and_then(|record| check(record, mode));

        match outcome {
            Ok(violations) => findings.extend(violations.into_iter().map(Finding::Violation)),
            Err(e) => findings.push(Finding::Schema {
                record: run.name.clone(),
                error: e.to_string(),
            }),
        }
    }

    BatchReport {
        mode,
        records: runs.len(),
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::{bench_a, record};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;

    fn invariants(violations: &[Violation]) -> Vec<Invariant> {
        violations.iter().map(|v| v.invariant).collect()
    }

    fn run(name: &str, value: &serde_json::Value) -> LoadedRun {
        let file = format!("{name}.json");
        LoadedRun {
            name: name.to_string(),
            path: PathBuf::from(&file),
            record: SimRecord::from_value(&file, value),
        }
    }

    fn four_core() -> serde_json::Value {
        json!({
            "overall_execution_cycles": 900,
            "per_core_execution_cycles": [900, 850, 700, 880],
            "per_core_loads": [10, 20, 0, 5],
            "per_core_stores": [5, 0, 0, 5],
            "per_core_hits": [12, 18, 0, 9],
            "per_core_misses": [3, 2, 0, 1],
            "bus_data_traffic_bytes": 256,
            "bus_invalidations_or_updates": 7,
            "per_core_private_accesses": [8, 10, 0, 4],
            "per_core_shared_accesses": [4, 8, 0, 5],
            "protocol": "MESI",
            "config": {"cache_size": 4096, "associativity": 2, "block_size": 32}
        })
    }

    #[test]
    fn valid_single_core_record_passes() {
        let rec = record("bench_a.json", &bench_a());
        assert_eq!(check(&rec, ValidationMode::SingleCore).unwrap(), vec![]);
        assert_eq!(check(&rec, ValidationMode::General).unwrap(), vec![]);
    }

    #[test]
    fn hits_misses_imbalance_is_reported() {
        let mut value = bench_a();
        value["per_core_hits"] = json!([10]);
        value["private_accesses"] = json!([15]);
        let rec = record("bench_b.json", &value);

        let violations = check(&rec, ValidationMode::SingleCore).unwrap();
        assert_eq!(invariants(&violations), vec![Invariant::HitsMissesBalance]);
        assert_eq!(
            violations[0].to_string(),
            "test failed for bench_b: expected hits + misses == loads + stores \
             (core 0: hits 10 + misses 3 != loads 10 + stores 5)"
        );
    }

    #[test]
    fn unaligned_bus_traffic_is_reported() {
        let mut value = bench_a();
        value["bus_data_traffic_bytes"] = json!(130);
        let rec = record("bench_c.json", &value);

        let violations = check(&rec, ValidationMode::General).unwrap();
        assert_eq!(invariants(&violations), vec![Invariant::BusTrafficAligned]);
        assert_eq!(violations[0].details, "130 % 64 = 2");
    }

    #[test]
    fn shared_access_on_single_core_is_reported() {
        let mut value = bench_a();
        value["shared_accesses"] = json!([2]);
        let rec = record("bench_d.json", &value);

        let violations = check(&rec, ValidationMode::SingleCore).unwrap();
        assert_eq!(invariants(&violations), vec![Invariant::NoSharedAccesses]);
        assert!(violations[0].to_string().contains("shared_accesses == 0"));

        // Not a rule outside single-core mode.
        assert_eq!(check(&rec, ValidationMode::General).unwrap(), vec![]);
    }

    #[test]
    fn all_single_core_violations_are_collected() {
        let mut value = bench_a();
        value["per_core_misses"] = json!([4]);
        value["bus_data_traffic_bytes"] = json!(100);
        value["bus_invalidations_or_updates"] = json!(3);
        value["private_accesses"] = json!([9]);
        value["shared_accesses"] = json!([6]);
        let rec = record("bench_e.json", &value);

        let violations = check(&rec, ValidationMode::SingleCore).unwrap();
        assert_eq!(
            invariants(&violations),
            vec![
                Invariant::HitsMissesBalance,
                Invariant::BusTrafficAligned,
                Invariant::PrivateAccessesMatch,
                Invariant::NoCoherenceTraffic,
                Invariant::NoSharedAccesses,
            ]
        );
    }

    #[test]
    fn every_core_is_checked() {
        let mut value = four_core();
        value["per_core_misses"] = json!([3, 2, 1, 2]);
        let rec = record("multi.json", &value);

        let violations = check(&rec, ValidationMode::General).unwrap();
        let cores: Vec<_> = violations.iter().map(|v| v.core).collect();
        assert_eq!(cores, vec![Some(2), Some(3)]);
    }

    #[test]
    fn single_core_mode_rejects_multi_core_record() {
        let rec = record("multi.json", &four_core());
        let err = check(&rec, ValidationMode::SingleCore).unwrap_err();
        assert_eq!(
            err,
            SchemaError::NotSingleCore {
                file: "multi.json".to_string(),
                cores: 4,
            }
        );
    }

    #[test]
    fn multi_core_rules() {
        let rec = record("multi.json", &four_core());
        assert_eq!(check(&rec, ValidationMode::MultiCore).unwrap(), vec![]);

        let mut value = four_core();
        value["per_core_shared_accesses"] = json!([4, 9, 0, 5]);
        value["overall_execution_cycles"] = json!(1000);
        let rec = record("multi.json", &value);
        let violations = check(&rec, ValidationMode::MultiCore).unwrap();
        assert_eq!(
            invariants(&violations),
            vec![Invariant::ClassifiedWithinHits, Invariant::OverallCyclesMax]
        );
        assert_eq!(violations[0].core, Some(1));
    }

    #[test]
    fn multi_core_mode_rejects_single_core_record() {
        let rec = record("bench_a.json", &bench_a());
        let err = check(&rec, ValidationMode::MultiCore).unwrap_err();
        assert_eq!(
            err,
            SchemaError::NotMultiCore {
                file: "bench_a.json".to_string(),
                cores: 1,
            }
        );
    }

    #[test]
    fn hand_built_record_is_rechecked() {
        let mut rec = record("bench_a.json", &bench_a());
        rec.per_core_hits.clear();
        let err = check(&rec, ValidationMode::General).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::CoreCountMismatch { ref field, found: 0, .. } if field == "per_core_hits"
        ));

        let mut rec = record("bench_a.json", &bench_a());
        rec.config.block_size = 0;
        let err = check(&rec, ValidationMode::General).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MalformedField { ref field, .. } if field == "config.block_size"
        ));
    }

    #[test]
    fn batch_report_json_shape() {
        let mut value = bench_a();
        value["bus_data_traffic_bytes"] = json!(130);
        let runs = vec![run("bench_c", &value), run("bench_a", &bench_a())];
        let report = check_batch(&runs, ValidationMode::SingleCore);

        let json = serde_json::to_value(&report).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["diagnostics", "failures", "mode", "records"]);
        assert_eq!(json["mode"], "single-core");
        assert_eq!(json["records"], 2);
        assert_eq!(json["failures"], 1);
        assert_eq!(json["diagnostics"][0]["kind"], "violation");
        assert_eq!(json["diagnostics"][0]["record"], "bench_c");
        assert_eq!(json["diagnostics"][0]["invariant"], "bus-traffic-aligned");
    }

    #[test]
    fn batch_continues_past_schema_errors() {
        let mut broken = bench_a();
        broken.as_object_mut().unwrap().remove("per_core_loads");
        let mut unbalanced = bench_a();
        unbalanced["per_core_hits"] = json!([1]);

        let runs = vec![
            run("zeta", &unbalanced),
            run("alpha", &broken),
            run("bench_a", &bench_a()),
        ];
        let report = check_batch(&runs, ValidationMode::SingleCore);

        assert_eq!(report.records, 3);
        assert_eq!(report.failures(), 2);
        let names: Vec<_> = report.findings.iter().map(Finding::record).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(
            report.findings[0].to_string(),
            "test failed for alpha: alpha.json: missing required field `per_core_loads`"
        );
        assert_eq!(report.summary_line(), "2 tests failed!");
    }

    #[test]
    fn batch_check_is_idempotent() {
        let mut value = bench_a();
        value["bus_data_traffic_bytes"] = json!(1);
        let runs = vec![run("b", &value), run("a", &bench_a())];

        let first = check_batch(&runs, ValidationMode::SingleCore);
        let second = check_batch(&runs, ValidationMode::SingleCore);
        assert_eq!(first, second);
        assert!(!first.is_pass());
    }

    #[test]
    fn clean_batch_passes() {
        let runs = vec![run("bench_a", &bench_a())];
        let report = check_batch(&runs, ValidationMode::SingleCore);
        assert!(report.is_pass());
        assert_eq!(report.summary_line(), "All tests passed!");
    }

    #[test]
    fn mode_display_matches_cli_names() {
        use clap::ValueEnum;
        for mode in ValidationMode::value_variants() {
            let name = mode.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(mode.to_string(), name);
        }
    }
}
