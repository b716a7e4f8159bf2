//! Fixed-width comparison table across runs.
//!
//! Rows are sorted by record name so the output depends only on the inputs,
//! never on directory enumeration order.

use crate::stats::RunMetrics;
use crate::types::SimRecord;

const NAME_WIDTH: usize = 24;
const RULE_WIDTH: usize = 100;

/// Column titles.
pub fn header() -> String {
    format!(
        "{:NAME_WIDTH$} {:>8} {:>8} {:>10} {:>10} {:>8} {:>12} {:>12}",
        "Benchmark", "Loads", "Stores", "Hits", "Misses", "HitRate", "ExecCycles", "BusBytes"
    )
}

/// Horizontal rule under the header.
pub fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

/// Hit rate as a percentage with two decimals, e.g. `80.00%`.
pub fn format_hit_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

pub fn row(metrics: &RunMetrics) -> String {
    format!(
        "{:NAME_WIDTH$} {:>8} {:>8} {:>10} {:>10} {:>8} {:>12} {:>12}",
        metrics.name,
        metrics.loads,
        metrics.stores,
        metrics.hits,
        metrics.misses,
        format_hit_rate(metrics.hit_rate()),
        metrics.exec_cycles,
        metrics.bus_bytes
    )
}

/// Renders header, rule and one row per record, sorted by name.
pub fn render_table<'a>(records: impl IntoIterator<Item = &'a SimRecord>) -> String {
    let mut metrics: Vec<RunMetrics> = records.into_iter().map(RunMetrics::from_record).collect();
    metrics.sort_by(|a, b| a.name.cmp(&b.name));

    let mut lines = vec![header(), rule()];
    lines.extend(metrics.iter().map(row));
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::{bench_a, record};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn header_layout() {
        assert_eq!(
            header(),
            "Benchmark                   Loads   Stores       Hits     Misses  HitRate   ExecCycles     BusBytes"
        );
        assert_eq!(rule().len(), 100);
    }

    #[test]
    fn row_layout() {
        let metrics = RunMetrics::from_record(&record("bench_a.json", &bench_a()));
        assert_eq!(
            row(&metrics),
            "bench_a                        10        5         12          3   80.00%         1200          128"
        );
    }

    #[test]
    fn zero_accesses_render_as_zero_percent() {
        let mut value = bench_a();
        value["per_core_hits"] = json!([0]);
        value["per_core_misses"] = json!([0]);
        let metrics = RunMetrics::from_record(&record("bench_a.json", &value));
        assert!(row(&metrics).contains("   0.00% "));
    }

    #[test]
    fn rows_sorted_by_name() {
        let b = record("b_run.json", &bench_a());
        let a = record("a_run.json", &bench_a());
        let c = record("c_run.json", &bench_a());

        let table = render_table([&b, &c, &a]);
        let names: Vec<_> = table
            .lines()
            .skip(2)
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        assert_eq!(names, vec!["a_run", "b_run", "c_run"]);
        assert_eq!(table, render_table([&c, &a, &b]));
        assert_eq!(table.lines().count(), 5);
        assert!(table.ends_with("128\n"));
    }
}
