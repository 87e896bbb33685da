use std::{fs::File, io::Read, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::Deserialize;
use tracing::warn;

/// Fixed deployment policy codes from the experiment harness. Code 1
/// (no caching layer at all) exists in the harness but is never
/// plotted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Compute,
    FullCache,
    SourceCache,
    Adaptive,
}

impl CachePolicy {
    pub fn code(self) -> i64 {
        match self {
            CachePolicy::Compute => 2,
            CachePolicy::FullCache => 3,
            CachePolicy::SourceCache => 4,
            CachePolicy::Adaptive => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CachePolicy::Compute => "Compute",
            CachePolicy::FullCache => "Full Cache",
            CachePolicy::SourceCache => "Source cache",
            CachePolicy::Adaptive => "Adaptive (raw)",
        }
    }
}

/// One run from the aggregated results CSV. `avg` and `std` are the
/// per-run latency statistics in the table's native unit.
#[derive(Debug, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "experiment/deployment/params/cache_policy")]
    pub cache_policy: i64,
    #[serde(rename = "experiment/pipeline/params/sleep_time_msec")]
    pub sleep_time_msec: f64,
    pub avg: f64,
    pub std: f64,
}

#[derive(Debug)]
pub struct ResultsTable {
    rows: Vec<ResultRow>,
}

/// A single policy's latency curve, sorted ascending by injected
/// delay and normalized to milliseconds per row.
#[derive(Debug)]
pub struct PolicyCurve {
    pub policy: CachePolicy,
    pub sleep_times: Vec<f64>,
    pub avg_ms_per_row: Vec<f64>,
    pub std_ms_per_row: Vec<f64>,
}

impl PolicyCurve {
    pub fn len(&self) -> usize {
        self.sleep_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sleep_times.is_empty()
    }
}

impl ResultsTable {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open source data file {}", path.display()))?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let rows = rdr
            .deserialize()
            .map(|row| row.with_context(|| format!("malformed row in {source_name}")))
            .collect::<Result<Vec<ResultRow>>>()?;
        Ok(Self { rows })
    }

    /// Slices out one policy's runs and converts raw per-run averages
    /// to milliseconds per row: `1000 * avg / num_rows`.
    pub fn policy_curve(&self, policy: CachePolicy, num_rows: u64) -> PolicyCurve {
        let num_rows = num_rows as f64;
        let mut curve = PolicyCurve {
            policy,
            sleep_times: Vec::new(),
            avg_ms_per_row: Vec::new(),
            std_ms_per_row: Vec::new(),
        };
        for row in self
            .rows
            .iter()
            .filter(|row| row.cache_policy == policy.code())
            .sorted_by(|a, b| a.sleep_time_msec.total_cmp(&b.sleep_time_msec))
        {
            curve.sleep_times.push(row.sleep_time_msec);
            curve.avg_ms_per_row.push(1000.0 * row.avg / num_rows);
            curve.std_ms_per_row.push(1000.0 * row.std / num_rows);
        }
        if curve.is_empty() {
            warn!("no rows with cache_policy = {} in the source data", policy.code());
        }
        curve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
experiment/deployment/params/cache_policy,experiment/pipeline/params/sleep_time_msec,avg,std
2,200,556000,27.8
2,100,278000,13.9
3,100,111.2,5.56
4,100,222.4,11.12
5,100,150.0,7.5
";

    fn table() -> ResultsTable {
        ResultsTable::from_reader(CSV.as_bytes(), "test.csv").unwrap()
    }

    #[test]
    fn normalizes_to_ms_per_row() {
        // num_rows = 556, avg = 556000 -> 1000 * 556000 / 556
        let curve = table().policy_curve(CachePolicy::Compute, 556);
        assert_eq!(curve.avg_ms_per_row[1], 1_000_000.0);
        assert_eq!(curve.avg_ms_per_row[0], 500_000.0);
        assert_eq!(curve.std_ms_per_row[1], 1000.0 * 27.8 / 556.0);
    }

    #[test]
    fn slices_by_policy_code_and_sorts_by_delay() {
        let curve = table().policy_curve(CachePolicy::Compute, 556);
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.sleep_times, vec![100.0, 200.0]);

        for policy in [CachePolicy::FullCache, CachePolicy::SourceCache, CachePolicy::Adaptive] {
            let curve = table().policy_curve(policy, 556);
            assert_eq!(curve.len(), 1, "one row expected for {:?}", policy);
        }
    }

    #[test]
    fn missing_policy_yields_empty_curve() {
        let empty = ResultsTable::from_reader(
            "experiment/deployment/params/cache_policy,experiment/pipeline/params/sleep_time_msec,avg,std\n"
                .as_bytes(),
            "empty.csv",
        )
        .unwrap();
        let curve = empty.policy_curve(CachePolicy::Compute, 556);
        assert!(curve.is_empty());
    }
}
