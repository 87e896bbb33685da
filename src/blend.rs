use serde::Serialize;
use tracing::warn;

use crate::{
    decision::{Category, IndicatorTable},
    results::PolicyCurve,
};

/// The synthesized latency curve for the adaptive policy: at each
/// delay setting, the latency of whichever policy the decision log
/// voted for at that setting.
#[derive(Debug, Serialize)]
pub struct BlendedCurve {
    pub sleep_times: Vec<f64>,
    pub ms_per_row: Vec<f64>,
}

/// Weighted sum of the per-policy curves, weighted by the one-hot
/// indicator columns. The output length follows the full-cache curve.
///
/// Indicator buckets are joined to each curve on the `sleep_time_msec`
/// key; a category whose buckets do not line up 1:1 with its curve
/// contributes nothing and is reported with a warning.
pub fn blend(
    indicators: &IndicatorTable,
    cache: &PolicyCurve,
    compute: &PolicyCurve,
    source: &PolicyCurve,
) -> BlendedCurve {
    let len = cache.len();
    let mut ms_per_row = vec![0.0; len];
    for (category, curve) in [
        (Category::Cache, cache),
        (Category::Compute, compute),
        (Category::Source, source),
    ] {
        let Some(column) = indicators.column(category) else {
            continue;
        };
        if !aligned(indicators, column, curve, len) {
            warn!(
                "the decision indicator for '{category}' does not line up with the {} curve; \
                 skipping its contribution, please check the caching decision file",
                curve.policy.label()
            );
            continue;
        }
        for (out, (indicator, avg)) in
            ms_per_row.iter_mut().zip(column.iter().zip(&curve.avg_ms_per_row))
        {
            *out += f64::from(*indicator) * avg;
        }
    }
    BlendedCurve {
        sleep_times: cache.sleep_times.clone(),
        ms_per_row,
    }
}

/// The indicator column and the curve must both span exactly the
/// blended vector, and the decision buckets must sit at the same
/// delay values as the curve's rows.
fn aligned(indicators: &IndicatorTable, column: &[u8], curve: &PolicyCurve, len: usize) -> bool {
    column.len() == len
        && curve.len() == len
        && indicators
            .sleep_times
            .iter()
            .zip(&curve.sleep_times)
            .all(|(bucket, delay)| bucket == delay)
}
