use std::ops::Range;

use anyhow::{anyhow, bail, Result};
use itertools::izip;
use plotters::prelude::*;
use tracing::info;

use crate::{blend::BlendedCurve, config::PlotConfig, results::PolicyCurve};

const COMPUTE_COLOR: RGBColor = RGBColor(92, 138, 168);
const SOURCE_CACHE_COLOR: RGBColor = RGBColor(145, 92, 130);
const FULL_CACHE_COLOR: RGBColor = RGBColor(135, 168, 107);
const BLENDED_COLOR: RGBColor = RGBColor(255, 165, 0);
const RAW_COLOR: RGBColor = RGBColor(255, 192, 203);
const GRID_COLOR: RGBColor = RGBColor(211, 211, 211);

fn draw_err<E: std::fmt::Display>(err: E) -> anyhow::Error {
    anyhow!("chart rendering failed: {err}")
}

/// Comparison chart: errorbar lines for the three measured policies,
/// the blended adaptive curve as a thick translucent overlay, and
/// (on request) the adaptive policy's raw measured curve.
pub fn render(
    config: &PlotConfig,
    compute: &PolicyCurve,
    source_cache: &PolicyCurve,
    cache: &PolicyCurve,
    adaptive_raw: Option<&PolicyCurve>,
    blended: &BlendedCurve,
) -> Result<()> {
    let mut measured = vec![compute, source_cache, cache];
    if let Some(raw) = adaptive_raw {
        measured.push(raw);
    }
    let (x_range, y_range) = axis_ranges(&measured, blended)?;

    let root = BitMapBackend::new(&config.output, (1000, 400)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(55)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range, y_range)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .light_line_style(GRID_COLOR.mix(0.4))
        .bold_line_style(GRID_COLOR)
        .x_desc(config.x_label.as_str())
        .y_desc(config.y_label.as_str())
        .label_style(("sans-serif", 18))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(draw_err)?;

    for (curve, color) in [
        (compute, COMPUTE_COLOR),
        (source_cache, SOURCE_CACHE_COLOR),
        (cache, FULL_CACHE_COLOR),
    ] {
        let line = curve
            .sleep_times
            .iter()
            .zip(&curve.avg_ms_per_row)
            .map(|(&x, &y)| (x, y));
        chart
            .draw_series(LineSeries::new(line, color.stroke_width(2)))
            .map_err(draw_err)?
            .label(curve.policy.label())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
            });
        chart
            .draw_series(
                izip!(&curve.sleep_times, &curve.avg_ms_per_row, &curve.std_ms_per_row)
                    .map(|(&x, &y, &s)| {
                        ErrorBar::new_vertical(x, y - s, y, y + s, color.filled(), 6)
                    }),
            )
            .map_err(draw_err)?;
    }

    let blended_line = blended
        .sleep_times
        .iter()
        .zip(&blended.ms_per_row)
        .map(|(&x, &y)| (x, y));
    chart
        .draw_series(
            LineSeries::new(blended_line, BLENDED_COLOR.mix(0.6).filled().stroke_width(8))
                .point_size(5),
        )
        .map_err(draw_err)?
        .label("Adaptive cache")
        .legend(|(x, y)| {
            PathElement::new(vec![(x, y), (x + 16, y)], BLENDED_COLOR.stroke_width(4))
        });

    if let Some(raw) = adaptive_raw {
        let line = raw
            .sleep_times
            .iter()
            .zip(&raw.avg_ms_per_row)
            .map(|(&x, &y)| (x, y));
        chart
            .draw_series(
                LineSeries::new(line, RAW_COLOR.mix(0.6).filled().stroke_width(8)).point_size(5),
            )
            .map_err(draw_err)?
            .label(raw.policy.label())
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], RAW_COLOR.stroke_width(4))
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .border_style(TRANSPARENT)
        .label_font(("sans-serif", 18))
        .draw()
        .map_err(draw_err)?;
    root.present().map_err(draw_err)?;
    info!("wrote chart to {}", config.output.display());
    Ok(())
}

fn axis_ranges(
    measured: &[&PolicyCurve],
    blended: &BlendedCurve,
) -> Result<(Range<f64>, Range<f64>)> {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let xs = measured
        .iter()
        .flat_map(|curve| curve.sleep_times.iter())
        .chain(blended.sleep_times.iter());
    for &x in xs {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
    }
    let mut y_max = 0.0f64;
    for curve in measured {
        for (&avg, &std) in curve.avg_ms_per_row.iter().zip(&curve.std_ms_per_row) {
            y_max = y_max.max(avg + std);
        }
    }
    for &y in &blended.ms_per_row {
        y_max = y_max.max(y);
    }
    if !x_min.is_finite() || y_max <= 0.0 {
        bail!("nothing to plot: all curves are empty");
    }
    if x_min == x_max {
        x_min -= 1.0;
        x_max += 1.0;
    }
    Ok((x_min..x_max, 0.0..y_max * 1.1))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::results::CachePolicy;

    fn curve(policy: CachePolicy, avg: &[f64]) -> PolicyCurve {
        PolicyCurve {
            policy,
            sleep_times: (0..avg.len()).map(|i| 100.0 * (i + 1) as f64).collect(),
            avg_ms_per_row: avg.to_vec(),
            std_ms_per_row: vec![1.0; avg.len()],
        }
    }

    #[test]
    fn renders_a_png_at_the_configured_path() {
        let output = std::env::temp_dir().join(format!(
            "autocache-plot-render-test-{}.png",
            std::process::id()
        ));
        let config = PlotConfig {
            output: output.clone(),
            ..PlotConfig::default()
        };
        let compute = curve(CachePolicy::Compute, &[50.0, 70.0]);
        let source = curve(CachePolicy::SourceCache, &[20.0, 30.0]);
        let cache = curve(CachePolicy::FullCache, &[5.0, 7.0]);
        let blended = BlendedCurve {
            sleep_times: cache.sleep_times.clone(),
            ms_per_row: vec![5.0, 70.0],
        };
        render(&config, &compute, &source, &cache, None, &blended).unwrap();
        assert!(output.exists());
        let _ = fs::remove_file(&output);
    }

    #[test]
    fn empty_input_is_an_error_not_a_panic() {
        let config = PlotConfig::default();
        let compute = curve(CachePolicy::Compute, &[]);
        let source = curve(CachePolicy::SourceCache, &[]);
        let cache = curve(CachePolicy::FullCache, &[]);
        let blended = BlendedCurve {
            sleep_times: vec![],
            ms_per_row: vec![],
        };
        assert!(render(&config, &compute, &source, &cache, None, &blended).is_err());
    }
}
