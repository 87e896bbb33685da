use std::{fs::File, io::BufWriter, path::Path, path::PathBuf, process};

use anyhow::{Context, Result};
use autocache_plot::{
    blend::blend,
    config::PlotConfig,
    decision::aggregate_decisions,
    init_logger, plot,
    results::{CachePolicy, ResultsTable},
};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(about = "Plot effective latency of the adaptive caching policy against injected delay")]
struct Cli {
    /// The csv file for the source data to plot.
    #[arg(long)]
    data: Option<PathBuf>,
    /// The csv file for the caching decision log, as generated by the
    /// decision extraction script.
    #[arg(long = "caching_decision")]
    caching_decision: Option<PathBuf>,
    /// The yaml config file (if any).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also draw the adaptive policy's raw measured curve.
    #[arg(long)]
    show_raw: bool,
    /// Write the blended curve to this path as json.
    #[arg(long)]
    dump: Option<PathBuf>,
}

fn main() {
    init_logger();
    let cli = Cli::parse();
    let Some(data) = cli.data else {
        println!("Please supply a filename for the source data.");
        process::exit(1);
    };
    let Some(caching_decision) = cli.caching_decision else {
        println!("Please supply a filename for the caching decision data.");
        process::exit(1);
    };
    if let Err(err) = run(
        &data,
        &caching_decision,
        cli.config.as_deref(),
        cli.show_raw,
        cli.dump.as_deref(),
    ) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run(
    data: &Path,
    caching_decision: &Path,
    config: Option<&Path>,
    show_raw: bool,
    dump: Option<&Path>,
) -> Result<()> {
    let config = PlotConfig::load(config)?;
    let results = ResultsTable::load(data)?;
    let compute = results.policy_curve(CachePolicy::Compute, config.num_rows);
    let full_cache = results.policy_curve(CachePolicy::FullCache, config.num_rows);
    let source_cache = results.policy_curve(CachePolicy::SourceCache, config.num_rows);
    let adaptive_raw =
        show_raw.then(|| results.policy_curve(CachePolicy::Adaptive, config.num_rows));

    let indicators = aggregate_decisions(caching_decision)?;
    info!(
        "aggregated {} decision buckets from {}",
        indicators.len(),
        caching_decision.display()
    );
    let blended = blend(&indicators, &full_cache, &compute, &source_cache);

    if let Some(dump) = dump {
        let writer = BufWriter::new(
            File::create(dump)
                .with_context(|| format!("failed to create dump file {}", dump.display()))?,
        );
        serde_json::to_writer_pretty(writer, &blended)
            .with_context(|| format!("failed to write dump file {}", dump.display()))?;
        info!("wrote blended curve to {}", dump.display());
    }

    plot::render(
        &config,
        &compute,
        &source_cache,
        &full_cache,
        adaptive_raw.as_ref(),
        &blended,
    )?;
    println!("plot saved at {}", config.output.display());
    Ok(())
}
