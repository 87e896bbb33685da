use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub mod blend;
pub mod config;
pub mod decision;
pub mod plot;
pub mod results;

pub fn init_logger() {
    tracing_subscriber::fmt::SubscriberBuilder::default()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use crate::{
        blend::blend,
        decision::aggregate_from_reader,
        results::{CachePolicy, ResultsTable},
    };

    const RESULTS: &str = "\
experiment/deployment/params/cache_policy,experiment/pipeline/params/sleep_time_msec,avg,std
2,100,55.6,2.78
2,200,111.2,2.78
3,100,5.56,0.556
3,200,5.56,0.556
4,100,27.8,1.39
4,200,27.8,1.39
5,100,6.0,0.6
5,200,50.0,0.6
";

    const DECISIONS: &str = "\
sleep_time_msec,decision
100,PROFILE
100,GET
100,PUT
100,COMPUTE
200,PROFILE
200,COMPUTE
200,COMPUTE
200,GET_SOURCE
";

    // low delay: the cache wins the vote, so the blended curve takes
    // the full-cache latency; high delay: recompute wins
    #[test]
    fn blended_curve_follows_the_votes_end_to_end() {
        let results = ResultsTable::from_reader(RESULTS.as_bytes(), "results.csv").unwrap();
        let compute = results.policy_curve(CachePolicy::Compute, 556);
        let full_cache = results.policy_curve(CachePolicy::FullCache, 556);
        let source_cache = results.policy_curve(CachePolicy::SourceCache, 556);
        let indicators = aggregate_from_reader(DECISIONS.as_bytes(), "decisions.csv").unwrap();

        let blended = blend(&indicators, &full_cache, &compute, &source_cache);
        assert_eq!(blended.sleep_times, vec![100.0, 200.0]);
        assert_eq!(
            blended.ms_per_row,
            vec![full_cache.avg_ms_per_row[0], compute.avg_ms_per_row[1]]
        );
    }
}
