use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Rows per batch at batch size 900; batch size 600 runs use 834.
pub const DEFAULT_NUM_ROWS: u64 = 556;

/// Plot-time knobs. All fields have defaults, so the yaml file may
/// override any subset of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotConfig {
    pub num_rows: u64,
    pub output: PathBuf,
    pub x_label: String,
    pub y_label: String,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            num_rows: DEFAULT_NUM_ROWS,
            output: PathBuf::from("./time_per_row_highlight.png"),
            x_label: "Per-batch data processing time injection (msec)".to_string(),
            y_label: "Total time per batch (msec)".to_string(),
        }
    }
}

impl PlotConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_experiment_setup() {
        let config = PlotConfig::default();
        assert_eq!(config.num_rows, 556);
        assert_eq!(config.output, PathBuf::from("./time_per_row_highlight.png"));
    }

    #[test]
    fn yaml_overrides_a_subset_of_fields() {
        let config: PlotConfig =
            serde_yaml::from_str("num_rows: 834\noutput: ./out.png\n").unwrap();
        assert_eq!(config.num_rows, 834);
        assert_eq!(config.output, PathBuf::from("./out.png"));
        assert_eq!(config.x_label, PlotConfig::default().x_label);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<PlotConfig>("nmu_rows: 5\n").is_err());
    }
}
