use std::{collections::BTreeMap, fmt, fs::File, io::Read, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One observation from the caching-decision log.
#[derive(Debug, Deserialize)]
pub struct DecisionRow {
    pub sleep_time_msec: f64,
    pub decision: String,
}

/// The three decision categories the blender understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Source,
    Cache,
    Compute,
}

impl Category {
    /// Maps a raw decision label to its category. `PROFILE` rows are
    /// dropped before this runs, so it is not part of the lookup.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "GET_SOURCE" | "PUT_SOURCE" => Some(Category::Source),
            "GET" | "PUT" => Some(Category::Cache),
            "COMPUTE" => Some(Category::Compute),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Source => "source",
            Category::Cache => "cache",
            Category::Compute => "compute",
        };
        f.write_str(name)
    }
}

/// One-hot encoding of the per-bucket majority decision, one row per
/// distinct `sleep_time_msec`, sorted ascending. A category column is
/// present only if that category won at least one bucket.
#[derive(Debug)]
pub struct IndicatorTable {
    pub sleep_times: Vec<f64>,
    pub columns: BTreeMap<Category, Vec<u8>>,
}

impl IndicatorTable {
    pub fn column(&self, category: Category) -> Option<&[u8]> {
        self.columns.get(&category).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.sleep_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sleep_times.is_empty()
    }
}

pub fn aggregate_decisions(path: &Path) -> Result<IndicatorTable> {
    let file = File::open(path)
        .with_context(|| format!("failed to open caching decision file {}", path.display()))?;
    aggregate_from_reader(file, &path.display().to_string())
}

/// Turns the raw decision log into the per-bucket indicator table:
/// drop `PROFILE` rows, map labels to categories, majority-vote per
/// `sleep_time_msec` bucket, one-hot encode.
pub fn aggregate_from_reader<R: Read>(reader: R, source_name: &str) -> Result<IndicatorTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut mapped: Vec<(f64, Category)> = Vec::new();
    let mut unknown = 0usize;
    for row in rdr.deserialize() {
        let row: DecisionRow =
            row.with_context(|| format!("malformed row in {source_name}"))?;
        if row.decision == "PROFILE" {
            continue;
        }
        match Category::from_label(&row.decision) {
            Some(category) => mapped.push((row.sleep_time_msec, category)),
            None => unknown += 1,
        }
    }
    if unknown > 0 {
        warn!(
            "there are {unknown} unexpected values in the caching decision file ({source_name}); \
             dropping them, but maybe regenerate that file"
        );
    }

    // stable sort keeps log order inside each bucket, which the
    // first-seen tie-break in mode() relies on
    mapped.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut buckets: Vec<(f64, Vec<Category>)> = Vec::new();
    for (sleep, category) in mapped {
        match buckets.last_mut() {
            Some((key, votes)) if *key == sleep => votes.push(category),
            _ => buckets.push((sleep, vec![category])),
        }
    }

    let sleep_times: Vec<f64> = buckets.iter().map(|(key, _)| *key).collect();
    let majorities: Vec<Category> = buckets.iter().map(|(_, votes)| mode(votes)).collect();

    let mut columns = BTreeMap::new();
    for category in [Category::Source, Category::Cache, Category::Compute] {
        if majorities.contains(&category) {
            let column = majorities.iter().map(|m| u8::from(*m == category)).collect();
            columns.insert(category, column);
        }
    }
    Ok(IndicatorTable { sleep_times, columns })
}

/// Most frequent category in a bucket; ties go to the category seen
/// first in the log.
fn mode(votes: &[Category]) -> Category {
    let mut tally: Vec<(Category, usize)> = Vec::new();
    for vote in votes {
        match tally.iter_mut().find(|(category, _)| category == vote) {
            Some((_, count)) => *count += 1,
            None => tally.push((*vote, 1)),
        }
    }
    tally
        .into_iter()
        .fold((Category::Compute, 0), |best, (category, count)| {
            if count > best.1 {
                (category, count)
            } else {
                best
            }
        })
        .0
}
