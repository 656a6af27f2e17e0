use crate::index::factory::ItemIndexFactory;
use crate::index::stats::format_size;
use crate::index::types::FactoryConfig;
use crate::utils::progress::store_progress;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::info;

/// Outcome of building a store from a text file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Input lines, one index each
    pub lines: usize,
    /// Distinct indexes stored, the empty one included
    pub distinct: u32,
    /// Lines answered with an already stored index
    pub hits: u64,
    /// Bytes written
    pub bytes: u64,
}

/// Parse one line of separated values into a sorted, deduplicated set
pub fn parse_line(line: &str) -> Result<Vec<u32>> {
    let mut values = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<u32>()
                .with_context(|| format!("invalid value '{token}'"))
        })
        .collect::<Result<Vec<u32>>>()?;
    values.sort_unstable();
    values.dedup();
    Ok(values)
}

/// Build a store with one index per line of `input`
///
/// Line `n` (zero-based) is stored under the id returned for it; identical
/// lines share an id.
pub fn build_store(
    input: &Path,
    output: &Path,
    config: FactoryConfig,
) -> Result<(BuildSummary, Vec<u32>)> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let lines: Vec<&str> = text.lines().collect();

    if config.show_progress {
        println!("Building: {} ({} lines)", input.display(), lines.len());
    }

    // Parse in parallel, insert in line order so ids are reproducible
    let sets = lines
        .par_iter()
        .enumerate()
        .map(|(n, line)| parse_line(line).with_context(|| format!("line {}", n + 1)))
        .collect::<Result<Vec<_>>>()?;

    let factory = ItemIndexFactory::new(config)?;
    let pb = store_progress(
        sets.len() as u64,
        factory.config().show_progress,
        "Encoding indexes",
    );
    let mut ids = Vec::with_capacity(sets.len());
    for (n, values) in sets.iter().enumerate() {
        let id = factory
            .add_sorted(values)
            .with_context(|| format!("Failed to encode line {}", n + 1))?;
        ids.push(id);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let bytes = factory
        .flush_to_path(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let summary = BuildSummary {
        lines: lines.len(),
        distinct: factory.size()?,
        hits: factory.hit_count(),
        bytes,
    };
    info!(
        lines = summary.lines,
        distinct = summary.distinct,
        size = %format_size(bytes),
        "built store"
    );
    Ok((summary, ids))
}
