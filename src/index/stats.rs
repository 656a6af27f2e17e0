use crate::index::store::ItemIndexStore;
use anyhow::{Context, Result};
use std::path::Path;

/// Display store statistics
pub fn show_stats(path: &Path, json: bool) -> Result<()> {
    let store = ItemIndexStore::open(path)
        .with_context(|| format!("Failed to open store {}", path.display()))?;
    let stats = store.stats().context("Failed to decode store")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Store Statistics");
    println!("================");
    println!();
    println!("Path:             {}", path.display());
    println!("Format version:   {}", stats.version);
    println!("Index type:       {}", stats.index_type);
    println!("Index count:      {}", stats.index_count);
    println!("Total elements:   {}", stats.total_elements);
    println!("Largest index:    {}", stats.largest_index);
    println!("Data size:        {}", format_size(stats.data_bytes));
    println!("File size:        {}", format_size(stats.total_bytes));

    println!();
    println!("Indexes by codec:");
    println!(
        "  {:10} {:>10} {:>14} {:>12} {:>8}",
        "type", "count", "elements", "bytes", "bpn"
    );
    for (ty, entry) in &stats.by_type {
        println!(
            "  {:10} {:>10} {:>14} {:>12} {:>8.2}",
            ty.name(),
            entry.count,
            entry.elements,
            entry.bytes,
            entry.bpn()
        );
    }

    Ok(())
}

/// Format byte size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
