//! Index statistics for `docsearch stats`.

use anyhow::Result;

use crate::service::DocumentSearchService;

/// Print totals, per-source counts, and the index file size.
pub async fn run_stats(service: &DocumentSearchService, json: bool) -> Result<()> {
    let stats = service.statistics().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let db_path = service.engine().db_path();
    let db_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    println!("Index:       {}", db_path.display());
    println!("Size:        {}", format_bytes(db_size));
    println!("Documents:   {}", stats.total_documents);

    if !stats.documents_by_source.is_empty() {
        println!();
        println!("  {:<24} {:>8}", "SOURCE", "DOCS");
        println!("  {}", "-".repeat(33));
        for (source, count) in &stats.documents_by_source {
            println!("  {:<24} {:>8}", source, count);
        }
    }

    println!();
    println!("Configured sources: {}", stats.sources.join(", "));

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
