//! Index command - status and offline compaction

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use resume_rag::SearchService;

/// Run index command
pub fn run(service: &SearchService, index_path: &Path, compact: bool, json: bool) -> Result<()> {
    let dropped = if compact {
        if !json {
            println!("{} Compacting vector index...", "→".dimmed());
        }
        Some(service.compact()?)
    } else {
        None
    };

    let stats = service.stats()?;
    let documents = service.document_count()?;

    // Get file size
    let file_size = std::fs::metadata(index_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "entry_count": stats.entry_count,
                "live_count": stats.live_count,
                "tombstoned": stats.entry_count - stats.live_count,
                "document_count": documents,
                "dimension": stats.dimension,
                "embedder": service.embedder_name(),
                "last_added": stats.last_added,
                "file_size_bytes": file_size,
                "compacted": dropped,
            })
        );
        return Ok(());
    }

    if let Some(dropped) = dropped {
        println!(
            "{} Removed {} tombstoned entries",
            "✓".green().bold(),
            dropped.to_string().cyan()
        );
        println!();
    }

    println!("{}", "Index Status".bold());
    println!();
    println!(
        "  {} {} resumes indexed",
        "→".dimmed(),
        stats.live_count.to_string().cyan()
    );
    let tombstoned = stats.entry_count - stats.live_count;
    if tombstoned > 0 {
        println!(
            "  {} {} deleted entries awaiting compaction",
            "→".dimmed(),
            tombstoned.to_string().yellow()
        );
    }
    println!("  {} {} documents stored", "→".dimmed(), documents);
    println!(
        "  {} Embedder: {} ({} dims)",
        "→".dimmed(),
        service.embedder_name(),
        stats.dimension.unwrap_or_default()
    );
    println!(
        "  {} Size: {:.2} KB",
        "→".dimmed(),
        file_size as f64 / 1024.0
    );
    if let Some(ts) = stats.last_added {
        println!(
            "  {} Last added: {}",
            "→".dimmed(),
            ts.format("%Y-%m-%d %H:%M:%S")
        );
    }
    if stats.live_count != documents {
        println!(
            "  {} Index and document store disagree; the store may have been edited externally",
            "!".yellow().bold()
        );
    }

    Ok(())
}
