//! Upload command - extract, store and index resumes

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use resume_rag::core::extract::DocumentKind;
use resume_rag::{IngestSummary, SearchService};

use super::truncate;

#[derive(Debug, Default)]
struct UploadStats {
    indexed: Vec<IngestSummary>,
    failed: Vec<(PathBuf, String)>,
}

/// Collect `.pdf` and `.docx` files below `dir`, sorted for stable ids.
fn collect_resumes(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| DocumentKind::from_filename(n).is_ok())
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

pub fn run(service: &SearchService, files: &[PathBuf], dir: Option<&Path>, json: bool) -> Result<()> {
    let mut targets = files.to_vec();
    if let Some(dir) = dir {
        targets.extend(collect_resumes(dir));
    }

    if targets.is_empty() {
        anyhow::bail!("No files to upload. Pass file paths or --dir");
    }

    let mut stats = UploadStats::default();
    for path in &targets {
        match upload_one(service, path) {
            Ok(summary) => {
                if !json {
                    println!(
                        "{} {} {} ({} chars)",
                        "✓".green().bold(),
                        summary.filename.cyan(),
                        format!("id {}", summary.id).dimmed(),
                        summary.chars
                    );
                }
                stats.indexed.push(summary);
            }
            Err(e) => {
                if !json {
                    eprintln!("{} {}: {:#}", "✗".red(), path.display(), e);
                }
                stats.failed.push((path.clone(), format!("{:#}", e)));
            }
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "uploaded": stats.indexed,
                "failed": stats
                    .failed
                    .iter()
                    .map(|(p, e)| serde_json::json!({ "path": p.display().to_string(), "error": e }))
                    .collect::<Vec<_>>(),
            }))?
        );
    } else {
        if let [single] = stats.indexed.as_slice() {
            println!();
            println!("{}", "Preview".bold());
            println!("  {}", truncate(&single.cleaned_preview, 300).dimmed());
        }
        println!();
        println!(
            "{} Uploaded {} resumes",
            "→".dimmed(),
            stats.indexed.len().to_string().cyan()
        );
        if !stats.failed.is_empty() {
            println!("  {} {} failed", "✗".red(), stats.failed.len());
        }
    }

    if !stats.failed.is_empty() && stats.indexed.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

fn upload_one(service: &SearchService, path: &Path) -> Result<IngestSummary> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("uploaded_file")
        .to_string();
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(service.ingest_file(&filename, &bytes)?)
}
