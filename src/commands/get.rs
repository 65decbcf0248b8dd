use anyhow::Result;
use colored::Colorize;

use resume_rag::SearchService;

pub fn run(service: &SearchService, id: i64, json: bool) -> Result<()> {
    let document = service.get_document(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!("{} {}", document.filename.cyan().bold(), format!("(id {})", document.id).dimmed());
    println!(
        "  {} Uploaded: {}",
        "→".dimmed(),
        document.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  {} {} chars", "→".dimmed(), document.content.chars().count());
    println!();
    println!("{}", document.content);

    Ok(())
}
