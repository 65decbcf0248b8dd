use anyhow::Result;
use colored::Colorize;

use resume_rag::SearchService;

pub fn run(service: &SearchService, id: i64, json: bool) -> Result<()> {
    let deleted = service.delete_document(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else if deleted == 0 {
        println!("{} No resume with id {}", "!".yellow().bold(), id);
    } else {
        println!("{} Deleted resume {}", "✓".green().bold(), id);
        println!(
            "  {} Index entry tombstoned; run {} to reclaim space",
            "→".dimmed(),
            "resume-rag index --compact".cyan()
        );
    }

    Ok(())
}
