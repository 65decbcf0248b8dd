//! Match command - rank resumes against a job description

use anyhow::{bail, Context, Result};
use std::path::Path;

use resume_rag::SearchService;

use super::print_hits;

pub fn run(
    service: &SearchService,
    text: Option<&str>,
    file: Option<&Path>,
    top_k: usize,
    json: bool,
) -> Result<()> {
    let jd_text = match (text, file) {
        (Some(text), None) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job description {}", path.display()))?,
        (Some(_), Some(_)) => bail!("Pass the job description as text or --file, not both"),
        (None, None) => bail!("Job description text is required."),
    };

    let results = service.match_text(&jd_text, top_k)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "jd": jd_text.trim(),
                "results": results,
            }))?
        );
    } else {
        print_hits(&results, "job description");
    }

    Ok(())
}
