//! Search command - semantic resume search

use anyhow::Result;
use resume_rag::SearchService;

use super::print_hits;

pub fn run(service: &SearchService, query: &str, top_k: usize, json: bool) -> Result<()> {
    let results = service.search(query, top_k)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "query": query.trim(),
                "results": results,
            }))?
        );
    } else {
        print_hits(&results, query.trim());
    }

    Ok(())
}
