pub mod chat;
pub mod delete;
pub mod get;
pub mod index;
pub mod match_text;
pub mod search;
pub mod upload;

use colored::Colorize;
use resume_rag::SearchHit;

/// Print ranked hits the same way for search, match and chat.
pub(crate) fn print_hits(hits: &[SearchHit], query: &str) {
    if hits.is_empty() {
        println!("{} No matching resumes found for: {}", "→".dimmed(), query.cyan());
        return;
    }

    println!(
        "{} {} results for: {}",
        "→".dimmed(),
        hits.len(),
        truncate(query, 80).cyan()
    );
    println!();

    for hit in hits {
        println!(
            "{}. [{}] {} {}",
            hit.rank.to_string().bold(),
            format!("{:.3}", hit.score).dimmed(),
            hit.filename.cyan(),
            format!("(id {})", hit.resume_id).dimmed()
        );
        for citation in &hit.citations {
            println!("   {}", truncate(citation, 160));
        }
        println!();
    }
}

/// Char-aware truncation for display
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hello...");
        assert_eq!(truncate("이력서 검색", 3), "이력서...");
    }
}
