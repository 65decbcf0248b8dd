//! Chat command - conversational resume search
//!
//! Each line is appended to the conversation; the last few turns are
//! searched together. `/history`, `/reset` and `/quit` are handled locally.

use anyhow::Result;
use colored::Colorize;
use std::io::{self, BufRead, Write};

use resume_rag::{ContextWindow, ConversationResponse, Config, SearchService};

pub fn run(service: &SearchService, config: &Config, top_k: usize, json: bool) -> Result<()> {
    let mut window = ContextWindow::new(config.context_turns, config.max_history);

    if !json {
        println!("{}", "Resume Chat".bold().cyan());
        println!(
            "{}",
            "Ask something about resumes. /history, /reset, /quit".dimmed()
        );
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if !json {
            print!("{} ", ">".green().bold());
            io::stdout().flush()?;
        }

        let Some(line) = lines.next() else { break };
        let line = line?;
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                window.clear();
                if !json {
                    println!("{} Conversation cleared", "→".dimmed());
                }
                continue;
            }
            "/history" => {
                for (i, query) in window.history().iter().enumerate() {
                    println!("  {}. {}", i + 1, query);
                }
                continue;
            }
            _ => {}
        }

        match service.conversational_search(&mut window, input, top_k) {
            Ok(response) if json => println!("{}", serde_json::to_string(&response)?),
            Ok(response) => print_response(&response),
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }

    Ok(())
}

fn print_response(response: &ConversationResponse) {
    if response.context != response.latest_query {
        println!("{} {}", "context:".dimmed(), response.context.dimmed());
    }

    if response.results.is_empty() {
        println!("No matching resumes found.");
        println!();
        return;
    }

    let blocks: Vec<String> = response
        .results
        .iter()
        .map(|r| {
            format!(
                "📄 {} (Rank {})\n   Snippet: {}",
                r.filename.cyan(),
                r.rank,
                r.citations.join(" | ")
            )
        })
        .collect();
    println!("{}", blocks.join("\n\n"));
    println!();
}
