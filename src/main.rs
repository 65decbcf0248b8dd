mod commands;
#[cfg(feature = "mcp")]
mod mcp;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use resume_rag::{Config, SearchService};

#[derive(Parser)]
#[command(name = "resume-rag")]
#[command(about = "Resume indexing with explainable semantic search", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Config file (default: ./resume-rag.yaml if present)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Data directory for the document store and index")]
    data_dir: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Debug logging")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, store and index resumes (.pdf, .docx)
    Upload {
        files: Vec<PathBuf>,
        #[arg(long, help = "Upload every resume below this directory")]
        dir: Option<PathBuf>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show a stored resume
    Get {
        id: i64,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Semantic search by free-text query
    #[command(alias = "s")]
    Search {
        query: String,
        #[arg(long, short = 'k', help = "Number of results")]
        top_k: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Rank resumes against a job description
    Match {
        text: Option<String>,
        #[arg(long, help = "Read the job description from a file")]
        file: Option<PathBuf>,
        #[arg(long, short = 'k', help = "Number of results")]
        top_k: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Conversational search over recent queries
    Chat {
        #[arg(long, short = 'k', help = "Number of results")]
        top_k: Option<usize>,
        #[arg(long, help = "JSON lines output")]
        json: bool,
    },
    /// Delete a resume and tombstone its index entry
    Delete {
        id: i64,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show index status or compact deleted entries
    Index {
        #[arg(long, help = "Rebuild the index without deleted entries")]
        compact: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    // ===== MCP Server =====
    /// Start MCP server exposing the resume tools
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show client configuration instructions")]
        install: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "resume_rag=debug" } else { "resume_rag=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout is reserved for command output and the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn open_service(config: &Config) -> Result<SearchService> {
    SearchService::open(config).with_context(|| {
        format!("Failed to open resume index in {}", config.data_dir.display())
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let top_k = |k: Option<usize>| k.unwrap_or(config.top_k);

    match cli.command {
        Commands::Upload { files, dir, json } => {
            commands::upload::run(&open_service(&config)?, &files, dir.as_deref(), json)
        }
        Commands::Get { id, json } => commands::get::run(&open_service(&config)?, id, json),
        Commands::Search { query, top_k: k, json } => {
            commands::search::run(&open_service(&config)?, &query, top_k(k), json)
        }
        Commands::Match {
            text,
            file,
            top_k: k,
            json,
        } => commands::match_text::run(
            &open_service(&config)?,
            text.as_deref(),
            file.as_deref(),
            top_k(k),
            json,
        ),
        Commands::Chat { top_k: k, json } => {
            commands::chat::run(&open_service(&config)?, &config, top_k(k), json)
        }
        Commands::Delete { id, json } => commands::delete::run(&open_service(&config)?, id, json),
        Commands::Index { compact, json } => {
            commands::index::run(&open_service(&config)?, &config.paths().index, compact, json)
        }

        // MCP Server
        #[cfg(feature = "mcp")]
        Commands::Mcp { install } => {
            if install {
                print_mcp_install_instructions();
                Ok(())
            } else {
                run_mcp_server(open_service(&config)?, &config)
            }
        }
    }
}

#[cfg(feature = "mcp")]
fn run_mcp_server(service: SearchService, config: &Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(mcp::run_mcp_server(service, config))
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions() {
    use colored::Colorize;

    let data_dir = std::env::current_dir()
        .map(|p| p.join(resume_rag::core::paths::DEFAULT_DATA_DIR))
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "/path/to/data".to_string());

    let binary_path = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "resume-rag".to_string());

    println!("{}", "MCP Server Installation Guide".bold().cyan());
    println!();
    println!("Add the following to your MCP client configuration:");
    println!();
    println!(r#"{{
  "mcpServers": {{
    "resume-search": {{
      "command": "{}",
      "args": ["mcp", "--data-dir", "{}"]
    }}
  }}
}}"#, binary_path, data_dir);
    println!();
    println!("{}", "Available tools:".bold());
    println!("  • {} - Upload a .pdf or .docx resume by path", "resume_upload".green());
    println!("  • {} - Get a stored resume by id", "resume_get".green());
    println!("  • {} - Semantic search with citations", "resume_search".green());
    println!("  • {} - Rank resumes against a job description", "resume_match".green());
    println!("  • {} - Conversational search with per-session history", "resume_chat".green());
    println!("  • {} - Forget a chat session", "resume_chat_reset".green());
    println!("  • {} - Delete a resume", "resume_delete".green());
    println!("  • {} - Index statistics", "resume_index_status".green());
}
