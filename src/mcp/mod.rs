//! MCP Server for resume search
//!
//! Exposes upload, lookup, search, job-description matching, chat and
//! delete as tools over stdio.

mod server;

pub use server::run_mcp_server;
