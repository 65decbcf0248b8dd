//! Resume MCP Server implementation

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use resume_rag::{Config, ErrorKind, RagError, SearchService, SessionRegistry};

/// Upper bound on requested results
const MAX_TOP_K: usize = 100;
const DEFAULT_SESSION: &str = "default";

/// Parameters for resume_upload tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UploadParams {
    /// Path to a .pdf or .docx file readable by the server
    #[schemars(description = "Path to a .pdf or .docx resume on the server's filesystem")]
    pub path: String,
}

/// Parameters for tools addressing one resume
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResumeIdParams {
    #[schemars(description = "Resume id returned by resume_upload or a search")]
    pub id: i64,
}

/// Parameters for resume_search tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Free-text query (e.g., "python backend team lead")
    #[schemars(description = "Free-text search query")]
    pub query: String,
    #[schemars(description = "Maximum number of results (default: 5)")]
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Parameters for resume_match tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MatchParams {
    #[schemars(description = "Job description text to match resumes against")]
    pub jd_text: String,
    #[schemars(description = "Maximum number of results (default: 5)")]
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Parameters for resume_chat tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChatParams {
    #[schemars(description = "Next message of the conversation")]
    pub query: String,
    #[schemars(description = "Maximum number of results (default: 5)")]
    #[serde(default)]
    pub top_k: Option<usize>,
    #[schemars(description = "Conversation id; history is kept per session (default: \"default\")")]
    #[serde(default)]
    pub session: Option<String>,
}

/// Parameters for resume_chat_reset tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResetParams {
    #[schemars(description = "Conversation id to forget (default: \"default\")")]
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchResponseJson<'a> {
    query: &'a str,
    results: Vec<resume_rag::SearchHit>,
}

/// Resume MCP Service
#[derive(Clone)]
pub struct ResumeService {
    search: Arc<SearchService>,
    sessions: Arc<SessionRegistry>,
    default_top_k: usize,
    tool_router: ToolRouter<Self>,
}

impl ResumeService {
    pub fn new(search: Arc<SearchService>, config: &Config) -> Self {
        Self {
            search,
            sessions: Arc::new(SessionRegistry::new(config.context_turns, config.max_history)),
            default_top_k: config.top_k,
            tool_router: Self::tool_router(),
        }
    }

    fn top_k(&self, requested: Option<usize>) -> usize {
        clamp_top_k(requested, self.default_top_k)
    }
}

#[tool_router]
impl ResumeService {
    /// Upload a resume file
    #[tool(description = "Extract text from a .pdf or .docx resume, store it and add it to the search index. Returns id, filename, character count and a cleaned preview.")]
    async fn resume_upload(
        &self,
        params: Parameters<UploadParams>,
    ) -> Result<CallToolResult, McpError> {
        let path = Path::new(&params.0.path);
        let bytes = std::fs::read(path).map_err(|e| {
            McpError::invalid_params(format!("Cannot read {}: {}", path.display(), e), None)
        })?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("uploaded_file");

        let summary = self
            .search
            .ingest_file(filename, &bytes)
            .map_err(to_mcp_error)?;

        json_result(&summary)
    }

    /// Get a stored resume
    #[tool(description = "Get the full cleaned text and upload metadata of a resume by id.")]
    async fn resume_get(
        &self,
        params: Parameters<ResumeIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let document = self
            .search
            .get_document(params.0.id)
            .map_err(to_mcp_error)?;

        json_result(&document)
    }

    /// Semantic search over resumes
    #[tool(description = "Search resumes by semantic similarity. Each result has a rank, an L2 distance score (lower is closer), the resume id and filename, and citation sentences from the resume.")]
    async fn resume_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let top_k = self.top_k(params.0.top_k);
        let results = self
            .search
            .search(&params.0.query, top_k)
            .map_err(to_mcp_error)?;

        json_result(&SearchResponseJson {
            query: params.0.query.trim(),
            results,
        })
    }

    /// Match resumes against a job description
    #[tool(description = "Rank resumes against a job description text. Same result shape as resume_search.")]
    async fn resume_match(
        &self,
        params: Parameters<MatchParams>,
    ) -> Result<CallToolResult, McpError> {
        let top_k = self.top_k(params.0.top_k);
        let results = self
            .search
            .match_text(&params.0.jd_text, top_k)
            .map_err(to_mcp_error)?;

        json_result(&serde_json::json!({
            "jd": params.0.jd_text.trim(),
            "results": results,
        }))
    }

    /// Conversational search
    #[tool(description = "Conversational resume search. The server keeps the history of each session and searches the last few messages together. Returns the conversation, the context string that was searched, and the results.")]
    async fn resume_chat(
        &self,
        params: Parameters<ChatParams>,
    ) -> Result<CallToolResult, McpError> {
        let top_k = self.top_k(params.0.top_k);
        let session = session_id(params.0.session.as_deref());

        let response = self
            .sessions
            .with_session(session, |window| {
                self.search
                    .conversational_search(window, &params.0.query, top_k)
            })
            .map_err(to_mcp_error)?;

        json_result(&response)
    }

    /// Reset a chat session
    #[tool(description = "Forget the conversation history of a chat session.")]
    async fn resume_chat_reset(
        &self,
        params: Parameters<ResetParams>,
    ) -> Result<CallToolResult, McpError> {
        let session = session_id(params.0.session.as_deref());
        let existed = self.sessions.reset(session);

        json_result(&serde_json::json!({
            "session": session,
            "reset": existed,
        }))
    }

    /// Delete a resume
    #[tool(description = "Delete a resume by id. It disappears from search results immediately. Returns the number of deleted resumes (0 if the id is unknown).")]
    async fn resume_delete(
        &self,
        params: Parameters<ResumeIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let deleted = self
            .search
            .delete_document(params.0.id)
            .map_err(to_mcp_error)?;

        json_result(&serde_json::json!({ "deleted": deleted }))
    }

    /// Index statistics
    #[tool(description = "Get resume index statistics: indexed and deleted entries, stored documents, embedder and dimension.")]
    async fn resume_index_status(&self) -> Result<CallToolResult, McpError> {
        let stats = self.search.stats().map_err(to_mcp_error)?;
        let documents = self.search.document_count().map_err(to_mcp_error)?;

        json_result(&serde_json::json!({
            "entry_count": stats.entry_count,
            "live_count": stats.live_count,
            "document_count": documents,
            "dimension": stats.dimension,
            "embedder": self.search.embedder_name(),
            "last_added": stats.last_added,
            "active_sessions": self.sessions.session_count(),
        }))
    }
}

#[tool_handler]
impl ServerHandler for ResumeService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Resume search MCP Server. Upload resumes, then search or match them against job descriptions; results cite the sentences that matched.".to_string()
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Default when absent, capped at `MAX_TOP_K`. Zero yields no results.
fn clamp_top_k(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).min(MAX_TOP_K)
}

fn session_id(session: Option<&str>) -> &str {
    match session.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => DEFAULT_SESSION,
    }
}

fn to_mcp_error(e: RagError) -> McpError {
    match e.kind() {
        ErrorKind::Validation | ErrorKind::Extraction | ErrorKind::NotFound => {
            McpError::invalid_params(e.to_string(), None)
        }
        ErrorKind::Persistence => McpError::internal_error(e.to_string(), None),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let output = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("JSON serialization failed: {}", e), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

/// Run the MCP server
pub async fn run_mcp_server(search: SearchService, config: &Config) -> Result<()> {
    use tokio::io::{stdin, stdout};

    info!(data_dir = %config.data_dir.display(), "Starting MCP server");
    let search = Arc::new(search);
    let service = ResumeService::new(Arc::clone(&search), config);
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    search.flush()?;
    info!("MCP server stopped, index flushed");

    Ok(())
}
