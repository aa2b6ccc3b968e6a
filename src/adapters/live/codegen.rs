//! Live code generator using the Anthropic messages API.
//!
//! The model is asked for complete files in fenced code blocks whose
//! first line is a `# filename: path` comment; blocks are written into
//! the project workspace and reported in the change set.

use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ports::{ChangeSet, CodeGenerator, CodegenFuture, FeedbackContext};
use crate::unit::Unit;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are an autonomous software engineer. You write \
production-ready code. Output every file in a fenced code block whose first line \
is a comment naming the file, e.g. `# filename: src/main.py`. Write the full \
content of each file.";

/// Live code generator that calls the Anthropic Claude API and writes
/// the returned files into the project workspace.
pub struct AnthropicCodeGenerator {
    client: Client,
    project_root: PathBuf,
    model: String,
    max_tokens: u32,
}

impl AnthropicCodeGenerator {
    /// Creates a generator writing into `project_root` with the given
    /// model.
    #[must_use]
    pub fn new(project_root: PathBuf, model: impl Into<String>) -> Self {
        Self { client: Client::new(), project_root, model: model.into(), max_tokens: 8192 }
    }

    fn build_prompt(unit: &Unit, feedback: Option<&FeedbackContext>) -> String {
        let mut prompt = unit.description.clone();
        if let Some(feedback) = feedback {
            prompt.push_str("\n\n");
            prompt.push_str(&feedback.to_prompt());
        }
        prompt
    }
}

/// Request body sent to the Anthropic messages API.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

/// A single message in the Anthropic API request.
#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Top-level response from the Anthropic messages API.
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

/// A content block in the Anthropic response.
#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

/// Error response from the Anthropic API.
#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

/// Detail inside an Anthropic error response.
#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

impl CodeGenerator for AnthropicCodeGenerator {
    fn implement(&self, unit: &Unit, feedback: Option<&FeedbackContext>) -> CodegenFuture<'_> {
        let prompt = Self::build_prompt(unit, feedback);
        let unit_name = unit.name.clone();

        Box::pin(async move {
            let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| {
                Box::<dyn Error + Send + Sync>::from(
                    "ANTHROPIC_API_KEY environment variable not set",
                )
            })?;

            let body = AnthropicRequest {
                model: &self.model,
                max_tokens: self.max_tokens,
                system: SYSTEM_PROMPT,
                messages: vec![AnthropicMessage { role: "user", content: &prompt }],
            };

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .send()
                .await
                .map_err(|e| -> Box<dyn Error + Send + Sync> {
                    format!("Anthropic API request failed: {e}").into()
                })?;

            let status = response.status();
            let response_text =
                response.text().await.map_err(|e| -> Box<dyn Error + Send + Sync> {
                    format!("Failed to read Anthropic API response: {e}").into()
                })?;

            if !status.is_success() {
                let msg = serde_json::from_str::<AnthropicError>(&response_text)
                    .map(|e| e.error.message)
                    .unwrap_or(response_text);
                return Err(format!("Anthropic API error ({}): {msg}", status.as_u16()).into());
            }

            let api_response: AnthropicResponse = serde_json::from_str(&response_text)
                .map_err(|e| -> Box<dyn Error + Send + Sync> {
                    format!("Failed to parse Anthropic API response: {e}").into()
                })?;

            let text =
                api_response.content.into_iter().map(|block| block.text).collect::<String>();
            let files = write_file_blocks(&self.project_root, &text)?;

            Ok(ChangeSet { summary: format!("generated {unit_name}: {} file(s)", files.len()), files })
        })
    }
}

/// Extracts `# filename:`-tagged fenced code blocks and writes each to
/// the workspace. Returns the written paths.
fn write_file_blocks(
    project_root: &Path,
    text: &str,
) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
    let mut files = Vec::new();
    for block in extract_file_blocks(text) {
        let target = project_root.join(&block.filename);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
        std::fs::write(&target, &block.content)
            .map_err(|e| format!("Failed to write {}: {e}", target.display()))?;
        files.push(block.filename);
    }
    Ok(files)
}

struct FileBlock {
    filename: String,
    content: String,
}

fn extract_file_blocks(text: &str) -> Vec<FileBlock> {
    let mut blocks = Vec::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        if !line.trim_start().starts_with("```") {
            continue;
        }
        let header = lines.peek().copied().unwrap_or_default();
        let Some(filename) = parse_filename_comment(header) else {
            // Unnamed block; skip to its closing fence.
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with("```") {
                    break;
                }
            }
            continue;
        };
        lines.next();
        let mut content = String::new();
        for inner in lines.by_ref() {
            if inner.trim_start().starts_with("```") {
                break;
            }
            content.push_str(inner);
            content.push('\n');
        }
        blocks.push(FileBlock { filename, content });
    }
    blocks
}

/// Parses `# filename: path`, `## filename: path`, or `// filename:
/// path` comment headers.
fn parse_filename_comment(line: &str) -> Option<String> {
    let trimmed = line.trim().trim_start_matches(['#', '/']).trim();
    let rest = trimmed.strip_prefix("filename:")?;
    let filename = rest.trim();
    // Reject path escapes out of the workspace.
    if filename.is_empty() || filename.starts_with('/') || filename.contains("..") {
        return None;
    }
    Some(filename.to_string())
}
