use std::time::Duration;

use collector_logging::{collector_debug, collector_warn};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::structured::{structure_content_schema, structured_to_markdown, StructuredDocument};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are an AI assistant that refines and structures webpage content \
     based on user prompts. Your task is to modify the given markdown content according to the \
     user's instructions.";

#[derive(Debug, Clone)]
pub struct RefineSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl RefineSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum RefineError {
    #[error("authentication failed: the API key was rejected")]
    Auth,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("LLM service error (status {status}): {message}")]
    RateOrServer { status: u16, message: String },
    #[error("the response carried no structured payload and no content")]
    MalformedResponse,
}

/// Best-effort spinner signals delivered to the tab(s) involved while a
/// refinement call is outstanding. Delivery failure is never a pipeline
/// error.
pub trait LoadingSink: Send + Sync {
    fn show_loading(&self);
    fn hide_loading(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLoadingSink;

impl LoadingSink for NoopLoadingSink {
    fn show_loading(&self) {}
    fn hide_loading(&self) {}
}

#[async_trait::async_trait]
pub trait Refiner: Send + Sync {
    /// Restructure `markdown` according to the natural-language `prompt`.
    /// Succeeds with refined markdown or fails with a categorized error; the
    /// caller decides whether to fall back to the unrefined content.
    async fn refine(
        &self,
        markdown: &str,
        prompt: &str,
        loading: &dyn LoadingSink,
    ) -> Result<String, RefineError>;
}

/// Client for an OpenAI-compatible chat-completions endpoint. The request
/// forces the `structure_content` function via `tools`/`tool_choice`; the
/// structured arguments are converted back to markdown locally.
#[derive(Debug, Clone)]
pub struct OpenAiRefiner {
    client: reqwest::Client,
    settings: RefineSettings,
}

impl OpenAiRefiner {
    pub fn new(settings: RefineSettings) -> Result<Self, RefineError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| RefineError::Connection(err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn request_body(&self, markdown: &str, prompt: &str) -> serde_json::Value {
        json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Refine the following markdown content based on this prompt: \"{prompt}\"\n\nContent:\n{markdown}"
                    )
                }
            ],
            "tools": [
                {
                    "type": "function",
                    "function": {
                        "name": "structure_content",
                        "description": "Structure the refined content",
                        "parameters": structure_content_schema()
                    }
                }
            ],
            "tool_choice": {
                "type": "function",
                "function": { "name": "structure_content" }
            }
        })
    }
}

#[async_trait::async_trait]
impl Refiner for OpenAiRefiner {
    async fn refine(
        &self,
        markdown: &str,
        prompt: &str,
        loading: &dyn LoadingSink,
    ) -> Result<String, RefineError> {
        collector_debug!(
            "refining markdown ({} chars) with model {}",
            markdown.len(),
            self.settings.model
        );
        loading.show_loading();
        let result = self.call(markdown, prompt).await;
        loading.hide_loading();
        result
    }
}

impl OpenAiRefiner {
    async fn call(&self, markdown: &str, prompt: &str) -> Result<String, RefineError> {
        let response = self
            .client
            .post(&self.settings.base_url)
            .bearer_auth(&self.settings.api_key)
            .json(&self.request_body(markdown, prompt))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(RefineError::Auth);
        }
        if !status.is_success() {
            let message = read_error_message(response).await;
            return Err(RefineError::RateOrServer {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|_| RefineError::MalformedResponse)?;
        extract_markdown(parsed)
    }
}

fn map_transport_error(err: reqwest::Error) -> RefineError {
    if err.is_timeout() {
        return RefineError::Connection("request timed out".to_string());
    }
    RefineError::Connection(err.to_string())
}

/// Pull a human-readable message out of a non-2xx body; the OpenAI layout
/// (`error.message`) is preferred, then a bare `message`, then raw text.
async fn read_error_message(response: reqwest::Response) -> String {
    let status = response.status().to_string();
    let Ok(text) = response.text().await else {
        return status;
    };
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        if let Some(message) = value
            .pointer("/error/message")
            .or_else(|| value.pointer("/message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }
    if text.is_empty() {
        status
    } else {
        text.chars().take(200).collect()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize, Default)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

/// Structured tool call preferred, legacy function call next, raw message
/// content as a last resort. Nothing usable at all is a malformed response.
fn extract_markdown(response: ChatResponse) -> Result<String, RefineError> {
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(RefineError::MalformedResponse);
    };
    let message = choice.message;

    if let Some(call) = message
        .tool_calls
        .and_then(|calls| calls.into_iter().next())
        .map(|call| call.function)
        .or(message.function_call)
    {
        if call.name == "structure_content" {
            match serde_json::from_str::<StructuredDocument>(&call.arguments) {
                Ok(doc) => return Ok(structured_to_markdown(&doc)),
                Err(err) => {
                    collector_warn!("unparseable structure_content arguments: {err}");
                    return Err(RefineError::MalformedResponse);
                }
            }
        }
    }

    match message.content.filter(|content| !content.is_empty()) {
        Some(content) => Ok(content),
        None => Err(RefineError::MalformedResponse),
    }
}
