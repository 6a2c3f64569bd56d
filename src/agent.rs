//! Conversational agent backed by a local Ollama server.
//!
//! [`OllamaClient::connect`] is called once at startup for `ask` and `chat`.
//! It checks that the chat and embedding models exist on the server and pulls
//! any that are missing, showing progress on stderr. A server that cannot be
//! reached at this point is a fatal error.
//!
//! Endpoints used:
//!
//! | Endpoint | Purpose |
//! |----------|---------|
//! | `GET /api/tags` | list local models |
//! | `POST /api/pull` | pull a model (streamed NDJSON status) |
//! | `POST /api/chat` | chat completion, optionally streamed as NDJSON |
//!
//! There is no retry and no cancellation: a pull or a chat turn runs until it
//! finishes or fails.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;

use crate::config::{
    Config, CHAT_MODEL, EMBEDDING_MODEL, MAX_TOKENS, OLLAMA_PASSWORD, OLLAMA_URL,
    OLLAMA_USERNAME, SYSTEM_PROMPT,
};
use crate::filesize::filesize_to_english;

/// Connect timeout for the model server.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Command that ends a chat session.
pub const END_CHAT: &str = "/done";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct ChatOptions {
    num_predict: i64,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// One status line from a streamed model pull.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Append `:latest` to model names without a tag.
pub fn qualify_model_name(model: &str) -> String {
    if model.contains(':') {
        model.to_string()
    } else {
        format!("{}:latest", model)
    }
}

/// `Status: downloading, Completed: 1.5 KB/3.0 KB (50.00%)`
pub fn format_pull_status(status: &PullStatus) -> String {
    let completed = status.completed.unwrap_or(0) as f64;
    let total = status.total.filter(|t| *t > 0).unwrap_or(1) as f64;
    format!(
        "Status: {}, Completed: {}/{} ({:.2}%)",
        status.status,
        filesize_to_english(status.completed),
        filesize_to_english(status.total),
        completed / total * 100.0
    )
}

/// Split complete newline-terminated lines off the front of `buf`.
fn drain_lines(buf: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
        let mut line: Vec<u8> = buf.drain(..=pos).collect();
        line.pop();
        if !line.iter().all(u8::is_ascii_whitespace) {
            lines.push(line);
        }
    }
    lines
}

/// Read an NDJSON response body, handing each decoded line to `on_item`.
async fn read_ndjson<T, F>(mut response: reqwest::Response, mut on_item: F) -> Result<()>
where
    T: for<'de> Deserialize<'de>,
    F: FnMut(T) -> Result<()>,
{
    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        buf.extend_from_slice(&chunk);
        for line in drain_lines(&mut buf) {
            on_item(serde_json::from_slice(&line).context("Invalid response line from Ollama")?)?;
        }
    }
    if !buf.iter().all(u8::is_ascii_whitespace) {
        on_item(serde_json::from_slice(&buf).context("Invalid response line from Ollama")?)?;
    }
    Ok(())
}

/// HTTP client for one Ollama server.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl OllamaClient {
    /// Build a client from configuration without contacting the server.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .get_string(OLLAMA_URL)
            .ok_or_else(|| anyhow::anyhow!("{} is not set", OLLAMA_URL))?
            .trim_end_matches('/')
            .to_string();
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            username: config.get_string(OLLAMA_USERNAME),
            password: config.get_string(OLLAMA_PASSWORD),
        })
    }

    /// Build a client and make sure the configured models are available,
    /// pulling the ones that are not.
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = Self::new(config)?;
        tracing::debug!("Initializing Ollama at {}...", client.base_url);

        let models = [config.get_string(CHAT_MODEL), config.get_string(EMBEDDING_MODEL)];
        for model in models.into_iter().flatten() {
            if client.is_model_available(&model).await? {
                tracing::debug!("Model '{}' is already available. Skipping pull.", model);
                continue;
            }
            tracing::info!("Pulling model '{}' from Ollama server...", model);
            let mut progress = PullProgressLine::new();
            client
                .pull_model(&model, |status| progress.show(status))
                .await
                .with_context(|| format!("Failed to pull model '{}'", model))?;
            progress.finish();
            tracing::info!("Successfully pulled model: {}", model);
        }
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await.with_context(|| {
            format!("Ollama connection error (is Ollama running at {}?)", self.base_url)
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body);
        }
        Ok(response)
    }

    /// Names of the models available locally.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .send(self.request(reqwest::Method::GET, "/api/tags"))
            .await?;
        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    pub async fn is_model_available(&self, model: &str) -> Result<bool> {
        let qualified = qualify_model_name(model);
        let available = self.list_models().await?.contains(&qualified);
        tracing::debug!("Model availability for '{}': {}", qualified, available);
        Ok(available)
    }

    /// Pull `model`, calling `on_status` for every status line.
    pub async fn pull_model<F>(&self, model: &str, mut on_status: F) -> Result<()>
    where
        F: FnMut(&PullStatus),
    {
        let body = serde_json::json!({ "model": model, "stream": true });
        let response = self
            .send(self.request(reqwest::Method::POST, "/api/pull").json(&body))
            .await?;
        read_ndjson(response, |status: PullStatus| {
            if let Some(err) = &status.error {
                bail!("{}", err);
            }
            on_status(&status);
            Ok(())
        })
        .await
    }

    /// One non-streamed chat completion.
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: Option<ChatOptions>,
    ) -> Result<ChatMessage> {
        let request = ChatRequest {
            model,
            messages,
            stream: false,
            options,
        };
        let response = self
            .send(self.request(reqwest::Method::POST, "/api/chat").json(&request))
            .await?;
        let chunk: ChatChunk = response.json().await?;
        if let Some(err) = chunk.error {
            bail!("Ollama chat error: {}", err);
        }
        chunk
            .message
            .ok_or_else(|| anyhow::anyhow!("Ollama response had no message"))
    }

    /// A streamed chat completion. Returns the full assistant text.
    async fn chat_stream<F>(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: Option<ChatOptions>,
        mut on_chunk: F,
    ) -> Result<String>
    where
        F: FnMut(&str),
    {
        let request = ChatRequest {
            model,
            messages,
            stream: true,
            options,
        };
        let response = self
            .send(self.request(reqwest::Method::POST, "/api/chat").json(&request))
            .await?;

        let mut full = String::new();
        read_ndjson(response, |chunk: ChatChunk| {
            if let Some(err) = chunk.error {
                bail!("Ollama chat error: {}", err);
            }
            if let Some(message) = chunk.message {
                on_chunk(&message.content);
                full.push_str(&message.content);
            }
            if chunk.done {
                tracing::debug!("Chat stream finished");
            }
            Ok(())
        })
        .await?;
        Ok(full)
    }
}

/// Single-line, carriage-return progress display on stderr. Silent when
/// stderr is not a terminal.
struct PullProgressLine {
    enabled: bool,
    max_len: usize,
}

impl PullProgressLine {
    fn new() -> Self {
        Self {
            enabled: atty::is(atty::Stream::Stderr),
            max_len: 0,
        }
    }

    fn show(&mut self, status: &PullStatus) {
        if !self.enabled {
            return;
        }
        let line = format_pull_status(status);
        self.max_len = self.max_len.max(line.len());
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{:<width$}", line, width = self.max_len);
        let _ = stderr.flush();
    }

    fn finish(&self) {
        if self.enabled {
            let _ = writeln!(std::io::stderr().lock());
        }
    }
}

/// A chat session: system prompt plus the running message history.
pub struct Conversation<'a> {
    client: &'a OllamaClient,
    model: String,
    messages: Vec<ChatMessage>,
    options: Option<ChatOptions>,
}

impl<'a> Conversation<'a> {
    /// `system_prompt` and `model` default to `SYSTEM_PROMPT` and
    /// `CHAT_MODEL`. `MAX_TOKENS` caps the response length.
    pub fn new(
        client: &'a OllamaClient,
        config: &Config,
        system_prompt: Option<&str>,
        model: Option<&str>,
    ) -> Self {
        let system_prompt = system_prompt
            .map(str::to_string)
            .or_else(|| config.get_string(SYSTEM_PROMPT))
            .unwrap_or_default();
        let model = model
            .map(str::to_string)
            .or_else(|| config.get_string(CHAT_MODEL))
            .unwrap_or_default();
        let options = config
            .get_int(MAX_TOKENS)
            .filter(|n| *n > 0)
            .map(|num_predict| ChatOptions { num_predict });

        Self {
            client,
            model,
            messages: vec![ChatMessage::new("system", system_prompt)],
            options,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new("user", content));
    }

    /// Get the full reply and append it to the history.
    pub async fn get_response(&mut self) -> Result<String> {
        let reply = self
            .client
            .chat(&self.model, &self.messages, self.options)
            .await?;
        let content = reply.content.clone();
        self.messages.push(ChatMessage::new("assistant", reply.content));
        Ok(content)
    }

    /// Stream the reply, calling `on_chunk` for each fragment. The assistant
    /// message is appended to the history as it arrives.
    pub async fn stream_response<F>(&mut self, mut on_chunk: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let mut reply = String::new();
        let result = self
            .client
            .chat_stream(&self.model, &self.messages, self.options, |chunk| {
                reply.push_str(chunk);
                on_chunk(chunk);
            })
            .await;
        self.messages.push(ChatMessage::new("assistant", reply));
        result
    }
}

fn print_chunk(chunk: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(chunk.as_bytes());
    let _ = stdout.flush();
}

/// `docs ask`: one question, answer printed to stdout.
pub async fn ask(client: &OllamaClient, config: &Config, prompt: &str, stream: bool) -> Result<()> {
    let mut conversation = Conversation::new(client, config, None, None);
    conversation.add_user_message(prompt);
    if stream {
        tracing::debug!("Streaming response...");
        conversation.stream_response(print_chunk).await?;
        println!();
    } else {
        tracing::debug!("Getting full response...");
        let response = conversation.get_response().await?;
        println!("{}", response);
    }
    Ok(())
}

/// `docs chat`: read prompts from stdin until `/done` or end of input.
pub async fn chat(client: &OllamaClient, config: &Config) -> Result<()> {
    use tokio::io::AsyncBufReadExt;

    let mut conversation = Conversation::new(client, config, None, None);
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    tracing::info!(
        "Starting chat session with the Docs agent. Type '{}' to quit.",
        END_CHAT
    );

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(input) = lines.next_line().await? else {
            println!();
            break;
        };
        if input.trim().eq_ignore_ascii_case(END_CHAT) {
            break;
        }
        if input.trim().is_empty() {
            continue;
        }
        conversation.add_user_message(input);
        conversation.stream_response(print_chunk).await?;
        println!();
        println!();
    }
    tracing::info!("Ending chat session.");
    Ok(())
}
