//! Ollama client: HTTP chat API with `ollama run` fallback.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GenerationError, Result};
use crate::prompt::build_prompt;
use crate::TextSource;

/// Reachability probe budget (`GET /api/tags`).
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
/// Model listing budget.
const TAGS_TIMEOUT: Duration = Duration::from_secs(5);
/// Chat request budget.
const CHAT_TIMEOUT: Duration = Duration::from_secs(120);
/// CLI fallback budget; `ollama run` may pull the model first.
const CLI_TIMEOUT: Duration = Duration::from_secs(180);
/// Poll interval while supervising the CLI child.
const CLI_POLL: Duration = Duration::from_millis(100);

/// Text source backed by a local or remote Ollama instance.
pub struct OllamaSource {
    host: String,
    model: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn<'a>>,
    stream: bool,
    options: ChatOptions<'a>,
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions<'a> {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    repeat_penalty: f64,
    stop: Vec<&'a str>,
    // Headroom past the token budget; the sanitizer trims afterwards.
    num_predict: u32,
}

impl Default for ChatOptions<'_> {
    fn default() -> Self {
        Self {
            temperature: 0.45,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.5,
            stop: vec!["\nEND"],
            num_predict: 64,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

impl OllamaSource {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()?;
        Ok(Self {
            host: host.into(),
            model: model.into(),
            client,
        })
    }

    /// `GET /api/tags` as a liveness probe.
    fn ensure_up(&self) -> Result<()> {
        self.client
            .get(format!("{}/api/tags", self.host))
            .timeout(PROBE_TIMEOUT)
            .send()
            .and_then(|r| r.error_for_status())
            .map(|_| ())
            .map_err(|source| GenerationError::Unreachable {
                host: self.host.clone(),
                source,
            })
    }

    fn has_model(&self) -> Result<bool> {
        let tags: TagsResponse = self
            .client
            .get(format!("{}/api/tags", self.host))
            .timeout(TAGS_TIMEOUT)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(tags.models.iter().any(|m| m.name == self.model))
    }

    fn generate_http(&self, prompt: &str) -> Result<String> {
        self.ensure_up()?;
        if !self.has_model()? {
            return Err(GenerationError::ModelUnavailable {
                model: self.model.clone(),
            });
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatTurn {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ChatOptions::default(),
        };
        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::BadStatus {
                status: status.as_u16(),
            });
        }

        extract_content(&response.text()?)
    }

    /// `ollama run <model> <prompt>`, supervised against [`CLI_TIMEOUT`].
    ///
    /// The child's pipes are drained on helper threads while the parent
    /// polls for exit, so a chatty model cannot deadlock on a full pipe.
    fn generate_cli(&self, prompt: &str) -> Result<String> {
        let mut child = Command::new("ollama")
            .args(["run", &self.model, prompt])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    GenerationError::CliMissing
                } else {
                    GenerationError::Io(err)
                }
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_reader = std::thread::spawn(move || drain(stdout));
        let err_reader = std::thread::spawn(move || drain(stderr));

        let deadline = Instant::now() + CLI_TIMEOUT;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GenerationError::CliTimeout(CLI_TIMEOUT));
            }
            std::thread::sleep(CLI_POLL);
        };

        let stdout = out_reader.join().unwrap_or_default();
        let stderr = err_reader.join().unwrap_or_default();
        if status.success() {
            Ok(stdout)
        } else {
            Err(GenerationError::CliFailed(stderr.trim().to_string()))
        }
    }
}

fn drain(pipe: Option<impl Read>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

/// Pull the generated text out of a chat response. Older backends answer
/// with a bare `response` field instead of `message.content`.
fn extract_content(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
    if let Some(message) = parsed.message {
        return Ok(message.content);
    }
    if let Some(response) = parsed.response {
        return Ok(response);
    }
    Err(GenerationError::MalformedResponse(
        "neither message.content nor response present".to_string(),
    ))
}

impl TextSource for OllamaSource {
    fn generate(&self) -> Result<String> {
        let prompt = build_prompt();
        match self.generate_http(&prompt) {
            Ok(text) => {
                debug!(bytes = text.len(), "generated via http api");
                Ok(text)
            }
            Err(err) => {
                // Any HTTP-path failure falls back to the CLI, which can
                // also pull a missing model on its own.
                warn!(error = %err, "http api path failed, falling back to cli");
                self.generate_cli(&prompt)
            }
        }
    }
}
