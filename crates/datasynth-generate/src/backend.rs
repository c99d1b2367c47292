use std::time::Duration;

use datasynth_core::Settings;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::BackendError;

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// Output shape requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// One prompt sent to a generative backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Hint only: the returned text may still fail to parse.
    pub response_format: ResponseFormat,
    pub temperature: f32,
}

/// Generative text capability consumed by the synthesis engine.
pub trait CompletionBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;
}

impl<B: CompletionBackend + ?Sized> CompletionBackend for &B {
    fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        (**self).complete(request)
    }
}

/// An absent backend fails every call, so the engine degrades to placeholders.
impl<B: CompletionBackend> CompletionBackend for Option<B> {
    fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        match self {
            Some(backend) => backend.complete(request),
            None => Err(BackendError::MissingApiKey),
        }
    }
}

/// OpenAI-compatible chat completions endpoint (Groq by default).
#[derive(Clone)]
pub struct ChatCompletionsBackend {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        let api_key = settings
            .require_api_key()
            .map_err(|_| BackendError::MissingApiKey)?;
        Self::new(&settings.completion_base_url, api_key, &settings.model_name)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatBody>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormatBody {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl CompletionBackend for ChatCompletionsBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            response_format: match request.response_format {
                ResponseFormat::JsonObject => Some(ResponseFormatBody {
                    kind: "json_object",
                }),
                ResponseFormat::Text => None,
            },
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|err| BackendError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|err| BackendError::Decode(err.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(BackendError::EmptyCompletion)?;

        debug!(model = %self.model, chars = content.len(), "completion received");
        Ok(content)
    }
}
