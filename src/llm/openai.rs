use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Outbound proxy for all completion requests, if configured.
    pub proxy: Option<String>,
    pub timeout: Duration,
}

impl OpenAiClientConfig {
    pub fn new(api_key: Option<String>, base_url: String, proxy: Option<String>) -> Self {
        let timeout = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self {
            api_key,
            base_url,
            proxy,
            timeout: Duration::from_secs(timeout),
        }
    }
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: HttpClient,
    cfg: OpenAiClientConfig,
}

impl OpenAiClient {
    pub fn new(cfg: OpenAiClientConfig) -> Result<Self, OpenAiError> {
        let mut builder = HttpClient::builder().timeout(cfg.timeout);
        if let Some(proxy) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy).map_err(OpenAiError::http)?);
        }
        let http = builder.build().map_err(OpenAiError::http)?;
        Ok(Self { http, cfg })
    }

    fn resolve_api_key(&self) -> Result<String, OpenAiError> {
        match &self.cfg.api_key {
            Some(key) => Ok(key.clone()),
            None => Err(OpenAiError::MissingApiKey),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        )
    }

    fn build_api_request(&self, req: &ChatCompletionRequest) -> ApiChatCompletionRequest {
        ApiChatCompletionRequest {
            model: req.model.clone(),
            messages: req
                .messages
                .iter()
                .map(|m| ApiChatMessage {
                    role: m.role.as_api_str().to_string(),
                    content: Some(m.content.clone()),
                })
                .collect(),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError>;
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError> {
        if request.messages.is_empty() {
            return Err(OpenAiError::EmptyMessages);
        }

        let api_key = self.resolve_api_key()?;
        let api_request = self.build_api_request(&request);
        let endpoint = self.endpoint();

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(OpenAiError::http)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(OpenAiError::http)?;

        if !status.is_success() {
            let api_err = serde_json::from_slice::<ApiErrorEnvelope>(&bytes)
                .ok()
                .map(|env| env.error);
            return Err(OpenAiError::Api {
                status,
                error: api_err.unwrap_or_default(),
            });
        }

        let parsed: ApiChatCompletionResponse =
            serde_json::from_slice(&bytes).map_err(OpenAiError::Decode)?;

        // first choice's content, verbatim; downstream tolerates whatever came back
        let content = parsed
            .choices
            .iter()
            .find_map(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(ChatCompletionResponse { content })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    fn as_api_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionResponse {
    pub content: String,
}

#[derive(Debug)]
pub enum OpenAiError {
    MissingApiKey,
    EmptyMessages,
    Http(reqwest::Error),
    Timeout,
    Api {
        status: StatusCode,
        error: ApiErrorBody,
    },
    MockQueueEmpty,
    Decode(serde_json::Error),
}

impl OpenAiError {
    fn http(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OpenAiError::Timeout
        } else {
            OpenAiError::Http(err)
        }
    }
}

impl std::fmt::Display for OpenAiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenAiError::MissingApiKey => write!(f, "OPENAI_API_KEY is not set"),
            OpenAiError::EmptyMessages => {
                write!(f, "chat completion requires at least one message")
            }
            OpenAiError::Http(err) => write!(f, "http error: {err}"),
            OpenAiError::Timeout => write!(f, "request timed out"),
            OpenAiError::Api { status, error } => {
                write!(f, "api error {status}: {}", error.message)
            }
            OpenAiError::MockQueueEmpty => {
                write!(f, "mock client response queue is empty")
            }
            OpenAiError::Decode(err) => write!(f, "decode error: {err}"),
        }
    }
}

impl std::error::Error for OpenAiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OpenAiError::Http(err) => Some(err),
            OpenAiError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl Default for ApiErrorBody {
    fn default() -> Self {
        Self {
            message: "unknown error".to_string(),
            r#type: None,
            param: None,
            code: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Default)]
pub struct MockClient {
    responses: Mutex<VecDeque<Result<ChatCompletionResponse, OpenAiError>>>,
    calls: Mutex<Vec<ChatCompletionRequest>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, resp: Result<ChatCompletionResponse, OpenAiError>) {
        self.responses.lock().unwrap().push_back(resp);
    }

    pub fn calls(&self) -> Vec<ChatCompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockClient {
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError> {
        self.calls.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OpenAiError::MockQueueEmpty))
    }
}

#[derive(Debug, Clone, Serialize)]
struct ApiChatCompletionRequest {
    model: String,
    messages: Vec<ApiChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatCompletionResponse {
    choices: Vec<ApiChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatChoice {
    message: ApiChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![
                ChatMessage::new(ChatRole::User, "article text"),
                ChatMessage::new(ChatRole::Assistant, "summarize it"),
            ],
        }
    }

    #[test]
    fn build_request_serializes_messages() {
        let client = OpenAiClient::new(OpenAiClientConfig {
            api_key: Some("test".into()),
            base_url: "https://api.openai.com/v1".to_string(),
            proxy: None,
            timeout: Duration::from_secs(30),
        })
        .unwrap();

        let request = sample_request();
        let api_request = client.build_api_request(&request);
        let value = serde_json::to_value(&api_request).unwrap();

        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "article text");
        assert_eq!(value["messages"][1]["role"], "assistant");
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let client = OpenAiClient::new(OpenAiClientConfig {
            api_key: Some("test".into()),
            base_url: "https://proxy.example.com/v1/".to_string(),
            proxy: None,
            timeout: Duration::from_secs(30),
        })
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://proxy.example.com/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn mock_client_returns_enqueued_response() {
        let mock = MockClient::new();
        let response = ChatCompletionResponse { content: "hi".into() };
        mock.push_response(Ok(response.clone()));

        let req = sample_request();
        let out = mock.chat_completion(req.clone()).await.unwrap();

        assert_eq!(out.content, "hi");
        assert_eq!(mock.calls().len(), 1);
        assert_eq!(mock.calls()[0], req);
    }

    #[test]
    fn api_error_display_includes_status() {
        let err = OpenAiError::Api {
            status: StatusCode::UNAUTHORIZED,
            error: ApiErrorBody {
                message: "invalid api key".into(),
                r#type: Some("invalid_request_error".into()),
                param: None,
                code: None,
            },
        };

        assert_eq!(
            format!("{err}"),
            "api error 401 Unauthorized: invalid api key"
        );
    }
}
