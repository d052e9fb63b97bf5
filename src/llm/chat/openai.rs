use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, StatusCode, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::time::Duration;

use super::{ ChatClient, CompletionResponse };
use crate::llm::{ CompletionError, LlmConfig };
use crate::models::chat::ChatMessage;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const ERROR_BODY_EXCERPT: usize = 300;

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAIChatClient {
    http: HttpClient,
    base_url: String,
    temperature: f32,
    timeout: Duration,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIReplyMessage,
}

#[derive(Deserialize)]
struct OpenAIReplyMessage {
    content: Option<String>,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        temperature: f32,
        timeout: Duration
    ) -> Result<Self, CompletionError> {
        if api_key.trim().is_empty() {
            return Err(CompletionError::Auth("API key is empty".to_string()));
        }
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|e| CompletionError::Auth(format!("Invalid API key format: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: api_url,
            temperature,
            timeout,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| CompletionError::Auth("API key is required".to_string()))?;

        Self::new(api_key, config.base_url.clone(), config.temperature, config.timeout)
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        }
    }

    fn map_request_error(&self, e: reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(self.timeout)
        } else {
            CompletionError::Transport(e.to_string())
        }
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_EXCERPT {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(ERROR_BODY_EXCERPT).collect();
        format!("{}...", cut)
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        max_tokens: u32
    ) -> Result<CompletionResponse, CompletionError> {
        let url = self.endpoint();

        let req = OpenAIChatRequest {
            model,
            messages: messages
                .iter()
                .map(|m| OpenAIMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
            temperature: self.temperature,
            max_tokens,
        };

        debug!("POST {} (model={}, max_tokens={}, messages={})", url, model, max_tokens, messages.len());

        let resp = self.http
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_request_error(e))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CompletionError::Auth(format!("HTTP {}: {}", status, excerpt(&body))));
        }
        if !status.is_success() {
            return Err(CompletionError::Upstream(format!("HTTP {}: {}", status, excerpt(&body))));
        }

        let parsed: OpenAIResponse = serde_json
            ::from_str(&body)
            .map_err(|e| CompletionError::Upstream(format!("Malformed completion payload: {}", e)))?;

        let content = parsed.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CompletionError::Upstream("No response text from completion API".to_string()))?;

        Ok(CompletionResponse { response: content })
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{ http::{ HeaderMap as AxumHeaders, StatusCode as AxumStatus }, routing::post, Json, Router };
    use serde_json::{ json, Value };

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String, timeout: Duration) -> OpenAIChatClient {
        OpenAIChatClient::new("sk-test".to_string(), Some(base_url), 0.7, timeout).unwrap()
    }

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::system("be helpful"), ChatMessage::user("How was your weekend?")]
    }

    #[tokio::test]
    async fn sends_model_budget_and_messages() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: AxumHeaders, Json(body): Json<Value>| async move {
                let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or("");
                let echo = format!(
                    "{}|{}|{}|{}|{}",
                    auth,
                    body["model"].as_str().unwrap_or(""),
                    body["max_tokens"],
                    body["messages"][0]["role"].as_str().unwrap_or(""),
                    body["messages"][1]["content"].as_str().unwrap_or("")
                );
                Json(json!({ "choices": [{ "message": { "role": "assistant", "content": echo } }] }))
            })
        );
        let base = spawn_upstream(router).await;

        let reply = client(format!("{}/v1", base), Duration::from_secs(5))
            .complete(&messages(), "gpt-4o-mini", 123).await
            .unwrap();

        assert_eq!(reply.response, "Bearer sk-test|gpt-4o-mini|123|system|How was your weekend?");
    }

    #[tokio::test]
    async fn accepts_full_endpoint_as_base_url() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({ "choices": [{ "message": { "content": "ok" } }] })) })
        );
        let base = spawn_upstream(router).await;

        let reply = client(format!("{}/chat/completions/", base), Duration::from_secs(5))
            .complete(&messages(), "m", 10).await
            .unwrap();
        assert_eq!(reply.response, "ok");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (AxumStatus::UNAUTHORIZED, "invalid api key") })
        );
        let base = spawn_upstream(router).await;

        let err = client(base, Duration::from_secs(5)).complete(&messages(), "m", 10).await.unwrap_err();
        match err {
            CompletionError::Auth(detail) => assert!(detail.contains("invalid api key")),
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_error_maps_to_upstream_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "overloaded") })
        );
        let base = spawn_upstream(router).await;

        let err = client(base, Duration::from_secs(5)).complete(&messages(), "m", 10).await.unwrap_err();
        assert!(matches!(err, CompletionError::Upstream(ref d) if d.contains("500")));
    }

    #[tokio::test]
    async fn malformed_payload_maps_to_upstream_error() {
        let router = Router::new().route("/chat/completions", post(|| async { "definitely not json" }));
        let base = spawn_upstream(router).await;

        let err = client(base, Duration::from_secs(5)).complete(&messages(), "m", 10).await.unwrap_err();
        assert!(matches!(err, CompletionError::Upstream(_)));
    }

    #[tokio::test]
    async fn empty_choices_map_to_upstream_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({ "choices": [] })) })
        );
        let base = spawn_upstream(router).await;

        let err = client(base, Duration::from_secs(5)).complete(&messages(), "m", 10).await.unwrap_err();
        assert!(matches!(err, CompletionError::Upstream(_)));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({ "choices": [{ "message": { "content": "late" } }] }))
            })
        );
        let base = spawn_upstream(router).await;

        let timeout = Duration::from_millis(200);
        let err = client(base, timeout).complete(&messages(), "m", 10).await.unwrap_err();
        assert!(matches!(err, CompletionError::Timeout(t) if t == timeout));
    }

    #[tokio::test]
    async fn refused_connection_maps_to_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{}", addr), Duration::from_secs(5))
            .complete(&messages(), "m", 10).await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
    }

    #[test]
    fn missing_key_is_an_auth_error() {
        let config = LlmConfig::default();
        assert!(matches!(OpenAIChatClient::from_config(&config), Err(CompletionError::Auth(_))));

        let blank = OpenAIChatClient::new("  ".to_string(), None, 0.7, Duration::from_secs(1));
        assert!(matches!(blank, Err(CompletionError::Auth(_))));
    }

    #[test]
    fn long_error_bodies_are_cut() {
        let body = "x".repeat(1_000);
        let cut = excerpt(&body);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), ERROR_BODY_EXCERPT + 3);
    }
}
