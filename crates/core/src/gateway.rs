use crate::error::{ConfigurationError, GatewayError};
use crate::prompt::{ChatMessage, CompletionRequest};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";

const INITIAL_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Boundary to the external completion provider.
///
/// A gateway returns either non-empty generated text or a typed failure. It
/// never panics on provider trouble; the caller decides how to recover.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct LlmResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Chat-completions client for OpenAI-compatible providers.
pub struct OpenAiGateway {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    retry_max_elapsed: Option<Duration>,
}

pub struct OpenAiGatewayBuilder {
    api_key: SecretString,
    model: String,
    base_url: String,
    request_timeout: Option<Duration>,
    retry_max_elapsed: Option<Duration>,
}

impl OpenAiGatewayBuilder {
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_max_elapsed(mut self, max_elapsed: Option<Duration>) -> Self {
        self.retry_max_elapsed = max_elapsed;
        self
    }

    pub fn build(self) -> Result<OpenAiGateway, ConfigurationError> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigurationError::InvalidValue {
                field: "http_client",
                reason: e.to_string(),
            })?;
        Ok(OpenAiGateway {
            client,
            api_key: self.api_key,
            model: self.model,
            base_url: self.base_url,
            retry_max_elapsed: self.retry_max_elapsed,
        })
    }
}

impl OpenAiGateway {
    pub fn builder(api_key: SecretString) -> OpenAiGatewayBuilder {
        OpenAiGatewayBuilder {
            api_key,
            model: DEFAULT_CHAT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
            retry_max_elapsed: None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send_once(&self, body: &ChatCompletionBody<'_>) -> Result<String, GatewayError> {
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), provider_message(&text)));
        }

        let parsed = resp
            .json::<LlmResponse>()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        first_completion(parsed)
    }
}

#[async_trait]
impl Gateway for OpenAiGateway {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: request.messages(),
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            n: 1,
        };
        tracing::debug!(
            "Calling {} with {} messages in {} mode",
            self.model,
            body.messages.len(),
            request.mode.as_str()
        );

        let Some(max_elapsed) = self.retry_max_elapsed else {
            return self.send_once(&body).await;
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(INITIAL_RETRY_INTERVAL)
            .with_max_elapsed_time(Some(max_elapsed))
            .build();
        let gateway = self;
        let body = &body;
        backoff::future::retry(policy, move || async move {
            gateway.send_once(body).await.map_err(|err| {
                if err.is_transient() {
                    tracing::warn!("Transient model provider failure, retrying: {}", err);
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        })
        .await
    }
}

fn classify_status(status: u16, message: String) -> GatewayError {
    match status {
        401 | 403 => GatewayError::Authentication(message),
        429 => GatewayError::RateLimited(message),
        status => GatewayError::Provider { status, message },
    }
}

// Providers wrap failures as {"error": {"message": ...}}; fall back to the raw body.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn first_completion(resp: LlmResponse) -> Result<String, GatewayError> {
    let content = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::Malformed("no choices in response".to_string()))?
        .message
        .content
        .unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{ChatRole, ResponseMode};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn parse(json: &str) -> LlmResponse {
        serde_json::from_str(json).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            mode: ResponseMode::FollowUp,
            system_directive: "You are an interviewer. Ask one follow-up question.".into(),
            framing: "Full list of interview questions:\n1. How do you use AI in teaching?".into(),
            context: vec![],
            user_payload: "The respondent answered with: 'I use it to draft quizzes.'".into(),
            max_output_tokens: 100,
            temperature: 0.7,
        }
    }

    /// Answers the n-th connection with the n-th scripted `(status, body)`,
    /// repeating the last one once the script runs out.
    async fn scripted_provider(script: Vec<(u16, &'static str)>) -> (SocketAddr, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = script[n.min(script.len() - 1)];
                read_request(&mut stream).await;
                let reason = match status {
                    200 => "OK",
                    401 => "Unauthorized",
                    503 => "Service Unavailable",
                    _ => "Status",
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        (addr, hits)
    }

    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let Ok(read) = stream.read(&mut chunk).await else {
                return;
            };
            if read == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..read]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    return;
                }
            }
        }
    }

    fn local_gateway(addr: SocketAddr) -> OpenAiGateway {
        OpenAiGateway::builder(SecretString::from("sk-test".to_string()))
            .with_base_url(&format!("http://{addr}/v1"))
            .with_request_timeout(Some(Duration::from_secs(5)))
            .with_retry_max_elapsed(Some(Duration::from_secs(5)))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let (addr, hits) = scripted_provider(vec![
            (503, r#"{"error": {"message": "overloaded"}}"#),
            (200, r#"{"choices": [{"message": {"content": "Why?"}}]}"#),
        ])
        .await;

        let reply = local_gateway(addr).complete(&request()).await;
        assert_eq!(reply, Ok("Why?".to_string()));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn authentication_failure_is_not_retried() {
        let (addr, hits) =
            scripted_provider(vec![(401, r#"{"error": {"message": "bad key"}}"#)]).await;

        let reply = local_gateway(addr).complete(&request()).await;
        assert_eq!(reply, Err(GatewayError::Authentication("bad key".into())));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn extracts_first_choice() {
        let resp = parse(
            r#"{"choices": [{"message": {"role": "assistant", "content": "  Tell me more?  "}}]}"#,
        );
        assert_eq!(first_completion(resp).unwrap(), "Tell me more?");
    }

    #[test]
    fn empty_content_is_a_failure() {
        let resp = parse(r#"{"choices": [{"message": {"content": "   "}}]}"#);
        assert_eq!(first_completion(resp), Err(GatewayError::EmptyResponse));

        let resp = parse(r#"{"choices": [{"message": {"content": null}}]}"#);
        assert_eq!(first_completion(resp), Err(GatewayError::EmptyResponse));
    }

    #[test]
    fn missing_choices_is_malformed() {
        let resp = parse(r#"{"choices": []}"#);
        assert!(matches!(
            first_completion(resp),
            Err(GatewayError::Malformed(_))
        ));
    }

    #[test]
    fn status_codes_map_to_typed_failures() {
        assert!(matches!(
            classify_status(401, "bad key".into()),
            GatewayError::Authentication(_)
        ));
        assert!(matches!(
            classify_status(429, "slow down".into()),
            GatewayError::RateLimited(_)
        ));
        assert_eq!(
            classify_status(502, "bad gateway".into()),
            GatewayError::Provider {
                status: 502,
                message: "bad gateway".into()
            }
        );
    }

    #[test]
    fn provider_message_prefers_error_envelope() {
        assert_eq!(
            provider_message(r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error"}}"#),
            "Incorrect API key"
        );
        assert_eq!(provider_message(" upstream timeout \n"), "upstream timeout");
    }

    #[test]
    fn body_serializes_in_openai_schema() {
        let body = ChatCompletionBody {
            model: "gpt-4",
            messages: vec![ChatMessage::new(ChatRole::System, "Be kind.")],
            max_tokens: 200,
            temperature: 0.5,
            n: 1,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["max_tokens"], 200);
        assert_eq!(json["n"], 1);
    }

    #[test]
    fn builder_trims_base_url() {
        let gateway = OpenAiGateway::builder(SecretString::from("sk-test".to_string()))
            .with_base_url("http://localhost:8080/v1/")
            .with_model("gpt-4o")
            .build()
            .unwrap();
        assert_eq!(gateway.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(gateway.model(), "gpt-4o");
    }

    // Makes a live call to the provider. Run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn live_follow_up_completion() {
        dotenvy::dotenv_override().ok();
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let gateway = OpenAiGateway::builder(SecretString::from(api_key))
            .with_request_timeout(Some(Duration::from_secs(30)))
            .build()
            .unwrap();

        let request = CompletionRequest {
            mode: ResponseMode::FollowUp,
            system_directive: "You are an interviewer. Ask one follow-up question.".into(),
            framing: "Full list of interview questions:\n1. How do you use AI in teaching?".into(),
            context: vec![],
            user_payload: "The respondent answered 'How do you use AI in teaching?' with: 'I use it to draft quizzes.'".into(),
            max_output_tokens: 100,
            temperature: 0.7,
        };

        let reply = gateway.complete(&request).await.expect("live completion failed");
        assert!(!reply.trim().is_empty());
    }
}
