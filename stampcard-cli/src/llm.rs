use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stampcard_core::{CompletionClient, CompletionRequest, SCHEMA_NAME, TransportError, parse_completion_text};
use tracing::debug;

use crate::auth::AuthState;
use crate::config::{LlmSection, normalize_openai_model};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(Self::OpenAI),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => bail!("unknown provider '{other}' (expected openai or anthropic)"),
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }
}

/// HTTP completion client for the configured provider.
pub struct LlmClient {
    provider: Provider,
    model: String,
    base_url: String,
    temperature: f32,
    key: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn from_config(cfg: &LlmSection, auth: &AuthState) -> Result<Self> {
        let http = http_builder(cfg).build().context("build http client")?;
        Self::with_http(cfg, auth, http)
    }

    fn with_http(cfg: &LlmSection, auth: &AuthState, http: reqwest::Client) -> Result<Self> {
        let provider = Provider::parse(&cfg.provider)?;
        let key = match provider {
            Provider::OpenAI => auth.openai_api_key.clone().ok_or_else(|| {
                anyhow::anyhow!("missing OpenAI API key; run: stampcard auth paste-openai-api-key")
            })?,
            Provider::Anthropic => auth.anthropic_api_key.clone().ok_or_else(|| {
                anyhow::anyhow!("missing Anthropic API key; run: stampcard auth paste-anthropic-key")
            })?,
        };
        let base_url = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url().to_string());

        Ok(Self {
            provider,
            model: cfg.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature: cfg.temperature,
            key,
            http,
        })
    }

    async fn openai_complete(&self, request: &CompletionRequest) -> Result<Option<Value>, TransportError> {
        let body = OaiReq {
            model: normalize_openai_model(&self.model),
            messages: vec![
                Msg {
                    role: "system".to_string(),
                    content: request.instruction.clone(),
                },
                Msg {
                    role: "user".to_string(),
                    content: request.user_message(),
                },
            ],
            temperature: self.temperature,
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": SCHEMA_NAME,
                    "schema": request.schema,
                },
            }),
        };

        let resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.key)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let out: OaiResp = resp.json().await.map_err(|e| decode("openai", e))?;
        Ok(openai_output(out))
    }

    async fn anthropic_complete(&self, request: &CompletionRequest) -> Result<Option<Value>, TransportError> {
        let body = AnthropicReq {
            model: self.model.clone(),
            max_tokens: 300,
            system: format!(
                "{}\n\nThe JSON object must match this JSON Schema:\n{}",
                request.instruction,
                serde_json::to_string_pretty(&request.schema).unwrap_or_default()
            ),
            messages: vec![Msg {
                role: "user".to_string(),
                content: request.user_message(),
            }],
            temperature: self.temperature,
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.key).map_err(|e| TransportError::Other(format!("invalid api key header: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let out: AnthropicResp = resp.json().await.map_err(|e| decode("anthropic", e))?;
        Ok(anthropic_output(out))
    }
}

fn http_builder(cfg: &LlmSection) -> reqwest::ClientBuilder {
    reqwest::Client::builder().timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
}

impl CompletionClient for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<Value>, TransportError> {
        debug!(provider = ?self.provider, model = %self.model, "sending completion request");
        match self.provider {
            Provider::OpenAI => self.openai_complete(request).await,
            Provider::Anthropic => self.anthropic_complete(request).await,
        }
    }
}

fn transport(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connection(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

const MAX_ERROR_BODY_LEN: usize = 500;

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() > MAX_ERROR_BODY_LEN {
        body.chars().take(MAX_ERROR_BODY_LEN).collect::<String>() + "…"
    } else {
        body.to_string()
    }
}

fn decode(provider: &str, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        return TransportError::Timeout;
    }
    TransportError::Other(format!("parse {provider} response: {e}"))
}

#[derive(Serialize)]
struct Msg {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OaiReq {
    model: String,
    messages: Vec<Msg>,
    temperature: f32,
    response_format: Value,
}

#[derive(Deserialize)]
struct OaiResp {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: Option<String>,
}

#[derive(Serialize)]
struct AnthropicReq {
    model: String,
    max_tokens: i32,
    system: String,
    messages: Vec<Msg>,
    temperature: f32,
}

#[derive(Deserialize)]
struct AnthropicResp {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    t: String,
    text: Option<String>,
}

fn openai_output(out: OaiResp) -> Option<Value> {
    let content = out.choices.into_iter().next()?.message.content?;
    parse_completion_text(&content)
}

fn anthropic_output(out: AnthropicResp) -> Option<Value> {
    let mut s = String::new();
    for b in out.content {
        if b.t == "text" {
            if let Some(t) = b.text {
                s.push_str(&t);
            }
        }
    }
    parse_completion_text(&s)
}
