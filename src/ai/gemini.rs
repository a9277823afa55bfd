// src/ai/gemini.rs
use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::connector::VisionConnector;
use super::prompts::PromptTemplate;
use crate::config::ModelConfig;
use crate::error::{ModelError, StartupError};
use crate::upload::EncodedImagePayload;

// Implementation for the Gemini generateContent REST API
pub struct GeminiClient {
    endpoint: String,
    model_name: String,
    api_key: String,
    timeout: Duration,
    client: Client,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GeminiClient {
    pub fn new(config: &ModelConfig) -> Result<Self, StartupError> {
        info!("Initializing vision model client: {} at {}", config.model, config.endpoint);

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StartupError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model_name: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
            client,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model_name)
    }

    /// Check that the endpoint knows the configured model and accepts the key
    pub fn check_model_available(&self) -> Result<(), ModelError> {
        let url = format!("{}/v1beta/models/{}", self.endpoint, self.model_name);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(classify_failure(status, &body))
    }

    fn transport_error(&self, e: reqwest::Error) -> ModelError {
        if e.is_timeout() {
            ModelError::Timeout(self.timeout.as_secs())
        } else {
            ModelError::Network(e.to_string())
        }
    }
}

impl VisionConnector for GeminiClient {
    fn describe(&self, payload: &EncodedImagePayload, prompt: &PromptTemplate) -> Result<String, ModelError> {
        info!(
            "Sending {} prompt to {} ({} base64 chars)",
            prompt.id,
            self.model_name,
            payload.data.len()
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: prompt.text },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: payload.mime_type,
                            data: &payload.data,
                        },
                    },
                ],
            }],
        };

        let started = Instant::now();
        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().map_err(|e| self.transport_error(e))?;
        debug!("Model responded {} in {:?}", status, started.elapsed());

        if !status.is_success() {
            let err = classify_failure(status, &body);
            warn!("Vision model call failed: {}", err);
            return Err(err);
        }

        let text = extract_text(&body)?;
        info!(
            "Received {} chars from {} in {:.1}s",
            text.len(),
            self.model_name,
            started.elapsed().as_secs_f32()
        );
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn classify_failure(status: StatusCode, body: &str) -> ModelError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("no details").to_string()
            } else {
                trimmed.to_string()
            }
        });

    let mentions_key = message.to_lowercase().contains("api key");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ModelError::Auth(message),
        StatusCode::BAD_REQUEST if mentions_key => ModelError::Auth(message),
        _ => ModelError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn extract_text(body: &str) -> Result<String, ModelError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ModelError::Malformed(e.to_string()))?;

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("no candidates returned (blocked: {})", r))
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(ModelError::Malformed(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(ModelError::Malformed(format!("candidate had no text (finish reason: {})", reason)));
    }
    Ok(text)
}
