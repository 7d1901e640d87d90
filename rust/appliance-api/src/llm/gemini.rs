//! Gemini `generateContent` driver implementing [`DeviceOracle`].

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use selection_engine::OracleError;
use selection_engine::oracle::DeviceOracle;
use selection_engine::record::{Device, MatchedDevice, Mode, SourceDocument};

use super::prompts;
use crate::config::{ConfigResult, ConfigurationError, GeminiConfig};
use crate::logging::OpTimer;

/// Live oracle calling the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiOracle {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_output_tokens: u32,
    /// Canonical group names as a JSON array, embedded in the matching prompt.
    canonical_groups: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DevicesEnvelope<T> {
    devices: Vec<T>,
}

impl GeminiOracle {
    /// Build the oracle from configuration.
    ///
    /// Fails when no API key is configured or the canonical group list
    /// cannot be read.
    pub fn from_config(config: &GeminiConfig) -> ConfigResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ConfigurationError::missing_required(
                "oracle.gemini.api_key",
                "live extraction and matching (enableLlmCalls=true)",
                "GEMINI_API_KEY",
            )
        })?;

        let path = &config.canonical_groups_path;
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::invalid(
                format!("cannot read canonical group list {}: {e}", path.display()),
                "Set APPLIANCE__ORACLE__GEMINI__CANONICAL_GROUPS_PATH to a JSON array of device names",
            )
        })?;
        let groups: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
            ConfigurationError::invalid(
                format!("canonical group list {} is not a JSON string array: {e}", path.display()),
                "The file must contain an array such as [\"Herd\", \"Kühltisch\"]",
            )
        })?;
        let canonical_groups = serde_json::to_string(&groups).map_err(|e| {
            ConfigurationError::invalid(format!("cannot encode canonical groups: {e}"), "Check the file contents")
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ConfigurationError::invalid(
                    format!("cannot build HTTP client: {e}"),
                    "Check TLS support of this build",
                )
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
            canonical_groups,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(&self, parts: Vec<Value>, schema: Value) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": 0,
                "responseMimeType": "application/json",
                "responseSchema": schema,
                "maxOutputTokens": self.max_output_tokens,
            }
        })
    }

    /// Send a request and decode the `{"devices": [...]}` JSON answer.
    async fn generate<T: DeserializeOwned>(&self, body: &Value) -> Result<Vec<T>, OracleError> {
        let response = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(OracleError::Request(format!("Gemini API error ({status}): {text}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(format!("unexpected response body: {e}")))?;
        decode_devices(parsed)
    }
}

fn decode_devices<T: DeserializeOwned>(
    response: GenerateContentResponse,
) -> Result<Vec<T>, OracleError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::Malformed("response has no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(OracleError::Malformed(format!(
            "response has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    let envelope: DevicesEnvelope<T> = serde_json::from_str(&text)
        .map_err(|e| OracleError::Malformed(format!("response is not a device list: {e}")))?;
    Ok(envelope.devices)
}

#[async_trait]
impl DeviceOracle for GeminiOracle {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        mode: Mode,
    ) -> Result<Vec<Device>, OracleError> {
        let prompt = match mode {
            Mode::FillFromCatalog => prompts::EXTRACTION_WITH_VENDOR,
            Mode::SaveNew => prompts::EXTRACTION,
        };
        let parts = vec![
            json!({
                "inlineData": {
                    "mimeType": "application/pdf",
                    "data": BASE64.encode(document.as_bytes()),
                }
            }),
            json!({ "text": prompt }),
        ];
        let body = self.request_body(parts, prompts::extraction_schema());

        let timer = OpTimer::new("gemini", "extract");
        let result = self.generate(&body).await;
        timer.finish_with_result(result.as_ref());
        result
    }

    async fn match_devices(&self, devices: &[Device]) -> Result<Vec<MatchedDevice>, OracleError> {
        let devices_json = serde_json::to_string(&json!({ "devices": devices }))
            .map_err(|e| OracleError::Malformed(format!("cannot encode devices: {e}")))?;
        let prompt = prompts::matching_prompt(&self.canonical_groups, &devices_json);
        let body = self.request_body(vec![json!({ "text": prompt })], prompts::matching_schema());

        let timer = OpTimer::new("gemini", "match");
        let result = self.generate(&body).await;
        timer.finish_with_result(result.as_ref());
        result
    }
}
