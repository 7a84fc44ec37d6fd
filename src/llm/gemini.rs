use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::GeminiConfig;
use crate::error::{CompanionError, Result};
use crate::llm::types::{GenerateContentRequest, GenerateContentResponse};

/// Client for the Gemini `generateContent` REST endpoint.
///
/// The API key is resolved once at startup and handed to the constructor;
/// it is sent in the `x-goog-api-key` header rather than the query string so
/// it never shows up in logged URLs.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(if config.timeout_secs > 0 {
                Duration::from_secs(config.timeout_secs)
            } else {
                Duration::from_secs(300)
            })
            .build()
            .map_err(|e| CompanionError::Config(format!("failed to create HTTP client: {e}")))?;

        info!(
            model = %config.model,
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            "Gemini client initialized"
        );

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full URL of the `generateContent` method for the configured model.
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        debug!(
            model = %self.model,
            turns = request.contents.len(),
            tools = request.tools.len(),
            "sending Gemini request"
        );

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CompanionError::Network(format!("Gemini request failed: {e}")))?;

        let status = resp.status();

        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            let error_msg = api_error_message(&error_text);

            warn!(
                status = %status,
                error = %error_msg,
                "Gemini API error"
            );

            return Err(CompanionError::Network(format!(
                "Gemini API returned {status}: {error_msg}"
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| CompanionError::Network(format!("failed to read Gemini response: {e}")))?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            debug!(body = %body, "undecodable Gemini response");
            CompanionError::ResponseShape(format!("failed to parse Gemini response: {e}"))
        })?;

        if let Some(usage) = parsed.usage_metadata {
            info!(
                prompt_tokens = usage.prompt_token_count,
                candidates_tokens = usage.candidates_token_count,
                total_tokens = usage.total_token_count,
                "Gemini usage"
            );
        }

        Ok(parsed)
    }
}

/// Pull `error.message` out of an API error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error: Some(ErrorBody { message }),
        }) => message,
        _ => body.to_string(),
    }
}
