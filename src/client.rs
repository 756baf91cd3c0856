use async_trait::async_trait;
use base64::Engine as _;

use crate::config::Config;
use crate::decoder::decode_image_stream;
use crate::http::send_checked;
use crate::request::GenerationRequest;
use crate::sse::sse_reader_from_response;
use crate::{IllustrateError, Result};

/// Seam between the batch driver and the remote generation API.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn model_id(&self) -> &str;

    /// Returns the decoded image bytes, or `None` when the stream completed
    /// without an image.
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<Vec<u8>>>;
}

/// Streaming client for `POST <base>/responses`.
#[derive(Clone)]
pub struct ResponsesImageClient {
    http: reqwest::Client,
    url: String,
    api_token: String,
    model: String,
}

impl ResponsesImageClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| IllustrateError::Config(format!("http client: {err}")))?;

        Ok(Self {
            http,
            url: config.responses_url(),
            api_token: config.api_token.clone(),
            model: config.model.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ImageGenerator for ResponsesImageClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Option<Vec<u8>>> {
        let body = serde_json::to_vec(request)?;
        tracing::debug!(url = %self.url, bytes = body.len(), "sending generation request");
        let req = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.api_token)
            .body(body);
        let response = send_checked(req).await?;

        let mut lines = sse_reader_from_response(response);
        let decoded = decode_image_stream(&mut lines).await?;
        tracing::debug!(
            events = decoded.events,
            saw_done = decoded.saw_done,
            "response stream finished"
        );

        let Some(image_b64) = decoded.image_b64 else {
            return Ok(None);
        };
        let bytes = base64::engine::general_purpose::STANDARD.decode(image_b64.trim())?;
        Ok(Some(bytes))
    }
}
