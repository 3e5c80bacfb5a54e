//! OpenAI image backend using the `/v1/images/generations` API.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::credentials::ApiKey;

use super::{http_client, post_json, ImageData, ImageProvider, ImageRequest, ProviderError};

const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";

/// Image generation request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiImageRequest {
    /// Model identifier (e.g. `dall-e-3`).
    pub model: String,
    /// Image prompt.
    pub prompt: String,
    /// Number of images; always 1.
    pub n: u8,
    /// Dimension string such as `1024x1792`.
    pub size: String,
    /// Quality tier (`standard` or `hd`).
    pub quality: String,
    /// Requested encoding of the result.
    pub response_format: String,
}

/// Image generation response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiImageResponse {
    /// Generated images.
    pub data: Vec<OpenAiImageDatum>,
}

/// One generated image.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiImageDatum {
    /// Base64 image payload when `response_format` is `b64_json`.
    pub b64_json: Option<String>,
    /// Hosted image URL when `response_format` is `url`.
    pub url: Option<String>,
}

/// OpenAI image generation provider.
#[derive(Debug, Clone)]
pub struct OpenAiImageProvider {
    model_spec: String,
    model_name: String,
    quality: String,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl OpenAiImageProvider {
    /// Create a new image provider.
    pub fn new(model_spec: String, model_name: String, quality: String, api_key: ApiKey) -> Self {
        Self {
            model_spec,
            model_name,
            quality,
            api_key,
            client: http_client(),
        }
    }
}

/// Build the wire request for one image.
#[doc(hidden)]
pub fn build_request(model: &str, quality: &str, request: &ImageRequest) -> OpenAiImageRequest {
    OpenAiImageRequest {
        model: model.to_owned(),
        prompt: request.prompt.clone(),
        n: 1,
        size: request.size.as_str().to_owned(),
        quality: quality.to_owned(),
        response_format: "b64_json".to_owned(),
    }
}

/// Parse the first image out of a response body.
///
/// # Errors
///
/// Returns `ProviderError::Parse` when the body is malformed, empty, or the
/// base64 payload does not decode.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<ImageData, ProviderError> {
    let resp: OpenAiImageResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let datum = resp
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("image response carried no data".to_owned()))?;

    if let Some(encoded) = datum.b64_json {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| ProviderError::Parse(format!("invalid base64 image: {e}")))?;
        return Ok(ImageData::Bytes(bytes));
    }
    if let Some(raw) = datum.url {
        let url = url::Url::parse(&raw)
            .map_err(|e| ProviderError::Parse(format!("invalid image url: {e}")))?;
        return Ok(ImageData::Url(url));
    }
    Err(ProviderError::Parse(
        "image response had neither b64_json nor url".to_owned(),
    ))
}

#[async_trait::async_trait]
impl ImageProvider for OpenAiImageProvider {
    async fn generate(&self, request: ImageRequest) -> Result<ImageData, ProviderError> {
        let body = build_request(&self.model_name, &self.quality, &request);
        let call = self
            .client
            .post(OPENAI_IMAGES_URL)
            .bearer_auth(self.api_key.expose());
        parse_response(&post_json(call, &body).await?)
    }

    fn model_id(&self) -> &str {
        &self.model_spec
    }
}
