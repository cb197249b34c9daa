use reqwest::Client;
use serde_json::{json, Value};

use crate::config::GeminiConfig;
use crate::error::{Result, StudioError};
use crate::image::{strip_data_uri_prefix, EncodedImage};
use crate::ImageGenerator;

/// Async client for the Gemini image endpoints.
///
/// Text-to-image goes through the Imagen `:predict` route; edits go through
/// `:generateContent` with the base image supplied inline.
///
/// # Example
/// ```no_run
/// use menu_photographer::{GeminiClient, GeminiConfig, ImageGenerator};
///
/// # async fn example() -> menu_photographer::Result<()> {
/// let client = GeminiClient::new(GeminiConfig::from_env()?);
/// let image = client.generate("A rustic photo of a delicious soup").await?;
/// assert!(image.starts_with("data:image/"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.endpoint.trim_end_matches('/'),
            model,
            method
        )
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .timeout(self.config.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| StudioError::Network {
                context: format!("Cannot connect to Gemini at {}", self.config.endpoint),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status, url, "gemini request rejected");
            return Err(StudioError::Http { status, body });
        }

        resp.json().await.map_err(|e| StudioError::Network {
            context: "Failed to parse Gemini response".into(),
            source: e,
        })
    }
}

impl ImageGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = generate_request_body(&self.config, prompt);
        let url = self.model_url(&self.config.generation_model, "predict");
        let json = self.post(&url, &body).await?;
        let image = parse_generate_response(&json, &self.config.output_mime_type)?;
        tracing::debug!(
            model = %self.config.generation_model,
            bytes = image.data.len(),
            "image generated"
        );
        Ok(image.to_data_uri())
    }

    async fn edit(&self, base_image: &str, mime_type: &str, instruction: &str) -> Result<String> {
        let body = edit_request_body(base_image, mime_type, instruction);
        let url = self.model_url(&self.config.edit_model, "generateContent");
        let json = self.post(&url, &body).await?;
        let image = parse_edit_response(&json)?;
        tracing::debug!(
            model = %self.config.edit_model,
            mime_type = %image.mime_type,
            bytes = image.data.len(),
            "image edited"
        );
        Ok(image.to_data_uri())
    }
}

fn generate_request_body(config: &GeminiConfig, prompt: &str) -> Value {
    json!({
        "instances": [{ "prompt": prompt }],
        "parameters": {
            "sampleCount": 1,
            "aspectRatio": config.aspect_ratio,
            "outputOptions": { "mimeType": config.output_mime_type },
        },
    })
}

fn edit_request_body(base_image: &str, mime_type: &str, instruction: &str) -> Value {
    json!({
        "contents": [{
            "parts": [
                {
                    "inlineData": {
                        "mimeType": mime_type,
                        "data": strip_data_uri_prefix(base_image),
                    }
                },
                { "text": instruction },
            ]
        }],
        "generationConfig": { "responseModalities": ["IMAGE"] },
    })
}

/// Extract the first image from an Imagen `:predict` response.
pub fn parse_generate_response(json: &Value, fallback_mime: &str) -> Result<EncodedImage> {
    let prediction = json
        .get("predictions")
        .and_then(|p| p.as_array())
        .and_then(|preds| {
            preds.iter().find_map(|p| {
                let data = p.get("bytesBase64Encoded").and_then(|b| b.as_str())?;
                (!data.is_empty()).then_some((p, data))
            })
        });
    let Some((prediction, data)) = prediction else {
        return Err(StudioError::NoImage("No images were generated.".into()));
    };

    let mime_type = prediction
        .get("mimeType")
        .and_then(|m| m.as_str())
        .unwrap_or(fallback_mime);

    Ok(EncodedImage::new(mime_type, data))
}

/// Extract the first `image/*` inline part from a `:generateContent` response.
pub fn parse_edit_response(json: &Value) -> Result<EncodedImage> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| StudioError::NoImage("No content received from image editing.".into()))?;

    parts
        .iter()
        .filter_map(|part| part.get("inlineData"))
        .find_map(|inline| {
            let mime_type = inline.get("mimeType").and_then(|m| m.as_str())?;
            let data = inline.get("data").and_then(|d| d.as_str())?;
            (mime_type.starts_with("image/") && !data.is_empty())
                .then(|| EncodedImage::new(mime_type, data))
        })
        .ok_or_else(|| {
            StudioError::NoImage("No image data found in the edited response.".into())
        })
}
