use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use image::{ImageBuffer, ImageFormat, Rgb};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use tracing::{info, error, warn};

use crate::capabilities::{ImageReply, ReasoningCapability, ReasoningRequest, SynthesisCapability, VisionCapability};
use crate::config::{GeminiConfig, DEMO_KEY};
use crate::error::{Capability, CapabilityError};
use crate::models::{Finger, StyleHint};

const VISION_INSTRUCTIONS: &str = "You are measuring a single fingernail from a photograph. \
Respond with one JSON object with the keys \"nail_width\" and \"nail_length\" (millimetres), \
\"nail_area\" (square millimetres, optional), \"nail_curvature\" (0 to 1, optional), \
\"shape_category\" (one of oval, square, round, almond, coffin, stiletto, unknown) and \
\"confidence\" (0 to 1). Return JSON only.";

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let serde_json::Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = serde_json::Value::String(format!("{}...[truncated {} chars]", head(s, 50), s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

/// At most `n` chars of `s`, cut on a char boundary.
fn head(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

fn preview(data: &str) -> String {
    let total = data.chars().count();
    if total > 50 {
        format!("{}...[{} chars total]", head(data, 50), total)
    } else {
        data.to_string()
    }
}

/// Maps a non-success HTTP status onto the capability error taxonomy.
fn classify_status(capability: Capability, status: StatusCode, body: &str) -> CapabilityError {
    let message = format!("status={} body={}", status, body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => CapabilityError::RateLimited { capability, message },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CapabilityError::Configuration { capability, message },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => CapabilityError::Timeout { capability, message },
        _ => CapabilityError::Upstream { capability, message },
    }
}

/// Request URLs never reach the message; callers see it in error bodies.
fn transport_error(capability: Capability, e: reqwest::Error) -> CapabilityError {
    let timed_out = e.is_timeout();
    let message = e.without_url().to_string();
    if timed_out {
        CapabilityError::Timeout { capability, message }
    } else {
        CapabilityError::Upstream { capability, message }
    }
}

/// Gemini-backed implementation of all three capabilities.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    image_model: String,
    text_model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            image_model: config.image_model.clone(),
            text_model: config.text_model.clone(),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.api_key == DEMO_KEY || self.api_key.is_empty()
    }

    fn demo_unavailable(capability: Capability) -> CapabilityError {
        CapabilityError::Configuration {
            capability,
            message: "GEMINI_API_KEY is not set (demo mode)".into(),
        }
    }

    async fn perform_api_call(
        &self,
        capability: Capability,
        model: &str,
        request_body: serde_json::Value,
    ) -> Result<GeminiResponse, CapabilityError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        info!("🔗 Making {} request to: {}", capability, url);

        let mut logged_body = request_body.clone();
        truncate_base64_in_json(&mut logged_body);
        info!("📤 Request body: {}", serde_json::to_string_pretty(&logged_body).unwrap_or_default());

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_error(capability, e))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await
            .map_err(|e| transport_error(capability, e))?;

        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            return Err(classify_status(capability, status, &response_text));
        }

        // Truncate base64 image data for cleaner logging
        let truncated_response = if response_text.len() > 1000 {
            if let Ok(mut json_value) = serde_json::from_str::<serde_json::Value>(&response_text) {
                truncate_base64_in_json(&mut json_value);
                serde_json::to_string_pretty(&json_value).unwrap_or_else(|_| preview(&response_text))
            } else {
                preview(&response_text)
            }
        } else {
            response_text.clone()
        };
        info!("📥 Raw Gemini API response: {}", truncated_response);

        serde_json::from_str(&response_text).map_err(|e| CapabilityError::Upstream {
            capability,
            message: format!("parse error: {}", e),
        })
    }

    fn placeholder_image(prompt: &str, hint: StyleHint) -> Result<String, CapabilityError> {
        // Soft pastel swatches for natural renders, saturated ones for vivid
        let palette: [[u8; 3]; 4] = match hint {
            StyleHint::Natural => [[233, 196, 200], [214, 190, 230], [250, 224, 196], [196, 222, 214]],
            StyleHint::Vivid => [[220, 38, 97], [124, 58, 237], [234, 88, 12], [13, 148, 136]],
        };
        let [r, g, b] = palette[prompt.len() % palette.len()];

        let img = ImageBuffer::from_fn(256, 256, |_, y| {
            let fade = y as f32 / 255.0 * 0.4;
            let mix = |c: u8| (c as f32 + (255.0 - c as f32) * fade) as u8;
            Rgb([mix(r), mix(g), mix(b)])
        });

        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, ImageFormat::Png).map_err(|e| CapabilityError::Upstream {
            capability: Capability::Synthesis,
            message: format!("placeholder encoding failed: {}", e),
        })?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(png.into_inner());
        Ok(format!("data:image/png;base64,{}", encoded))
    }
}

#[async_trait]
impl SynthesisCapability for GeminiClient {
    async fn synthesize(&self, prompt: &str, hint: StyleHint) -> Result<ImageReply, CapabilityError> {
        if self.is_demo() {
            info!("Using demo mode - no real images generated");
            let placeholder = Self::placeholder_image(prompt, hint)?;
            info!("📦 Generated placeholder image: {}", preview(&placeholder));
            return Ok(ImageReply { image_ref: Some(placeholder), texts: vec![] });
        }

        let rendering = match hint {
            StyleHint::Vivid => "Rendering style: vivid, hyper-real colors and dramatic lighting.",
            StyleHint::Natural => "Rendering style: natural, true-to-life colors and soft lighting.",
        };
        let request_body = json!({
            "contents": [{
                "parts": [{"text": format!("{}\n\n{}", prompt, rendering)}]
            }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
                "temperature": 0.4,
                "topP": 0.95,
                "topK": 64,
                "candidateCount": 1
            }
        });

        info!("Generating nail design with Gemini API ({} style)...", hint);
        let parsed = self.perform_api_call(Capability::Synthesis, &self.image_model, request_body).await?;

        let image_ref = extract_first_image(&parsed)
            .map(|inline| format!("data:{};base64,{}", inline.mime_type, inline.data));
        match &image_ref {
            Some(data) => info!("✅ Successfully generated image: {}", preview(data)),
            None => warn!("⚠️ No image data found in API response"),
        }
        Ok(ImageReply { image_ref, texts: extract_texts(&parsed) })
    }
}

#[async_trait]
impl ReasoningCapability for GeminiClient {
    async fn reason(&self, request: &ReasoningRequest) -> Result<String, CapabilityError> {
        if self.is_demo() {
            info!("Using demo mode - structured analysis unavailable");
            return Err(Self::demo_unavailable(Capability::Reasoning));
        }

        let payload = json!({
            "systemInstruction": { "parts": [{"text": request.instructions}] },
            "contents": [{
                "parts": [{"text": request.prompt}]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.7,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": 1024
            }
        });

        let parsed = self.perform_api_call(Capability::Reasoning, &self.text_model, payload).await?;
        first_text(&parsed, Capability::Reasoning)
    }
}

#[async_trait]
impl VisionCapability for GeminiClient {
    async fn measure(&self, image: &Bytes, finger: &Finger) -> Result<String, CapabilityError> {
        if self.is_demo() {
            info!("Using demo mode - nail measurement unavailable");
            return Err(Self::demo_unavailable(Capability::Vision));
        }

        let mime_type = image::guess_format(image)
            .map(|format| format.to_mime_type())
            .unwrap_or("image/jpeg");
        let payload = json!({
            "systemInstruction": { "parts": [{"text": VISION_INSTRUCTIONS}] },
            "contents": [{
                "parts": [
                    {"text": format!("Measure the nail of the {}.", finger.display_name().to_lowercase())},
                    {"inlineData": {
                        "mimeType": mime_type,
                        "data": base64::engine::general_purpose::STANDARD.encode(image)
                    }}
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.0
            }
        });

        info!("📏 Measuring {} ({} bytes, {})", finger, image.len(), mime_type);
        let parsed = self.perform_api_call(Capability::Vision, &self.text_model, payload).await?;
        first_text(&parsed, Capability::Vision)
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData
    },
    Text { text: String },
    #[allow(dead_code)]
    Other(serde_json::Value)
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

fn parts(resp: &GeminiResponse) -> impl Iterator<Item = &Part> {
    resp.candidates.iter().flat_map(|c| c.content.parts.iter())
}

fn extract_first_image(resp: &GeminiResponse) -> Option<&InlineData> {
    parts(resp).find_map(|p| match p {
        Part::Inline { inline_data } => {
            info!("🎯 Found image data with mime type: {}", inline_data.mime_type);
            Some(inline_data)
        }
        _ => None,
    })
}

fn extract_texts(resp: &GeminiResponse) -> Vec<String> {
    parts(resp)
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.trim().to_string()),
            _ => None,
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn first_text(resp: &GeminiResponse, capability: Capability) -> Result<String, CapabilityError> {
    extract_texts(resp).into_iter().next().ok_or_else(|| CapabilityError::Upstream {
        capability,
        message: "No text content found in response".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn client_with_key(api_key: &str) -> GeminiClient {
        GeminiClient::new(&GeminiConfig {
            api_key: api_key.into(),
            base_url: "http://127.0.0.1:9/".into(),
            image_model: "img".into(),
            text_model: "txt".into(),
            timeout: Duration::from_secs(1),
        })
    }

    fn demo_client() -> GeminiClient {
        client_with_key(DEMO_KEY)
    }

    #[test]
    fn previews_cut_on_char_boundaries() {
        let text = format!("a{}", "é".repeat(600));
        let shown = preview(&text);
        assert!(shown.starts_with(&format!("a{}", "é".repeat(49))));
        assert!(shown.ends_with("...[601 chars total]"));
        assert_eq!(head("short", 50), "short");

        let mut value = json!({"data": "é".repeat(200)});
        truncate_base64_in_json(&mut value);
        assert_eq!(value["data"].as_str().unwrap(), "é".repeat(200));
    }

    #[tokio::test]
    async fn transport_failures_do_not_expose_the_api_key() {
        let key = "AIzaSySECRETKEY1234567890";
        let client = client_with_key(key);
        let err = client.synthesize("a brief", StyleHint::Natural).await.unwrap_err();
        assert_eq!(err.capability(), Capability::Synthesis);
        assert!(!err.message().contains(key), "key leaked: {}", err.message());
        assert!(!err.to_string().contains(key));

        let request = ReasoningRequest { instructions: "x".into(), prompt: "y".into() };
        let err = client.reason(&request).await.unwrap_err();
        assert!(!err.to_string().contains(key));
    }

    #[test]
    fn long_base64_payloads_are_truncated_for_logs() {
        let data = "A".repeat(400);
        let mut value = json!({"parts": [{"inlineData": {"mimeType": "image/png", "data": data}}]});
        truncate_base64_in_json(&mut value);
        let logged = value["parts"][0]["inlineData"]["data"].as_str().unwrap();
        assert!(logged.ends_with("...[truncated 350 chars]"));
        assert_eq!(value["parts"][0]["inlineData"]["mimeType"], "image/png");
    }

    #[test]
    fn statuses_map_to_capability_errors() {
        let c = Capability::Synthesis;
        assert!(matches!(classify_status(c, StatusCode::TOO_MANY_REQUESTS, ""), CapabilityError::RateLimited { .. }));
        assert!(matches!(classify_status(c, StatusCode::FORBIDDEN, ""), CapabilityError::Configuration { .. }));
        assert!(matches!(classify_status(c, StatusCode::GATEWAY_TIMEOUT, ""), CapabilityError::Timeout { .. }));
        let err = classify_status(c, StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(err.message(), "status=500 Internal Server Error body=boom");
    }

    #[test]
    fn first_inline_image_and_texts_are_extracted() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [
                {"text": " Here is your design "},
                {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo"}},
                {"functionCall": {"name": "noop"}}
            ]}}]
        }))
        .unwrap();
        let image = extract_first_image(&resp).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "iVBORw0KGgo");
        assert_eq!(extract_texts(&resp), vec!["Here is your design".to_string()]);
    }

    #[test]
    fn missing_text_is_an_upstream_error() {
        let resp: GeminiResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        let err = first_text(&resp, Capability::Reasoning).unwrap_err();
        assert_eq!(err.capability(), Capability::Reasoning);
    }

    #[tokio::test]
    async fn demo_mode_renders_a_png_placeholder() {
        let client = demo_client();
        let reply = client.synthesize("a brief", StyleHint::Vivid).await.unwrap();
        let image_ref = reply.image_ref.unwrap();
        let encoded = image_ref.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[tokio::test]
    async fn demo_mode_has_no_reasoning_or_vision() {
        let client = demo_client();
        let request = ReasoningRequest { instructions: "x".into(), prompt: "y".into() };
        assert!(matches!(
            client.reason(&request).await,
            Err(CapabilityError::Configuration { capability: Capability::Reasoning, .. })
        ));
        assert!(matches!(
            client.measure(&Bytes::from_static(b"jpeg"), &Finger::LeftThumb).await,
            Err(CapabilityError::Configuration { capability: Capability::Vision, .. })
        ));
    }
}
