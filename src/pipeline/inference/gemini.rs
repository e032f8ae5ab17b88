use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::gemini_types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};
use super::types::VisionClient;
use super::InferenceError;
use crate::config::GeminiConfig;
use crate::pipeline::analysis::ExtractionRequest;

/// Gemini REST client for multimodal inference.
///
/// Built once at start-up. `reqwest::Client` pools connections internally,
/// so one instance serves every request.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, InferenceError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| InferenceError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client,
            timeout_secs: config.timeout_secs,
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn map_send_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_connect() {
            InferenceError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            InferenceError::Timeout(self.timeout_secs.unwrap_or_default())
        } else {
            InferenceError::HttpClient(e.to_string())
        }
    }
}

#[async_trait]
impl VisionClient for GeminiClient {
    async fn infer(&self, request: &ExtractionRequest) -> Result<String, InferenceError> {
        let image = request.image();
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.as_str(),
                            data: &image.data,
                        },
                    },
                    Part::Text {
                        text: request.instruction(),
                    },
                ],
            }],
            generation_config: self
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::ResponseParsing(e.to_string()))?;

        parsed.reply_text()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock vision client for testing. Returns a canned reply or failure and
/// counts how often it was called.
pub struct MockVisionClient {
    reply: Result<String, InferenceError>,
    calls: AtomicUsize,
    last_request: Mutex<Option<ExtractionRequest>>,
}

impl MockVisionClient {
    pub fn replying(reply: &str) -> Self {
        Self::with_result(Ok(reply.to_string()))
    }

    pub fn failing(error: InferenceError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(reply: Result<String, InferenceError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ExtractionRequest> {
        self.last_request.lock().ok().and_then(|slot| slot.clone())
    }
}

#[async_trait]
impl VisionClient for MockVisionClient {
    async fn infer(&self, request: &ExtractionRequest) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.last_request.lock() {
            *slot = Some(request.clone());
        }
        self.reply.clone()
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}
