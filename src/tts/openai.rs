//! Клиент OpenAI-совместимого эндпоинта `/v1/audio/speech`
//!
//! Тот же протокол отдают OpenAI и локальные мосты к Edge TTS, поэтому
//! идентификатор голоса передаётся как есть.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::config::SpeechConfig;
use crate::error::{DialogueTtsError, Result};
use crate::tts::SpeechSynthesizer;
use crate::utils::temp::Clip;

/// Тело запроса к API
#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

/// HTTP клиент синтеза речи
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleSynthesizer {
    client: Client,
    config: SpeechConfig,
}

impl OpenAiCompatibleSynthesizer {
    pub fn new(config: SpeechConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(DialogueTtsError::Configuration("Speech endpoint URL is empty".to_string()));
        }
        if config.max_attempts == 0 {
            return Err(DialogueTtsError::Configuration("max_attempts must be at least 1".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    fn headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                .map_err(|e| DialogueTtsError::Configuration(format!("Invalid API key: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn request_audio(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        let body = SpeechRequest {
            model: &self.config.model,
            input: text,
            voice: voice_id,
            speed: self.config.speed,
            response_format: self.config.response_format.as_str(),
        };
        let headers = self.headers()?;
        let max_attempts = self.config.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("TTS request ({}/{}) voice={} text='{}'", attempt, max_attempts, voice_id, text);

            let response = self
                .client
                .post(&self.config.endpoint)
                .headers(headers.clone())
                .json(&body)
                .send()
                .await;

            let retry_reason = match response {
                Ok(resp) if resp.status().is_success() => {
                    let bytes = resp.bytes().await?;
                    if bytes.is_empty() {
                        return Err(DialogueTtsError::Synthesis(format!(
                            "Provider returned no audio for '{}'",
                            text
                        )));
                    }
                    info!("Received {} bytes of audio for voice {}", bytes.len(), voice_id);
                    return Ok(bytes.to_vec());
                }
                Ok(resp) => {
                    let status = resp.status();
                    let message = provider_message(&resp.text().await.unwrap_or_default());
                    error!("TTS API error (status {}): {}", status, message);
                    if !is_retryable(status) {
                        return Err(DialogueTtsError::Synthesis(format!("API error ({}): {}", status, message)));
                    }
                    format!("API error ({}): {}", status, message)
                }
                Err(e) => {
                    error!("TTS request failed: {}", e);
                    e.to_string()
                }
            };

            if attempt >= max_attempts {
                return Err(DialogueTtsError::Synthesis(format!(
                    "Giving up after {} attempts: {}",
                    attempt, retry_reason
                )));
            }

            let wait = Duration::from_secs(2u64.pow(attempt));
            warn!("Retrying TTS request in {}s...", wait.as_secs());
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiCompatibleSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Clip> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DialogueTtsError::Synthesis("Nothing to synthesize".to_string()));
        }

        let audio = self.request_audio(text, voice_id).await?;
        let suffix = format!(".{}", self.config.response_format.as_str());
        Clip::from_bytes("tts_", &suffix, &audio)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Достаёт `error.message` из JSON ответа или возвращает тело целиком
fn provider_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "unknown provider error".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResponseFormat;

    #[test]
    fn test_provider_message() {
        assert_eq!(provider_message(r#"{"error":{"message":"Invalid voice"}}"#), "Invalid voice");
        assert_eq!(provider_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(provider_message("  "), "unknown provider error");
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_config_validation() {
        let config = SpeechConfig {
            endpoint: "  ".to_string(),
            ..SpeechConfig::default()
        };
        assert!(OpenAiCompatibleSynthesizer::new(config).is_err());

        let config = SpeechConfig {
            max_attempts: 0,
            ..SpeechConfig::default()
        };
        assert!(OpenAiCompatibleSynthesizer::new(config).is_err());
    }

    #[test]
    fn test_request_body_shape() {
        let body = SpeechRequest {
            model: "tts-1",
            input: "Hello",
            voice: "en-GB-RyanNeural",
            speed: 1.0,
            response_format: ResponseFormat::Wav.as_str(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["voice"], "en-GB-RyanNeural");
        assert_eq!(json["response_format"], "wav");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_synthesis_error() {
        let synth = OpenAiCompatibleSynthesizer::new(SpeechConfig {
            endpoint: "http://127.0.0.1:9/v1/audio/speech".to_string(),
            max_attempts: 1,
            timeout_secs: 2,
            ..SpeechConfig::default()
        })
        .unwrap();
        let err = synth.synthesize("Hello", "en-US-JennyNeural").await.unwrap_err();
        assert!(matches!(err, DialogueTtsError::Synthesis(_)));
    }
}
