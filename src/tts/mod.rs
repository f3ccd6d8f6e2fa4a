//! Модуль для работы с TTS
//!
//! Синтез речи делегирован внешнему провайдеру. Оркестратор видит его через
//! трейт `SpeechSynthesizer` и любую ошибку считает ошибкой сегмента.

pub mod openai;

use async_trait::async_trait;

use crate::error::Result;
use crate::utils::temp::Clip;

pub use openai::OpenAiCompatibleSynthesizer;

/// Клиент синтеза речи
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Озвучивает `text` голосом `voice_id` во временный клип
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Clip>;
}
