//! Модуль обработки ошибок библиотеки dialogue-tts
//!
//! Ошибки разделены по уровням: ошибки конфигурации прерывают запуск целиком,
//! ошибки синтеза и склейки восстанавливаются на уровне строки диалога.

use thiserror::Error;

/// Ошибки библиотеки dialogue-tts
#[derive(Debug, Error)]
pub enum DialogueTtsError {
    /// Неверный шаблон имени, выходная директория или пустой сценарий
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Провайдер речи не смог озвучить сегмент
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Не удалось склеить клипы
    #[error("Merge error: {0}")]
    Merge(String),

    /// Ошибка декодирования или ресемплинга
    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    /// Ни один способ воспроизведения не сработал
    #[error("Playback error: {0}")]
    Playback(String),

    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка чтения или записи WAV
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DialogueTtsError {
    /// Ошибка, которая прерывает весь запуск, а не одну строку
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Тип Result для библиотеки dialogue-tts
pub type Result<T> = std::result::Result<T, DialogueTtsError>;
