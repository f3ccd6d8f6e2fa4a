//! Модуль конфигурации библиотеки dialogue-tts
//!
//! Настройки синтеза, обработки аудио и вывода. Все поля имеют значения
//! по умолчанию, поэтому JSON-файл может содержать только нужные ключи.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::voices::VoiceAssignment;

/// Переменная окружения, перекрывающая API ключ из файла
pub const API_KEY_ENV: &str = "DIALOGUE_TTS_API_KEY";

/// Формат аудио, который возвращает провайдер
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Mp3,
    Wav,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

/// Настройки клиента синтеза речи
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Адрес OpenAI-совместимого эндпоинта `/v1/audio/speech`
    pub endpoint: String,
    /// API ключ (необязателен для локальных серверов)
    pub api_key: Option<String>,
    /// Модель TTS
    pub model: String,
    /// Формат ответа
    pub response_format: ResponseFormat,
    /// Скорость речи (0.25 - 4.0)
    pub speed: f32,
    /// Таймаут одного запроса в секундах
    pub timeout_secs: u64,
    /// Максимальное количество попыток на сегмент
    pub max_attempts: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            // Локальный мост к Edge TTS, понимающий имена голосов *Neural
            endpoint: "http://127.0.0.1:5050/v1/audio/speech".to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            response_format: ResponseFormat::default(),
            speed: 1.0,
            timeout_secs: 30,
            max_attempts: 3,
        }
    }
}

/// Настройки обработки аудио
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Частота дискретизации генерируемой тишины
    pub silence_sample_rate: u32,
    /// Частота, к которой приводятся клипы с разной частотой при склейке
    pub merge_sample_rate: u32,
    /// Разрешить ресемплинг при склейке
    pub resample: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            silence_sample_rate: 24_000,
            merge_sample_rate: 24_000,
            resample: true,
        }
    }
}

/// Настройки вывода
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Директория для результатов
    pub output_dir: PathBuf,
    /// Шаблон имени файла строки (`{index}`, `{speaker}`)
    pub filename_template: String,
    /// Склеить все строки в один файл
    pub merge: bool,
    /// Имя склеенного файла
    pub merged_filename: String,
    /// Удалить отдельные файлы после успешной склейки
    pub delete_singles: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let output_dir = dirs::desktop_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("TTS_Output");
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M");

        Self {
            output_dir,
            filename_template: "{index}_{speaker}.wav".to_string(),
            merge: true,
            merged_filename: format!("{}_merged.wav", stamp),
            delete_singles: true,
        }
    }
}

/// Полная конфигурация приложения
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub speech: SpeechConfig,
    pub audio: AudioConfig,
    pub output: OutputConfig,
    /// Назначение голосов говорящим
    pub voices: VoiceAssignment,
}

impl AppConfig {
    /// Загрузить конфигурацию из JSON-файла
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut config: AppConfig = serde_json::from_str(&raw)?;
        config.apply_env();
        log::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Сохранить конфигурацию в JSON-файл
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Применить переопределения из окружения
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.speech.api_key = Some(key.trim().to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "audio": { "merge_sample_rate": 16000 }, "output": { "merge": false } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.audio.merge_sample_rate, 16_000);
        assert_eq!(config.audio.silence_sample_rate, 24_000);
        assert!(!config.output.merge);
        assert_eq!(config.output.filename_template, "{index}_{speaker}.wav");
        assert_eq!(config.speech.response_format, ResponseFormat::Mp3);
        assert_eq!(config.voices.voice_for("A"), Some("en-GB-RyanNeural"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.speech.model = "tts-1-hd".to_string();
        config.output.delete_singles = false;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.speech.model, "tts-1-hd");
        assert!(!loaded.output.delete_singles);
    }
}
