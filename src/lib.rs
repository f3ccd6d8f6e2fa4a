//! Основной файл библиотеки dialogue-tts
//!
//! Библиотека превращает сценарий диалога вида `A: текст [pause_1.5] текст`
//! в аудиофайлы по одному на реплику и, при желании, в общий склеенный файл.
//! Синтез речи выполняет внешний OpenAI-совместимый сервис, паузы и склейка
//! делаются локально.

pub mod config;
pub mod error;
pub mod generator;
pub mod logger;
pub mod media;
pub mod preview;
pub mod progress;
pub mod run;
pub mod script;
pub mod tts;
pub mod utils;
pub mod voices;

use std::path::Path;

use tokio_util::sync::CancellationToken;

pub use crate::config::AppConfig;
pub use crate::error::{DialogueTtsError, Result};
pub use crate::generator::{DialogueGenerator, GenerationRequest, GenerationResult, OutputSettings, RunOutcome};
pub use crate::media::playback::{AudioPlayer, PlaybackReport};
pub use crate::preview::PreviewReport;
pub use crate::progress::{EventSink, GenerationEvent, StatusKind};
pub use crate::run::RunHandle;
pub use crate::script::{DialogueLine, ScriptWarning};

/// Основная структура для работы с библиотекой
pub struct DialogueTts {
    config: AppConfig,
    player: AudioPlayer,
}

impl DialogueTts {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            player: AudioPlayer::with_default_backends(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// Разбирает сценарий и запускает прогон в фоне.
    ///
    /// Ошибки конфигурации (шаблон имени, имя склеенного файла, пустой
    /// сценарий) возвращаются сразу, до начала синтеза.
    pub fn start(&self, script: &str) -> Result<(RunHandle, Vec<ScriptWarning>)> {
        let (request, warnings) = GenerationRequest::from_script(script, &self.config)?;
        let generator = DialogueGenerator::from_config(&self.config)?;
        let handle = RunHandle::spawn(generator, request)?;
        Ok((handle, warnings))
    }

    /// Прослушать готовый файл
    pub fn play_file(&self, path: &Path) -> PlaybackReport {
        self.player.play(path)
    }

    /// Озвучивает сценарий во временные клипы и проигрывает их по порядку.
    ///
    /// Блокирует вызывающий поток до конца воспроизведения, поэтому вызывать
    /// его нужно вне асинхронного рантайма.
    pub fn preview_script(&self, script: &str) -> Result<PreviewReport> {
        let lines = preview::preview_lines(script, &self.config.voices);
        let generator = DialogueGenerator::from_config(&self.config)?;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let rendered = runtime.block_on(preview::render_preview(&generator, &lines, &CancellationToken::new()));
        Ok(preview::play_preview(&self.player, rendered))
    }
}

impl Default for DialogueTts {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    mod mock;
    mod test_generator;
    mod test_preview;
    mod test_run_handle;
}
