//! Оркестратор генерации диалога
//!
//! Строки обрабатываются последовательно. Ошибка синтеза выбрасывает только
//! свою строку, отмена проверяется перед каждой строкой, перед каждым
//! сегментом и перед финальной склейкой. Уже записанные файлы при отмене
//! остаются на месте.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, OutputConfig};
use crate::error::{DialogueTtsError, Result};
use crate::media::merge::{AudioMerger, MergeMode};
use crate::media::silence::create_silence;
use crate::progress::{EventSink, GenerationEvent};
use crate::script::{parse_script, split_segments, validate_file_name, DialogueLine, FilenameTemplate, ScriptWarning, Segment};
use crate::tts::{OpenAiCompatibleSynthesizer, SpeechSynthesizer};
use crate::utils::temp::{Clip, ClipFormat};
use crate::voices::display_name_for;

/// Куда и как сохранять результат
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub output_dir: PathBuf,
    pub filename_template: String,
    pub merge: bool,
    pub merged_filename: String,
    pub delete_singles: bool,
}

impl From<&OutputConfig> for OutputSettings {
    fn from(config: &OutputConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            filename_template: config.filename_template.clone(),
            merge: config.merge,
            merged_filename: config.merged_filename.clone(),
            delete_singles: config.delete_singles,
        }
    }
}

/// Проверенный запрос на генерацию
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    lines: Vec<DialogueLine>,
    output: OutputSettings,
    template: FilenameTemplate,
}

impl GenerationRequest {
    /// Проверяет шаблон имён, имя склеенного файла и наличие строк.
    /// Любая ошибка здесь - ошибка конфигурации, синтез не начинается.
    pub fn new(lines: Vec<DialogueLine>, output: OutputSettings) -> Result<Self> {
        if lines.is_empty() {
            return Err(DialogueTtsError::Configuration("No dialogue lines to generate".to_string()));
        }
        if output.output_dir.as_os_str().is_empty() {
            return Err(DialogueTtsError::Configuration("Output directory is not set".to_string()));
        }
        if let Some(line) = lines.iter().find(|l| l.voice_id.trim().is_empty()) {
            return Err(DialogueTtsError::Configuration(format!(
                "No voice assigned to speaker {}",
                line.speaker_id
            )));
        }

        let template = FilenameTemplate::parse(&output.filename_template)?;
        if output.merge {
            validate_file_name(&output.merged_filename)?;
        }

        // Имена сравниваются без учёта регистра: на части ФС это один файл
        let merged_key = output.merge.then(|| output.merged_filename.to_lowercase());
        let mut seen = HashMap::new();
        for (i, line) in lines.iter().enumerate() {
            let index = i + 1;
            let name = template.render(index, &line.speaker_id);
            let key = name.to_lowercase();
            if merged_key.as_deref() == Some(key.as_str()) {
                return Err(DialogueTtsError::Configuration(format!(
                    "Line {} would be saved as '{}', which is also the merged file name",
                    index, name
                )));
            }
            if let Some(previous) = seen.insert(key, index) {
                return Err(DialogueTtsError::Configuration(format!(
                    "Lines {} and {} would both be saved as '{}'",
                    previous, index, name
                )));
            }
        }

        Ok(Self { lines, output, template })
    }

    /// Разбирает сценарий и собирает запрос по конфигурации.
    /// Предупреждения разбора возвращаются вместе с запросом.
    pub fn from_script(script: &str, config: &AppConfig) -> Result<(Self, Vec<ScriptWarning>)> {
        let parsed = parse_script(script, &config.voices);
        let request = Self::new(parsed.lines, OutputSettings::from(&config.output))?;
        Ok((request, parsed.warnings))
    }

    pub fn lines(&self) -> &[DialogueLine] {
        &self.lines
    }

    pub fn output(&self) -> &OutputSettings {
        &self.output
    }

    /// Путь файла строки с номером `index` (с единицы)
    pub fn line_path(&self, index: usize, speaker: &str) -> PathBuf {
        self.output.output_dir.join(self.template.render(index, speaker))
    }

    pub fn merged_path(&self) -> PathBuf {
        self.output.output_dir.join(&self.output.merged_filename)
    }
}

/// Итоговое состояние прогона
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

/// Результат прогона
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Файлы в выходной директории, по порядку строк
    pub files: Vec<PathBuf>,
    /// Склеенный файл, если склейка удалась
    pub merged: Option<PathBuf>,
    pub outcome: RunOutcome,
    /// Номера строк (с единицы), которые не удалось озвучить
    pub failed_lines: Vec<usize>,
    pub warnings: Vec<String>,
    pub requested: usize,
}

impl GenerationResult {
    fn new(requested: usize) -> Self {
        Self {
            files: Vec::new(),
            merged: None,
            outcome: RunOutcome::Completed,
            failed_lines: Vec::new(),
            warnings: Vec::new(),
            requested,
        }
    }

    pub(crate) fn failed(requested: usize, error: impl Into<String>) -> Self {
        let mut result = Self::new(requested);
        result.outcome = RunOutcome::Failed(error.into());
        result
    }

    /// Прогон завершён, но часть строк пропущена
    pub fn is_partial(&self) -> bool {
        self.outcome == RunOutcome::Completed && !self.failed_lines.is_empty()
    }
}

enum LineOutcome {
    Produced(PathBuf),
    Cancelled,
}

/// Генератор диалога
#[derive(Clone)]
pub struct DialogueGenerator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    merger: AudioMerger,
    silence_sample_rate: u32,
}

impl DialogueGenerator {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, merger: AudioMerger, silence_sample_rate: u32) -> Self {
        Self {
            synthesizer,
            merger,
            silence_sample_rate,
        }
    }

    /// Генератор с HTTP клиентом синтеза из конфигурации
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let synthesizer = OpenAiCompatibleSynthesizer::new(config.speech.clone())?;
        Ok(Self::new(
            Arc::new(synthesizer),
            AudioMerger::from_config(&config.audio),
            config.audio.silence_sample_rate,
        ))
    }

    /// Выполняет прогон целиком. Ошибки строк и склейки попадают в события и
    /// в результат, а не в `Err`.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        events: &EventSink,
    ) -> GenerationResult {
        let total = request.lines.len();
        let mut result = GenerationResult::new(total);
        events.send(GenerationEvent::RunStarted { total });

        if let Err(e) = fs::create_dir_all(&request.output.output_dir) {
            let error = format!(
                "Cannot create output directory {}: {}",
                request.output.output_dir.display(),
                e
            );
            events.send(GenerationEvent::Failed { error: error.clone() });
            result.outcome = RunOutcome::Failed(error);
            return result;
        }

        for (i, line) in request.lines.iter().enumerate() {
            let index = i + 1;
            if cancel.is_cancelled() {
                return cancelled(result, events);
            }

            events.send(GenerationEvent::LineStarted {
                index,
                total,
                speaker: line.speaker_id.clone(),
                voice: display_name_for(&line.voice_id),
            });

            let output_path = request.line_path(index, &line.speaker_id);
            match self.generate_line(index, line, &output_path, cancel, events, &mut result).await {
                Ok(LineOutcome::Produced(path)) => {
                    events.send(GenerationEvent::LineCompleted {
                        index,
                        total,
                        path: path.clone(),
                    });
                    result.files.push(path);
                }
                Ok(LineOutcome::Cancelled) => return cancelled(result, events),
                Err(e) => {
                    result.failed_lines.push(index);
                    events.send(GenerationEvent::LineFailed {
                        index,
                        total,
                        error: e.to_string(),
                    });
                }
            }
        }

        if request.output.merge && !result.files.is_empty() {
            if cancel.is_cancelled() {
                return cancelled(result, events);
            }
            self.merge_all(request, events, &mut result);
        }

        events.send(GenerationEvent::Completed {
            produced: result.files.len(),
            requested: total,
        });
        result
    }

    /// Озвучивает одну строку в `output_path`. Временные клипы удаляются при
    /// выходе из функции в любом случае.
    async fn generate_line(
        &self,
        index: usize,
        line: &DialogueLine,
        output_path: &Path,
        cancel: &CancellationToken,
        events: &EventSink,
        result: &mut GenerationResult,
    ) -> Result<LineOutcome> {
        let Some(mut clips) = self
            .synthesize_line(index, line, cancel, events, &mut result.warnings)
            .await?
        else {
            return Ok(LineOutcome::Cancelled);
        };

        if clips.len() == 1 && clips[0].format() == ClipFormat::Wav {
            if let Some(clip) = clips.pop() {
                debug!("Moving {} to {}", clip.path().display(), output_path.display());
                return Ok(LineOutcome::Produced(clip.persist_to(output_path)?));
            }
        }

        let paths: Vec<&Path> = clips.iter().map(|c| c.path()).collect();
        let report = self.merger.merge(&paths, output_path)?;
        if !report.skipped.is_empty() {
            let message = format!("{} segment(s) skipped while joining", report.skipped.len());
            warn_line(index, message, events, &mut result.warnings);
        }
        Ok(LineOutcome::Produced(report.output))
    }

    /// Озвучивает сегменты строки во временные клипы по порядку.
    /// `None` означает, что прогон отменили между сегментами; уже готовые
    /// клипы при этом удаляются.
    pub(crate) async fn synthesize_line(
        &self,
        index: usize,
        line: &DialogueLine,
        cancel: &CancellationToken,
        events: &EventSink,
        warnings: &mut Vec<String>,
    ) -> Result<Option<Vec<Clip>>> {
        let segments = split_segments(&line.text);
        if segments.is_empty() {
            return Err(DialogueTtsError::Synthesis("Line has no text to speak".to_string()));
        }

        let mut clips: Vec<Clip> = Vec::with_capacity(segments.len());
        for segment in segments {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            match segment {
                Segment::Speech(text) => {
                    let clip = self.synthesizer.synthesize(&text, &line.voice_id).await?;
                    clips.push(clip);
                }
                Segment::Pause(duration) => {
                    let silence = create_silence(duration, self.silence_sample_rate)?;
                    if silence.degraded {
                        let message = format!("Pause of {}s written as 16-bit PCM fallback", duration);
                        warn_line(index, message, events, warnings);
                    }
                    clips.push(silence.clip);
                }
            }
        }

        Ok(Some(clips))
    }

    /// Собирает клипы строки в один временный клип для прослушивания.
    /// Если склейка не удалась, остаётся первый клип.
    pub(crate) fn join_into_clip(&self, mut clips: Vec<Clip>) -> Result<Clip> {
        if clips.len() <= 1 {
            return clips
                .pop()
                .ok_or_else(|| DialogueTtsError::Merge("No clips to join".to_string()));
        }

        let joined = Clip::create("tts_preview_", ".wav")?;
        let merged = {
            let paths: Vec<&Path> = clips.iter().map(|c| c.path()).collect();
            self.merger.merge(&paths, joined.path())
        };
        match merged {
            Ok(_) => Ok(joined),
            Err(e) => {
                warn!("Joining preview segments failed ({}), keeping the first one", e);
                Ok(clips.swap_remove(0))
            }
        }
    }

    fn merge_all(&self, request: &GenerationRequest, events: &EventSink, result: &mut GenerationResult) {
        let merged_path = request.merged_path();
        events.send(GenerationEvent::MergeStarted {
            files: result.files.len(),
        });

        let report = match self.merger.merge(&result.files, &merged_path) {
            Ok(report) => report,
            Err(e) => {
                let error = e.to_string();
                result.warnings.push(format!("Merge failed: {}", error));
                events.send(GenerationEvent::MergeFailed { error });
                return;
            }
        };

        if report.mode == MergeMode::RawFrames && !report.skipped.is_empty() {
            let message = format!(
                "{} file(s) with a different format were left out of the merged file",
                report.skipped.len()
            );
            result.warnings.push(message.clone());
            events.send(GenerationEvent::Warning { index: None, message });
        }

        events.send(GenerationEvent::MergeCompleted {
            path: report.output.clone(),
            duration_secs: report.duration_secs(),
        });

        if request.output.delete_singles {
            let mut kept = Vec::new();
            for file in result.files.drain(..) {
                if file == merged_path {
                    continue;
                }
                if let Err(e) = fs::remove_file(&file) {
                    warn!("Failed to delete {}: {}", file.display(), e);
                    kept.push(file);
                }
            }
            result.files = kept;
        } else {
            result.files.retain(|file| *file != merged_path);
        }

        result.files.push(merged_path.clone());
        result.merged = Some(merged_path);
    }
}

fn warn_line(index: usize, message: String, events: &EventSink, warnings: &mut Vec<String>) {
    warnings.push(format!("Line {}: {}", index, message));
    events.send(GenerationEvent::Warning {
        index: Some(index),
        message,
    });
}

fn cancelled(mut result: GenerationResult, events: &EventSink) -> GenerationResult {
    events.send(GenerationEvent::Cancelled {
        produced: result.files.len(),
    });
    result.outcome = RunOutcome::Cancelled;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voices::VoiceAssignment;
    use tempfile::tempdir;

    fn settings(dir: &Path) -> OutputSettings {
        OutputSettings {
            output_dir: dir.to_path_buf(),
            filename_template: "{index}_{speaker}.wav".to_string(),
            merge: false,
            merged_filename: "merged.wav".to_string(),
            delete_singles: false,
        }
    }

    #[test]
    fn test_request_validation() {
        let dir = tempdir().unwrap();
        let lines = vec![DialogueLine::new("A", "Hello", "en-US-JennyNeural")];

        assert!(GenerationRequest::new(Vec::new(), settings(dir.path())).is_err());

        let mut bad = settings(dir.path());
        bad.filename_template = "{index}_{foo}.wav".to_string();
        let err = GenerationRequest::new(lines.clone(), bad).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("{foo}"));

        let mut bad = settings(dir.path());
        bad.merge = true;
        bad.merged_filename = "merged.mp3".to_string();
        assert!(GenerationRequest::new(lines.clone(), bad).is_err());

        let request = GenerationRequest::new(lines, settings(dir.path())).unwrap();
        assert_eq!(request.line_path(3, "B"), dir.path().join("3_B.wav"));
    }

    #[test]
    fn test_request_from_script() {
        let mut config = AppConfig::default();
        config.output.output_dir = tempdir().unwrap().path().to_path_buf();
        let mut voices = VoiceAssignment::new();
        voices.assign("A", "en-US-JennyNeural");
        config.voices = voices;

        let (request, warnings) = GenerationRequest::from_script("A: Hi\nZ: Who?\nno colon", &config).unwrap();
        assert_eq!(request.lines().len(), 1);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_partial_result() {
        let mut result = GenerationResult::new(3);
        assert!(!result.is_partial());
        result.failed_lines.push(2);
        assert!(result.is_partial());
        assert!(!GenerationResult::failed(3, "x").is_partial());
    }
}
