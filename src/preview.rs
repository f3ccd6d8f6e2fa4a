//! Предпрослушивание сценария
//!
//! Каждая реплика озвучивается во временный клип тем же конвейером, что и
//! основная генерация (сегменты, паузы, склейка строки), затем клипы
//! проигрываются по порядку и удаляются. В выходную директорию ничего не пишется.

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::generator::DialogueGenerator;
use crate::media::playback::{AudioPlayer, PlaybackReport};
use crate::progress::EventSink;
use crate::script::{parse_script, DialogueLine};
use crate::utils::temp::Clip;
use crate::voices::{VoiceAssignment, FALLBACK_VOICE_ID};

/// Текст, который озвучивается, если в сценарии нет ни одной реплики
pub const PREVIEW_FALLBACK_TEXT: &str = "Hello, this is a preview.";

/// Реплики для прослушивания. Пустой сценарий даёт одну фразу голосом по умолчанию.
pub fn preview_lines(script: &str, voices: &VoiceAssignment) -> Vec<DialogueLine> {
    let parsed = parse_script(script, voices);
    if parsed.lines.is_empty() {
        return vec![DialogueLine::new("A", PREVIEW_FALLBACK_TEXT, FALLBACK_VOICE_ID)];
    }
    parsed.lines
}

/// Озвученные, но ещё не проигранные клипы
#[derive(Debug, Default)]
pub struct RenderedPreview {
    /// (номер строки с единицы, клип)
    pub clips: Vec<(usize, Clip)>,
    pub failed_lines: Vec<usize>,
    pub cancelled: bool,
}

/// Итог прослушивания
#[derive(Debug, Clone, Default)]
pub struct PreviewReport {
    pub played: Vec<usize>,
    pub failed_lines: Vec<usize>,
    pub unplayable: Vec<usize>,
    pub playback: Vec<PlaybackReport>,
    pub cancelled: bool,
}

impl PreviewReport {
    /// Все реплики озвучены и проиграны
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed_lines.is_empty() && self.unplayable.is_empty()
    }
}

/// Озвучивает реплики во временные клипы. Ошибка одной реплики её пропускает.
pub async fn render_preview(
    generator: &DialogueGenerator,
    lines: &[DialogueLine],
    cancel: &CancellationToken,
) -> RenderedPreview {
    let mut rendered = RenderedPreview::default();
    let events = EventSink::none();
    let mut warnings = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let index = i + 1;
        if cancel.is_cancelled() {
            rendered.cancelled = true;
            break;
        }

        let clips = match generator.synthesize_line(index, line, cancel, &events, &mut warnings).await {
            Ok(Some(clips)) => clips,
            Ok(None) => {
                rendered.cancelled = true;
                break;
            }
            Err(e) => {
                warn!("Preview of line {} failed: {}", index, e);
                rendered.failed_lines.push(index);
                continue;
            }
        };

        match generator.join_into_clip(clips) {
            Ok(clip) => rendered.clips.push((index, clip)),
            Err(e) => {
                warn!("Preview of line {} failed: {}", index, e);
                rendered.failed_lines.push(index);
            }
        }
    }

    rendered
}

/// Проигрывает клипы по порядку. Клипы удаляются после проигрывания.
pub fn play_preview(player: &AudioPlayer, rendered: RenderedPreview) -> PreviewReport {
    let mut report = PreviewReport {
        failed_lines: rendered.failed_lines,
        cancelled: rendered.cancelled,
        ..PreviewReport::default()
    };

    for (index, clip) in rendered.clips {
        let playback = player.play(clip.path());
        if playback.succeeded() {
            report.played.push(index);
        } else {
            report.unplayable.push(index);
        }
        report.playback.push(playback);
    }

    if report.is_complete() {
        info!("Preview finished");
    } else {
        warn!(
            "Preview finished partially: {} played, {} failed, {} unplayable",
            report.played.len(),
            report.failed_lines.len(),
            report.unplayable.len()
        );
    }
    report
}
