//! Парсер сценария диалога
//!
//! Одна реплика на строку: `<SpeakerID>: <текст>`. Некорректные строки
//! пропускаются с предупреждением, разбор никогда не завершается ошибкой.

use std::fmt;

use crate::voices::VoiceAssignment;

/// Реплика диалога. Не изменяется после разбора.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueLine {
    /// Идентификатор говорящего в верхнем регистре
    pub speaker_id: String,
    /// Текст реплики, может содержать маркеры пауз
    pub text: String,
    /// Идентификатор голоса провайдера
    pub voice_id: String,
}

impl DialogueLine {
    pub fn new(speaker_id: impl Into<String>, text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            text: text.into(),
            voice_id: voice_id.into(),
        }
    }
}

/// Причина пропуска строки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptWarningKind {
    MissingColon,
    UnknownSpeaker,
    EmptyText,
}

/// Предупреждение о пропущенной строке
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptWarning {
    /// Номер строки во входном тексте (с 1)
    pub line_number: usize,
    pub kind: ScriptWarningKind,
    pub content: String,
}

impl fmt::Display for ScriptWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            ScriptWarningKind::MissingColon => "missing 'Speaker:' prefix",
            ScriptWarningKind::UnknownSpeaker => "unknown speaker",
            ScriptWarningKind::EmptyText => "empty text",
        };
        write!(f, "Skipping line {} ({}): {}", self.line_number, reason, self.content)
    }
}

/// Результат разбора сценария
#[derive(Debug, Clone, Default)]
pub struct ParsedScript {
    pub lines: Vec<DialogueLine>,
    pub warnings: Vec<ScriptWarning>,
}

/// Разбирает сценарий, назначая каждой реплике голос её говорящего
pub fn parse_script(text: &str, voices: &VoiceAssignment) -> ParsedScript {
    let mut parsed = ParsedScript::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let mut warn = |kind| {
            let warning = ScriptWarning {
                line_number: idx + 1,
                kind,
                content: line.to_string(),
            };
            log::warn!("{}", warning);
            parsed.warnings.push(warning);
        };

        let Some((speaker, body)) = line.split_once(':') else {
            warn(ScriptWarningKind::MissingColon);
            continue;
        };

        let speaker_id = speaker.trim().to_uppercase();
        let body = body.trim();

        let Some(voice_id) = voices.voice_for(&speaker_id) else {
            warn(ScriptWarningKind::UnknownSpeaker);
            continue;
        };

        if body.is_empty() {
            warn(ScriptWarningKind::EmptyText);
            continue;
        }

        parsed.lines.push(DialogueLine::new(speaker_id, body, voice_id));
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_script() {
        let script = "A: Hello, welcome.\n\n  b : This is not a test [pause_1]  \nC: What about: colons?";
        let parsed = parse_script(script, &VoiceAssignment::default());

        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.lines.len(), 3);
        assert_eq!(parsed.lines[0], DialogueLine::new("A", "Hello, welcome.", "en-GB-RyanNeural"));
        assert_eq!(parsed.lines[1].speaker_id, "B");
        assert_eq!(parsed.lines[1].text, "This is not a test [pause_1]");
        assert_eq!(parsed.lines[2].text, "What about: colons?");
    }

    #[test]
    fn test_invalid_lines_are_skipped_with_warnings() {
        let script = "no colon here\nZ: unknown speaker\nA:   \nB: fine";
        let parsed = parse_script(script, &VoiceAssignment::default());

        assert_eq!(parsed.lines.len(), 1);
        assert_eq!(parsed.lines[0].speaker_id, "B");

        let kinds: Vec<_> = parsed.warnings.iter().map(|w| (w.line_number, w.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (1, ScriptWarningKind::MissingColon),
                (2, ScriptWarningKind::UnknownSpeaker),
                (3, ScriptWarningKind::EmptyText),
            ]
        );
    }
}
