//! Шаблон имени файла строки
//!
//! Поддерживаются только `{index}` и `{speaker}`; `{{` и `}}` дают литеральные скобки.

use crate::error::{DialogueTtsError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Index,
    Speaker,
}

/// Проверенный шаблон имени файла
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameTemplate {
    source: String,
    parts: Vec<Part>,
}

impl FilenameTemplate {
    /// Разбирает шаблон. Неизвестные плейсхолдеры, непарные скобки и шаблон
    /// без `{index}` - ошибка конфигурации.
    pub fn parse(template: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(DialogueTtsError::Configuration(format!(
                            "Unclosed '{{' in filename template '{}'",
                            template
                        )));
                    }
                    let part = match name.as_str() {
                        "index" => Part::Index,
                        "speaker" => Part::Speaker,
                        other => {
                            return Err(DialogueTtsError::Configuration(format!(
                                "Unknown placeholder '{{{}}}' in filename template '{}' (allowed: {{index}}, {{speaker}})",
                                other, template
                            )))
                        }
                    };
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(part);
                }
                '}' => {
                    return Err(DialogueTtsError::Configuration(format!(
                        "Unmatched '}}' in filename template '{}'",
                        template
                    )))
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        if !parts.contains(&Part::Index) {
            return Err(DialogueTtsError::Configuration(format!(
                "Filename template '{}' must contain {{index}} so every line gets its own file",
                template
            )));
        }

        let parsed = Self {
            source: template.to_string(),
            parts,
        };
        // Пробный рендер ловит шаблоны вида "a/{index}" или без расширения .wav
        validate_file_name(&parsed.render(1, "A"))?;
        Ok(parsed)
    }

    /// Имя файла для строки `index` (с 1) и говорящего `speaker`
    pub fn render(&self, index: usize, speaker: &str) -> String {
        let speaker = sanitize_speaker(speaker);
        self.parts
            .iter()
            .map(|part| match part {
                Part::Literal(text) => text.clone(),
                Part::Index => index.to_string(),
                Part::Speaker => speaker.clone(),
            })
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Убирает символы, небезопасные для имени файла: пробелы -> `_`,
/// остаются буквы, цифры, `_` и `-`.
pub fn sanitize_speaker(speaker: &str) -> String {
    speaker
        .trim()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Проверяет имя выходного файла: не пустое, без разделителей пути, расширение `.wav`
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DialogueTtsError::Configuration("Output file name is empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(DialogueTtsError::Configuration(format!(
            "Output file name '{}' must not contain path separators",
            name
        )));
    }
    if !name.to_lowercase().ends_with(".wav") || name.len() <= 4 {
        return Err(DialogueTtsError::Configuration(format!(
            "Output file name '{}' must end with .wav",
            name
        )));
    }
    Ok(())
}
