//! Разбор маркеров пауз `[pause_<секунды>]`
//!
//! Текст реплики разбивается на упорядоченные сегменты речи и тишины.
//! Некорректные маркеры (`[pause_abc]`, незакрытые скобки) остаются обычным текстом.

use once_cell::sync::Lazy;
use regex::Regex;

static PAUSE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[pause_(\d+(?:\.\d+)?)\]").expect("pause marker regex is valid"));

/// Сегмент реплики
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Текст для озвучивания (без пробелов по краям, не пустой)
    Speech(String),
    /// Пауза в секундах
    Pause(f64),
}

/// Разбивает текст на сегменты в порядке чтения.
///
/// Пустые после обрезки фрагменты текста отбрасываются, поэтому строка из
/// одного маркера даёт ровно один `Segment::Pause`.
pub fn split_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in PAUSE_MARKER.captures_iter(text) {
        let (Some(marker), Some(value)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // \d+(\.\d+)? всегда разбирается в f64
        let Ok(seconds) = value.as_str().parse::<f64>() else {
            continue;
        };

        push_speech(&mut segments, &text[last..marker.start()]);
        segments.push(Segment::Pause(seconds));
        last = marker.end();
    }
    push_speech(&mut segments, &text[last..]);

    segments
}

fn push_speech(segments: &mut Vec<Segment>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        segments.push(Segment::Speech(trimmed.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speech(s: &str) -> Segment {
        Segment::Speech(s.to_string())
    }

    #[test]
    fn test_no_markers() {
        assert_eq!(split_segments("  Hello there  "), vec![speech("Hello there")]);
    }

    #[test]
    fn test_markers_in_order() {
        let segments = split_segments("Hi [pause_1.5] there[pause_2]friend");
        assert_eq!(
            segments,
            vec![
                speech("Hi"),
                Segment::Pause(1.5),
                speech("there"),
                Segment::Pause(2.0),
                speech("friend"),
            ]
        );
    }

    #[test]
    fn test_marker_only_line() {
        assert_eq!(split_segments("[pause_3]"), vec![Segment::Pause(3.0)]);
        assert_eq!(split_segments("  [pause_0] "), vec![Segment::Pause(0.0)]);
    }

    #[test]
    fn test_adjacent_markers_drop_blank_speech() {
        assert_eq!(
            split_segments("[pause_1]   [pause_0.25] go"),
            vec![Segment::Pause(1.0), Segment::Pause(0.25), speech("go")]
        );
    }

    #[test]
    fn test_malformed_markers_are_literal() {
        assert_eq!(split_segments("Hi [pause_abc] there"), vec![speech("Hi [pause_abc] there")]);
        assert_eq!(split_segments("Hi [pause_1 there"), vec![speech("Hi [pause_1 there")]);
        assert_eq!(split_segments("[pause_-1] x"), vec![speech("[pause_-1] x")]);
        assert_eq!(split_segments("[pause_.5]"), vec![speech("[pause_.5]")]);
        assert!(split_segments("").is_empty());
    }

    #[test]
    fn test_speech_rejoins_to_text_without_markers() {
        let inputs = [
            "One [pause_1] two [pause_2.75] three",
            "[pause_1]lead and trail[pause_1]",
            "plain",
            "a[pause_0]b[pause_10]c",
        ];
        for input in inputs {
            let joined: Vec<String> = split_segments(input)
                .into_iter()
                .filter_map(|s| match s {
                    Segment::Speech(t) => Some(t),
                    Segment::Pause(_) => None,
                })
                .collect();
            let stripped: Vec<String> = PAUSE_MARKER
                .split(input)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            assert_eq!(joined, stripped, "input: {input}");
        }
    }
}
