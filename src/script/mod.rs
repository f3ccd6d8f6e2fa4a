//! Разбор входного сценария диалога
//!
//! - `parser`: строки вида `A: текст` -> `DialogueLine`
//! - `pause`: маркеры `[pause_N]` внутри текста -> сегменты речи и тишины
//! - `template`: шаблон имени файла строки

pub mod parser;
pub mod pause;
pub mod template;

pub use parser::{parse_script, DialogueLine, ParsedScript, ScriptWarning, ScriptWarningKind};
pub use pause::{split_segments, Segment};
pub use template::{sanitize_speaker, validate_file_name, FilenameTemplate};
