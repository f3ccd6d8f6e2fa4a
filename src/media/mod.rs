//! Модуль для работы с аудио
//!
//! Декодирование, кодирование и ресемплинг (`audio`), генерация тишины
//! (`silence`), склейка клипов (`merge`) и воспроизведение (`playback`).

pub mod audio;
pub mod merge;
pub mod playback;
pub mod silence;
