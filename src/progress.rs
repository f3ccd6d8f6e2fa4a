//! Модуль для отслеживания прогресса генерации
//!
//! Рабочий поток публикует структурированные события в канал, а слой
//! представления забирает их в своём темпе. Категория события задаётся
//! перечислением `StatusKind`, текст сообщения строится через `Display`.

use std::fmt;
use std::path::PathBuf;

use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Категория события
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    RunStarted,
    LineStarted,
    LineCompleted,
    LineFailed,
    Warning,
    MergeStarted,
    MergeCompleted,
    MergeFailed,
    Cancelled,
    Completed,
    Failed,
}

/// Событие прогона
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    RunStarted {
        total: usize,
    },
    LineStarted {
        index: usize,
        total: usize,
        speaker: String,
        /// Отображаемое имя голоса
        voice: String,
    },
    LineCompleted {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    LineFailed {
        index: usize,
        total: usize,
        error: String,
    },
    Warning {
        index: Option<usize>,
        message: String,
    },
    MergeStarted {
        files: usize,
    },
    MergeCompleted {
        path: PathBuf,
        duration_secs: f64,
    },
    MergeFailed {
        error: String,
    },
    Cancelled {
        produced: usize,
    },
    Completed {
        produced: usize,
        requested: usize,
    },
    Failed {
        error: String,
    },
}

impl GenerationEvent {
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::RunStarted { .. } => StatusKind::RunStarted,
            Self::LineStarted { .. } => StatusKind::LineStarted,
            Self::LineCompleted { .. } => StatusKind::LineCompleted,
            Self::LineFailed { .. } => StatusKind::LineFailed,
            Self::Warning { .. } => StatusKind::Warning,
            Self::MergeStarted { .. } => StatusKind::MergeStarted,
            Self::MergeCompleted { .. } => StatusKind::MergeCompleted,
            Self::MergeFailed { .. } => StatusKind::MergeFailed,
            Self::Cancelled { .. } => StatusKind::Cancelled,
            Self::Completed { .. } => StatusKind::Completed,
            Self::Failed { .. } => StatusKind::Failed,
        }
    }

    /// Последнее событие прогона
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            StatusKind::Cancelled | StatusKind::Completed | StatusKind::Failed
        )
    }
}

impl fmt::Display for GenerationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunStarted { total } => write!(f, "Starting generation of {} line(s)", total),
            Self::LineStarted {
                index,
                total,
                speaker,
                voice,
            } => write!(f, "Generating line {}/{} (speaker {}, voice {})", index, total, speaker, voice),
            Self::LineCompleted { index, total, path } => {
                write!(f, "Line {}/{} saved to {}", index, total, path.display())
            }
            Self::LineFailed { index, total, error } => {
                write!(f, "Line {}/{} failed: {}", index, total, error)
            }
            Self::Warning { index: Some(index), message } => write!(f, "Line {}: {}", index, message),
            Self::Warning { index: None, message } => write!(f, "{}", message),
            Self::MergeStarted { files } => write!(f, "Merging {} file(s)", files),
            Self::MergeCompleted { path, duration_secs } => {
                write!(f, "Merged file saved to {} ({:.2}s)", path.display(), duration_secs)
            }
            Self::MergeFailed { error } => write!(f, "Merge failed, keeping individual files: {}", error),
            Self::Cancelled { produced } => {
                write!(f, "Generation cancelled, {} file(s) kept", produced)
            }
            Self::Completed { produced, requested } => {
                write!(f, "Generation finished: {} of {} line(s) produced", produced, requested)
            }
            Self::Failed { error } => write!(f, "Generation failed: {}", error),
        }
    }
}

/// Отправитель событий
///
/// Отправка никогда не блокирует. Если получатель уже закрыт, событие
/// просто теряется.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<GenerationEvent>>,
}

impl EventSink {
    /// Отправитель без получателя, события только пишутся в лог
    pub fn none() -> Self {
        Self { sender: None }
    }

    pub fn new(sender: UnboundedSender<GenerationEvent>) -> Self {
        Self { sender: Some(sender) }
    }

    /// Создаёт канал событий
    pub fn channel() -> (Self, UnboundedReceiver<GenerationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, event: GenerationEvent) {
        match event.kind() {
            StatusKind::LineFailed | StatusKind::MergeFailed | StatusKind::Failed => error!("{}", event),
            StatusKind::Warning | StatusKind::Cancelled => warn!("{}", event),
            _ => info!("{}", event),
        }

        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
