//! Модуль для работы с временными файлами
//!
//! Клип - временный аудиофайл во временной директории системы. Файл удаляется
//! при уничтожении клипа, если его не перенесли в выходной путь.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::error::Result;

/// Контейнер аудио клипа, определяется по расширению
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipFormat {
    Wav,
    Mp3,
    Other,
}

impl ClipFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("wav") => Self::Wav,
            Some("mp3") => Self::Mp3,
            _ => Self::Other,
        }
    }
}

/// Временный аудиофайл
#[derive(Debug)]
pub struct Clip {
    path: TempPath,
}

impl Clip {
    /// Создать пустой временный файл `<prefix><random><suffix>`
    pub fn create(prefix: &str, suffix: &str) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    /// Создать временный файл с указанным содержимым
    pub fn from_bytes(prefix: &str, suffix: &str, bytes: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ClipFormat {
        ClipFormat::from_path(&self.path)
    }

    /// Перенести клип в `dest`. Если переименование невозможно (другая файловая
    /// система), файл копируется, а временный удаляется.
    pub fn persist_to(self, dest: &Path) -> Result<PathBuf> {
        match self.path.persist(dest) {
            Ok(()) => Ok(dest.to_path_buf()),
            Err(err) => {
                log::debug!(
                    "Rename to {} failed ({}), copying instead",
                    dest.display(),
                    err.error
                );
                let temp = err.path;
                fs::copy(&temp, dest)?;
                drop(temp);
                Ok(dest.to_path_buf())
            }
        }
    }
}
