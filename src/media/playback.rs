//! Предпрослушивание клипов
//!
//! Бэкенды перебираются в фиксированном порядке. Первый успешный побеждает,
//! ошибки остальных записываются в отчёт и в лог, но наружу не пробрасываются.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{DialogueTtsError, Result};

/// Способ воспроизвести аудиофайл
pub trait PlaybackBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Воспроизводит файл до конца
    fn play(&self, path: &Path) -> Result<()>;
}

/// Внешний плеер из PATH. Аргумент `{file}` заменяется путём к файлу.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn locate(&self) -> Result<PathBuf> {
        which::which(&self.program)
            .map_err(|e| DialogueTtsError::Playback(format!("{} not found: {}", self.program, e)))
    }
}

impl PlaybackBackend for CommandPlayer {
    fn name(&self) -> &str {
        &self.program
    }

    fn play(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(DialogueTtsError::Playback(format!("{} does not exist", path.display())));
        }
        let bin = self.locate()?;
        let file = path.to_string_lossy();

        let status = Command::new(bin)
            .args(self.args.iter().map(|a| a.replace("{file}", &file)))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if !status.success() {
            return Err(DialogueTtsError::Playback(format!("{} exited with {}", self.program, status)));
        }
        Ok(())
    }
}

/// Итог попытки воспроизведения
#[derive(Debug, Clone, Default)]
pub struct PlaybackReport {
    /// Бэкенд, который сработал
    pub backend: Option<String>,
    /// (бэкенд, ошибка) для каждой неудачной попытки
    pub failures: Vec<(String, String)>,
}

impl PlaybackReport {
    pub fn succeeded(&self) -> bool {
        self.backend.is_some()
    }
}

/// Плеер с упорядоченным списком бэкендов
pub struct AudioPlayer {
    backends: Vec<Box<dyn PlaybackBackend>>,
}

impl AudioPlayer {
    pub fn new(backends: Vec<Box<dyn PlaybackBackend>>) -> Self {
        Self { backends }
    }

    /// ffplay, затем системный плеер текущей платформы
    pub fn with_default_backends() -> Self {
        let mut backends: Vec<Box<dyn PlaybackBackend>> = vec![Box::new(CommandPlayer::new(
            "ffplay",
            &["-autoexit", "-nodisp", "-loglevel", "quiet", "{file}"],
        ))];

        if cfg!(target_os = "macos") {
            backends.push(Box::new(CommandPlayer::new("afplay", &["{file}"])));
        } else if cfg!(target_os = "windows") {
            backends.push(Box::new(CommandPlayer::new(
                "powershell",
                &["-NoProfile", "-Command", "(New-Object Media.SoundPlayer '{file}').PlaySync()"],
            )));
        } else {
            backends.push(Box::new(CommandPlayer::new("paplay", &["{file}"])));
            backends.push(Box::new(CommandPlayer::new("aplay", &["-q", "{file}"])));
        }

        Self::new(backends)
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Пробует бэкенды по порядку. Никогда не возвращает ошибку.
    pub fn play(&self, path: &Path) -> PlaybackReport {
        let mut report = PlaybackReport::default();

        for backend in &self.backends {
            match backend.play(path) {
                Ok(()) => {
                    log::debug!("Played {} with {}", path.display(), backend.name());
                    report.backend = Some(backend.name().to_string());
                    return report;
                }
                Err(e) => {
                    log::warn!("Playback with {} failed: {}", backend.name(), e);
                    report.failures.push((backend.name().to_string(), e.to_string()));
                }
            }
        }

        log::error!("All playback methods failed for {}", path.display());
        report
    }
}

impl Default for AudioPlayer {
    fn default() -> Self {
        Self::with_default_backends()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeBackend {
        name: &'static str,
        ok: bool,
        calls: Arc<AtomicUsize>,
    }

    impl PlaybackBackend for FakeBackend {
        fn name(&self) -> &str {
            self.name
        }

        fn play(&self, _path: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.ok {
                Ok(())
            } else {
                Err(DialogueTtsError::Playback(format!("{} broke", self.name)))
            }
        }
    }

    fn fake(name: &'static str, ok: bool, calls: &Arc<AtomicUsize>) -> Box<dyn PlaybackBackend> {
        Box::new(FakeBackend {
            name,
            ok,
            calls: calls.clone(),
        })
    }

    #[test]
    fn test_first_success_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let player = AudioPlayer::new(vec![
            fake("broken", false, &calls),
            fake("works", true, &calls),
            fake("never", true, &calls),
        ]);

        let report = player.play(Path::new("clip.wav"));
        assert!(report.succeeded());
        assert_eq!(report.backend.as_deref(), Some("works"));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_all_fail_is_reported_not_raised() {
        let calls = Arc::new(AtomicUsize::new(0));
        let player = AudioPlayer::new(vec![fake("a", false, &calls), fake("b", false, &calls)]);

        let report = player.play(Path::new("clip.wav"));
        assert!(!report.succeeded());
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn test_command_player_missing_file_or_program() {
        let player = CommandPlayer::new("definitely-not-a-real-player-binary", &["{file}"]);
        assert!(player.play(Path::new("/no/such/file.wav")).is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(player.play(file.path()), Err(DialogueTtsError::Playback(_))));
    }

    #[test]
    fn test_default_backend_order_starts_with_ffplay() {
        let player = AudioPlayer::with_default_backends();
        assert_eq!(player.backend_names()[0], "ffplay");
        assert!(player.backend_names().len() >= 2);
    }
}
