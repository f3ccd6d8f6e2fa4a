//! Генерация тишины для маркеров пауз
//!
//! Клип содержит ровно `round(duration * sample_rate)` нулевых семплов.
//! Сеть не нужна. Если запись через hound не удалась, пишется минимальный
//! 16-битный PCM WAV вручную, и результат помечается как деградированный.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{DialogueTtsError, Result};
use crate::media::audio::{output_spec, samples_for_duration};
use crate::utils::temp::Clip;

/// Клип тишины
#[derive(Debug)]
pub struct SilenceClip {
    pub clip: Clip,
    /// Количество семплов
    pub samples: usize,
    /// true, если файл записан запасным способом
    pub degraded: bool,
}

/// Создаёт временный WAV с тишиной заданной длительности
pub fn create_silence(duration_secs: f64, sample_rate: u32) -> Result<SilenceClip> {
    create_silence_with(duration_secs, sample_rate, write_float_silence)
}

fn create_silence_with<F>(duration_secs: f64, sample_rate: u32, write_primary: F) -> Result<SilenceClip>
where
    F: FnOnce(&Path, usize, u32) -> Result<()>,
{
    if !duration_secs.is_finite() || duration_secs < 0.0 {
        return Err(DialogueTtsError::AudioProcessing(format!(
            "Invalid silence duration: {}",
            duration_secs
        )));
    }
    if sample_rate == 0 {
        return Err(DialogueTtsError::AudioProcessing("Sample rate must be positive".to_string()));
    }

    let samples = samples_for_duration(duration_secs, sample_rate);
    let clip = Clip::create("tts_silence_", ".wav")?;

    match write_primary(clip.path(), samples, sample_rate) {
        Ok(()) => {
            log::debug!("Created {:.3}s of silence ({} samples at {} Hz)", duration_secs, samples, sample_rate);
            Ok(SilenceClip {
                clip,
                samples,
                degraded: false,
            })
        }
        Err(e) => {
            log::warn!("Float WAV writer failed ({}), writing plain PCM silence", e);
            write_pcm16_silence(clip.path(), samples, sample_rate)?;
            Ok(SilenceClip {
                clip,
                samples,
                degraded: true,
            })
        }
    }
}

fn write_float_silence(path: &Path, samples: usize, sample_rate: u32) -> Result<()> {
    let mut writer = hound::WavWriter::create(path, output_spec(sample_rate))?;
    for _ in 0..samples {
        writer.write_sample(0.0f32)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Пишет моно 16-битный PCM WAV из нулей без сторонних библиотек
pub(crate) fn write_pcm16_silence(path: &Path, samples: usize, sample_rate: u32) -> Result<()> {
    let data_size = u32::try_from(samples * 2)
        .map_err(|_| DialogueTtsError::AudioProcessing("Silence too long for a WAV file".to_string()))?;
    let byte_rate = sample_rate * 2;

    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(b"RIFF")?;
    out.write_all(&(36 + data_size).to_le_bytes())?;
    out.write_all(b"WAVE")?;
    out.write_all(b"fmt ")?;
    out.write_all(&16u32.to_le_bytes())?;
    out.write_all(&1u16.to_le_bytes())?; // PCM
    out.write_all(&1u16.to_le_bytes())?; // моно
    out.write_all(&sample_rate.to_le_bytes())?;
    out.write_all(&byte_rate.to_le_bytes())?;
    out.write_all(&2u16.to_le_bytes())?; // block align
    out.write_all(&16u16.to_le_bytes())?;
    out.write_all(b"data")?;
    out.write_all(&data_size.to_le_bytes())?;
    out.write_all(&vec![0u8; data_size as usize])?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::audio::decode_audio_file;
    use tempfile::tempdir;

    #[test]
    fn test_silence_sample_count() {
        for (duration, rate) in [(0.0, 24_000), (1.0, 24_000), (1.5, 22_050), (0.333, 16_000), (2.25, 44_100)] {
            let silence = create_silence(duration, rate).unwrap();
            assert!(!silence.degraded);

            let expected = (duration * rate as f64).round() as usize;
            assert_eq!(silence.samples, expected);

            let decoded = decode_audio_file(silence.clip.path()).unwrap();
            assert_eq!(decoded.sample_rate, rate);
            assert_eq!(decoded.samples.len(), expected);
            assert!(decoded.samples.iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn test_invalid_durations() {
        assert!(create_silence(-1.0, 24_000).is_err());
        assert!(create_silence(f64::NAN, 24_000).is_err());
        assert!(create_silence(1.0, 0).is_err());
    }

    #[test]
    fn test_pcm16_fallback_is_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fallback.wav");
        write_pcm16_silence(&path, 4_800, 24_000).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.duration(), 4_800);
    }

    #[test]
    fn test_fallback_used_when_primary_writer_fails() {
        let silence = create_silence_with(0.25, 16_000, |_, _, _| {
            Err(DialogueTtsError::AudioProcessing("writer unavailable".to_string()))
        })
        .unwrap();
        assert!(silence.degraded);
        assert_eq!(silence.samples, 4_000);

        let decoded = decode_audio_file(silence.clip.path()).unwrap();
        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.samples.len(), 4_000);
        assert!(decoded.samples.iter().all(|&s| s == 0.0));
    }
}
