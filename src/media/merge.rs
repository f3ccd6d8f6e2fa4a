//! Склейка аудиоклипов в один WAV
//!
//! Основной режим декодирует все клипы в моно f32 и, если частоты различаются,
//! приводит их к целевой частоте. Если этот режим недоступен или упал, клипы
//! склеиваются покадрово: подходят только WAV с теми же параметрами, что у
//! первого файла, остальные пропускаются с предупреждением.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use log::{info, warn};

use crate::config::AudioConfig;
use crate::error::{DialogueTtsError, Result};
use crate::media::audio::{self, PcmAudio};

/// Каким способом выполнена склейка
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Resampled,
    RawFrames,
}

/// Результат склейки
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub output: PathBuf,
    pub mode: MergeMode,
    pub sample_rate: u32,
    /// Количество кадров в выходном файле
    pub total_frames: usize,
    /// Файлы, пропущенные в покадровом режиме
    pub skipped: Vec<PathBuf>,
}

impl MergeReport {
    pub fn duration_secs(&self) -> f64 {
        audio::duration_in_seconds(self.total_frames, self.sample_rate)
    }
}

/// Склейщик клипов
#[derive(Debug, Clone)]
pub struct AudioMerger {
    target_sample_rate: u32,
    resample: bool,
}

impl AudioMerger {
    pub fn new(target_sample_rate: u32, resample: bool) -> Self {
        Self {
            target_sample_rate,
            resample,
        }
    }

    pub fn from_config(config: &AudioConfig) -> Self {
        Self::new(config.merge_sample_rate, config.resample)
    }

    /// Склеивает `inputs` по порядку в `output`
    pub fn merge<P: AsRef<Path>>(&self, inputs: &[P], output: &Path) -> Result<MergeReport> {
        if inputs.is_empty() {
            return Err(DialogueTtsError::Merge("No clips to merge".to_string()));
        }
        let inputs: Vec<&Path> = inputs.iter().map(|p| p.as_ref()).collect();

        if self.resample {
            match self.merge_resampled(&inputs, output) {
                Ok(report) => return Ok(report),
                Err(DialogueTtsError::AudioProcessing(e)) => {
                    warn!("Resampling merge unavailable ({}), falling back to raw frame concatenation", e);
                }
                Err(e) => return Err(DialogueTtsError::Merge(e.to_string())),
            }
        }

        self.merge_raw_frames(&inputs, output)
    }

    fn merge_resampled(&self, inputs: &[&Path], output: &Path) -> Result<MergeReport> {
        let decoded = inputs
            .iter()
            .map(|path| audio::decode_audio_file(path))
            .collect::<Result<Vec<PcmAudio>>>()?;

        let first_rate = decoded[0].sample_rate;
        let uniform = decoded.iter().all(|clip| clip.sample_rate == first_rate);
        let sample_rate = if uniform { first_rate } else { self.target_sample_rate };

        let mut combined = Vec::with_capacity(
            decoded
                .iter()
                .map(|clip| (clip.samples.len() as f64 * sample_rate as f64 / clip.sample_rate.max(1) as f64) as usize + 1)
                .sum(),
        );
        for clip in &decoded {
            if clip.sample_rate == sample_rate {
                combined.extend_from_slice(&clip.samples);
            } else {
                combined.extend(audio::resample(&clip.samples, clip.sample_rate, sample_rate)?);
            }
        }

        audio::encode_wav(&combined, sample_rate, output)?;
        info!(
            "Merged {} clips into {} ({:.2}s at {} Hz)",
            inputs.len(),
            output.display(),
            audio::duration_in_seconds(combined.len(), sample_rate),
            sample_rate
        );

        Ok(MergeReport {
            output: output.to_path_buf(),
            mode: MergeMode::Resampled,
            sample_rate,
            total_frames: combined.len(),
            skipped: Vec::new(),
        })
    }

    fn merge_raw_frames(&self, inputs: &[&Path], output: &Path) -> Result<MergeReport> {
        let first = WavReader::open(inputs[0]).map_err(|e| {
            DialogueTtsError::Merge(format!(
                "Cannot read {} as WAV for raw concatenation: {}",
                inputs[0].display(),
                e
            ))
        })?;
        let spec = first.spec();
        drop(first);

        let mut skipped = Vec::new();
        let mut total_samples = 0usize;

        audio::write_wav_atomically(output, spec, |writer| {
            for path in inputs {
                let mut reader = match WavReader::open(path) {
                    Ok(reader) if reader.spec() == spec => reader,
                    Ok(reader) => {
                        warn!(
                            "Skipping {}: format {:?} differs from {:?}",
                            path.display(),
                            reader.spec(),
                            spec
                        );
                        skipped.push(path.to_path_buf());
                        continue;
                    }
                    Err(e) => {
                        warn!("Skipping {}: not a readable WAV ({})", path.display(), e);
                        skipped.push(path.to_path_buf());
                        continue;
                    }
                };

                match spec.sample_format {
                    SampleFormat::Float => {
                        for sample in reader.samples::<f32>() {
                            writer.write_sample(sample?)?;
                            total_samples += 1;
                        }
                    }
                    SampleFormat::Int => {
                        for sample in reader.samples::<i32>() {
                            writer.write_sample(sample?)?;
                            total_samples += 1;
                        }
                    }
                }
            }
            Ok(())
        })
        .map_err(|e| DialogueTtsError::Merge(e.to_string()))?;

        let total_frames = total_samples / spec.channels.max(1) as usize;
        info!(
            "Concatenated {} of {} clips into {} without resampling",
            inputs.len() - skipped.len(),
            inputs.len(),
            output.display()
        );

        Ok(MergeReport {
            output: output.to_path_buf(),
            mode: MergeMode::RawFrames,
            sample_rate: spec.sample_rate,
            total_frames,
            skipped,
        })
    }
}
