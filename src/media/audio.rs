//! # Audio Format Handling
//!
//! Декодирование аудиофайлов в моно PCM (f32), запись WAV и ресемплинг.
//!
//! - WAV читается через hound (8/16/24/32 бит int, 32 бит float)
//! - Всё остальное (MP3 и WAV, которые hound не понял) определяется по содержимому через Symphonia
//! - Ресемплинг выполняется Rubato с sinc-интерполяцией

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, warn};
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{DialogueTtsError, Result};

/// Декодированное моно аудио
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn duration_secs(&self) -> f64 {
        duration_in_seconds(self.samples.len(), self.sample_rate)
    }
}

/// Длительность в секундах по количеству семплов и частоте дискретизации
pub fn duration_in_seconds(sample_count: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    sample_count as f64 / sample_rate as f64
}

/// Количество семплов для длительности: `round(duration * rate)`
pub fn samples_for_duration(duration_secs: f64, sample_rate: u32) -> usize {
    (duration_secs * sample_rate as f64).round().max(0.0) as usize
}

/// Декодирует аудиофайл в моно PCM.
///
/// Сначала пробуем hound (быстрый путь для WAV), затем Symphonia с
/// определением формата по содержимому. Расширению файла не доверяем.
pub fn decode_audio_file<P: AsRef<Path>>(path: P) -> Result<PcmAudio> {
    let path = path.as_ref();
    match decode_wav_file(path) {
        Ok(audio) => Ok(audio),
        Err(e) => {
            debug!("hound could not read {} ({}), probing with symphonia", path.display(), e);
            decode_with_symphonia(path)
        }
    }
}

/// Декодирует WAV-файл через hound. Многоканальный звук сводится в моно.
pub fn decode_wav_file<P: AsRef<Path>>(path: P) -> Result<PcmAudio> {
    let mut reader = WavReader::open(path.as_ref())?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
        (format, bits) => {
            return Err(DialogueTtsError::AudioProcessing(format!(
                "Unsupported WAV format: {:?}, {} bits",
                format, bits
            )))
        }
    };

    Ok(PcmAudio::new(downmix(&interleaved, spec.channels as usize), spec.sample_rate))
}

/// Декодирует любой поддерживаемый Symphonia формат
fn decode_with_symphonia(path: &Path) -> Result<PcmAudio> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DialogueTtsError::AudioProcessing(format!("Unrecognized audio format in {}: {}", path.display(), e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DialogueTtsError::AudioProcessing(format!("No audio track in {}", path.display())))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DialogueTtsError::AudioProcessing(format!("Cannot create decoder: {}", e)))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut pcm = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(DialogueTtsError::AudioProcessing(format!(
                    "Failed to read packet from {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                let channels = spec.channels.count();

                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                pcm.extend(downmix(buf.samples(), channels));
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet in {}: {}", path.display(), e);
            }
            Err(e) => {
                return Err(DialogueTtsError::AudioProcessing(format!(
                    "Decoding {} failed: {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    let sample_rate = sample_rate
        .ok_or_else(|| DialogueTtsError::AudioProcessing(format!("Unknown sample rate in {}", path.display())))?;

    debug!("Decoded {} samples at {} Hz from {}", pcm.len(), sample_rate, path.display());
    Ok(PcmAudio::new(pcm, sample_rate))
}

/// Сводит чередующиеся каналы в моно усреднением
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Спецификация WAV, в которой пишутся все выходные файлы
pub fn output_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

/// Записывает моно f32 WAV в `output_path`.
///
/// Данные пишутся во временный файл рядом с целевым и переименовываются
/// только после `finalize`, поэтому битый файл по целевому пути не появляется.
pub fn encode_wav(samples: &[f32], sample_rate: u32, output_path: &Path) -> Result<()> {
    write_wav_atomically(output_path, output_spec(sample_rate), |writer| {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        Ok(())
    })
}

/// Общий помощник атомарной записи WAV
pub(crate) fn write_wav_atomically<F>(output_path: &Path, spec: WavSpec, write: F) -> Result<()>
where
    F: FnOnce(&mut WavWriter<BufWriter<&mut File>>) -> Result<()>,
{
    let dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".partial-")
        .suffix(".wav")
        .tempfile_in(dir)?;

    {
        let mut writer = WavWriter::new(BufWriter::new(tmp.as_file_mut()), spec)?;
        write(&mut writer)?;
        writer.finalize()?;
    }

    tmp.persist(output_path).map_err(|e| DialogueTtsError::Io(e.error))?;
    Ok(())
}

/// Размер входного блока ресемплера
const RESAMPLE_CHUNK: usize = 1024;

/// Ресемплинг моно сигнала Rubato.
///
/// Длина результата ровно `round(len * to_rate / from_rate)`: задержка фильтра
/// компенсируется, хвост добивается нулями или обрезается.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(DialogueTtsError::AudioProcessing(format!(
            "Invalid sample rates for resampling: {} -> {}",
            from_rate, to_rate
        )));
    }
    if from_rate == to_rate || input.is_empty() {
        return Ok(input.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let expected = (input.len() as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| DialogueTtsError::AudioProcessing(format!("Rubato init failed: {}", e)))?;

    let delay = resampler.output_delay();
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);
    let mut pos = 0;

    while input.len() - pos >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let frames = resampler
            .process(&[&input[pos..pos + needed]], None)
            .map_err(|e| DialogueTtsError::AudioProcessing(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&frames[0]);
        pos += needed;
    }

    if pos < input.len() {
        let frames = resampler
            .process_partial(Some(&[&input[pos..]]), None)
            .map_err(|e| DialogueTtsError::AudioProcessing(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&frames[0]);
    }

    // Выталкиваем хвост, задержанный фильтром
    while output.len() < expected + delay {
        let frames = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| DialogueTtsError::AudioProcessing(format!("Resampling failed: {}", e)))?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use tempfile::tempdir;

    fn sine(freq: f32, secs: f64, rate: u32) -> Vec<f32> {
        (0..samples_for_duration(secs, rate))
            .map(|i| (2.0 * PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_duration_helpers() {
        assert_eq!(duration_in_seconds(24_000, 24_000), 1.0);
        assert_eq!(duration_in_seconds(0, 0), 0.0);
        assert_eq!(samples_for_duration(1.5, 24_000), 36_000);
        assert_eq!(samples_for_duration(0.00002, 24_000), 0);
        assert_eq!(samples_for_duration(0.00003, 24_000), 1);
    }

    #[test]
    fn test_wav_encode_decode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples = sine(440.0, 0.1, 22_050);

        encode_wav(&samples, 22_050, &path).unwrap();
        let decoded = decode_audio_file(&path).unwrap();

        assert_eq!(decoded.sample_rate, 22_050);
        assert_eq!(decoded.samples.len(), samples.len());
        for (a, b) in samples.iter().zip(decoded.samples.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
        // Рядом не должно остаться временных файлов
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_decode_int16_stereo_downmix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16_384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = decode_audio_file(&path).unwrap();
        assert_eq!(decoded.samples.len(), 100);
        assert!((decoded.samples[0] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(decode_audio_file(&path).is_err());
    }

    #[test]
    fn test_resample_length_is_exact() {
        let input = sine(220.0, 0.73, 22_050);
        let out = resample(&input, 22_050, 24_000).unwrap();
        let expected = (input.len() as f64 * 24_000.0 / 22_050.0).round() as usize;
        assert_eq!(out.len(), expected);

        let down = resample(&input, 22_050, 16_000).unwrap();
        assert_eq!(down.len(), (input.len() as f64 * 16_000.0 / 22_050.0).round() as usize);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let input = sine(220.0, 0.01, 24_000);
        assert_eq!(resample(&input, 24_000, 24_000).unwrap(), input);
        assert!(resample(&[], 8_000, 24_000).unwrap().is_empty());
        assert!(resample(&input, 0, 24_000).is_err());
    }
}
