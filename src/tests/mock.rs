//! Сценарный синтезатор для тестов

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{DialogueTtsError, Result};
use crate::generator::DialogueGenerator;
use crate::media::audio::encode_wav;
use crate::media::merge::AudioMerger;
use crate::tts::SpeechSynthesizer;
use crate::utils::temp::Clip;

pub const RATE: u32 = 24000;
/// 0.1 с тона на каждый сегмент речи
pub const CLIP_SAMPLES: usize = 2400;

#[derive(Default)]
pub struct MockSynthesizer {
    fail_on: HashSet<String>,
    cancel_on: Option<(String, CancellationToken)>,
    calls: Mutex<Vec<String>>,
    clips: Mutex<Vec<PathBuf>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, text: &str) -> Self {
        self.fail_on.insert(text.to_string());
        self
    }

    pub fn cancel_on(mut self, text: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((text.to_string(), token));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clip_paths(&self) -> Vec<PathBuf> {
        self.clips.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _voice_id: &str) -> Result<Clip> {
        self.calls.lock().unwrap().push(text.to_string());

        if let Some((trigger, token)) = &self.cancel_on {
            if trigger == text {
                token.cancel();
            }
        }
        if self.fail_on.contains(text) {
            return Err(DialogueTtsError::Synthesis(format!("mock failure for '{}'", text)));
        }

        let samples: Vec<f32> = (0..CLIP_SAMPLES)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / RATE as f32).sin() * 0.3)
            .collect();
        let clip = Clip::create("mock_tts_", ".wav")?;
        encode_wav(&samples, RATE, clip.path())?;
        self.clips.lock().unwrap().push(clip.path().to_path_buf());
        Ok(clip)
    }
}

pub fn generator(mock: Arc<MockSynthesizer>) -> DialogueGenerator {
    DialogueGenerator::new(mock, AudioMerger::new(RATE, true), RATE)
}
