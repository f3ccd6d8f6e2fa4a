//! Каталог голосов и назначение голосов говорящим
//!
//! Каталог статичен: отображаемое имя -> идентификатор голоса провайдера,
//! сгруппированные по категориям. Оркестратор видит только идентификатор.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Голос, используемый когда отображаемое имя не найдено в каталоге
pub const FALLBACK_VOICE_ID: &str = "en-US-JennyNeural";

/// Категория голосов
#[derive(Debug, Clone, Copy)]
pub struct VoiceCategory {
    pub name: &'static str,
    /// Пары (отображаемое имя, идентификатор голоса)
    pub voices: &'static [(&'static str, &'static str)],
}

pub static VOICE_CATALOG: &[VoiceCategory] = &[
    VoiceCategory {
        name: "US English - Male",
        voices: &[
            ("Andrew (US)", "en-US-AndrewNeural"),
            ("Brian (US)", "en-US-BrianNeural"),
            ("Christopher (US)", "en-US-ChristopherNeural"),
            ("Roger (US)", "en-US-RogerNeural"),
            ("Steffan (US)", "en-US-SteffanNeural"),
            ("Guy (US, Default)", "en-US-GuyNeural"),
        ],
    },
    VoiceCategory {
        name: "US English - Female",
        voices: &[
            ("Ana (US)", "en-US-AnaNeural"),
            ("Aria (US)", "en-US-AriaNeural"),
            ("Ava (US)", "en-US-AvaNeural"),
            ("Jenny (US, Default)", "en-US-JennyNeural"),
            ("Michelle (US)", "en-US-MichelleNeural"),
        ],
    },
    VoiceCategory {
        name: "UK English - Male",
        voices: &[
            ("Libby (UK)", "en-GB-LibbyNeural"),
            ("Ryan (UK, Default)", "en-GB-RyanNeural"),
        ],
    },
    VoiceCategory {
        name: "UK English - Female",
        voices: &[
            ("Sonia (UK)", "en-GB-SoniaNeural"),
            ("Maisie (UK)", "en-GB-MaisieNeural"),
        ],
    },
];

/// Найти идентификатор голоса по отображаемому имени
pub fn resolve_voice(display_name: &str) -> Option<&'static str> {
    VOICE_CATALOG
        .iter()
        .flat_map(|category| category.voices.iter())
        .find(|(name, _)| *name == display_name)
        .map(|(_, id)| *id)
}

/// Короткое имя голоса ("Ryan") или сам идентификатор, если голос неизвестен
pub fn display_name_for(voice_id: &str) -> String {
    VOICE_CATALOG
        .iter()
        .flat_map(|category| category.voices.iter())
        .find(|(_, id)| *id == voice_id)
        .map(|(name, _)| name.split(" (").next().unwrap_or(name).to_string())
        .unwrap_or_else(|| voice_id.to_string())
}

/// Список для выпадающего меню: заголовки категорий вида `--- name ---` и имена голосов
pub fn all_display_names() -> Vec<String> {
    let mut names = Vec::new();
    for category in VOICE_CATALOG {
        names.push(format!("--- {} ---", category.name));
        names.extend(category.voices.iter().map(|(name, _)| name.to_string()));
    }
    names
}

/// Назначение голосов говорящим: идентификатор говорящего -> идентификатор голоса
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceAssignment(BTreeMap<String, String>);

impl VoiceAssignment {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Назначить голос по идентификатору
    pub fn assign(&mut self, speaker: &str, voice_id: impl Into<String>) {
        self.0.insert(speaker.trim().to_uppercase(), voice_id.into());
    }

    /// Назначить голос по отображаемому имени из каталога.
    /// Неизвестное имя даёт голос по умолчанию.
    pub fn assign_display_name(&mut self, speaker: &str, display_name: &str) {
        let voice_id = resolve_voice(display_name).unwrap_or_else(|| {
            log::warn!("Unknown voice '{}' for speaker {}, using {}", display_name, speaker, FALLBACK_VOICE_ID);
            FALLBACK_VOICE_ID
        });
        self.assign(speaker, voice_id);
    }

    pub fn voice_for(&self, speaker: &str) -> Option<&str> {
        self.0.get(speaker).map(String::as_str)
    }

    pub fn speakers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl Default for VoiceAssignment {
    fn default() -> Self {
        let mut assignment = Self::new();
        for (speaker, display_name) in [
            ("A", "Ryan (UK, Default)"),
            ("B", "Jenny (US, Default)"),
            ("C", "Christopher (US)"),
            ("D", "Ana (US)"),
            ("E", "Libby (UK)"),
            ("F", "Guy (US, Default)"),
        ] {
            assignment.assign_display_name(speaker, display_name);
        }
        assignment
    }
}
