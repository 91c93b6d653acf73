//! Language definitions and script-aware text rules
//!
//! Narration languages supported by the pipeline, with the per-language
//! rules the script processor and text validator rely on: sentence
//! terminators, sentence-length caps, speaking rate and RTL handling.

use serde::{Deserialize, Serialize};

/// Supported narration languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    #[default]
    EnglishUs,
    EnglishUk,
    Hebrew,
    Arabic,
    French,
    Spanish,
    German,
    Italian,
    Portuguese,
    Russian,
    Japanese,
}

impl Language {
    /// BCP-47-ish code used by speech providers
    pub fn code(&self) -> &'static str {
        match self {
            Self::EnglishUs => "en-US",
            Self::EnglishUk => "en-GB",
            Self::Hebrew => "he",
            Self::Arabic => "ar",
            Self::French => "fr",
            Self::Spanish => "es",
            Self::German => "de",
            Self::Italian => "it",
            Self::Portuguese => "pt",
            Self::Russian => "ru",
            Self::Japanese => "ja",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnglishUs => "English (US)",
            Self::EnglishUk => "English (UK)",
            Self::Hebrew => "Hebrew",
            Self::Arabic => "Arabic",
            Self::French => "French",
            Self::Spanish => "Spanish",
            Self::German => "German",
            Self::Italian => "Italian",
            Self::Portuguese => "Portuguese",
            Self::Russian => "Russian",
            Self::Japanese => "Japanese",
        }
    }

    /// Whether this language is written right-to-left
    pub fn is_rtl(&self) -> bool {
        matches!(self, Self::Hebrew | Self::Arabic)
    }

    /// Characters that terminate a sentence in this language
    pub fn sentence_terminators(&self) -> &'static [char] {
        match self {
            Self::Arabic => &['.', '!', '?', ';', ':', '؟', '۔'],
            Self::Japanese => &['.', '!', '?', ';', ':', '。', '！', '？'],
            _ => &['.', '!', '?', ';', ':'],
        }
    }

    /// Maximum words per sentence before the script processor splits it.
    ///
    /// Hebrew and Arabic words carry more information per token; German
    /// compounds push the cap the other way.
    pub fn max_sentence_words(&self) -> usize {
        match self {
            Self::Hebrew | Self::Arabic => 12,
            Self::French | Self::Spanish => 16,
            Self::German => 18,
            _ => 15,
        }
    }

    /// Average comfortable speaking rate, in words per second.
    pub fn words_per_second(&self) -> f64 {
        match self {
            Self::Hebrew | Self::Arabic => 2.2,
            Self::German => 2.3,
            _ => 2.5,
        }
    }

    /// Whether brackets and parentheses must be stripped before TTS.
    ///
    /// RTL engines mis-shape bracketed runs, which produces audible
    /// artifacts.
    pub fn strip_brackets_for_tts(&self) -> bool {
        self.is_rtl()
    }

    /// Parse from a loose string (code or name, case-insensitive)
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "en" | "en-us" | "english" => Some(Self::EnglishUs),
            "en-gb" | "en-uk" => Some(Self::EnglishUk),
            "he" | "iw" | "hebrew" => Some(Self::Hebrew),
            "ar" | "arabic" => Some(Self::Arabic),
            "fr" | "french" => Some(Self::French),
            "es" | "spanish" => Some(Self::Spanish),
            "de" | "german" => Some(Self::German),
            "it" | "italian" => Some(Self::Italian),
            "pt" | "portuguese" => Some(Self::Portuguese),
            "ru" | "russian" => Some(Self::Russian),
            "ja" | "japanese" => Some(Self::Japanese),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Unicode ranges counted as right-to-left script
const RTL_RANGES: &[(u32, u32)] = &[
    (0x0590, 0x05FF), // Hebrew
    (0x0600, 0x06FF), // Arabic
    (0x0750, 0x077F), // Arabic Supplement
    (0x08A0, 0x08FF), // Arabic Extended-A
    (0xFB50, 0xFDFF), // Arabic Presentation Forms-A
    (0xFE70, 0xFEFF), // Arabic Presentation Forms-B
];

/// Whether a single character belongs to an RTL script
pub fn is_rtl_char(c: char) -> bool {
    let code = c as u32;
    RTL_RANGES.iter().any(|&(start, end)| code >= start && code <= end)
}

/// Fraction of non-whitespace characters that are RTL script
pub fn rtl_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut rtl = 0usize;
    for c in text.chars() {
        if c.is_whitespace() {
            continue;
        }
        total += 1;
        if is_rtl_char(c) {
            rtl += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        rtl as f64 / total as f64
    }
}

/// Text counts as RTL when more than 30% of its non-whitespace
/// characters come from an RTL script.
pub fn is_rtl_text(text: &str) -> bool {
    rtl_ratio(text) > 0.3
}

/// Guess the language of a text from its dominant script.
///
/// Only distinguishes Hebrew from Arabic among RTL scripts; Latin-script
/// languages cannot be told apart by characters alone.
pub fn detect_language(text: &str) -> Option<Language> {
    if !is_rtl_text(text) {
        return None;
    }
    let hebrew = text
        .chars()
        .filter(|&c| (0x0590..=0x05FF).contains(&(c as u32)))
        .count();
    let arabic = text
        .chars()
        .filter(|&c| (0x0600..=0x06FF).contains(&(c as u32)))
        .count();
    if hebrew > arabic {
        Some(Language::Hebrew)
    } else if arabic > 0 {
        Some(Language::Arabic)
    } else {
        None
    }
}
