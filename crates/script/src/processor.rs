//! Script processing for TTS delivery
//!
//! Rewrites parsed script text into duration-budgeted, one-sentence
//! segments: contractions expanded, problematic glyphs removed, every
//! segment under the language's word cap. The text service proposes an
//! optimised script; the deterministic path enforces the budget either
//! way, so the output invariants hold even with no AI at all.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use vidforge_core::{Error, Language};
use vidforge_services::FallbackOrchestrator;

use crate::contractions::expand_contractions;
use crate::sentence::{split_long_sentence, split_sentences, word_count};

/// How well the estimated duration matched the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationMatch {
    /// Within 2 s of target
    Perfect,
    /// Within 5 s of target
    Close,
    /// Deterministically trimmed/expanded to fit
    Adjusted,
    /// Built without the text service
    Fallback,
}

/// One spoken segment: exactly one sentence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSegment {
    pub text: String,
    /// Estimated speaking time in seconds
    pub duration: f64,
    pub word_count: usize,
    pub voice_suggestion: String,
}

/// Duration-budgeted script ready for TTS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedScript {
    pub optimized_script: String,
    pub segments: Vec<ScriptSegment>,
    pub total_estimated_duration: f64,
    pub total_word_count: usize,
    pub duration_match: DurationMatch,
    pub target_duration: f64,
    pub language: Language,
}

impl ProcessedScript {
    fn empty(language: Language, target_duration: f64) -> Self {
        Self {
            optimized_script: String::new(),
            segments: Vec::new(),
            total_estimated_duration: 0.0,
            total_word_count: 0,
            duration_match: DurationMatch::Fallback,
            target_duration,
            language,
        }
    }
}

/// Script processor backed by the text-service chain
pub struct ScriptProcessor {
    orchestrator: Arc<FallbackOrchestrator>,
}

impl ScriptProcessor {
    pub fn new(orchestrator: Arc<FallbackOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Process script text into a `ProcessedScript` bound to the target
    /// duration. Never fails: AI trouble degrades to the deterministic
    /// paths.
    pub async fn process(
        &self,
        script_content: &str,
        language: Language,
        target_duration: f64,
    ) -> ProcessedScript {
        let flattened = flatten(script_content);
        if flattened.is_empty() {
            return ProcessedScript::empty(language, target_duration);
        }

        match self.process_with_ai(&flattened, language, target_duration).await {
            Ok(script) => script,
            Err(e) => {
                tracing::warn!(error = %e, "AI script processing failed, using fallback");
                build_script(
                    &flattened,
                    language,
                    target_duration,
                    DurationMatch::Fallback,
                )
            }
        }
    }

    async fn process_with_ai(
        &self,
        script_content: &str,
        language: Language,
        target_duration: f64,
    ) -> Result<ProcessedScript, Error> {
        let prompt = build_prompt(script_content, language, target_duration);
        let schema = script_schema();

        let value = match self.orchestrator.generate_structured(&prompt, &schema).await {
            Ok(outcome) => outcome.value,
            // SchemaMismatch gets one immediate re-ask with stricter
            // instructions before the fallback path takes over.
            Err(Error::SchemaMismatch(_)) => {
                let strict = format!(
                    "{prompt}\n\nReturn ONLY the JSON object. No prose, no Markdown fences."
                );
                self.orchestrator
                    .generate_structured(&strict, &schema)
                    .await?
                    .value
            }
            Err(e) => return Err(e),
        };

        let draft: AiScript = serde_json::from_value(value)?;
        let optimized = if draft.optimized_script.trim().is_empty() {
            draft
                .segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            draft.optimized_script
        };
        if optimized.trim().is_empty() {
            return Err(Error::SchemaMismatch("empty optimized script".to_string()));
        }

        // Segment boundaries, durations and word counts are recomputed
        // here; the model's own numbers are advisory only.
        let script = build_script(&optimized, language, target_duration, DurationMatch::Perfect);

        let deviation = (script.total_estimated_duration - target_duration).abs();
        if deviation <= 2.0 {
            Ok(script)
        } else if deviation <= 5.0 {
            Ok(ProcessedScript {
                duration_match: DurationMatch::Close,
                ..script
            })
        } else {
            tracing::info!(
                estimated = script.total_estimated_duration,
                target = target_duration,
                "duration mismatch, reprocessing deterministically"
            );
            Ok(reprocess_for_duration(
                &script.optimized_script,
                language,
                target_duration,
            ))
        }
    }
}

/// Loose shape of the AI response
#[derive(Debug, Deserialize)]
struct AiScript {
    #[serde(default)]
    optimized_script: String,
    #[serde(default)]
    segments: Vec<AiSegment>,
}

#[derive(Debug, Deserialize)]
struct AiSegment {
    text: String,
}

fn script_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "optimized_script": { "type": "string" },
            "segments": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" },
                        "duration": { "type": "number" },
                        "word_count": { "type": "integer" },
                        "voice_suggestion": { "type": "string" }
                    },
                    "required": ["text"]
                }
            },
            "total_estimated_duration": { "type": "number" },
            "total_word_count": { "type": "integer" },
            "duration_match": { "type": "string" }
        },
        "required": ["optimized_script", "segments"]
    })
}

fn build_prompt(script_content: &str, language: Language, target_duration: f64) -> String {
    let min_words = (target_duration * 2.3).round() as i64;
    let max_words = (target_duration * language.words_per_second()).round() as i64;

    format!(
        r#"You are an expert script processor specialising in TTS optimisation and duration control.

ORIGINAL SCRIPT:
{script_content}

TARGET LANGUAGE: {language}
TARGET DURATION: {target_duration} seconds (strict)

Requirements:
1. Fit the script to {min_words}-{max_words} words so it speaks in exactly {target_duration} seconds.
2. Exactly ONE sentence per segment, each with terminal punctuation.
3. Never use contractions: write "do not", "it is", "let us", "cannot".
4. Keep sentences under {max_sentence} words for subtitle readability.
5. Use clear, pronounceable words; remove filler rather than padding.

Return a JSON object with: optimized_script, segments (array of objects with text, duration, word_count, voice_suggestion), total_estimated_duration, total_word_count, duration_match."#,
        max_sentence = language.max_sentence_words(),
    )
}

/// Collapse paragraphs and runs of whitespace into single spaces
fn flatten(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove glyph sequences that trip TTS engines
fn apply_language_formatting(text: &str, language: Language) -> String {
    let mut formatted = text.replace("...", " ").replace('\u{2014}', " ").replace('\u{2013}', " ");
    if language.strip_brackets_for_tts() {
        formatted = formatted
            .chars()
            .filter(|c| !matches!(c, '(' | ')' | '[' | ']' | '{' | '}'))
            .collect();
    }
    flatten(&formatted)
}

/// Build a `ProcessedScript` from text: normalise, split into single
/// sentences under the cap, estimate per-segment timing.
fn build_script(
    text: &str,
    language: Language,
    target_duration: f64,
    duration_match: DurationMatch,
) -> ProcessedScript {
    let wps = language.words_per_second();
    let normalised = apply_language_formatting(&expand_contractions(text), language);

    let mut segments = Vec::new();
    for sentence in split_sentences(&normalised, language) {
        for part in split_long_sentence(&sentence, language.max_sentence_words(), language) {
            let words = word_count(&part);
            if words == 0 {
                continue;
            }
            segments.push(ScriptSegment {
                text: part,
                duration: words as f64 / wps,
                word_count: words,
                voice_suggestion: "storyteller".to_string(),
            });
        }
    }

    let total_estimated_duration = segments.iter().map(|s| s.duration).sum();
    let total_word_count = segments.iter().map(|s| s.word_count).sum();
    let optimized_script = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    ProcessedScript {
        optimized_script,
        segments,
        total_estimated_duration,
        total_word_count,
        duration_match,
        target_duration,
        language,
    }
}

/// Deterministic duration correction: trim at sentence boundaries when
/// well over budget, cycle source sentences when well under.
fn reprocess_for_duration(
    text: &str,
    language: Language,
    target_duration: f64,
) -> ProcessedScript {
    let wps = language.words_per_second();
    let budget = (target_duration * wps).round() as usize;
    let words = word_count(text);

    let adjusted = if words as f64 > budget as f64 * 1.2 {
        trim_to_budget(text, language, budget)
    } else if (words as f64) < budget as f64 * 0.6 {
        extend_to_budget(text, language, budget)
    } else {
        text.to_string()
    };

    build_script(&adjusted, language, target_duration, DurationMatch::Adjusted)
}

/// Drop whole sentences from the end until within 110% of the budget
fn trim_to_budget(text: &str, language: Language, budget: usize) -> String {
    let limit = (budget as f64 * 1.1) as usize;
    let mut kept = Vec::new();
    let mut used = 0usize;

    for sentence in split_sentences(text, language) {
        let words = word_count(&sentence);
        if used + words > limit {
            break;
        }
        used += words;
        kept.push(sentence);
    }
    if kept.is_empty() {
        // A single over-budget sentence still has to be spoken.
        split_sentences(text, language)
            .into_iter()
            .next()
            .unwrap_or_default()
    } else {
        kept.join(" ")
    }
}

/// Repeat source sentences until the budget is reached
fn extend_to_budget(text: &str, language: Language, budget: usize) -> String {
    let sentences = split_sentences(text, language);
    if sentences.is_empty() {
        return text.to_string();
    }
    let mut out = Vec::new();
    let mut used = 0usize;
    let mut i = 0usize;
    while used < budget {
        let sentence = &sentences[i % sentences.len()];
        used += word_count(sentence);
        out.push(sentence.clone());
        i += 1;
        if i > sentences.len() * 10 {
            break;
        }
    }
    out.join(" ")
}
