//! Mission parsing
//!
//! Splits a free-form mission into spoken script, visual instructions
//! and style notes. The text service does the heavy lifting when it is
//! available; a rule-based parse covers the rest. Either way the
//! output invariant holds: script content carries no stage directions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use vidforge_core::{Error, Platform};
use vidforge_services::FallbackOrchestrator;

use crate::sentence::split_sentences;

/// Confidence at or above which an AI parse is accepted as reliable
const RELIABLE_CONFIDENCE: f64 = 0.8;
/// Confidence below which the heuristic parse replaces the AI parse
const FALLBACK_CONFIDENCE: f64 = 0.6;

/// Parsed mission with separated components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedMission {
    /// Mission text as received
    pub original_mission: String,
    /// What should be spoken, and nothing else
    pub script_content: String,
    /// Visual elements to show, never spoken
    pub visual_instructions: Vec<String>,
    /// Character name -> description
    pub character_descriptions: HashMap<String, String>,
    /// Settings, backgrounds, environments
    pub scene_descriptions: Vec<String>,
    /// Animation/visual style notes
    pub style_notes: String,
    /// Overlays, tickers, logos
    pub special_effects: Vec<String>,
    /// Comedy/satire flag
    pub is_satirical: bool,
    /// Content category, e.g. "news_parody"
    pub mission_type: String,
    /// How confident the parse is, 0.0-1.0
    pub parsing_confidence: f64,
}

/// Extra context forwarded by the caller (CLI flags in the original UI)
#[derive(Debug, Clone, Default)]
pub struct MissionFlags {
    pub character: Option<String>,
    pub scene: Option<String>,
    pub visual_style: Option<String>,
    pub theme: Option<String>,
}

impl MissionFlags {
    fn context_block(&self) -> String {
        let mut parts = Vec::new();
        if let Some(character) = &self.character {
            parts.push(format!("Character: {character}"));
        }
        if let Some(scene) = &self.scene {
            parts.push(format!("Scene: {scene}"));
        }
        if let Some(style) = &self.visual_style {
            parts.push(format!("Visual style: {style}"));
        }
        if let Some(theme) = &self.theme {
            parts.push(format!("Theme: {theme}"));
        }
        if parts.is_empty() {
            "No additional context provided".to_string()
        } else {
            parts.join("\n")
        }
    }
}

// Dialogue: a speaker label or speech verb followed by quoted text
static DIALOGUE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?i)(?:says?|said|speaking|announces?|reports?|states?):\s*["']([^"']+)["']"#)
            .expect("static pattern"),
        Regex::new(r#"[A-Z][a-zA-Z]*:\s*["']([^"']+)["']"#).expect("static pattern"),
        Regex::new(r#""([^"]+)""#).expect("static pattern"),
    ]
});

// Visual instructions: asterisk actions, stage parentheticals, command verbs
static ASTERISK_ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("static pattern"));
static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("static pattern"));
static VISUAL_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b((?:Cut to|Show|Display|Pan to|Zoom|Fade)\b[^.!?*()]*)")
        .expect("static pattern")
});
static SCENE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)(?:Scene|Background|Setting|Visual):\s*([^.!?\n]*)").expect("static pattern")
});
static SPEAKER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z\s]*:\s*").expect("static pattern"));

/// Markers that disqualify a sentence from being spoken script
const SCRIPT_SKIP_MARKERS: &[&str] = &[
    "show", "display", "cut to", "pan to", "zoom", "fade", "scene:", "background:",
    "setting:", "visual:", "(", "*", "[", "style", "animation",
];

const SATIRE_MARKERS: &[&str] = &["family guy", "parody", "satire", "comedy", "funny"];

/// Mission parser backed by the text-service chain with a rule-based
/// fallback.
pub struct MissionParser {
    orchestrator: Arc<FallbackOrchestrator>,
}

impl MissionParser {
    pub fn new(orchestrator: Arc<FallbackOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Parse a mission. Never fails: an unusable AI parse degrades to
    /// the heuristic parse, which degrades to a minimal parse.
    pub async fn parse(
        &self,
        mission: &str,
        platform: Option<Platform>,
        flags: Option<&MissionFlags>,
    ) -> ParsedMission {
        match self.parse_with_ai(mission, platform, flags).await {
            Ok(parsed) if parsed.parsing_confidence >= FALLBACK_CONFIDENCE => {
                if parsed.parsing_confidence < RELIABLE_CONFIDENCE {
                    tracing::info!(
                        confidence = parsed.parsing_confidence,
                        "mission parse below reliable confidence, keeping it"
                    );
                }
                scrub(parsed)
            }
            Ok(parsed) => {
                tracing::info!(
                    confidence = parsed.parsing_confidence,
                    "mission parse confidence too low, using heuristic parse"
                );
                self.heuristic_parse(mission, flags)
            }
            Err(e) => {
                tracing::warn!(error = %e, "AI mission parse failed, using heuristic parse");
                self.heuristic_parse(mission, flags)
            }
        }
    }

    async fn parse_with_ai(
        &self,
        mission: &str,
        platform: Option<Platform>,
        flags: Option<&MissionFlags>,
    ) -> Result<ParsedMission, Error> {
        let prompt = build_prompt(mission, platform, flags);
        let schema = parse_schema();

        let value = match self.orchestrator.generate_structured(&prompt, &schema).await {
            Ok(outcome) => outcome.value,
            // One immediate re-ask with stricter instructions before
            // giving up on the AI path.
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

        let draft: AiParse = serde_json::from_value(value)?;
        Ok(ParsedMission {
            original_mission: mission.to_string(),
            script_content: draft.script_content,
            visual_instructions: draft.visual_instructions,
            character_descriptions: draft.character_descriptions,
            scene_descriptions: draft.scene_descriptions,
            style_notes: draft.style_notes,
            special_effects: draft.special_effects,
            is_satirical: draft.is_satirical,
            mission_type: draft.mission_type,
            parsing_confidence: draft.parsing_confidence.clamp(0.0, 1.0),
        })
    }

    /// Rule-based parse used when the text service is unavailable or
    /// not confident.
    pub fn heuristic_parse(&self, mission: &str, flags: Option<&MissionFlags>) -> ParsedMission {
        heuristic_parse_impl(mission, flags)
    }
}

/// Loose shape of the AI response; missing fields default
#[derive(Debug, Deserialize)]
struct AiParse {
    script_content: String,
    #[serde(default)]
    visual_instructions: Vec<String>,
    #[serde(default)]
    character_descriptions: HashMap<String, String>,
    #[serde(default)]
    scene_descriptions: Vec<String>,
    #[serde(default)]
    style_notes: String,
    #[serde(default)]
    special_effects: Vec<String>,
    #[serde(default)]
    is_satirical: bool,
    #[serde(default = "default_mission_type")]
    mission_type: String,
    parsing_confidence: f64,
}

fn default_mission_type() -> String {
    "general".to_string()
}

fn parse_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "script_content": { "type": "string" },
            "visual_instructions": { "type": "array", "items": { "type": "string" } },
            "character_descriptions": { "type": "object" },
            "scene_descriptions": { "type": "array", "items": { "type": "string" } },
            "style_notes": { "type": "string" },
            "special_effects": { "type": "array", "items": { "type": "string" } },
            "is_satirical": { "type": "boolean" },
            "mission_type": { "type": "string" },
            "parsing_confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 }
        },
        "required": ["script_content", "parsing_confidence"]
    })
}

fn build_prompt(mission: &str, platform: Option<Platform>, flags: Option<&MissionFlags>) -> String {
    let flag_context = flags
        .map(MissionFlags::context_block)
        .unwrap_or_else(|| "No additional context provided".to_string());
    let platform_line = platform
        .map(|p| format!("Target platform: {p}"))
        .unwrap_or_default();

    format!(
        r#"You are an expert video content parser. Separate this mission statement into components.

MISSION STATEMENT:
"{mission}"

ADDITIONAL CONTEXT:
{flag_context}
{platform_line}

Rules:
- script_content contains ONLY what is meant to be spoken or narrated.
- Visual actions like "show", "display", "cut to" belong in visual_instructions, never in the script.
- Quoted text is usually dialogue for the script; strip the speaker label.
- Extract character descriptions, scene descriptions, style notes (e.g. "Family Guy style") and special effects (logos, tickers, overlays).
- Mark satirical/comedy content with is_satirical.

Return a JSON object with: script_content, visual_instructions, character_descriptions, scene_descriptions, style_notes, special_effects, is_satirical, mission_type, parsing_confidence (0.0-1.0)."#
    )
}

/// Enforce the output invariant on an accepted AI parse: no sentence in
/// the script may open with a stage-direction marker. Offenders are
/// routed to the visual instructions.
fn scrub(mut parsed: ParsedMission) -> ParsedMission {
    let sentences = split_sentences(&parsed.script_content, Default::default());
    let mut kept = Vec::new();
    for sentence in sentences {
        if is_stage_direction(&sentence) {
            let cleaned = sentence.trim_matches(['*', '(', ')', '[', ']']).trim().to_string();
            if !cleaned.is_empty() && !parsed.visual_instructions.contains(&cleaned) {
                parsed.visual_instructions.push(cleaned);
            }
        } else {
            kept.push(sentence);
        }
    }
    parsed.script_content = kept.join(" ");
    parsed
}

fn is_stage_direction(sentence: &str) -> bool {
    let trimmed = sentence.trim_start();
    if trimmed.starts_with(['(', '*', '[']) {
        return true;
    }
    let lower = trimmed.to_lowercase();
    lower.starts_with("show ")
        || lower.starts_with("cut to")
        || lower.starts_with("scene:")
}

fn heuristic_parse_impl(mission: &str, flags: Option<&MissionFlags>) -> ParsedMission {
    tracing::debug!("using heuristic mission parse");

    let mut script_parts: Vec<String> = Vec::new();
    for pattern in DIALOGUE_PATTERNS.iter() {
        for caps in pattern.captures_iter(mission) {
            let text = caps[1].trim();
            if text.len() > 3 {
                script_parts.push(text.to_string());
            }
        }
    }

    let mut visual_instructions: Vec<String> = Vec::new();
    for caps in ASTERISK_ACTION.captures_iter(mission) {
        visual_instructions.push(caps[1].trim().to_string());
    }
    for caps in PARENTHETICAL.captures_iter(mission) {
        visual_instructions.push(caps[1].trim().to_string());
    }
    for caps in VISUAL_COMMAND.captures_iter(mission) {
        visual_instructions.push(caps[1].trim().to_string());
    }

    let mut scene_descriptions: Vec<String> = Vec::new();
    for caps in SCENE_MARKER.captures_iter(mission) {
        let text = caps[1].trim();
        if !text.is_empty() {
            scene_descriptions.push(text.to_string());
        }
    }

    // No quoted dialogue found: salvage narrative sentences that are
    // not visual instructions.
    if script_parts.is_empty() {
        for sentence in split_sentences(mission, Default::default()) {
            let lower = sentence.to_lowercase();
            let is_visual = SCRIPT_SKIP_MARKERS.iter().any(|m| lower.contains(m));
            if !is_visual && sentence.len() > 10 && !sentence.ends_with(':') {
                script_parts.push(sentence);
            }
        }
    }

    // Strip speaker labels and deduplicate
    let mut unique_parts: Vec<String> = Vec::new();
    for part in script_parts {
        let cleaned = SPEAKER_LABEL.replace(&part, "").trim().to_string();
        if !cleaned.is_empty() && !unique_parts.contains(&cleaned) {
            unique_parts.push(cleaned);
        }
    }
    let script_content = unique_parts.join(" ");

    let lower_mission = mission.to_lowercase();
    let style_notes = if lower_mission.contains("family guy") {
        "Family Guy animation style".to_string()
    } else if lower_mission.contains("marvel") {
        "Marvel Comics style".to_string()
    } else if lower_mission.contains("anime") {
        "Anime style".to_string()
    } else {
        flags.and_then(|f| f.visual_style.clone()).unwrap_or_default()
    };

    let is_satirical = SATIRE_MARKERS.iter().any(|m| lower_mission.contains(m));

    dedup(&mut visual_instructions);

    let mut character_descriptions = HashMap::new();
    if let Some(character) = flags.and_then(|f| f.character.clone()) {
        character_descriptions.insert("character".to_string(), character);
    }
    if let Some(scene) = flags.and_then(|f| f.scene.clone()) {
        scene_descriptions.push(scene);
    }

    if script_content.is_empty() {
        // Minimal parse: speak the mission as-is, low confidence.
        return ParsedMission {
            original_mission: mission.to_string(),
            script_content: mission.to_string(),
            visual_instructions,
            character_descriptions,
            scene_descriptions,
            style_notes,
            special_effects: Vec::new(),
            is_satirical,
            mission_type: "general".to_string(),
            parsing_confidence: 0.3,
        };
    }

    ParsedMission {
        original_mission: mission.to_string(),
        script_content,
        visual_instructions,
        character_descriptions,
        scene_descriptions,
        style_notes,
        special_effects: Vec::new(),
        is_satirical,
        mission_type: if is_satirical { "news_parody" } else { "general" }.to_string(),
        parsing_confidence: 0.6,
    }
}

fn dedup(items: &mut Vec<String>) {
    let mut seen = Vec::new();
    items.retain(|item| {
        let key = item.to_lowercase();
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}
