//! User-visible text validation
//!
//! Subtitles and overlays must never show stage directions, metadata or
//! debug fragments. Cleaning order is fixed: instructions first,
//! metadata second, whitespace and punctuation last. RTL text is
//! detected by character ratio and tagged for the RTL subtitle preset.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use vidforge_core::{detect_language, is_rtl_char, is_rtl_text, Language, Platform};

/// Right-to-left mark prefixed to cleaned RTL text
const RLM: char = '\u{200F}';

/// Where the text will be shown; picks the replacement default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationContext {
    Cta,
    Hook,
    Subtitle,
    Overlay,
    General,
}

/// Result of validating one piece of user-visible text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextValidation {
    pub original: String,
    pub cleaned: String,
    pub valid: bool,
    pub issues: Vec<String>,
    pub is_rtl: bool,
    pub language: Option<Language>,
    pub metadata_removed: bool,
    pub instructions_removed: bool,
}

/// Subtitle rendering preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    pub font_size: u32,
    pub stroke_width: u32,
    pub rtl: bool,
}

impl SubtitleStyle {
    /// Standard left-to-right preset
    pub fn ltr() -> Self {
        Self { font_size: 48, stroke_width: 2, rtl: false }
    }

    /// RTL preset: larger font, thicker stroke
    pub fn rtl() -> Self {
        Self { font_size: 56, stroke_width: 4, rtl: true }
    }

    pub fn for_text(is_rtl: bool) -> Self {
        if is_rtl {
            Self::rtl()
        } else {
            Self::ltr()
        }
    }
}

static VISUAL_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[VISUAL:[^\]]*\]").expect("static pattern"));
static ASTERISK_WRAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*[^*]*\*").expect("static pattern"));
static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("static pattern"));
static SCENE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*(?:Scene|Visual|Cut to)\s*:.*$").expect("static pattern"));
static BRACE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]*\}").expect("static pattern"));
static DB_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:_id|created_at|updated_at)\s*:\s*\S+").expect("static pattern")
});
static DICT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\d+\s*,\s*['"]"#).expect("static pattern"));

/// Validator for user-visible text fragments
#[derive(Default)]
pub struct TextValidator;

impl TextValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate and clean one fragment. When cleaning leaves nothing
    /// usable, the platform's default text for the context is
    /// substituted and the result is flagged invalid.
    pub fn validate(
        &self,
        text: &str,
        context: ValidationContext,
        platform: Platform,
        expected_language: Option<Language>,
    ) -> TextValidation {
        if text.trim().is_empty() {
            return TextValidation {
                original: String::new(),
                cleaned: String::new(),
                valid: true,
                issues: Vec::new(),
                is_rtl: false,
                language: expected_language,
                metadata_removed: false,
                instructions_removed: false,
            };
        }

        let original = text.to_string();
        let mut issues = Vec::new();

        let is_rtl = is_rtl_text(text);
        let language = expected_language.or_else(|| detect_language(text));

        // Instructions first
        let (cleaned, instruction_issues) = remove_instructions(text);
        let instructions_removed = !instruction_issues.is_empty();
        issues.extend(instruction_issues);

        // Metadata second
        let (cleaned, metadata_issues) = remove_metadata(&cleaned, is_rtl);
        let metadata_removed = !metadata_issues.is_empty();
        issues.extend(metadata_issues);

        // Whitespace and punctuation last
        let cleaned = tidy(&cleaned, is_rtl);

        let valid = !cleaned.trim().is_empty() && !contains_invalid_patterns(&cleaned, is_rtl);

        let cleaned = if valid {
            cleaned
        } else {
            let substitute = match context {
                ValidationContext::Cta => platform.default_cta().to_string(),
                ValidationContext::Hook => platform.default_hook().to_string(),
                _ => "Content".to_string(),
            };
            issues.push(format!("text failed validation, using default: {substitute}"));
            substitute
        };

        if !issues.is_empty() {
            tracing::debug!(context = ?context, ?issues, "text cleaned");
        }

        TextValidation {
            original,
            cleaned,
            valid,
            issues,
            is_rtl,
            language,
            metadata_removed,
            instructions_removed,
        }
    }

    /// Validate a list of segment texts, returning cleaned texts in order
    pub fn validate_segments(
        &self,
        texts: &[String],
        platform: Platform,
        expected_language: Option<Language>,
    ) -> Vec<TextValidation> {
        texts
            .iter()
            .map(|t| self.validate(t, ValidationContext::Subtitle, platform, expected_language))
            .collect()
    }
}

fn remove_instructions(text: &str) -> (String, Vec<String>) {
    let mut issues = Vec::new();
    let mut cleaned = text.to_string();

    if VISUAL_TAG.is_match(&cleaned) {
        cleaned = VISUAL_TAG.replace_all(&cleaned, " ").into_owned();
        issues.push("removed [VISUAL:] tags".to_string());
    }
    if ASTERISK_WRAP.is_match(&cleaned) {
        cleaned = ASTERISK_WRAP.replace_all(&cleaned, " ").into_owned();
        issues.push("removed *action* markers".to_string());
    }
    if PARENTHETICAL.is_match(&cleaned) {
        cleaned = PARENTHETICAL.replace_all(&cleaned, " ").into_owned();
        issues.push("removed parenthetical directions".to_string());
    }
    if SCENE_MARKER.is_match(&cleaned) {
        cleaned = SCENE_MARKER.replace_all(&cleaned, " ").into_owned();
        issues.push("removed scene markers".to_string());
    }

    (cleaned, issues)
}

fn remove_metadata(text: &str, is_rtl: bool) -> (String, Vec<String>) {
    let mut issues = Vec::new();

    // Dictionary dumps and colon cascades mean the whole fragment is
    // metadata, not prose. RTL text gets a pass on colon counting.
    if !is_rtl && (DICT_PREFIX.is_match(text.trim()) || text.matches(':').count() > 5) {
        issues.push("entire text appears to be metadata".to_string());
        return (String::new(), issues);
    }

    let mut cleaned = text.to_string();
    if DB_FIELD.is_match(&cleaned) {
        cleaned = DB_FIELD.replace_all(&cleaned, " ").into_owned();
        issues.push("removed database fields".to_string());
    }
    if cleaned.contains('{') || cleaned.contains('}') {
        cleaned = BRACE_BLOCK.replace_all(&cleaned, " ").into_owned();
        cleaned = cleaned.replace(['{', '}'], " ");
        issues.push("removed dictionary structures".to_string());
    }

    (cleaned, issues)
}

fn tidy(text: &str, is_rtl: bool) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed
        .trim_matches(['.', ',', ';', ':', '!', '?', '-', '_', ' '])
        .to_string();

    if is_rtl && !trimmed.is_empty() && !trimmed.starts_with(RLM) {
        format!("{RLM}{trimmed}")
    } else {
        trimmed
    }
}

fn contains_invalid_patterns(text: &str, is_rtl: bool) -> bool {
    if text.contains('{') || text.contains('}') {
        return true;
    }
    if !is_rtl && text.matches(':').count() > 3 {
        return true;
    }
    if is_rtl {
        text.chars().filter(|&c| is_rtl_char(c)).count() < 2
    } else {
        text.chars().filter(|c| c.is_alphanumeric()).count() < 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(text: &str) -> TextValidation {
        TextValidator::new().validate(
            text,
            ValidationContext::Subtitle,
            Platform::Youtube,
            None,
        )
    }

    #[test]
    fn strips_stage_directions() {
        let result = validate("Breaking news *camera zooms in* (dramatic pause) tonight");
        assert_eq!(result.cleaned, "Breaking news tonight");
        assert!(result.instructions_removed);
        assert!(!result.cleaned.contains('*'));
        assert!(!result.cleaned.contains('('));
    }

    #[test]
    fn strips_visual_tags_and_scene_markers() {
        let result = validate("[VISUAL: explosion] The plot thickens");
        assert_eq!(result.cleaned, "The plot thickens");

        let result = validate("Scene: newsroom interior\nWelcome back viewers");
        assert_eq!(result.cleaned, "Welcome back viewers");
    }

    #[test]
    fn strips_metadata_structures() {
        let result = validate("Hello {\"_id\": 42} world");
        assert!(!result.cleaned.contains('{'));
        assert!(!result.cleaned.contains('}'));
        assert!(result.metadata_removed);
        assert!(result.cleaned.contains("Hello"));
    }

    #[test]
    fn colon_cascade_is_metadata() {
        let result = validate("a: 1, b: 2, c: 3, d: 4, e: 5, f: 6");
        assert!(!result.valid);
        // Substituted with the subtitle default
        assert_eq!(result.cleaned, "Content");
    }

    #[test]
    fn cta_context_substitutes_platform_default() {
        let result = TextValidator::new().validate(
            "{}",
            ValidationContext::Cta,
            Platform::Youtube,
            None,
        );
        assert!(!result.valid);
        assert_eq!(result.cleaned, Platform::Youtube.default_cta());
    }

    #[test]
    fn hebrew_is_rtl_with_rlm_prefix() {
        let result = validate("שלום (הערה) עולם");
        assert!(result.is_rtl);
        assert_eq!(result.language, Some(Language::Hebrew));
        assert!(result.cleaned.starts_with('\u{200F}'));
        assert!(!result.cleaned.contains('('));

        let style = SubtitleStyle::for_text(result.is_rtl);
        assert!(style.rtl);
        assert!(style.font_size > SubtitleStyle::ltr().font_size);
        assert!(style.stroke_width > SubtitleStyle::ltr().stroke_width);
    }

    #[test]
    fn rtl_threshold_is_thirty_percent() {
        // Mostly Latin text with a few Hebrew chars stays LTR
        let result = validate("The word שלום means hello in Hebrew language");
        assert!(!result.is_rtl);
    }

    #[test]
    fn validation_is_idempotent() {
        for input in [
            "Breaking news *zoom* (pause) tonight",
            "שלום (הערה) עולם",
            "plain subtitle text",
        ] {
            let once = validate(input);
            let twice = validate(&once.cleaned);
            assert_eq!(once.cleaned, twice.cleaned, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn empty_input_is_trivially_valid() {
        let result = validate("   ");
        assert!(result.valid);
        assert!(result.cleaned.is_empty());
    }

    #[test]
    fn segments_are_validated_in_order() {
        let validator = TextValidator::new();
        let texts = vec!["one *x*".to_string(), "two".to_string()];
        let results = validator.validate_segments(&texts, Platform::Tiktok, None);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].cleaned, "one");
        assert_eq!(results[1].cleaned, "two");
    }
}
