//! Contraction expansion for TTS
//!
//! TTS engines spell out contractions letter by letter often enough
//! that the script processor bans them outright. The table is fixed and
//! its expansions contain no contractions, so expansion is idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Fixed expansion table, lowercase forms
const TABLE: &[(&str, &str)] = &[
    ("don't", "do not"),
    ("doesn't", "does not"),
    ("didn't", "did not"),
    ("isn't", "is not"),
    ("aren't", "are not"),
    ("wasn't", "was not"),
    ("weren't", "were not"),
    ("won't", "will not"),
    ("can't", "cannot"),
    ("couldn't", "could not"),
    ("shouldn't", "should not"),
    ("wouldn't", "would not"),
    ("it's", "it is"),
    ("that's", "that is"),
    ("there's", "there is"),
    ("what's", "what is"),
    ("let's", "let us"),
    ("we're", "we are"),
    ("they're", "they are"),
    ("you're", "you are"),
    ("i'm", "i am"),
    ("i've", "i have"),
    ("we've", "we have"),
    ("you've", "you have"),
    ("i'll", "i will"),
    ("we'll", "we will"),
    ("you'll", "you will"),
];

static PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    TABLE
        .iter()
        .map(|(contraction, expansion)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(contraction));
            (Regex::new(&pattern).expect("static contraction pattern"), *expansion)
        })
        .collect()
});

/// Expand every contraction from the fixed table, preserving the
/// capitalisation of the original token.
pub fn expand_contractions(text: &str) -> String {
    // Curly apostrophes fold into straight ones before matching.
    let mut result = text.replace('\u{2019}', "'");

    for (pattern, expansion) in PATTERNS.iter() {
        result = pattern
            .replace_all(&result, |caps: &regex::Captures<'_>| {
                match_case(&caps[0], expansion)
            })
            .into_owned();
    }
    result
}

/// Whether any table contraction appears in the text (case-insensitive)
pub fn contains_contraction(text: &str) -> bool {
    let folded = text.replace('\u{2019}', "'");
    PATTERNS.iter().any(|(pattern, _)| pattern.is_match(&folded))
}

/// Apply the source token's capitalisation to the replacement
fn match_case(source: &str, replacement: &str) -> String {
    let mut chars = source.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            if source.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase)
                && source.chars().filter(|c| c.is_alphabetic()).count() > 1
            {
                replacement.to_uppercase()
            } else {
                let mut out = String::with_capacity(replacement.len());
                let mut rep = replacement.chars();
                if let Some(r) = rep.next() {
                    out.extend(r.to_uppercase());
                }
                out.extend(rep);
                out
            }
        }
        _ => replacement.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_spec_table() {
        assert_eq!(expand_contractions("don't stop"), "do not stop");
        assert_eq!(expand_contractions("it's fine"), "it is fine");
        assert_eq!(expand_contractions("we're here"), "we are here");
        assert_eq!(expand_contractions("let's go"), "let us go");
        assert_eq!(expand_contractions("you won't win"), "you will not win");
        assert_eq!(expand_contractions("I can't"), "I cannot");
    }

    #[test]
    fn preserves_capitalisation() {
        assert_eq!(expand_contractions("Don't stop"), "Do not stop");
        assert_eq!(expand_contractions("DON'T STOP"), "DO NOT STOP");
        assert_eq!(expand_contractions("I'm ready"), "I am ready");
    }

    #[test]
    fn handles_curly_apostrophes() {
        assert_eq!(expand_contractions("don\u{2019}t stop"), "do not stop");
    }

    #[test]
    fn expansion_is_idempotent() {
        let once = expand_contractions("Don't worry, it's fine and we're close.");
        let twice = expand_contractions(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn detection() {
        assert!(contains_contraction("I can't do this"));
        assert!(contains_contraction("It\u{2019}s here"));
        assert!(!contains_contraction("I cannot do this"));
        // "cant" without apostrophe is a different word, leave it alone
        assert!(!contains_contraction("recant the statement"));
    }

    #[test]
    fn word_boundaries_respected() {
        // "won't" inside a longer token must not match
        assert_eq!(expand_contractions("showbiz"), "showbiz");
        assert_eq!(expand_contractions("its value"), "its value");
    }
}
