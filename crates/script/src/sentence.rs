//! Sentence splitting and repair
//!
//! Splits text into single sentences on language-aware terminators,
//! keeping terminal punctuation attached and leaving decimal numbers
//! intact. Long sentences are re-split at commas and conjunctions so
//! every segment stays under the language's word cap.

use unicode_segmentation::UnicodeSegmentation;
use vidforge_core::Language;

/// Words a long sentence may break after, besides commas
const BREAK_WORDS: &[&str] = &[
    "and", "but", "or", "so", "because", "when", "while", "although",
];

/// Count words the way the rest of the pipeline does
pub fn word_count(text: &str) -> usize {
    text.unicode_words().count()
}

/// Split text into sentences, preserving terminal punctuation.
///
/// A `.` between two digits is part of a number, not a terminator.
/// Trailing text without a terminator becomes the final sentence.
pub fn split_sentences(text: &str, language: Language) -> Vec<String> {
    let terminators = language.sentence_terminators();
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        current.push(c);

        let is_decimal_point = c == '.'
            && i > 0
            && i + 1 < chars.len()
            && chars[i - 1].is_ascii_digit()
            && chars[i + 1].is_ascii_digit();

        if terminators.contains(&c) && !is_decimal_point {
            let mut end = i + 1;
            // Absorb terminator runs ("?!", "...") and closing quotes
            while end < chars.len() {
                let next = chars[end];
                if terminators.contains(&next)
                    || matches!(next, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}')
                {
                    current.push(next);
                    end += 1;
                } else {
                    break;
                }
            }
            i = end;

            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        } else {
            i += 1;
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Ensure a sentence carries a terminator, picking one from content.
pub fn ensure_terminal_punctuation(sentence: &str, language: Language) -> String {
    let sentence = sentence.trim();
    if sentence.is_empty() {
        return String::new();
    }
    if sentence
        .chars()
        .last()
        .map(|c| language.sentence_terminators().contains(&c))
        .unwrap_or(false)
    {
        return sentence.to_string();
    }

    let lower = sentence.to_lowercase();
    let interrogative = ["what", "who", "when", "where", "why", "how"]
        .iter()
        .any(|w| lower.starts_with(w));
    let exclamatory = ["amazing", "wow", "incredible", "awesome"]
        .iter()
        .any(|w| lower.contains(w));

    if sentence.contains('?') || interrogative {
        format!("{sentence}?")
    } else if sentence.contains('!') || exclamatory {
        format!("{sentence}!")
    } else {
        format!("{sentence}.")
    }
}

/// Split a sentence exceeding the word cap into shorter sentences,
/// breaking at commas or conjunctions once past half the cap.
pub fn split_long_sentence(sentence: &str, max_words: usize, language: Language) -> Vec<String> {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if words.len() <= max_words {
        return vec![ensure_terminal_punctuation(sentence, language)];
    }

    let mut result = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in words {
        current.push(word);

        let lower = word.to_lowercase();
        let natural_break =
            word.ends_with(',') || BREAK_WORDS.contains(&lower.trim_matches(','));
        let should_break =
            current.len() >= max_words || (current.len() >= max_words / 2 && natural_break);

        if should_break {
            let part = current.join(" ");
            let part = part.trim_end_matches(',').to_string();
            result.push(ensure_terminal_punctuation(&part, language));
            current.clear();
        }
    }

    if !current.is_empty() {
        let part = current.join(" ");
        result.push(ensure_terminal_punctuation(&part, language));
    }
    result
}
