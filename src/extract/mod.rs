//! Answer-letter extraction from free-text model responses.
//!
//! Pattern precedence is contractual: an explicit `<answer>` tag is trusted
//! over keyword forms, keyword forms over a bare standalone letter, and all
//! pattern matches over an option-text substring scan. A model restating an
//! option without committing to it must not beat a tagged answer.

use regex::Regex;

/// Sentinel answer letter meaning "no answer could be determined."
pub const UNANSWERED: char = 'X';

/// Extract the answer letter from a model response.
///
/// `valid_letters` is the question's answer alphabet; `options` are the
/// (letter, text) pairs used for the substring fallback. The result is
/// always a member of `valid_letters` or [`UNANSWERED`].
pub fn extract_answer(
    response_text: &str,
    valid_letters: &[char],
    options: &[(String, String)],
) -> char {
    let text = response_text.trim().to_uppercase();

    let class: String = valid_letters
        .iter()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if !class.is_empty() {
        let patterns = [
            format!("<ANSWER>([{class}])</ANSWER>"),
            format!(r"ANSWER[\s:]*([{class}])"),
            format!(r"\b([{class}])\b"),
            format!(r"OPTION[\s:]*([{class}])"),
            format!(r"CHOICE[\s:]*([{class}])"),
        ];

        for pattern in &patterns {
            // The class is plain ASCII letters, so these always compile.
            let Ok(re) = Regex::new(pattern) else { continue };
            if let Some(m) = re.captures(&text).and_then(|caps| caps.get(1)) {
                if let Some(letter) = m.as_str().chars().next() {
                    return letter;
                }
            }
        }
    }

    // No committed pattern: see if the response reproduces an option's text.
    for (key, option_text) in options {
        let option_upper = option_text.trim().to_uppercase();
        if option_upper.is_empty() || !text.contains(&option_upper) {
            continue;
        }
        let mut chars = key.trim().chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphabetic() {
                return c.to_ascii_uppercase();
            }
        }
    }

    UNANSWERED
}
