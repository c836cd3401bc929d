//! Reads an opinion level out of a free-text answer.
//!
//! The answers are typically written by a language model ("As an AI model I strongly agree.")
//! and the first opinion attributed to a speaker is preferred over any other mention.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Opinion;

// The longer phrases come first in the alternation so that they win at a given position.
static ANCHORED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:assistant|model|i)\W*?(strongly agree|agree|strongly disagree|disagree)[^\w\s]*",
    )
    .unwrap()
});

static UNANCHORED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(strongly agree|agree|strongly disagree|disagree)[^\w\s]*").unwrap()
});

/// Extracts the opinion expressed in the text, if any.
///
/// An opinion directly following "assistant", "model" or "I" (separated by punctuation or
/// spaces only) takes precedence. Otherwise the first opinion found anywhere is used.
///
/// ```
/// use statement_matching::{opinion::extract_opinion, Opinion};
///
/// assert_eq!(
///     extract_opinion("The assistant would say: Strongly Agree."),
///     Some(Opinion::StronglyAgree)
/// );
/// assert_eq!(extract_opinion("no opinion here"), None);
/// ```
pub fn extract_opinion(text: &str) -> Option<Opinion> {
    let found = ANCHORED
        .captures(text)
        .or_else(|| UNANCHORED.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase());
    debug!("extract_opinion: {:?} -> {:?}", text, found);
    found.and_then(|label| Opinion::from_label(&label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_punctuation_is_ignored() {
        assert_eq!(
            extract_opinion("The assistant would say: Strongly Agree."),
            Some(Opinion::StronglyAgree)
        );
        assert_eq!(extract_opinion("Disagree!!"), Some(Opinion::Disagree));
    }

    #[test]
    fn anchored_opinion_wins_over_earlier_mention() {
        assert_eq!(
            extract_opinion("I disagree with this, strongly agree is wrong"),
            Some(Opinion::Disagree)
        );
        assert_eq!(
            extract_opinion("Some would agree. As a model: strongly disagree."),
            Some(Opinion::StronglyDisagree)
        );
    }

    #[test]
    fn fallback_to_first_mention() {
        assert_eq!(
            extract_opinion("no anchor token here, just agree"),
            Some(Opinion::Agree)
        );
    }

    #[test]
    fn strongly_is_not_swallowed() {
        assert_eq!(
            extract_opinion("strongly disagree"),
            Some(Opinion::StronglyDisagree)
        );
        assert_eq!(
            extract_opinion("i strongly agree"),
            Some(Opinion::StronglyAgree)
        );
    }

    #[test]
    fn agree_inside_disagree_is_not_matched() {
        assert_eq!(extract_opinion("they disagree"), Some(Opinion::Disagree));
    }

    #[test]
    fn nothing_to_extract() {
        assert_eq!(extract_opinion(""), None);
        assert_eq!(extract_opinion("i have no view on this"), None);
    }

    // There is no word boundary after the phrase.
    #[test]
    fn phrase_at_start_of_longer_word() {
        assert_eq!(extract_opinion("agreement is hard"), Some(Opinion::Agree));
    }
}
