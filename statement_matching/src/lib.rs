/*!
Matching of rendered questionnaire statements against a catalog of answers.

A questionnaire renders its statements with small differences from the
reference text (typographic quotes, spacing, trailing punctuation). This crate
finds, for each rendered statement, the catalog entry it corresponds to and the
answer to submit.

```
use statement_matching::catalog::StatementCatalog;
use statement_matching::*;

let catalog = StatementCatalog::from_csv_text(
    "statement,opinion\nThe rich should pay more tax,I agree\n",
);
let question = normalize_text("The rich should  pay more tax.");
let res = match_statement(&question, &catalog, DEFAULT_THRESHOLD);
let action = res.entry().map(|e| plan_action(e.opinion));
assert_eq!(action, Some(ActionCode::Two));
```
*/

pub mod catalog;
mod config;
pub mod opinion;
pub mod outcome;
pub mod questionnaire;
pub mod session;
mod similarity;

use log::{debug, info, warn};

pub use crate::catalog::StatementCatalog;
pub use crate::config::*;
pub use crate::similarity::similarity_ratio;

/// Puts a text in a canonical form for comparisons.
///
/// Typographic quotes become straight quotes, the text is lowercased and
/// all runs of whitespace become a single space. Leading and trailing whitespace is removed.
pub fn normalize_text(text: &str) -> String {
    let straight: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{00B4}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            _ => c,
        })
        .collect();
    straight
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Finds the catalog entry for a normalized question.
///
/// An entry equal to the question is returned first (the earliest one in the catalog).
/// Otherwise the most similar entry is returned if its similarity reaches the threshold.
/// Among equally similar entries, the earliest one is kept.
pub fn match_statement<'a>(
    question: &str,
    catalog: &'a StatementCatalog,
    threshold: f64,
) -> MatchResult<'a> {
    if let Some(entry) = catalog.entries().iter().find(|e| e.statement == question) {
        info!("Exact match found: {}", entry.statement);
        return MatchResult::Found { entry, score: 1.0 };
    }

    let mut best: Option<&StatementEntry> = None;
    let mut best_score: f64 = 0.0;
    for entry in catalog.entries() {
        let score = similarity_ratio(question, &entry.statement);
        debug!("match_statement: {:.4} for {:?}", score, entry.statement);
        if score > best_score {
            best_score = score;
            best = Some(entry);
        }
    }

    match best {
        Some(entry) if best_score >= threshold => {
            info!(
                "Fuzzy matched with score {:.4}: '{}' to '{}'",
                best_score, question, entry.statement
            );
            MatchResult::Found {
                entry,
                score: best_score,
            }
        }
        closest => {
            warn!(
                "No match found for '{}'. Best match was {:?} with score {:.4}",
                question,
                closest.map(|e| e.statement.as_str()),
                best_score
            );
            MatchResult::NoMatch {
                best_score,
                closest,
            }
        }
    }
}

/// The answer to submit for an opinion.
pub fn plan_action(opinion: Opinion) -> ActionCode {
    match opinion {
        Opinion::StronglyDisagree => ActionCode::Zero,
        Opinion::Disagree => ActionCode::One,
        Opinion::Agree => ActionCode::Two,
        Opinion::StronglyAgree => ActionCode::Three,
    }
}

/// Same as [plan_action] for an opinion that was not validated yet.
///
/// Unknown labels produce no action: the question should be left unanswered.
pub fn plan_action_for_label(label: &str) -> Option<ActionCode> {
    match Opinion::from_label(label) {
        Some(opinion) => Some(plan_action(opinion)),
        None => {
            warn!("Unrecognized answer: '{}'", label);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn entry(statement: &str, opinion: Opinion) -> StatementEntry {
        StatementEntry {
            statement: statement.to_string(),
            opinion,
        }
    }

    #[test]
    fn normalize_basic() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("  \t\n "), "");
        assert_eq!(
            normalize_text("  The  RICH\tshould\n\npay "),
            "the rich should pay"
        );
        assert_eq!(normalize_text("\u{201C}Quoted\u{201D}"), "\"quoted\"");
    }

    #[test]
    fn normalize_quote_variants() {
        let straight = normalize_text("don't");
        assert_eq!(normalize_text("don\u{2019}t"), straight);
        assert_eq!(normalize_text("don\u{00B4}t"), straight);
        assert_eq!(normalize_text("Don\u{2018}t"), straight);
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "",
            " A  b ",
            "\u{201C}Mixed\u{201D} Case\u{2019}s\t\ttext\u{00A0}here ",
            "ÉCOLE  Straße",
            "line\r\nbreak",
        ];
        for s in samples.iter() {
            let once = normalize_text(s);
            assert_eq!(normalize_text(&once), once);
        }
    }

    #[test]
    fn exact_match_wins_over_fuzzy() {
        let catalog = StatementCatalog::new(vec![
            entry("a b c d", Opinion::Disagree),
            entry("a b c", Opinion::Agree),
        ]);
        let res = match_statement("a b c", &catalog, DEFAULT_THRESHOLD);
        assert_eq!(
            res,
            MatchResult::Found {
                entry: &catalog.entries()[1],
                score: 1.0
            }
        );
    }

    #[test]
    fn duplicate_statements_first_wins() {
        let catalog = StatementCatalog::new(vec![
            entry("same text", Opinion::StronglyAgree),
            entry("same text", Opinion::StronglyDisagree),
        ]);
        let res = match_statement("same text", &catalog, DEFAULT_THRESHOLD);
        assert_eq!(res.entry().unwrap().opinion, Opinion::StronglyAgree);

        // Equal fuzzy scores also keep the first entry.
        let res = match_statement("same text.", &catalog, DEFAULT_THRESHOLD);
        assert_eq!(res.entry().unwrap().opinion, Opinion::StronglyAgree);
    }

    #[test]
    fn threshold_is_inclusive() {
        let catalog = StatementCatalog::new(vec![entry("abcdxy", Opinion::Agree)]);
        let res = match_statement("abcd", &catalog, 0.8);
        assert_eq!(res.score(), 0.8);
        assert!(res.entry().is_some());

        let catalog = StatementCatalog::new(vec![entry("abcdxyz", Opinion::Agree)]);
        let res = match_statement("abcd", &catalog, 0.8);
        assert!(res.entry().is_none());
        assert!(res.score() < 0.8);
        assert!(matches!(
            res,
            MatchResult::NoMatch {
                closest: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn empty_catalog() {
        let catalog = StatementCatalog::default();
        let res = match_statement("anything", &catalog, DEFAULT_THRESHOLD);
        assert_eq!(
            res,
            MatchResult::NoMatch {
                best_score: 0.0,
                closest: None
            }
        );
    }

    #[test]
    fn best_fuzzy_candidate_is_selected() {
        let catalog = StatementCatalog::new(vec![
            entry("the rich should pay less tax", Opinion::Disagree),
            entry("the rich should pay more tax", Opinion::Agree),
        ]);
        let res = match_statement("the rich should pay more tax!", &catalog, 0.8);
        assert_eq!(res.entry().unwrap().opinion, Opinion::Agree);
    }

    #[test]
    fn action_codes() {
        assert_eq!(plan_action(Opinion::StronglyDisagree).value(), "0");
        assert_eq!(plan_action(Opinion::Disagree).value(), "1");
        assert_eq!(plan_action(Opinion::Agree).value(), "2");
        assert_eq!(plan_action(Opinion::StronglyAgree).value(), "3");
        assert_eq!(plan_action_for_label("strongly agree"), Some(ActionCode::Three));
        assert_eq!(plan_action_for_label("maybe"), None);
    }

    #[test]
    fn end_to_end_trailing_period() {
        init();
        let catalog = StatementCatalog::new(vec![entry(
            "the rich should pay more tax",
            Opinion::Agree,
        )]);
        let question = normalize_text("The rich should pay more tax.");
        assert_eq!(question, "the rich should pay more tax.");
        let res = match_statement(&question, &catalog, 0.8);
        match res {
            MatchResult::Found { entry, score } => {
                assert!(score > 0.8 && score < 1.0);
                assert_eq!(plan_action(entry.opinion).value(), "2");
            }
            MatchResult::NoMatch { .. } => panic!("expected a fuzzy match"),
        }
    }
}
