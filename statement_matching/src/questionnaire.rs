//! Answers all the pages of a questionnaire through a [QuestionnaireSession].

use std::thread;

use log::{debug, error, info, warn};

use crate::catalog::StatementCatalog;
use crate::config::{FillRules, MatchResult};
use crate::session::{InteractionResult, QuestionBlock, QuestionnaireSession};
use crate::{match_statement, normalize_text, plan_action};

// Number of catalog statements shown when a question cannot be matched.
const STATEMENTS_SHOWN_ON_MISS: usize = 5;

/// What happened while filling a questionnaire.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FillReport {
    pub pages_completed: u32,
    pub answered: u32,
    /// Questions without a catalog entry (or without text).
    pub unmatched: u32,
    /// Questions with an entry for which the answer could not be submitted.
    pub failed_selections: u32,
}

/// Runs an interaction up to `max_attempts` times, pausing between attempts.
pub fn with_retries<T, F>(rules: &FillRules, what: &str, mut f: F) -> InteractionResult<T>
where
    F: FnMut() -> InteractionResult<T>,
{
    let attempts = rules.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match f() {
            Ok(x) => return Ok(x),
            Err(e) if attempt < attempts => {
                warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                thread::sleep(rules.retry_delay);
                attempt += 1;
            }
            Err(e) => {
                error!("{} failed after {} attempts: {}", what, attempts, e);
                return Err(e);
            }
        }
    }
}

fn answer_question<S: QuestionnaireSession>(
    session: &mut S,
    block: &QuestionBlock,
    catalog: &StatementCatalog,
    rules: &FillRules,
    report: &mut FillReport,
) {
    let question = normalize_text(&block.text);
    if question.is_empty() {
        warn!("Skipped empty question block {}", block.handle);
        report.unmatched += 1;
        return;
    }
    debug!("Normalized website question: '{}'", question);

    match match_statement(&question, catalog, rules.threshold) {
        MatchResult::Found { entry, .. } => {
            let action = plan_action(entry.opinion);
            info!(
                "Answering question: '{}' with '{}' (value {})",
                block.text, entry.opinion, action
            );
            let what = format!("Selecting option {} for '{}'", action, block.text);
            match with_retries(rules, &what, || session.select_option(block, action)) {
                Ok(()) => report.answered += 1,
                Err(_) => {
                    error!("Could not select option for question '{}'", block.text);
                    report.failed_selections += 1;
                }
            }
        }
        MatchResult::NoMatch { .. } => {
            warn!("No matching answer found for question: {}", block.text);
            info!(
                "First {} available statements in CSV:",
                STATEMENTS_SHOWN_ON_MISS
            );
            for (idx, e) in catalog
                .entries()
                .iter()
                .take(STATEMENTS_SHOWN_ON_MISS)
                .enumerate()
            {
                info!("{}. {}", idx + 1, e.statement);
            }
            report.unmatched += 1;
        }
    }
}

/// Answers every page of the questionnaire currently loaded in the session.
///
/// Problems with single questions never stop the filling. If the questions of a page
/// cannot be read after all the attempts, the remaining pages are abandoned.
/// The last page is not submitted: see [QuestionnaireSession::finalize_and_extract_scores].
pub fn fill_questionnaire<S: QuestionnaireSession>(
    session: &mut S,
    catalog: &StatementCatalog,
    rules: &FillRules,
) -> FillReport {
    let mut report = FillReport::default();
    for page in 1..=rules.total_pages {
        info!("Filling out page {}", page);
        let blocks: Vec<QuestionBlock> = match with_retries(
            rules,
            &format!("Reading the questions of page {}", page),
            || session.question_blocks(),
        ) {
            Ok(b) => b,
            Err(e) => {
                error!("Giving up on page {}: {}", page, e);
                break;
            }
        };
        info!("Found {} questions on page {}.", blocks.len(), page);

        for block in blocks.iter() {
            answer_question(session, block, catalog, rules, &mut report);
        }
        report.pages_completed += 1;

        if page < rules.total_pages {
            if let Err(e) = session.advance_page() {
                error!("Error moving past page {}: {}", page, e);
            }
        }
    }
    info!(
        "Filled {} pages: {} answered, {} unmatched, {} failed selections",
        report.pages_completed, report.answered, report.unmatched, report.failed_selections
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionCode, InteractionError, Opinion, StatementEntry};
    use crate::session::CompassScores;
    use std::path::Path;
    use std::time::Duration;

    /// A questionnaire scripted in memory.
    #[derive(Default)]
    struct ScriptedSession {
        pages: Vec<Vec<String>>,
        current: usize,
        // The next selections that will fail.
        select_failures: u32,
        page_failures: u32,
        selections: Vec<(usize, String, ActionCode)>,
        advances: u32,
    }

    impl QuestionnaireSession for ScriptedSession {
        fn load_page(&mut self, _url: &str) -> InteractionResult<()> {
            self.current = 0;
            Ok(())
        }

        fn question_blocks(&mut self) -> InteractionResult<Vec<QuestionBlock>> {
            if self.page_failures > 0 {
                self.page_failures -= 1;
                return Err(InteractionError::Timeout("fieldset".to_string()));
            }
            Ok(self.pages[self.current]
                .iter()
                .enumerate()
                .map(|(idx, text)| QuestionBlock {
                    handle: format!("{}-{}", self.current, idx),
                    text: text.clone(),
                })
                .collect())
        }

        fn select_option(
            &mut self,
            block: &QuestionBlock,
            action: ActionCode,
        ) -> InteractionResult<()> {
            if self.select_failures > 0 {
                self.select_failures -= 1;
                return Err(InteractionError::ElementNotFound(block.handle.clone()));
            }
            self.selections
                .push((self.current, block.text.clone(), action));
            Ok(())
        }

        fn advance_page(&mut self) -> InteractionResult<()> {
            self.advances += 1;
            self.current += 1;
            Ok(())
        }

        fn finalize_and_extract_scores(&mut self) -> InteractionResult<CompassScores> {
            Ok(CompassScores {
                economic: Some(0.0),
                social: Some(0.0),
            })
        }

        fn export_current_view_as_document(&mut self, _path: &Path) -> InteractionResult<()> {
            Ok(())
        }
    }

    fn rules(total_pages: u32) -> FillRules {
        FillRules {
            total_pages,
            retry_delay: Duration::from_millis(0),
            ..FillRules::DEFAULT_RULES
        }
    }

    fn catalog() -> StatementCatalog {
        StatementCatalog::new(vec![
            StatementEntry {
                statement: "the rich should pay more tax".to_string(),
                opinion: Opinion::Agree,
            },
            StatementEntry {
                statement: "astrology accurately explains many things.".to_string(),
                opinion: Opinion::StronglyDisagree,
            },
        ])
    }

    #[test]
    fn answers_all_pages() {
        let mut session = ScriptedSession {
            pages: vec![
                vec!["The rich should pay more tax.".to_string()],
                vec![
                    "Astrology accurately explains many things.".to_string(),
                    "Something completely unrelated".to_string(),
                    "   ".to_string(),
                ],
            ],
            ..ScriptedSession::default()
        };
        let report = fill_questionnaire(&mut session, &catalog(), &rules(2));
        assert_eq!(
            report,
            FillReport {
                pages_completed: 2,
                answered: 2,
                unmatched: 2,
                failed_selections: 0,
            }
        );
        // The last page is left to the finalization.
        assert_eq!(session.advances, 1);
        assert_eq!(session.selections[0].2, ActionCode::Two);
        assert_eq!(session.selections[1].0, 1);
        assert_eq!(session.selections[1].2, ActionCode::Zero);
    }

    #[test]
    fn selection_is_retried() {
        let mut session = ScriptedSession {
            pages: vec![vec!["The rich should pay more tax".to_string()]],
            select_failures: 2,
            ..ScriptedSession::default()
        };
        let report = fill_questionnaire(&mut session, &catalog(), &rules(1));
        assert_eq!(report.answered, 1);
        assert_eq!(report.failed_selections, 0);
    }

    #[test]
    fn selection_gives_up() {
        let mut session = ScriptedSession {
            pages: vec![vec!["The rich should pay more tax".to_string()]],
            select_failures: 3,
            ..ScriptedSession::default()
        };
        let report = fill_questionnaire(&mut session, &catalog(), &rules(1));
        assert_eq!(report.answered, 0);
        assert_eq!(report.failed_selections, 1);
        assert_eq!(report.pages_completed, 1);
    }

    #[test]
    fn unreadable_page_stops_filling() {
        let mut session = ScriptedSession {
            pages: vec![vec![], vec![]],
            page_failures: 3,
            ..ScriptedSession::default()
        };
        let report = fill_questionnaire(&mut session, &catalog(), &rules(2));
        assert_eq!(report.pages_completed, 0);
        assert_eq!(session.advances, 0);
    }

    #[test]
    fn retries_return_last_error() {
        let mut calls = 0;
        let res: Result<(), InteractionError> = with_retries(&rules(1), "test", || {
            calls += 1;
            Err(InteractionError::Transport("down".to_string()))
        });
        assert_eq!(calls, 3);
        assert_eq!(res, Err(InteractionError::Transport("down".to_string())));
    }
}
