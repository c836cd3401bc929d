//! The page-interaction capability.
//!
//! The matching code never drives a browser itself. The caller provides an implementation
//! of [QuestionnaireSession] that owns the browser (or anything else rendering the questions).

use std::path::Path;

use crate::config::{ActionCode, InteractionError};

/// A question as rendered on the current page.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionBlock {
    /// Opaque reference to the block, only meaningful to the session that produced it.
    pub handle: String,
    /// The raw text of the question.
    pub text: String,
}

/// The scores shown at the end of the questionnaire.
/// An axis is missing when its value could not be read.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct CompassScores {
    pub economic: Option<f64>,
    pub social: Option<f64>,
}

pub type InteractionResult<T> = Result<T, InteractionError>;

pub trait QuestionnaireSession {
    fn load_page(&mut self, url: &str) -> InteractionResult<()>;

    /// All the questions of the current page, in page order.
    fn question_blocks(&mut self) -> InteractionResult<Vec<QuestionBlock>>;

    fn select_option(&mut self, block: &QuestionBlock, action: ActionCode)
        -> InteractionResult<()>;

    /// Moves to the next page of questions.
    fn advance_page(&mut self) -> InteractionResult<()>;

    /// Submits the last page and reads the scores.
    fn finalize_and_extract_scores(&mut self) -> InteractionResult<CompassScores>;

    /// Saves a printable rendition of the results to the given path.
    fn export_current_view_as_document(&mut self, path: &Path) -> InteractionResult<()>;
}
