// ********* Catalog data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::time::Duration;

/// The four agreement levels that a statement can be answered with.
///
/// The variants are ordered from the strongest disagreement to the strongest agreement.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Opinion {
    StronglyDisagree,
    Disagree,
    Agree,
    StronglyAgree,
}

impl Opinion {
    pub const ALL: [Opinion; 4] = [
        Opinion::StronglyDisagree,
        Opinion::Disagree,
        Opinion::Agree,
        Opinion::StronglyAgree,
    ];

    /// The lowercase label, as it appears in the free-text opinions.
    pub fn label(&self) -> &'static str {
        match self {
            Opinion::StronglyDisagree => "strongly disagree",
            Opinion::Disagree => "disagree",
            Opinion::Agree => "agree",
            Opinion::StronglyAgree => "strongly agree",
        }
    }

    /// Reads back a label. Only the exact lowercase labels are accepted.
    pub fn from_label(label: &str) -> Option<Opinion> {
        Opinion::ALL.iter().find(|o| o.label() == label).cloned()
    }
}

impl Display for Opinion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The value submitted to the questionnaire to select one of the four answers.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ActionCode {
    Zero,
    One,
    Two,
    Three,
}

impl ActionCode {
    /// The value of the radio input on the page.
    pub fn value(&self) -> &'static str {
        match self {
            ActionCode::Zero => "0",
            ActionCode::One => "1",
            ActionCode::Two => "2",
            ActionCode::Three => "3",
        }
    }
}

impl Display for ActionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// A canonical statement and the opinion to answer it with.
///
/// The statement is always stored in its normalized form.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StatementEntry {
    pub statement: String,
    pub opinion: Opinion,
}

// ******** Matching output *********

/// The outcome of looking up a rendered question in a catalog.
#[derive(PartialEq, Debug, Clone)]
pub enum MatchResult<'a> {
    /// An entry was found. The score is 1.0 for exact matches.
    Found {
        entry: &'a StatementEntry,
        score: f64,
    },
    /// Nothing reached the threshold. The closest entry, if any, is kept for diagnostics.
    NoMatch {
        best_score: f64,
        closest: Option<&'a StatementEntry>,
    },
}

impl<'a> MatchResult<'a> {
    pub fn entry(&self) -> Option<&'a StatementEntry> {
        match self {
            MatchResult::Found { entry, .. } => Some(entry),
            MatchResult::NoMatch { .. } => None,
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            MatchResult::Found { score, .. } => *score,
            MatchResult::NoMatch { best_score, .. } => *best_score,
        }
    }
}

// ********* Configuration **********

pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Controls how a questionnaire gets filled.
#[derive(PartialEq, Debug, Clone)]
pub struct FillRules {
    /// Minimum similarity for a fuzzy match to be accepted (inclusive).
    pub threshold: f64,
    /// Number of pages in the questionnaire. The last one finalizes instead of advancing.
    pub total_pages: u32,
    /// How many times an interaction is attempted before giving up on it.
    pub max_attempts: u32,
    /// Pause between two attempts.
    pub retry_delay: Duration,
}

impl FillRules {
    pub const DEFAULT_RULES: FillRules = FillRules {
        threshold: DEFAULT_THRESHOLD,
        total_pages: 6,
        max_attempts: 3,
        retry_delay: Duration::from_secs(1),
    };
}

// ********* Errors **********

/// A failure reported by the page-interaction layer.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum InteractionError {
    /// The element could not be located on the current page.
    ElementNotFound(String),
    /// The page did not reach the expected state in time.
    Timeout(String),
    /// The automation backend could not be reached.
    Transport(String),
    /// The automation backend answered something unexpected.
    Protocol(String),
}

impl Error for InteractionError {}

impl Display for InteractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionError::ElementNotFound(s) => write!(f, "element not found: {}", s),
            InteractionError::Timeout(s) => write!(f, "timed out waiting for {}", s),
            InteractionError::Transport(s) => write!(f, "transport error: {}", s),
            InteractionError::Protocol(s) => write!(f, "unexpected response: {}", s),
        }
    }
}
