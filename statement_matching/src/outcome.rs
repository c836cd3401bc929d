//! Per-file results of a batch.

use std::fmt::Display;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::session::CompassScores;

static ECONOMIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Economic Left/Right:\s*([-\d.]+)").unwrap());
static SOCIAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Social Libertarian/Authoritarian:\s*([-\d.]+)").unwrap());

/// The value recorded for one axis.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum AxisValue {
    Score(f64),
    /// The questionnaire could not be completed or read.
    Error,
    /// No answers were available for this file.
    NoData,
}

impl AxisValue {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, AxisValue::Error | AxisValue::NoData)
    }
}

impl Display for AxisValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisValue::Score(x) => write!(f, "{:.2}", x),
            AxisValue::Error => write!(f, "Error"),
            AxisValue::NoData => write!(f, "No data"),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct FileOutcome {
    pub file_name: String,
    pub economic: AxisValue,
    pub social: AxisValue,
}

impl FileOutcome {
    pub fn no_data(file_name: &str) -> FileOutcome {
        FileOutcome {
            file_name: file_name.to_string(),
            economic: AxisValue::NoData,
            social: AxisValue::NoData,
        }
    }

    pub fn error(file_name: &str) -> FileOutcome {
        FileOutcome {
            file_name: file_name.to_string(),
            economic: AxisValue::Error,
            social: AxisValue::Error,
        }
    }

    /// An axis that could not be read is recorded as an error.
    pub fn from_scores(file_name: &str, scores: &CompassScores) -> FileOutcome {
        FileOutcome {
            file_name: file_name.to_string(),
            economic: scores.economic.map(AxisValue::Score).unwrap_or(AxisValue::Error),
            social: scores.social.map(AxisValue::Score).unwrap_or(AxisValue::Error),
        }
    }

    pub fn is_broken(&self) -> bool {
        self.economic.is_sentinel() || self.social.is_sentinel()
    }
}

/// Reads the two axis values out of the text of the results heading.
pub fn parse_compass_scores(text: &str) -> CompassScores {
    let read = |re: &Regex| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    };
    let scores = CompassScores {
        economic: read(&ECONOMIC_RE),
        social: read(&SOCIAL_RE),
    };
    debug!("parse_compass_scores: {:?} -> {:?}", text, scores);
    scores
}

/// The outcomes of all the files of a batch, in the order they were processed.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ResultsTable {
    outcomes: Vec<FileOutcome>,
}

impl ResultsTable {
    pub const HEADER: [&'static str; 3] = [
        "File Name",
        "Economic Left/Right",
        "Social Libertarian/Authoritarian",
    ];

    pub fn new() -> ResultsTable {
        ResultsTable::default()
    }

    /// Records the outcome of a file. A file recorded twice keeps its first position
    /// and its latest outcome.
    pub fn record(&mut self, outcome: FileOutcome) {
        if let Some(existing) = self
            .outcomes
            .iter_mut()
            .find(|o| o.file_name == outcome.file_name)
        {
            warn!("Replacing the outcome recorded for {}", outcome.file_name);
            *existing = outcome;
        } else {
            self.outcomes.push(outcome);
        }
    }

    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    /// The rows of the report, with the values as displayed.
    pub fn rows(&self) -> Vec<[String; 3]> {
        self.outcomes
            .iter()
            .map(|o| {
                [
                    o.file_name.clone(),
                    o.economic.to_string(),
                    o.social.to_string(),
                ]
            })
            .collect()
    }

    pub fn broken_files(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.is_broken())
            .map(|o| o.file_name.clone())
            .collect()
    }
}
