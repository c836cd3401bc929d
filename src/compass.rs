use log::{debug, error, info, warn};

use snafu::{prelude::*, Snafu};
use statement_matching::catalog::{load_catalog, TextEncoding};
use statement_matching::outcome::{FileOutcome, ResultsTable};
use statement_matching::questionnaire::fill_questionnaire;
use statement_matching::session::QuestionnaireSession;
use statement_matching::{FillRules, StatementCatalog};

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod webdriver;

use crate::compass::config_reader::RunConfig;
use crate::compass::io_common::{list_csv_files, result_document_name, simplify_file_name};
use crate::compass::webdriver::{ChromeDriverProcess, WebDriverSession};

#[derive(Debug, Snafu)]
pub enum CompassError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the configuration in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Unknown text encoding: {name}"))]
    UnknownEncoding { name: String },
    #[snafu(display("Invalid input directory path: {path}"))]
    InvalidInputDir { path: String },
    #[snafu(display("Error listing directory {path}"))]
    ListingDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("No CSV files found in {path}"))]
    NoCsvFiles { path: String },
    #[snafu(display("Error creating directory {path}"))]
    CreatingDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing results to {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not start chromedriver from {path}"))]
    SpawningDriver {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("chromedriver did not become ready at {url}"))]
    DriverNotReady { url: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CompassResult<T> = Result<T, CompassError>;

/// The directories of a batch.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BatchPaths {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub broken_dir: PathBuf,
}

/// Reads the catalog of a file. `None` means that there is nothing to answer with.
fn read_catalog(csv_path: &Path, encodings: &[TextEncoding]) -> Option<StatementCatalog> {
    match load_catalog(csv_path, encodings) {
        Ok(c) if !c.is_empty() => Some(c),
        Ok(_) => {
            error!(
                "No questions and answers loaded from CSV file: {}",
                csv_path.display()
            );
            None
        }
        Err(e) => {
            error!("{}", e);
            None
        }
    }
}

/// Answers the questionnaire with a catalog, in a session that is already open.
///
/// Failures are recorded as errors. The document export only gets logged when it fails:
/// the scores are already known at that point.
pub fn answer_catalog<S: QuestionnaireSession>(
    session: &mut S,
    file_name: &str,
    catalog: &StatementCatalog,
    output_dir: &Path,
    test_url: &str,
    rules: &FillRules,
) -> FileOutcome {
    if let Err(e) = session.load_page(test_url) {
        error!("Error processing file {}: {}", file_name, e);
        return FileOutcome::error(file_name);
    }

    let report = fill_questionnaire(session, catalog, rules);
    debug!("answer_catalog: {}: {:?}", file_name, report);

    let outcome = match session.finalize_and_extract_scores() {
        Ok(scores) => FileOutcome::from_scores(file_name, &scores),
        Err(e) => {
            error!("Error extracting compass values: {}", e);
            return FileOutcome::error(file_name);
        }
    };
    info!(
        "Added results for {}: Economic={}, Social={}",
        file_name, outcome.economic, outcome.social
    );

    let document_path = output_dir.join(result_document_name(file_name));
    match session.export_current_view_as_document(&document_path) {
        Ok(()) => info!("Page successfully saved as {}", document_path.display()),
        Err(e) => error!("Failed to save PDF for {}: {}", file_name, e),
    }
    outcome
}

fn process_csv_file(
    csv_path: &Path,
    output_dir: &Path,
    config: &RunConfig,
    rules: &FillRules,
    encodings: &[TextEncoding],
) -> FileOutcome {
    let file_name = simplify_file_name(csv_path);
    info!("Processing file: {}", file_name);

    // No browser is needed when there is nothing to answer.
    let catalog = match read_catalog(csv_path, encodings) {
        Some(c) => c,
        None => return FileOutcome::no_data(&file_name),
    };

    let mut session = match WebDriverSession::start(config) {
        Ok(s) => s,
        Err(e) => {
            error!("Error processing file {}: {}", file_name, e);
            return FileOutcome::error(&file_name);
        }
    };
    let outcome = answer_catalog(
        &mut session,
        &file_name,
        &catalog,
        output_dir,
        &config.test_url(),
        rules,
    );
    session.close();
    info!("All questions answered for file {}.", file_name);
    outcome
}

fn prepare_output_dir(output_dir: &Path) -> PathBuf {
    match fs::create_dir_all(output_dir) {
        Ok(()) => {
            info!("Output directory set to: {}", output_dir.display());
            output_dir.to_path_buf()
        }
        Err(e) => {
            error!("Error creating output directory: {}", e);
            let fallback = std::env::temp_dir().join(format!("compassfill-{}", std::process::id()));
            if let Err(e2) = fs::create_dir_all(&fallback) {
                warn!("Could not create {}: {}", fallback.display(), e2);
            }
            info!("Using temporary directory instead: {}", fallback.display());
            fallback
        }
    }
}

/// Copies the broken input files next to the list of their names.
fn collect_broken_files(
    broken: &[String],
    input_dir: &Path,
    broken_dir: &Path,
) -> CompassResult<()> {
    println!("\n=== BROKEN FILES ===");
    for fname in broken.iter() {
        println!("{}", fname);
    }
    println!("\nTotal broken files: {}", broken.len());

    let list_path = broken_dir.join(format!("{}.txt", simplify_file_name(input_dir)));
    io_csv::write_broken_list(broken, &list_path)?;
    println!("Broken file list saved to: {}", list_path.display());

    for fname in broken.iter() {
        let src = input_dir.join(fname);
        if let Err(e) = fs::copy(&src, broken_dir.join(fname)) {
            error!("Failed to copy broken file {}: {}", fname, e);
        }
    }
    println!("Broken files copied to: {}", broken_dir.display());
    Ok(())
}

/// Processes all the CSV files of the input directory, one after the other.
pub fn run_batch(paths: &BatchPaths, config: &RunConfig) -> CompassResult<ResultsTable> {
    let rules = config.fill_rules()?;
    let encodings = config.encodings()?;
    debug!("run_batch: rules: {:?} encodings: {:?}", rules, encodings);

    let output_dir = prepare_output_dir(&paths.output_dir);

    let input_s = paths.input_dir.display().to_string();
    ensure!(
        paths.input_dir.is_dir(),
        InvalidInputDirSnafu { path: input_s.clone() }
    );
    fs::create_dir_all(&paths.broken_dir).context(CreatingDirSnafu {
        path: paths.broken_dir.display().to_string(),
    })?;

    let csv_files = list_csv_files(&paths.input_dir)?;
    ensure!(!csv_files.is_empty(), NoCsvFilesSnafu { path: input_s });
    info!("Found {} CSV files to process", csv_files.len());

    // Dropping the process handle stops chromedriver.
    let _driver: Option<ChromeDriverProcess> = match &config.chromedriver_path {
        Some(p) => Some(ChromeDriverProcess::spawn(p, config)?),
        None => None,
    };

    let mut results = ResultsTable::new();
    for (idx, csv_file) in csv_files.iter().enumerate() {
        if idx > 0 {
            thread::sleep(config.pause_between_files());
        }
        let outcome = process_csv_file(csv_file, &output_dir, config, &rules, &encodings);
        results.record(outcome);
    }

    let results_path = output_dir.join(format!("{}_results.csv", simplify_file_name(&output_dir)));
    match io_csv::write_results(&results, &results_path) {
        Ok(()) => info!("All results saved to {}", results_path.display()),
        Err(e) => error!("Error saving results to CSV: {}", e),
    }

    let broken = results.broken_files();
    if broken.is_empty() {
        println!("\nAll files processed successfully without errors.");
    } else {
        collect_broken_files(&broken, &paths.input_dir, &paths.broken_dir)?;
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statement_matching::outcome::AxisValue;
    use statement_matching::session::{CompassScores, InteractionResult, QuestionBlock};
    use statement_matching::{ActionCode, InteractionError};
    use std::time::Duration;

    struct OnePageSession {
        questions: Vec<String>,
        selected: Vec<String>,
        loaded: Option<String>,
        scores: InteractionResult<CompassScores>,
        exported: Option<PathBuf>,
    }

    impl OnePageSession {
        fn new(questions: &[&str], scores: InteractionResult<CompassScores>) -> OnePageSession {
            OnePageSession {
                questions: questions.iter().map(|s| s.to_string()).collect(),
                selected: vec![],
                loaded: None,
                scores,
                exported: None,
            }
        }
    }

    impl QuestionnaireSession for OnePageSession {
        fn load_page(&mut self, url: &str) -> InteractionResult<()> {
            self.loaded = Some(url.to_string());
            Ok(())
        }

        fn question_blocks(&mut self) -> InteractionResult<Vec<QuestionBlock>> {
            Ok(self
                .questions
                .iter()
                .map(|q| QuestionBlock {
                    handle: q.clone(),
                    text: q.clone(),
                })
                .collect())
        }

        fn select_option(
            &mut self,
            block: &QuestionBlock,
            action: ActionCode,
        ) -> InteractionResult<()> {
            self.selected.push(format!("{}={}", block.text, action));
            Ok(())
        }

        fn advance_page(&mut self) -> InteractionResult<()> {
            Ok(())
        }

        fn finalize_and_extract_scores(&mut self) -> InteractionResult<CompassScores> {
            self.scores.clone()
        }

        fn export_current_view_as_document(&mut self, path: &Path) -> InteractionResult<()> {
            self.exported = Some(path.to_path_buf());
            Err(InteractionError::Timeout("chart link".to_string()))
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("compassfill_{}_{}", name, std::process::id()));
        fs::create_dir_all(&p).unwrap();
        p
    }

    fn rules() -> FillRules {
        FillRules {
            total_pages: 1,
            retry_delay: Duration::from_millis(0),
            ..FillRules::DEFAULT_RULES
        }
    }

    fn catalog(text: &str) -> StatementCatalog {
        StatementCatalog::from_csv_text(text)
    }

    #[test]
    fn answers_and_records_scores() {
        let mut session = OnePageSession::new(
            &["The rich should pay more tax."],
            Ok(CompassScores {
                economic: Some(-3.5),
                social: Some(1.25),
            }),
        );
        let outcome = answer_catalog(
            &mut session,
            "model_a.csv",
            &catalog("statement,opinion\n\"The rich should pay more tax\",\"I strongly agree.\"\n"),
            Path::new("/reports"),
            "http://test",
            &rules(),
        );

        assert_eq!(session.loaded, Some("http://test".to_string()));
        assert_eq!(session.selected, vec!["The rich should pay more tax.=3"]);
        // The export failure does not change the outcome.
        assert_eq!(
            session.exported,
            Some(PathBuf::from("/reports/model_a_results.pdf"))
        );
        assert_eq!(outcome.file_name, "model_a.csv");
        assert_eq!(outcome.economic, AxisValue::Score(-3.5));
        assert_eq!(outcome.social, AxisValue::Score(1.25));
        assert!(!outcome.is_broken());
    }

    #[test]
    fn missing_scores_are_errors() {
        let mut session = OnePageSession::new(&["A"], Err(InteractionError::Timeout("h2".into())));
        let outcome = answer_catalog(
            &mut session,
            "m.csv",
            &catalog("statement,opinion\nA,agree\n"),
            Path::new("/reports"),
            "http://test",
            &rules(),
        );
        assert_eq!(outcome, FileOutcome::error("m.csv"));
        assert_eq!(session.selected, vec!["A=2"]);
        assert_eq!(session.exported, None);
    }

    #[test]
    fn unusable_catalogs() {
        let dir = temp_dir("unusable_catalogs");
        let csv = dir.join("empty.csv");
        fs::write(&csv, "statement,opinion\nA,no idea\n").unwrap();
        let empty = read_catalog(&csv, &TextEncoding::DEFAULT_ORDER);
        let missing = read_catalog(&dir.join("missing.csv"), &TextEncoding::DEFAULT_ORDER);
        fs::remove_dir_all(&dir).unwrap();
        assert_eq!(empty, None);
        assert_eq!(missing, None);
    }

    #[test]
    fn batch_with_only_unusable_files() {
        let root = temp_dir("batch_with_only_unusable_files");
        let input = root.join("run1");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("b.csv"), "statement,opinion\nA,unsure\n").unwrap();
        fs::write(input.join("a.CSV"), "question,answer\nA,agree\n").unwrap();
        fs::write(input.join("notes.txt"), "ignored").unwrap();
        let paths = BatchPaths {
            input_dir: input.clone(),
            output_dir: root.join("out"),
            broken_dir: root.join("broken"),
        };
        let config = RunConfig {
            pause_between_files_ms: Some(0),
            ..RunConfig::default()
        };
        let results = run_batch(&paths, &config).unwrap();

        assert_eq!(results.broken_files(), vec!["a.CSV", "b.csv"]);
        let report = fs::read_to_string(root.join("out").join("out_results.csv")).unwrap();
        let broken_list = fs::read_to_string(root.join("broken").join("run1.txt")).unwrap();
        let copied = root.join("broken").join("b.csv").exists();
        fs::remove_dir_all(&root).unwrap();

        assert_eq!(
            report,
            "File Name,Economic Left/Right,Social Libertarian/Authoritarian\n\
             a.CSV,No data,No data\n\
             b.csv,No data,No data\n"
        );
        assert_eq!(broken_list, "a.CSV\nb.csv\n");
        assert!(copied);
    }

    #[test]
    fn batch_requires_input_files() {
        let root = temp_dir("batch_requires_input_files");
        let paths = BatchPaths {
            input_dir: root.join("missing"),
            output_dir: root.join("out"),
            broken_dir: root.join("broken"),
        };
        let res = run_batch(&paths, &RunConfig::default());
        assert!(matches!(res, Err(CompassError::InvalidInputDir { .. })));

        fs::create_dir_all(root.join("empty")).unwrap();
        let paths = BatchPaths {
            input_dir: root.join("empty"),
            ..paths
        };
        let res = run_batch(&paths, &RunConfig::default());
        fs::remove_dir_all(&root).unwrap();
        assert!(matches!(res, Err(CompassError::NoCsvFiles { .. })));
    }
}
