use clap::Parser;

/// Answers the political compass questionnaire once per answer file, and collects the scores.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (directory) The directory containing the CSV answer files. Each file must have a
    /// 'statement' and an 'opinion' column.
    #[clap(short, long, value_parser)]
    pub input_dir: String,

    /// (directory) Where the results table and the result documents are written. It is
    /// created if needed.
    #[clap(short, long, value_parser)]
    pub output_dir: String,

    /// (directory) Where the list of the files that could not be scored is written, along
    /// with a copy of these files.
    #[clap(short, long, value_parser)]
    pub broken_dir: String,

    /// (file path, optional) A JSON file with the settings of the run (browser, timeouts,
    /// matching threshold, encodings). All the settings have defaults.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
