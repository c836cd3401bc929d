mod args;
mod compass;

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use log::{error, info, LevelFilter};

use crate::compass::config_reader::{read_config, RunConfig};
use crate::compass::{run_batch, BatchPaths, CompassResult};

fn run(args: &args::Args) -> CompassResult<()> {
    let config = match &args.config {
        Some(path) => read_config(path)?,
        None => RunConfig::default(),
    };
    info!("config: {:?}", config);

    let paths = BatchPaths {
        input_dir: PathBuf::from(&args.input_dir),
        output_dir: PathBuf::from(&args.output_dir),
        broken_dir: PathBuf::from(&args.broken_dir),
    };
    let results = run_batch(&paths, &config)?;
    info!(
        "Processed {} files, {} broken",
        results.outcomes().len(),
        results.broken_files().len()
    );
    Ok(())
}

fn main() {
    let args = args::Args::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let start = Instant::now();
    info!("Script started");
    let res = run(&args);
    info!("Script ended, total execution time: {:.2?}", start.elapsed());

    if let Err(e) = res {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
