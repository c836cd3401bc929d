use std::path::{Path, PathBuf};

use crate::compass::*;

/// The last component of a path, or the whole path when it has none (such as `..`).
pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// The name of the document exported for an input file: `model.csv` gives `model_results.pdf`.
pub fn result_document_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());
    format!("{}_results.pdf", stem)
}

/// The CSV files directly inside a directory, sorted by name.
pub fn list_csv_files(dir: &Path) -> CompassResult<Vec<PathBuf>> {
    let path = dir.display().to_string();
    let mut res: Vec<PathBuf> = Vec::new();
    for entry_r in fs::read_dir(dir).context(ListingDirSnafu { path: path.clone() })? {
        let entry = entry_r.context(ListingDirSnafu { path: path.clone() })?;
        let p = entry.path();
        let is_csv = p
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase().ends_with(".csv"))
            .unwrap_or(false);
        if is_csv && p.is_file() {
            res.push(p);
        } else {
            debug!("list_csv_files: skipping {:?}", p);
        }
    }
    res.sort();
    Ok(res)
}
