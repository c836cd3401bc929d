// Writers for the reports of a batch.

use std::io::Write;

use statement_matching::outcome::ResultsTable;

use crate::compass::*;

pub fn write_results(results: &ResultsTable, path: &Path) -> CompassResult<()> {
    let path_s = path.display().to_string();
    let mut wtr = csv::Writer::from_path(path).context(CsvWriteSnafu {
        path: path_s.clone(),
    })?;
    wtr.write_record(ResultsTable::HEADER)
        .context(CsvWriteSnafu {
            path: path_s.clone(),
        })?;
    for row in results.rows() {
        debug!("write_results: {:?}", row);
        wtr.write_record(&row).context(CsvWriteSnafu {
            path: path_s.clone(),
        })?;
    }
    wtr.flush().context(WritingFileSnafu { path: path_s })?;
    Ok(())
}

/// One file name per line.
pub fn write_broken_list(broken: &[String], path: &Path) -> CompassResult<()> {
    let path_s = path.display().to_string();
    let mut f = fs::File::create(path).context(WritingFileSnafu {
        path: path_s.clone(),
    })?;
    for fname in broken.iter() {
        writeln!(f, "{}", fname).context(WritingFileSnafu {
            path: path_s.clone(),
        })?;
    }
    Ok(())
}
