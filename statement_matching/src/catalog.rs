//! Loading of the statement catalogs.
//!
//! A catalog is a delimited text file with a header row that contains at least the
//! `statement` and `opinion` columns. The files come from various tools, so the text
//! encoding is guessed from a list of candidates.

use std::error::Error;
use std::fmt::Display;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::{debug, info, warn};

use crate::config::StatementEntry;
use crate::normalize_text;
use crate::opinion::extract_opinion;

pub const STATEMENT_COLUMN: &str = "statement";
pub const OPINION_COLUMN: &str = "opinion";

// Code points that windows-1252 leaves undefined.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// The text encodings that can be tried when decoding a catalog.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TextEncoding {
    Utf8,
    Windows1252,
    Latin1,
}

impl TextEncoding {
    pub const DEFAULT_ORDER: [TextEncoding; 3] = [
        TextEncoding::Utf8,
        TextEncoding::Windows1252,
        TextEncoding::Latin1,
    ];

    pub fn from_name(name: &str) -> Option<TextEncoding> {
        match name.to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Some(TextEncoding::Utf8),
            "windows-1252" | "cp1252" => Some(TextEncoding::Windows1252),
            "latin1" | "latin-1" | "iso-8859-1" => Some(TextEncoding::Latin1),
            _ => None,
        }
    }

    /// Decodes the whole buffer, or nothing at all if some bytes are invalid.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => encoding_rs::UTF_8
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|s| s.into_owned()),
            TextEncoding::Windows1252 => {
                if bytes.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
                    return None;
                }
                encoding_rs::WINDOWS_1252
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .map(|s| s.into_owned())
            }
            // Every byte maps to the code point of the same value.
            TextEncoding::Latin1 => Some(bytes.iter().map(|b| *b as char).collect()),
        }
    }
}

impl Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Latin1 => "latin1",
        };
        write!(f, "{}", name)
    }
}

/// Reasons for which a catalog could not be read at all.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum CatalogLoadError {
    NotFound(String),
    Unreadable { path: String, message: String },
    /// None of the candidate encodings could decode the file.
    Undecodable(String),
}

impl Error for CatalogLoadError {}

impl Display for CatalogLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogLoadError::NotFound(p) => write!(f, "catalog file not found: {}", p),
            CatalogLoadError::Unreadable { path, message } => {
                write!(f, "cannot read catalog file {}: {}", path, message)
            }
            CatalogLoadError::Undecodable(p) => {
                write!(f, "failed to decode {} with the available encodings", p)
            }
        }
    }
}

/// An ordered list of statements with their opinions.
///
/// The entries keep the order of the rows in the source. Duplicated statements are kept:
/// the lookups return the first one.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct StatementCatalog {
    entries: Vec<StatementEntry>,
}

impl StatementCatalog {
    pub fn new(entries: Vec<StatementEntry>) -> StatementCatalog {
        StatementCatalog { entries }
    }

    pub fn entries(&self) -> &[StatementEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a catalog from decoded text.
    ///
    /// Rows without a statement or an opinion, and rows where no opinion can be found in the
    /// opinion text, are skipped.
    pub fn from_csv_text(text: &str) -> StatementCatalog {
        let cleaned: String = text
            .strip_prefix('\u{feff}')
            .unwrap_or(text)
            .chars()
            .filter(|c| *c != '\0')
            .collect();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(cleaned.as_bytes());

        let (statement_idx, opinion_idx) = match rdr.headers() {
            Ok(header) => {
                debug!("from_csv_text: header: {:?}", header);
                (
                    header.iter().position(|h| h == STATEMENT_COLUMN),
                    header.iter().position(|h| h == OPINION_COLUMN),
                )
            }
            Err(e) => {
                warn!("from_csv_text: could not read the header: {}", e);
                return StatementCatalog::default();
            }
        };
        if statement_idx.is_none() || opinion_idx.is_none() {
            warn!(
                "from_csv_text: the header does not contain both '{}' and '{}' columns",
                STATEMENT_COLUMN, OPINION_COLUMN
            );
        }

        let mut entries: Vec<StatementEntry> = Vec::new();
        for (idx, record_r) in rdr.records().enumerate() {
            // The header is on the first line.
            let lineno = idx + 2;
            let record = match record_r {
                Ok(r) => r,
                Err(e) => {
                    warn!("Skipping unreadable row {}: {}", lineno, e);
                    continue;
                }
            };
            let statement = statement_idx.and_then(|i| record.get(i));
            let opinion_text = opinion_idx.and_then(|i| record.get(i));
            match (statement, opinion_text) {
                (Some(statement), Some(opinion_text)) => {
                    match extract_opinion(&normalize_text(opinion_text)) {
                        Some(opinion) => entries.push(StatementEntry {
                            statement: normalize_text(statement),
                            opinion,
                        }),
                        None => {
                            warn!("Could not extract opinion from: {}", opinion_text);
                        }
                    }
                }
                _ => {
                    warn!("Missing required fields in row {}: {:?}", lineno, record);
                }
            }
        }
        StatementCatalog { entries }
    }
}

/// Decodes a buffer with the first encoding that accepts it entirely.
pub fn decode_source(bytes: &[u8], encodings: &[TextEncoding]) -> Option<(String, TextEncoding)> {
    for enc in encodings.iter() {
        match enc.decode(bytes) {
            Some(text) => return Some((text, *enc)),
            None => {
                warn!("Encoding error with {}. Trying next encoding...", enc);
            }
        }
    }
    None
}

/// Reads a catalog file, trying the encodings in order.
pub fn load_catalog(
    path: &Path,
    encodings: &[TextEncoding],
) -> Result<StatementCatalog, CatalogLoadError> {
    let path_s = path.display().to_string();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CatalogLoadError::NotFound(path_s.clone()),
        _ => CatalogLoadError::Unreadable {
            path: path_s.clone(),
            message: e.to_string(),
        },
    })?;
    let (text, encoding) =
        decode_source(&bytes, encodings).ok_or(CatalogLoadError::Undecodable(path_s.clone()))?;
    let catalog = StatementCatalog::from_csv_text(&text);
    info!("Successfully read CSV file {} using {} encoding.", path_s, encoding);
    info!("Loaded {} valid questions and answers.", catalog.len());
    Ok(catalog)
}
