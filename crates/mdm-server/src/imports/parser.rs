//! Upload parsing
//!
//! Turns an uploaded file into an ordered list of [`RawRow`]s. Row position in
//! the returned vector is the row's `original_index`.
//!
//! Supported formats:
//! - CSV with a header row (fields trimmed, blank and whitespace-only lines
//!   skipped, short rows leave the missing columns absent). A line of empty
//!   fields such as `,,` is still a row and keeps its position.
//! - JSON: a top-level array of objects
//! - JSON Lines: one object per non-blank line
//!
//! Any error here is fatal for the whole upload.

use mdm_common::types::RawRow;
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;

use super::error::ParseError;

const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    #[default]
    Csv,
    Json,
    JsonLines,
}

impl FileFormat {
    /// Explicit format wins, then the file extension, then CSV
    pub fn detect(explicit: Option<&str>, file_name: Option<&str>) -> Result<Self, ParseError> {
        if let Some(format) = explicit.map(str::trim).filter(|f| !f.is_empty()) {
            return format.parse();
        }

        let extension = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        Ok(match extension.as_deref() {
            Some("json") => FileFormat::Json,
            Some("jsonl") | Some("ndjson") => FileFormat::JsonLines,
            _ => FileFormat::Csv,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
            FileFormat::JsonLines => "jsonl",
        }
    }
}

impl FromStr for FileFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            "jsonl" | "ndjson" | "json-lines" => Ok(FileFormat::JsonLines),
            other => Err(ParseError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A received upload, ready for the executor
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub format: FileFormat,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(format: FileFormat, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: None,
            format,
            bytes: bytes.into(),
        }
    }

    pub fn csv(text: &str) -> Self {
        Self::new(FileFormat::Csv, text.as_bytes())
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

pub fn parse_rows(format: FileFormat, bytes: &[u8]) -> Result<Vec<RawRow>, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::Encoding(e.valid_up_to()))?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    match format {
        FileFormat::Csv => parse_csv(text),
        FileFormat::Json => parse_json(text),
        FileFormat::JsonLines => parse_json_lines(text),
    }
}

fn parse_csv(text: &str) -> Result<Vec<RawRow>, ParseError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(String::is_empty) {
        return Err(ParseError::MissingHeader);
    }

    let mut seen = HashSet::new();
    for header in headers.iter().filter(|h| !h.is_empty()) {
        if !seen.insert(header.as_str()) {
            return Err(ParseError::DuplicateHeader(header.clone()));
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        // Whitespace-only line: the reader hands it back as one empty field
        if record.len() == 1 && record.iter().all(str::is_empty) {
            continue;
        }

        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), Value::String(value.to_string())))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

fn parse_json(text: &str) -> Result<Vec<RawRow>, ParseError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<Value> = serde_json::from_str(text)?;
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            Value::Object(row) => Ok(row),
            _ => Err(ParseError::NotAnObject(i)),
        })
        .collect()
}

fn parse_json_lines(text: &str) -> Result<Vec<RawRow>, ParseError> {
    let mut rows = Vec::new();
    for (i, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        match serde_json::from_str::<Value>(line)? {
            Value::Object(row) => rows.push(row),
            _ => return Err(ParseError::NotAnObject(i)),
        }
    }
    Ok(rows)
}
