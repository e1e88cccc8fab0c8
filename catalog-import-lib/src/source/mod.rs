//! Row sources feeding the import.

mod excel;

pub use excel::ExcelRowSource;

use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::error::ImportError;
use crate::types::Row;

/// Boxed, forward-only iterator over the rows of one input
pub type RowIter = Box<dyn Iterator<Item = Result<Row, ImportError>> + Send>;

/// Lazy CSV reader; the first record holds the column names.
pub struct CsvRowSource<R: Read> {
    records: StringRecordsIntoIter<R>,
    headers: Arc<[String]>,
}

impl CsvRowSource<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ImportError> {
        let path = path.as_ref();
        tracing::info!("Reading CSV rows from {}", path.display());
        let file = File::open(path).map_err(|e| {
            ImportError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open {}: {}", path.display(), e),
            ))
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read> CsvRowSource<R> {
    pub fn from_reader(reader: R) -> Result<Self, ImportError> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        tracing::debug!("CSV headers: {:?}", headers);

        Ok(Self {
            records: reader.into_records(),
            headers: headers.into(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl<R: Read> Iterator for CsvRowSource<R> {
    type Item = Result<Row, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        let line = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or_default();
        let values = record.iter().map(String::from).collect();
        Some(Ok(Row::new(line, Arc::clone(&self.headers), values)))
    }
}

/// Open a row source for `path`, chosen by file extension
pub fn open_rows<P: AsRef<Path>>(path: P) -> Result<RowIter, ImportError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => Ok(Box::new(ExcelRowSource::from_path(path, None)?)),
        _ => Ok(Box::new(CsvRowSource::from_path(path)?)),
    }
}

/// Split a multi-valued cell, honouring CSV quoting:
/// `"Default Category/Sale, Outlet",Default Category/Men` yields two values.
pub fn explode(value: &str, delimiter: char) -> Result<Vec<String>, ImportError> {
    if !delimiter.is_ascii() {
        return Err(ImportError::InvalidConfig(format!(
            "Delimiter {:?} is not an ASCII character",
            delimiter
        )));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(value.as_bytes());

    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(String::from).collect()),
        None => Ok(Vec::new()),
    }
}
