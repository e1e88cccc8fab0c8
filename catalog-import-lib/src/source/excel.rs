use calamine::{open_workbook, Reader, Xlsx};
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

use crate::error::ImportError;
use crate::types::Row;

/// Rows of one worksheet; the first worksheet row holds the column names.
pub struct ExcelRowSource {
    headers: Arc<[String]>,
    rows: std::vec::IntoIter<Row>,
}

impl ExcelRowSource {
    pub fn from_path<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<Self, ImportError> {
        let path = path.as_ref();
        tracing::info!("Reading worksheet rows from {}", path.display());
        let workbook: Xlsx<_> = open_workbook(path).map_err(|e| {
            ImportError::Spreadsheet(format!(
                "Failed to open Excel workbook {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_workbook(workbook, sheet)
    }

    pub fn from_reader<R: Read + Seek>(reader: R, sheet: Option<&str>) -> Result<Self, ImportError> {
        let workbook = Xlsx::new(reader).map_err(|e| {
            ImportError::Spreadsheet(format!("Failed to open Excel workbook: {}", e))
        })?;
        Self::from_workbook(workbook, sheet)
    }

    fn from_workbook<R: Read + Seek>(
        mut workbook: Xlsx<R>,
        sheet: Option<&str>,
    ) -> Result<Self, ImportError> {
        let sheet_name = match sheet {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .into_iter()
                .next()
                .ok_or_else(|| ImportError::Spreadsheet("Workbook has no sheets".into()))?,
        };

        let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
            ImportError::Spreadsheet(format!("Sheet '{sheet_name}' not found in workbook: {e}"))
        })?;

        let mut cells = range.rows();
        let headers: Arc<[String]> = match cells.next() {
            Some(header) => header
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect::<Vec<_>>()
                .into(),
            None => Arc::from(Vec::new()),
        };

        // worksheet rows are 1-based and the header takes the first one
        let first_line = range.start().map(|(row, _)| row as usize).unwrap_or(0) + 2;
        let rows: Vec<Row> = cells
            .enumerate()
            .map(|(index, row)| {
                let values = row.iter().map(|cell| cell.to_string()).collect();
                Row::new(first_line + index, Arc::clone(&headers), values)
            })
            .collect();

        tracing::debug!(
            "Read {} rows with {} columns from sheet '{}'",
            rows.len(),
            headers.len(),
            sheet_name
        );

        Ok(Self {
            headers,
            rows: rows.into_iter(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl Iterator for ExcelRowSource {
    type Item = Result<Row, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(Ok)
    }
}
