//! Minimal CSV table for uploads, outputs, and the dataset file.
//!
//! Columns are addressed by header name. Short rows are padded with empty
//! cells, and every column the caller did not ask about is carried through
//! untouched so a classified upload round-trips with its extra columns.

use std::path::Path;

use logtriage_types::{LabeledExample, LogRecord, Result, TriageError};

pub const SOURCE: &str = "source";
pub const LOG_MESSAGE: &str = "log_message";
pub const TARGET_LABEL: &str = "target_label";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Parse CSV bytes. The first record is the header row.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| TriageError::validation(format!("unreadable CSV header: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record
                .map_err(|e| TriageError::validation(format!("unreadable CSV row {}: {e}", idx + 1)))?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len().max(row.len()), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Read and parse a CSV file.
    pub fn read_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Build a table in the canonical dataset layout.
    pub fn from_examples(examples: &[LabeledExample]) -> Self {
        Self {
            headers: vec![SOURCE.into(), LOG_MESSAGE.into(), TARGET_LABEL.into()],
            rows: examples
                .iter()
                .map(|e| vec![e.source.clone(), e.message.clone(), e.label.clone()])
                .collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Indices of `names`, or a `Validation` error listing every missing one.
    pub fn require(&self, names: &[&str]) -> Result<Vec<usize>> {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column(name) {
                Some(idx) => found.push(idx),
                None => missing.push(*name),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(TriageError::validation(format!(
                "CSV must contain column(s): {}",
                missing.join(", ")
            )))
        }
    }

    fn cell(&self, row: usize, col: usize) -> &str {
        self.rows[row].get(col).map(String::as_str).unwrap_or("")
    }

    /// Rows as records to classify. Requires `source` and `log_message`.
    pub fn log_records(&self) -> Result<Vec<LogRecord>> {
        let cols = self.require(&[SOURCE, LOG_MESSAGE])?;
        Ok((0..self.rows.len())
            .map(|r| LogRecord::new(self.cell(r, cols[0]), self.cell(r, cols[1])))
            .collect())
    }

    /// Rows as uncleaned training examples. Requires all three dataset
    /// columns; extra columns are ignored.
    pub fn labeled_examples(&self) -> Result<Vec<LabeledExample>> {
        let cols = self.require(&[SOURCE, LOG_MESSAGE, TARGET_LABEL])?;
        Ok((0..self.rows.len())
            .map(|r| {
                LabeledExample::new(
                    self.cell(r, cols[0]),
                    self.cell(r, cols[1]),
                    self.cell(r, cols[2]),
                )
            })
            .collect())
    }

    /// Copy of the table with `target_label` set per row, appending the
    /// column if absent and overwriting it otherwise.
    pub fn with_labels<S: AsRef<str>>(&self, labels: &[S]) -> Result<Self> {
        if labels.len() != self.rows.len() {
            return Err(TriageError::Internal(format!(
                "{} labels for {} rows",
                labels.len(),
                self.rows.len()
            )));
        }

        let mut out = self.clone();
        let col = match out.column(TARGET_LABEL) {
            Some(idx) => idx,
            None => {
                out.headers.push(TARGET_LABEL.into());
                out.headers.len() - 1
            }
        };
        for (row, label) in out.rows.iter_mut().zip(labels) {
            if row.len() <= col {
                row.resize(col + 1, String::new());
            }
            row[col] = label.as_ref().to_string();
        }
        Ok(out)
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        writer
            .write_record(&self.headers)
            .map_err(|e| TriageError::Internal(format!("csv write: {e}")))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| TriageError::Internal(format!("csv write: {e}")))?;
        }
        writer
            .into_inner()
            .map_err(|e| TriageError::Internal(format!("csv flush: {e}")))
    }
}
