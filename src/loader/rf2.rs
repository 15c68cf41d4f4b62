//! RF2 tab-delimited table reader
//!
//! Columns are located by header name. Every failure names the file, the
//! 1-based line and the column.

use super::{LoaderError, LoaderResult};
use crate::graph::ConceptId;
use std::collections::HashMap;
use std::io::BufRead;

/// One data row with access to its columns by header name
pub struct Rf2Row<'a> {
    file: &'a str,
    line: usize,
    columns: &'a HashMap<String, usize>,
    fields: Vec<&'a str>,
}

impl<'a> Rf2Row<'a> {
    fn malformed(&self, column: &str, reason: impl Into<String>) -> LoaderError {
        LoaderError::MalformedRecord {
            file: self.file.to_string(),
            line: self.line,
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    /// Raw text of a column
    pub fn text(&self, column: &str) -> LoaderResult<&'a str> {
        let idx = self
            .columns
            .get(column)
            .copied()
            .ok_or_else(|| self.malformed(column, "column not present in header"))?;
        Ok(self.fields[idx])
    }

    pub fn id(&self, column: &str) -> LoaderResult<ConceptId> {
        let raw = self.text(column)?;
        raw.parse::<ConceptId>()
            .map_err(|e| self.malformed(column, e.to_string()))
    }

    /// `1` / `0` status flag
    pub fn flag(&self, column: &str) -> LoaderResult<bool> {
        match self.text(column)? {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(self.malformed(column, format!("expected 0 or 1, found {:?}", other))),
        }
    }

    /// `YYYYMMDD` date
    pub fn date(&self, column: &str) -> LoaderResult<u32> {
        let raw = self.text(column)?;
        if raw.len() != 8 {
            return Err(self.malformed(column, format!("expected YYYYMMDD, found {:?}", raw)));
        }
        raw.parse::<u32>()
            .map_err(|_| self.malformed(column, format!("expected YYYYMMDD, found {:?}", raw)))
    }

    pub fn number(&self, column: &str) -> LoaderResult<u32> {
        let raw = self.text(column)?;
        raw.parse::<u32>()
            .map_err(|_| self.malformed(column, format!("expected a number, found {:?}", raw)))
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

/// Read a whole RF2 table.
///
/// `required` columns must appear in the header. `parse` maps each row to
/// `Some(record)` to keep it or `None` to skip it; its first error aborts
/// the read. Returns the kept records and the number of data rows seen.
pub fn read_table<R, T, F>(
    file: &str,
    reader: R,
    required: &[&str],
    mut parse: F,
) -> LoaderResult<(Vec<T>, usize)>
where
    R: BufRead,
    F: FnMut(&Rf2Row<'_>) -> LoaderResult<Option<T>>,
{
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line.map_err(|e| LoaderError::io(file, e))?,
        None => {
            return Err(LoaderError::MalformedRecord {
                file: file.to_string(),
                line: 1,
                column: "<header>".to_string(),
                reason: "file is empty".to_string(),
            })
        }
    };
    let header = header.trim_end_matches('\r').trim_start_matches('\u{feff}');
    let columns: HashMap<String, usize> = header
        .split('\t')
        .enumerate()
        .map(|(idx, name)| (name.trim().to_string(), idx))
        .collect();

    for &name in required {
        if !columns.contains_key(name) {
            return Err(LoaderError::MalformedRecord {
                file: file.to_string(),
                line: 1,
                column: name.to_string(),
                reason: "required column missing from header".to_string(),
            });
        }
    }

    let width = columns.len();
    let mut records = Vec::new();
    let mut seen = 0usize;

    for (offset, line) in lines.enumerate() {
        let line_no = offset + 2;
        let line = line.map_err(|e| LoaderError::io(file, e))?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != width {
            return Err(LoaderError::MalformedRecord {
                file: file.to_string(),
                line: line_no,
                column: "<row>".to_string(),
                reason: format!("expected {} fields, found {}", width, fields.len()),
            });
        }

        seen += 1;
        let row = Rf2Row {
            file,
            line: line_no,
            columns: &columns,
            fields,
        };
        if let Some(record) = parse(&row)? {
            records.push(record);
        }
    }

    Ok((records, seen))
}
