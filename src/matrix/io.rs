//! Matrix files and concept lists
//!
//! Delimited layout: a header row with an empty corner cell followed by the
//! column labels, then one row per label. Missing cells are written as the
//! configured missing label.

use super::{is_missing, DistanceMatrix, MatrixError, MatrixResult, MISSING};
use crate::graph::ConceptId;
use indexmap::IndexSet;
use ndarray::Array2;
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;

/// On-disk matrix format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixFormat {
    /// Delimited text with the given separator
    Delimited(char),
    Json,
}

impl MatrixFormat {
    /// Guess from a file extension: `.csv`, `.json`, anything else tab-separated
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => MatrixFormat::Delimited(','),
            Some("json") => MatrixFormat::Json,
            _ => MatrixFormat::Delimited('\t'),
        }
    }
}

impl FromStr for MatrixFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tsv" => Ok(MatrixFormat::Delimited('\t')),
            "csv" => Ok(MatrixFormat::Delimited(',')),
            "json" => Ok(MatrixFormat::Json),
            other => Err(format!("unknown matrix format '{}'", other)),
        }
    }
}

fn format_cell(value: f64, missing_label: &str) -> String {
    if is_missing(value) {
        missing_label.to_string()
    } else {
        value.to_string()
    }
}

pub fn write_delimited<W: Write>(
    matrix: &DistanceMatrix,
    mut writer: W,
    delimiter: char,
    missing_label: &str,
) -> std::io::Result<()> {
    let sep = delimiter.to_string();

    let mut header = vec![String::new()];
    header.extend(matrix.labels().iter().cloned());
    writeln!(writer, "{}", header.join(&sep))?;

    for (i, label) in matrix.labels().iter().enumerate() {
        let mut cells = Vec::with_capacity(matrix.len() + 1);
        cells.push(label.clone());
        cells.extend(
            matrix
                .values()
                .row(i)
                .iter()
                .map(|&v| format_cell(v, missing_label)),
        );
        writeln!(writer, "{}", cells.join(&sep))?;
    }
    writer.flush()
}

#[derive(Serialize)]
struct MatrixDocument<'a> {
    measure: String,
    ids: &'a [String],
    unresolved: Vec<&'a str>,
    /// Missing cells are `null`
    values: Vec<Vec<Option<f64>>>,
}

pub fn write_json<W: Write>(matrix: &DistanceMatrix, writer: W) -> MatrixResult<()> {
    let values = matrix
        .values()
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|&v| (!is_missing(v)).then_some(v)).collect())
        .collect();
    let doc = MatrixDocument {
        measure: matrix.measure().to_string(),
        ids: matrix.labels(),
        unresolved: matrix.unresolved(),
        values,
    };
    serde_json::to_writer_pretty(writer, &doc)?;
    Ok(())
}

/// A matrix read back from a delimited file
#[derive(Debug, Clone)]
pub struct LabeledMatrix {
    pub labels: Vec<String>,
    pub values: Array2<f64>,
}

/// Read a delimited matrix.
///
/// Cells equal to `missing_label` (or empty) become [`MISSING`]. The column
/// labels must match the row labels in count.
pub fn read_delimited<R: BufRead>(
    name: &str,
    reader: R,
    delimiter: char,
    missing_label: &str,
) -> MatrixResult<LabeledMatrix> {
    let malformed = |line: usize, reason: String| MatrixError::Malformed {
        file: name.to_string(),
        line,
        reason,
    };

    let mut lines = reader.lines().enumerate();
    let header = match lines.next() {
        Some((_, line)) => line.map_err(|e| MatrixError::io(name, e))?,
        None => return Err(malformed(1, "empty matrix file".to_string())),
    };
    let labels: Vec<String> = header
        .trim_end_matches(['\r', '\n'])
        .split(delimiter)
        .skip(1)
        .map(|s| s.trim().to_string())
        .collect();
    let n = labels.len();

    let mut values = Array2::from_elem((n, n), MISSING);
    let mut row = 0;
    for (idx, line) in lines {
        let line = line.map_err(|e| MatrixError::io(name, e))?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        if row >= n {
            return Err(malformed(idx + 1, format!("more rows than the {} columns", n)));
        }

        let mut cells = line.split(delimiter);
        let label = cells.next().unwrap_or_default().trim();
        if label != labels[row] {
            return Err(malformed(
                idx + 1,
                format!("row label '{}' does not match column '{}'", label, labels[row]),
            ));
        }

        let cells: Vec<&str> = cells.collect();
        if cells.len() != n {
            return Err(malformed(idx + 1, format!("expected {} cells, found {}", n, cells.len())));
        }
        for (col, cell) in cells.into_iter().enumerate() {
            let cell = cell.trim();
            values[[row, col]] = if cell.is_empty() || cell == missing_label {
                MISSING
            } else {
                cell.parse::<f64>()
                    .map_err(|e| malformed(idx + 1, format!("cell '{}': {}", cell, e)))?
            };
        }
        row += 1;
    }

    if row != n {
        return Err(malformed(row + 2, format!("expected {} rows, found {}", n, row)));
    }
    Ok(LabeledMatrix { labels, values })
}

/// Read a concept id list.
///
/// One id per line; only the first tab- or comma-separated field counts,
/// so mapping files can be read directly. Blank lines and `#` comments are
/// skipped and repeated ids keep their first position. A first line whose
/// leading field is not an id is treated as a header.
pub fn read_concept_list<R: BufRead>(reader: R) -> std::io::Result<Vec<String>> {
    let mut seen: IndexSet<String> = IndexSet::new();
    let mut first = true;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let field = line
            .split(['\t', ','])
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        // a header can only be the first line that is not a comment
        let header = first && field.parse::<ConceptId>().is_err();
        first = false;
        if header {
            continue;
        }
        seen.insert(field);
    }
    Ok(seen.into_iter().collect())
}

/// Write a matrix to `path` in the given format
pub fn write_matrix_file(
    matrix: &DistanceMatrix,
    path: &Path,
    format: MatrixFormat,
    missing_label: &str,
) -> MatrixResult<()> {
    let name = path.display().to_string();
    let file = std::fs::File::create(path).map_err(|e| MatrixError::io(&name, e))?;
    let writer = std::io::BufWriter::new(file);
    match format {
        MatrixFormat::Delimited(delimiter) => write_delimited(matrix, writer, delimiter, missing_label)
            .map_err(|e| MatrixError::io(&name, e)),
        MatrixFormat::Json => write_json(matrix, writer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::{Measure, SemanticEngine};
    use crate::graph::{Concept, ConceptGraph, GraphBuilder, Relationship, IS_A};
    use crate::loader::LoadedRelease;
    use crate::matrix::MatrixAssembler;
    use std::io::Cursor;

    const R: u64 = 138875005;

    fn graph() -> ConceptGraph {
        let concepts = [R, 1, 2, 3]
            .iter()
            .map(|&id| Concept::new(ConceptId(id)))
            .collect();
        let relationships = vec![
            Relationship::new(11u64, 1u64, R, IS_A),
            Relationship::new(12u64, 2u64, R, IS_A),
            Relationship::new(13u64, 3u64, 1u64, IS_A),
        ];
        GraphBuilder::default()
            .build(&LoadedRelease::from_parts(concepts, relationships))
            .unwrap()
    }

    fn matrix(graph: &ConceptGraph) -> DistanceMatrix {
        let engine = SemanticEngine::new(graph);
        MatrixAssembler::new(&engine)
            .assemble(&["1", "3", "77"], Measure::ShortestPath)
            .unwrap()
    }

    #[test]
    fn test_write_delimited() {
        let graph = graph();
        let mut out = Vec::new();
        write_delimited(&matrix(&graph), &mut out, '\t', "NA").unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "\t1\t3\t77");
        assert_eq!(lines[1], "1\t0\t1\tNA");
        assert_eq!(lines[3], "77\tNA\tNA\tNA");
    }

    #[test]
    fn test_delimited_read_back() {
        let graph = graph();
        let original = matrix(&graph);
        let mut out = Vec::new();
        write_delimited(&original, &mut out, ',', "NA").unwrap();

        let read = read_delimited("m.csv", Cursor::new(out), ',', "NA").unwrap();
        assert_eq!(read.labels, vec!["1", "3", "77"]);
        assert_eq!(read.values[[0, 1]], 1.0);
        assert!(is_missing(read.values[[2, 0]]));
    }

    #[test]
    fn test_read_delimited_rejects_ragged_rows() {
        let text = "\ta\tb\na\t0\t1\nb\t1\n";
        let err = read_delimited("m.tsv", Cursor::new(text), '\t', "NA").unwrap_err();
        assert!(matches!(err, MatrixError::Malformed { line: 3, .. }));
    }

    #[test]
    fn test_write_json_uses_null_for_missing() {
        let graph = graph();
        let mut out = Vec::new();
        write_json(&matrix(&graph), &mut out).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(doc["measure"], "ShortestPath");
        assert_eq!(doc["ids"][2], "77");
        assert_eq!(doc["unresolved"][0], "77");
        assert!(doc["values"][0][2].is_null());
        assert_eq!(doc["values"][0][1], 1.0);
    }

    #[test]
    fn test_read_concept_list() {
        let text = "conceptId\tterm\n22298006\tMyocardial infarction\n\n# note\n73211009\n22298006\n";
        let ids = read_concept_list(Cursor::new(text)).unwrap();
        assert_eq!(ids, vec!["22298006", "73211009"]);
    }

    #[test]
    fn test_concept_list_header_after_comments() {
        let text = "# exported 2023-04-30\n\nconceptId\n22298006\nnot-an-id\n";
        let ids = read_concept_list(Cursor::new(text)).unwrap();
        // only the first non-comment line may be a header
        assert_eq!(ids, vec!["22298006", "not-an-id"]);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(MatrixFormat::from_path(Path::new("m.csv")), MatrixFormat::Delimited(','));
        assert_eq!(MatrixFormat::from_path(Path::new("m.json")), MatrixFormat::Json);
        assert_eq!(MatrixFormat::from_path(Path::new("m.tsv")), MatrixFormat::Delimited('\t'));
        assert_eq!("CSV".parse::<MatrixFormat>().unwrap(), MatrixFormat::Delimited(','));
    }
}
