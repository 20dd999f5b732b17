//! Tab-separated grid and document files.
//!
//! Both formats are read fail-fast: the first malformed record aborts the
//! load with its file name and 1-based line number. Blank lines are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::error::{CoocError, Result};
use crate::models::{Document, Grid, GridCell, BIGRAM_SEPARATOR};

pub fn read_grid(path: &Path) -> Result<Grid> {
    debug!("Reading grid from {}", path.display());
    let file = File::open(path).map_err(|e| CoocError::io(path, e))?;
    let grid = parse_grid(BufReader::new(file), path)?;
    debug!("Finished reading {} grid cells", grid.cells().len());
    Ok(grid)
}

pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    debug!("Reading documents from {}", path.display());
    let file = File::open(path).map_err(|e| CoocError::io(path, e))?;
    let documents = parse_documents(BufReader::new(file), path)?;
    debug!("Finished reading {} documents", documents.len());
    Ok(documents)
}

/// Parses `id, latmin, lonmin, latmax, lonmax` rows and validates the
/// south-west to north-east ordering.
pub fn parse_grid<R: BufRead>(reader: R, path: &Path) -> Result<Grid> {
    let mut cells = Vec::new();
    for_each_record(reader, path, |line_no, line| {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 5 {
            return Err(CoocError::parse(
                path,
                line_no,
                format!("expected 5 fields, found {}", fields.len()),
            ));
        }
        cells.push(GridCell {
            id: field(&fields, 0, "id", path, line_no)?,
            latmin: coordinate(&fields, 1, "latmin", path, line_no)?,
            lonmin: coordinate(&fields, 2, "lonmin", path, line_no)?,
            latmax: coordinate(&fields, 3, "latmax", path, line_no)?,
            lonmax: coordinate(&fields, 4, "lonmax", path, line_no)?,
        });
        Ok(())
    })?;
    Grid::new(cells)
}

/// Parses `id, lat, lon, tokens` rows, tokens separated by whitespace.
/// Tokens containing [`BIGRAM_SEPARATOR`] are rejected.
pub fn parse_documents<R: BufRead>(reader: R, path: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for_each_record(reader, path, |line_no, line| {
        let fields: Vec<&str> = line.splitn(4, '\t').collect();
        if fields.len() != 4 {
            return Err(CoocError::parse(
                path,
                line_no,
                format!("expected 4 fields, found {}", fields.len()),
            ));
        }
        let tokens: Vec<String> = fields[3].split_whitespace().map(str::to_string).collect();
        if let Some(token) = tokens.iter().find(|t| t.contains(BIGRAM_SEPARATOR)) {
            return Err(CoocError::parse(
                path,
                line_no,
                format!("token '{}' contains the bigram separator '{}'", token, BIGRAM_SEPARATOR),
            ));
        }
        documents.push(Document::new(
            field(&fields, 0, "id", path, line_no)?,
            coordinate(&fields, 1, "lat", path, line_no)?,
            coordinate(&fields, 2, "lon", path, line_no)?,
            tokens,
        ));
        Ok(())
    })?;
    Ok(documents)
}

pub(crate) fn for_each_record<R, F>(reader: R, path: &Path, mut handle: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(usize, &str) -> Result<()>,
{
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CoocError::io(path, e))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        handle(i + 1, line)?;
    }
    Ok(())
}

pub(crate) fn field<T: FromStr>(
    fields: &[&str],
    index: usize,
    name: &str,
    path: &Path,
    line_no: usize,
) -> Result<T> {
    let raw = fields[index].trim();
    raw.parse().map_err(|_| {
        CoocError::parse(path, line_no, format!("cannot parse {} from '{}'", name, raw))
    })
}

fn coordinate(fields: &[&str], index: usize, name: &str, path: &Path, line_no: usize) -> Result<f64> {
    let value: f64 = field(fields, index, name, path, line_no)?;
    if !value.is_finite() {
        return Err(CoocError::parse(
            path,
            line_no,
            format!("{} must be finite, got {}", name, value),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_grid_rows() {
        let text = "0\t40.0\t29.0\t40.5\t29.5\n1\t40.5\t29.5\t41.0\t30.0\n";
        let grid = parse_grid(Cursor::new(text), Path::new("grid.tsv")).unwrap();
        assert_eq!(grid.cells().len(), 2);
        assert_eq!(grid.south_west(), (40.0, 29.0));
        assert_eq!(grid.north_east(), (41.0, 30.0));
    }

    #[test]
    fn grid_error_names_line() {
        let text = "0\t40.0\t29.0\t40.5\t29.5\n\n1\t40.5\tnorth\t41.0\t30.0\n";
        let err = parse_grid(Cursor::new(text), Path::new("grid.tsv")).unwrap_err();
        match &err {
            CoocError::Parse { line, message, .. } => {
                assert_eq!(*line, 3);
                assert!(message.contains("lonmin"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().starts_with("grid.tsv:3:"));
    }

    #[test]
    fn grid_rejects_short_rows() {
        let err = parse_grid(Cursor::new("0\t40.0\t29.0\n"), Path::new("g")).unwrap_err();
        assert!(matches!(err, CoocError::Parse { line: 1, .. }));
    }

    #[test]
    fn parses_documents_with_token_order() {
        let text = "7\t40.1\t29.2\tbig rain  umbrella rain\r\n8\t40.2\t29.3\t\n";
        let docs = parse_documents(Cursor::new(text), Path::new("docs.tsv")).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, 7);
        assert_eq!(docs[0].tokens, vec!["big", "rain", "umbrella", "rain"]);
        assert!(docs[1].tokens.is_empty());
    }

    #[test]
    fn token_with_separator_is_rejected() {
        let text = "7\t40.1\t29.2\train\n8\t40.2\t29.3\tbig a|$|b\n";
        let err = parse_documents(Cursor::new(text), Path::new("docs.tsv")).unwrap_err();
        match &err {
            CoocError::Parse { line, message, .. } => {
                assert_eq!(*line, 2);
                assert!(message.contains("a|$|b"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn document_with_bad_latitude() {
        let text = "7\tNaN\t29.2\train\n";
        let err = parse_documents(Cursor::new(text), Path::new("docs.tsv")).unwrap_err();
        assert!(matches!(err, CoocError::Parse { line: 1, .. }));

        let err = parse_documents(Cursor::new("7\t40.0\train\n"), Path::new("docs.tsv")).unwrap_err();
        assert!(matches!(err, CoocError::Parse { line: 1, .. }));
    }
}
