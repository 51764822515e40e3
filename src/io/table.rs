//! Reader for the van Genuchten soil parameter table.
//!
//! # File Format
//!
//! Whitespace- or comma-separated text, one soil type per line, `#` for
//! comments:
//!
//! ```text
//! # index theta_res theta_wp theta_fc theta_sat gamma_sat alpha    l      n
//! 0       0.041     0.059    0.242    0.403     4.15e-6   3.83    1.250  1.3774
//! 1       0.179     0.151    0.346    0.614     5.74e-7   2.65    -2.342 1.1012
//! ```
//!
//! Rows are keyed by the leading integer index and must form a contiguous
//! range starting at zero, because soil fields store the index directly.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::soil::VanGenuchtenTable;

/// Error type for parameter table parsing.
#[derive(Debug, Error)]
pub enum TableError {
    /// File I/O error.
    #[error("table I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error with line number.
    #[error("table parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// No data rows.
    #[error("parameter table contains no soil types")]
    Empty,

    /// Indices do not form 0..n.
    #[error("soil type indices are not contiguous from zero")]
    NonContiguousIndex,
}

/// Read a van Genuchten parameter table, returning it with its derived
/// columns computed.
pub fn read_van_genuchten_table(path: &Path) -> Result<VanGenuchtenTable, TableError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut rows: Vec<(usize, [f64; 8])> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_no + 1;

        let data = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line.as_str(),
        };
        if data.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = data
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .collect();

        if fields.len() != 9 {
            return Err(TableError::Parse {
                line: line_no,
                message: format!("expected 9 columns, found {}", fields.len()),
            });
        }

        let index: usize = fields[0].parse().map_err(|_| TableError::Parse {
            line: line_no,
            message: format!("invalid soil index '{}'", fields[0]),
        })?;

        let mut values = [0.0; 8];
        for (n, field) in fields[1..].iter().enumerate() {
            values[n] = field.parse().map_err(|_| TableError::Parse {
                line: line_no,
                message: format!("invalid number '{}'", field),
            })?;
        }

        rows.push((index, values));
    }

    if rows.is_empty() {
        return Err(TableError::Empty);
    }

    rows.sort_by_key(|(index, _)| *index);
    if rows.iter().enumerate().any(|(n, (index, _))| n != *index) {
        return Err(TableError::NonContiguousIndex);
    }

    let column = |n: usize| rows.iter().map(|(_, v)| v[n]).collect::<Vec<f64>>();

    Ok(VanGenuchtenTable::new(
        column(0),
        column(1),
        column(2),
        column(3),
        column(4),
        column(5),
        column(6),
        column(7),
    ))
}
