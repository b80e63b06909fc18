//! Index arithmetic for cutting matrices into per-rank pieces.

use matrix_mul_types::Element;

use crate::matrix::{FlatMatrix, RowBlock};
use crate::Error;

/// Number of rows each of `parts` equal blocks receives.
pub fn block_rows(rows: usize, parts: usize) -> Result<usize, Error> {
    if parts == 0 || rows % parts != 0 {
        return Err(Error::Configuration(format!(
            "{rows} rows cannot be split evenly across {parts} processes"
        )));
    }
    Ok(rows / parts)
}

/// Splits `matrix` into `parts` blocks of consecutive full rows.
///
/// Block `k` covers source rows `[k * n, (k + 1) * n)` where
/// `n = rows / parts`; concatenating the blocks in order yields `matrix`.
pub fn split_into_blocks(matrix: &FlatMatrix, parts: usize) -> Result<Vec<RowBlock>, Error> {
    let rows_per_block = block_rows(matrix.rows(), parts)?;
    let chunk_len = rows_per_block * matrix.columns();

    if chunk_len == 0 {
        return (0..parts)
            .map(|_| FlatMatrix::zeros(rows_per_block, matrix.columns()))
            .collect();
    }

    matrix
        .as_slice()
        .chunks(chunk_len)
        .map(|chunk| FlatMatrix::from_vec(chunk.to_vec(), rows_per_block, matrix.columns()))
        .collect()
}

/// Copies column `column` of `matrix` into a contiguous vector of length
/// `rows`.
pub fn extract_column(matrix: &FlatMatrix, column: usize) -> Result<Vec<Element>, Error> {
    (0..matrix.rows())
        .map(|row| matrix.get(row, column))
        .collect()
}

pub fn extract_row(matrix: &FlatMatrix, row: usize) -> Result<Vec<Element>, Error> {
    Ok(matrix.row(row)?.to_vec())
}

/// Writes `values` down column `column`, starting at row `row_offset`.
///
/// Inverse of [`extract_column`] when `row_offset` is 0 and `values` spans
/// every row.
pub fn write_column(
    matrix: &mut FlatMatrix,
    column: usize,
    row_offset: usize,
    values: &[Element],
) -> Result<(), Error> {
    for (i, &value) in values.iter().enumerate() {
        matrix.set(row_offset + i, column, value)?;
    }
    Ok(())
}
