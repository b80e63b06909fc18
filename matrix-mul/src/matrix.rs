//! Row-major dense integer matrices.

use std::fmt;

use matrix_mul_types::Element;
use rand::Rng;

use crate::Error;

/// A dense matrix stored as one contiguous row-major buffer.
///
/// Element `(r, c)` lives at offset `r * columns + c`, and the buffer always
/// holds exactly `rows * columns` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatMatrix {
    data: Vec<Element>,
    rows: usize,
    columns: usize,
}

/// Contiguous run of full rows cut from a larger matrix.
pub type RowBlock = FlatMatrix;

/// Rows of the product computed from one [`RowBlock`].
pub type ProductBlock = FlatMatrix;

impl FlatMatrix {
    /// Allocates a zero-filled matrix, reporting allocation failure instead of
    /// aborting.
    pub fn zeros(rows: usize, columns: usize) -> Result<Self, Error> {
        let len = rows
            .checked_mul(columns)
            .ok_or(Error::Allocation(usize::MAX))?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| Error::Allocation(len))?;
        data.resize(len, 0);
        Ok(Self {
            data,
            rows,
            columns,
        })
    }

    pub fn from_vec(data: Vec<Element>, rows: usize, columns: usize) -> Result<Self, Error> {
        if rows.checked_mul(columns) != Some(data.len()) {
            return Err(Error::ShapeMismatch {
                len: data.len(),
                rows,
                columns,
            });
        }
        Ok(Self {
            data,
            rows,
            columns,
        })
    }

    /// Fills a new matrix with values drawn uniformly from `[0, max_value)`.
    pub fn random<R: Rng + ?Sized>(
        rows: usize,
        columns: usize,
        max_value: Element,
        rng: &mut R,
    ) -> Result<Self, Error> {
        if max_value <= 0 {
            return Err(Error::Configuration(format!(
                "max value must be positive, got {max_value}"
            )));
        }
        let mut matrix = Self::zeros(rows, columns)?;
        for value in &mut matrix.data {
            *value = rng.gen_range(0..max_value);
        }
        Ok(matrix)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn as_slice(&self) -> &[Element] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<Element> {
        self.data
    }

    pub fn get(&self, row: usize, column: usize) -> Result<Element, Error> {
        let offset = self.offset(row, column)?;
        Ok(self.data[offset])
    }

    pub fn set(&mut self, row: usize, column: usize, value: Element) -> Result<(), Error> {
        let offset = self.offset(row, column)?;
        self.data[offset] = value;
        Ok(())
    }

    pub fn row(&self, row: usize) -> Result<&[Element], Error> {
        if row >= self.rows {
            return Err(self.out_of_bounds(row, 0));
        }
        let start = row * self.columns;
        Ok(&self.data[start..start + self.columns])
    }

    /// Sequential triple-loop product, the reference every distributed
    /// strategy must reproduce.
    pub fn multiply(&self, other: &FlatMatrix) -> Result<FlatMatrix, Error> {
        if self.columns != other.rows {
            return Err(Error::DimensionMismatch(
                self.rows,
                self.columns,
                other.rows,
                other.columns,
            ));
        }

        let mut product = FlatMatrix::zeros(self.rows, other.columns)?;
        for i in 0..self.rows {
            for j in 0..other.columns {
                let mut sum = 0;
                for k in 0..self.columns {
                    sum += self.data[i * self.columns + k] * other.data[k * other.columns + j];
                }
                product.data[i * other.columns + j] = sum;
            }
        }
        Ok(product)
    }

    fn offset(&self, row: usize, column: usize) -> Result<usize, Error> {
        if row >= self.rows || column >= self.columns {
            return Err(self.out_of_bounds(row, column));
        }
        Ok(row * self.columns + column)
    }

    fn out_of_bounds(&self, row: usize, column: usize) -> Error {
        Error::OutOfBounds {
            row,
            column,
            rows: self.rows,
            columns: self.columns,
        }
    }
}

/// Whitespace-separated values, one matrix row per line.
impl fmt::Display for FlatMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.data.chunks(self.columns.max(1)) {
            let mut values = row.iter();
            if let Some(first) = values.next() {
                write!(f, "{first}")?;
            }
            for value in values {
                write!(f, "\t{value}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn random_is_reproducible_and_bounded() {
        let a = FlatMatrix::random(4, 5, 10, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = FlatMatrix::random(4, 5, 10, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
        assert!(a.as_slice().iter().all(|&v| (0..10).contains(&v)));
    }

    #[test]
    fn random_rejects_empty_value_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for max_value in [0, -5] {
            assert!(matches!(
                FlatMatrix::random(2, 2, max_value, &mut rng),
                Err(Error::Configuration(_))
            ));
        }
    }

    #[test]
    fn display_renders_one_row_per_line() {
        let m = FlatMatrix::from_vec(vec![1, 2, 3, 4, 5, 6], 2, 3).unwrap();
        assert_eq!(m.to_string(), "1\t2\t3\n4\t5\t6\n");
    }

    #[test]
    fn zeros_reports_impossible_allocation() {
        assert!(matches!(
            FlatMatrix::zeros(usize::MAX, 2),
            Err(Error::Allocation(_))
        ));
        assert!(matches!(
            FlatMatrix::zeros(usize::MAX / 8, 2),
            Err(Error::Allocation(_))
        ));
    }
}
