//! Timing and console output for a finished multiplication.

use std::io::Write;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::coordinator::Outcome;
use crate::Error;

/// Wall-clock bounds of a multiplication as seen by the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Records timestamps from the system clock and the elapsed time from a
/// monotonic one.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn stop(&self) -> Timing {
        Timing {
            started_at: self.started_at,
            finished_at: Utc::now(),
            elapsed: self.started.elapsed(),
        }
    }
}

pub trait Reporter {
    fn report(&mut self, outcome: &Outcome) -> Result<(), Error>;
}

/// Writes the outcome as plain text.
///
/// When verification is enabled and the product differs from the
/// sequential reference, the verdict is still written before
/// [`Error::VerificationFailed`] is returned.
pub struct ConsoleReporter<W> {
    out: W,
    print_operands: bool,
    verify: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            print_operands: false,
            verify: false,
        }
    }

    pub fn print_operands(mut self, enabled: bool) -> Self {
        self.print_operands = enabled;
        self
    }

    pub fn verify(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report(&mut self, outcome: &Outcome) -> Result<(), Error> {
        let Outcome {
            operands,
            product,
            timing,
        } = outcome;

        if self.print_operands {
            writeln!(self.out, "Matrix A ({}x{}):", operands.a.rows(), operands.a.columns())?;
            write!(self.out, "{}", operands.a)?;
            writeln!(self.out, "Matrix B ({}x{}):", operands.b.rows(), operands.b.columns())?;
            write!(self.out, "{}", operands.b)?;
        }
        writeln!(self.out, "Product ({}x{}):", product.rows(), product.columns())?;
        write!(self.out, "{product}")?;

        writeln!(self.out, "Started:  {}", timing.started_at.to_rfc3339())?;
        writeln!(self.out, "Finished: {}", timing.finished_at.to_rfc3339())?;
        writeln!(self.out, "Elapsed:  {:.6} s", timing.elapsed.as_secs_f64())?;

        if self.verify {
            if outcome.verify()? {
                writeln!(self.out, "Verification: product matches the sequential reference")?;
            } else {
                writeln!(self.out, "Verification: product differs from the sequential reference")?;
                self.out.flush()?;
                return Err(Error::VerificationFailed);
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Operands;
    use crate::matrix::FlatMatrix;

    fn outcome(product: Vec<i64>) -> Outcome {
        let a = FlatMatrix::from_vec(vec![1, 2, 3, 4], 2, 2).unwrap();
        let b = FlatMatrix::from_vec(vec![1, 0, 0, 1], 2, 2).unwrap();
        Outcome {
            operands: Operands::new(a, b).unwrap(),
            product: FlatMatrix::from_vec(product, 2, 2).unwrap(),
            timing: Stopwatch::start().stop(),
        }
    }

    #[test]
    fn prints_product_and_verdict() {
        let mut reporter = ConsoleReporter::new(Vec::new()).verify(true);
        reporter.report(&outcome(vec![1, 2, 3, 4])).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();

        assert!(text.starts_with("Product (2x2):\n1\t2\n3\t4\n"));
        assert!(text.contains("Elapsed:"));
        assert!(text.contains("matches the sequential reference"));
        assert!(!text.contains("Matrix A"));
    }

    #[test]
    fn wrong_product_fails_verification() {
        let mut reporter = ConsoleReporter::new(Vec::new())
            .print_operands(true)
            .verify(true);
        let result = reporter.report(&outcome(vec![1, 2, 3, 5]));
        assert!(matches!(result, Err(Error::VerificationFailed)));

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(text.starts_with("Matrix A (2x2):\n1\t2\n3\t4\n"));
        assert!(text.contains("differs"));
    }
}
