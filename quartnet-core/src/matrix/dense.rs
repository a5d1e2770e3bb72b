use crate::matrix::{quartet_equation, Gf2Matrix};
use crate::quartet::Quartet;
use crate::vector::{DenseVector, TripleVector};
use crate::{Error, Result, Taxon};

/// Row-major GF(2) system with bit-packed rows.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    taxon_count: usize,
    rows: Vec<DenseVector>,
    results: Vec<bool>,
    reduced: bool,
}

impl DenseMatrix {
    pub fn new(taxon_count: usize) -> Self {
        Self {
            taxon_count,
            rows: Vec::new(),
            results: Vec::new(),
            reduced: true,
        }
    }

    /// One row per quartet, unreduced.
    pub fn from_quartets(taxon_count: usize, quartets: &[Quartet]) -> Result<Self> {
        let mut m = Self::new(taxon_count);
        m.add_quartets(quartets)?;
        Ok(m)
    }

    pub fn add_row(&mut self, coefficients: DenseVector, result: bool) {
        debug_assert_eq!(coefficients.taxon_count(), self.taxon_count);
        self.rows.push(coefficients);
        self.results.push(result);
        self.reduced = false;
    }

    pub fn rows(&self) -> impl Iterator<Item = (&DenseVector, bool)> + '_ {
        self.rows.iter().zip(self.results.iter().copied())
    }

    /// Every row restricted onto `taxa` (see [`TripleVector::select`]).
    pub fn select(&self, taxa: &[Taxon]) -> DenseMatrix {
        let mut m = DenseMatrix::new(taxa.len());
        for (row, result) in self.rows() {
            m.add_row(row.select(taxa), result);
        }
        m
    }

    fn ensure_reduced(&self) -> Result<()> {
        if self.reduced {
            Ok(())
        } else {
            Err(Error::NotReduced)
        }
    }

    /// Pivot column of every non-zero row, in row order.
    fn pivots(&self) -> impl Iterator<Item = (usize, &DenseVector, bool)> + '_ {
        self.rows()
            .filter_map(|(row, result)| row.first_one().map(|col| (col, row, result)))
    }
}

impl Gf2Matrix for DenseMatrix {
    fn taxon_count(&self) -> usize {
        self.taxon_count
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn add_row_for_quartet(&mut self, quartet: &Quartet) -> Result<()> {
        let (triples, result) = quartet_equation(quartet, self.taxon_count)?;
        let mut row = DenseVector::new(self.taxon_count);
        for t in triples {
            let col = row.index().column(t);
            row.set_index(col, true);
        }
        self.add_row(row, result);
        Ok(())
    }

    fn row_reduce(&mut self) {
        let n_rows = self.rows.len();
        let n_cols = self.column_count();
        let mut row = 0usize;
        for col in 0..n_cols {
            if row == n_rows {
                break;
            }
            // first row at or below `row` with a 1 in this column
            let Some(sel) = (row..n_rows).find(|&r| self.rows[r].get_index(col)) else {
                continue;
            };
            self.rows.swap(row, sel);
            self.results.swap(row, sel);
            let pivot = self.rows[row].clone();
            let pivot_result = self.results[row];
            for r in 0..n_rows {
                if r != row && self.rows[r].get_index(col) {
                    self.rows[r].add_vector(&pivot, col);
                    self.results[r] ^= pivot_result;
                }
            }
            row += 1;
        }
        self.reduced = true;
        tracing::trace!(rows = n_rows, rank = row, "dense reduction finished");
    }

    fn is_reduced(&self) -> bool {
        self.reduced
    }

    fn is_consistent(&self) -> Result<bool> {
        self.ensure_reduced()?;
        Ok(!self
            .rows()
            .any(|(row, result)| result && row.is_zero()))
    }

    fn conforming_vector(&self) -> Result<DenseVector> {
        if !self.is_consistent()? {
            return Err(Error::MatrixInconsistent);
        }
        let mut v = DenseVector::new(self.taxon_count);
        for (col, _, result) in self.pivots() {
            v.set_index(col, result);
        }
        debug_assert!(self.conforms(&v));
        Ok(v)
    }

    fn conforms(&self, v: &DenseVector) -> bool {
        self.rows().all(|(row, result)| row.dot(v) == result)
    }

    fn rank(&self) -> Result<usize> {
        self.ensure_reduced()?;
        Ok(self.pivots().count())
    }

    fn kernel(&self) -> Result<DenseMatrix> {
        self.ensure_reduced()?;
        let pivots: Vec<(usize, &DenseVector)> =
            self.pivots().map(|(col, row, _)| (col, row)).collect();
        let mut is_pivot = vec![false; self.column_count()];
        for &(col, _) in &pivots {
            is_pivot[col] = true;
        }
        let mut kernel = DenseMatrix::new(self.taxon_count);
        for free in (0..self.column_count()).filter(|&c| !is_pivot[c]) {
            let mut v = DenseVector::new(self.taxon_count);
            v.set_index(free, true);
            for &(col, row) in &pivots {
                if row.get_index(free) {
                    v.set_index(col, true);
                }
            }
            kernel.add_row(v, false);
        }
        Ok(kernel)
    }
}
