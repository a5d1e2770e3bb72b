use std::collections::BTreeSet;
use std::sync::Arc;

use crate::index::TripleIndex;
use crate::matrix::{quartet_equation, DenseMatrix, Gf2Matrix};
use crate::quartet::Quartet;
use crate::vector::{DenseVector, SparseVector};
use crate::{Error, Result};

type RowId = usize;

/// GF(2) system with sparse rows and a per-column index of the rows that
/// hold a 1 in that column.
///
/// Rows that cancel to nothing during elimination are dropped; a dropped
/// row whose result was 1 is a contradiction and makes the system
/// inconsistent for good, since adding equations cannot remove it.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    taxon_count: usize,
    index: Arc<TripleIndex>,
    rows: Vec<Option<SparseVector>>,
    columns: Vec<BTreeSet<RowId>>,
    live: usize,
    contradictions: usize,
    reduced: bool,
}

impl SparseMatrix {
    pub fn new(taxon_count: usize) -> Self {
        let index = TripleIndex::for_taxa(taxon_count);
        Self {
            taxon_count,
            columns: vec![BTreeSet::new(); index.len()],
            index,
            rows: Vec::new(),
            live: 0,
            contradictions: 0,
            reduced: true,
        }
    }

    pub fn from_quartets(taxon_count: usize, quartets: &[Quartet]) -> Result<Self> {
        let mut m = Self::new(taxon_count);
        m.add_quartets(quartets)?;
        Ok(m)
    }

    pub fn add_row(&mut self, row: SparseVector) {
        self.reduced = false;
        if row.is_empty() {
            if row.result() {
                self.contradictions += 1;
            }
            return;
        }
        let id = self.rows.len();
        for &t in row.entries() {
            self.columns[self.index.column(t)].insert(id);
        }
        self.rows.push(Some(row));
        self.live += 1;
    }

    /// Live rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = &SparseVector> + '_ {
        self.rows.iter().flatten()
    }

    /// Number of rows holding a 1 in column `col`.
    pub fn column_weight(&self, col: usize) -> usize {
        self.columns[col].len()
    }

    fn leading_column(&self, id: RowId) -> Option<usize> {
        self.rows[id]
            .as_ref()
            .and_then(SparseVector::leading)
            .map(|t| self.index.column(t))
    }

    /// Add row `pivot` into row `target`, keeping the column index in step.
    fn eliminate(&mut self, pivot: RowId, target: RowId) {
        let Some(mut row) = self.rows[target].take() else {
            return;
        };
        let Some(pivot_row) = self.rows[pivot].as_ref() else {
            self.rows[target] = Some(row);
            return;
        };
        let columns = &mut self.columns;
        let index = &self.index;
        row.add_tracked(pivot_row, |t, appeared| {
            let col = index.column(t);
            if appeared {
                columns[col].insert(target);
            } else {
                columns[col].remove(&target);
            }
        });
        if row.is_empty() {
            self.live -= 1;
            if row.result() {
                self.contradictions += 1;
            }
        } else {
            self.rows[target] = Some(row);
        }
    }

    fn ensure_reduced(&self) -> Result<()> {
        if self.reduced {
            Ok(())
        } else {
            Err(Error::NotReduced)
        }
    }
}

impl Gf2Matrix for SparseMatrix {
    fn taxon_count(&self) -> usize {
        self.taxon_count
    }

    fn row_count(&self) -> usize {
        self.live
    }

    fn add_row_for_quartet(&mut self, quartet: &Quartet) -> Result<()> {
        let (triples, result) = quartet_equation(quartet, self.taxon_count)?;
        self.add_row(SparseVector::from_entries(self.taxon_count, triples, result));
        Ok(())
    }

    fn row_reduce(&mut self) {
        for col in 0..self.columns.len() {
            // A row leading in `col` exists iff `col` is a pivot column:
            // every other row holding `col` already leads in an earlier one.
            let pivot = self.columns[col]
                .iter()
                .copied()
                .find(|&id| self.leading_column(id) == Some(col));
            let Some(pivot) = pivot else {
                continue;
            };
            let targets: Vec<RowId> = self.columns[col]
                .iter()
                .copied()
                .filter(|&id| id != pivot)
                .collect();
            for target in targets {
                self.eliminate(pivot, target);
            }
        }
        self.reduced = true;
        tracing::trace!(
            rows = self.live,
            contradictions = self.contradictions,
            "sparse reduction finished"
        );
    }

    fn is_reduced(&self) -> bool {
        self.reduced
    }

    fn is_consistent(&self) -> Result<bool> {
        self.ensure_reduced()?;
        Ok(self.contradictions == 0)
    }

    fn conforming_vector(&self) -> Result<DenseVector> {
        if !self.is_consistent()? {
            return Err(Error::MatrixInconsistent);
        }
        let mut v = DenseVector::new(self.taxon_count);
        for row in self.rows() {
            if let Some(t) = row.leading() {
                v.set_index(self.index.column(t), row.result());
            }
        }
        debug_assert!(self.conforms(&v));
        Ok(v)
    }

    fn conforms(&self, v: &DenseVector) -> bool {
        self.contradictions == 0 && self.rows().all(|row| row.dot(v) == row.result())
    }

    fn rank(&self) -> Result<usize> {
        self.ensure_reduced()?;
        Ok(self.live)
    }

    fn kernel(&self) -> Result<DenseMatrix> {
        self.ensure_reduced()?;
        let mut kernel = DenseMatrix::new(self.taxon_count);
        for free in 0..self.columns.len() {
            let is_pivot = self.columns[free]
                .iter()
                .any(|&id| self.leading_column(id) == Some(free));
            if is_pivot {
                continue;
            }
            let mut v = DenseVector::new(self.taxon_count);
            v.set_index(free, true);
            for &id in &self.columns[free] {
                if let Some(col) = self.leading_column(id) {
                    v.set_index(col, true);
                }
            }
            kernel.add_row(v, false);
        }
        Ok(kernel)
    }
}
