//! Affine GF(2) systems with one equation per quartet.
//!
//! Columns are the base triples `(0, i, j)` in smart-index order. A quartet
//! `l1 l2 | r1 r2` constrains the cocycle of any circular order that
//! displays it; after canonicalization the constraint touches two base
//! triples when `l1 == 0` and four otherwise.

mod dense;
mod sparse;

pub use dense::DenseMatrix;
pub use sparse::SparseMatrix;

use std::cmp::Ordering;

use crate::quartet::Quartet;
use crate::triple::Triple;
use crate::vector::DenseVector;
use crate::witness::Witness;
use crate::{Error, Result};

/// Operations shared by the dense and sparse engines.
///
/// Queries that depend on reduced row-echelon form (`is_consistent`,
/// `conforming_vector`, `rank`, `kernel`) fail with [`Error::NotReduced`]
/// when rows were added after the last [`Gf2Matrix::row_reduce`].
pub trait Gf2Matrix {
    fn taxon_count(&self) -> usize;

    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize {
        crate::index::column_count(self.taxon_count())
    }

    /// Append the equation of `quartet`.
    fn add_row_for_quartet(&mut self, quartet: &Quartet) -> Result<()>;

    fn add_quartets(&mut self, quartets: &[Quartet]) -> Result<()> {
        for q in quartets {
            self.add_row_for_quartet(q)?;
        }
        Ok(())
    }

    /// Bring the system into reduced row-echelon form.
    fn row_reduce(&mut self);

    fn is_reduced(&self) -> bool;

    /// `false` iff some row reads `0 = 1`.
    fn is_consistent(&self) -> Result<bool>;

    /// One solution: pivot columns take their row's result bit, free
    /// columns are 0.
    fn conforming_vector(&self) -> Result<DenseVector>;

    /// Whether `v` satisfies every row.
    fn conforms(&self, v: &DenseVector) -> bool;

    /// Number of pivot rows.
    fn rank(&self) -> Result<usize>;

    /// Basis of the null space of the coefficient matrix, one row per free
    /// column, all results 0.
    fn kernel(&self) -> Result<DenseMatrix>;

    /// Four-taxon subsets on which the data leaves all three topologies
    /// open: the kernel restricted to them has full rank 3.
    fn find_witnesses(&self) -> Result<Vec<Witness>> {
        let kernel = self.kernel()?;
        let n = self.taxon_count();
        let mut witnesses = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                for k in (j + 1)..n {
                    for l in (k + 1)..n {
                        let taxa = [i, j, k, l];
                        let mut restricted = kernel.select(&taxa);
                        restricted.row_reduce();
                        let rank = restricted.rank()?;
                        match rank.cmp(&3) {
                            Ordering::Greater => {
                                return Err(Error::WitnessRankOverflow { taxa, rank })
                            }
                            Ordering::Equal => witnesses.push(Witness::new(taxa)),
                            Ordering::Less => {}
                        }
                    }
                }
            }
        }
        tracing::debug!(
            kernel_dimension = kernel.row_count(),
            witnesses = witnesses.len(),
            "witness scan finished"
        );
        Ok(witnesses)
    }
}

/// The base triples and the result bit of the equation for `quartet`.
///
/// The triples are ascending, start with taxon 0 and are pairwise distinct.
pub fn quartet_equation(quartet: &Quartet, taxon_count: usize) -> Result<(Vec<Triple>, bool)> {
    if !quartet.is_valid() {
        return Err(Error::InvalidQuartet(*quartet));
    }
    if let Some(&taxon) = quartet.taxa().iter().find(|&&t| t >= taxon_count) {
        return Err(Error::TaxonOutOfRange { taxon, taxon_count });
    }
    let q = quartet.canonical();
    let [l1, l2] = q.left;
    let [r1, r2] = q.right;
    let mut result = false;
    let mut triples = Vec::with_capacity(4);
    if l1 == 0 {
        for mut t in [Triple::new(0, l2, r1), Triple::new(0, l2, r2)] {
            result ^= t.make_ascending();
            triples.push(t);
        }
    } else {
        for mut t in [
            Triple::new(0, l1, r1),
            Triple::new(0, l2, r1),
            Triple::new(0, l1, r2),
            Triple::new(0, l2, r2),
        ] {
            result ^= t.make_ascending_alt();
            triples.push(t);
        }
    }
    Ok((triples, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equation_with_taxon_zero() {
        let (triples, result) = quartet_equation(&Quartet::new(0, 1, 2, 3), 4).unwrap();
        assert_eq!(triples, vec![Triple::new(0, 1, 2), Triple::new(0, 1, 3)]);
        assert!(!result);

        let (triples, result) = quartet_equation(&Quartet::new(2, 0, 3, 1), 4).unwrap();
        assert_eq!(triples, vec![Triple::new(0, 1, 2), Triple::new(0, 2, 3)]);
        assert!(result);
    }

    #[test]
    fn test_equation_without_taxon_zero() {
        let (triples, result) = quartet_equation(&Quartet::new(1, 3, 2, 4), 5).unwrap();
        assert_eq!(
            triples,
            vec![
                Triple::new(0, 1, 2),
                Triple::new(0, 2, 3),
                Triple::new(0, 1, 4),
                Triple::new(0, 3, 4),
            ]
        );
        // only (0, 3, 2) needed a swap
        assert!(result);
    }

    #[test]
    fn test_equation_rejects_bad_quartets() {
        assert!(matches!(
            quartet_equation(&Quartet::new(0, 1, 1, 2), 4),
            Err(Error::InvalidQuartet(_))
        ));
        assert!(matches!(
            quartet_equation(&Quartet::new(0, 1, 2, 9), 4),
            Err(Error::TaxonOutOfRange { taxon: 9, .. })
        ));
    }
}
