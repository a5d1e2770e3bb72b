//! GF(2) vectors over taxon triples.
//!
//! Only the base triples `(0, i, j)` with `0 < i < j` are stored. Every
//! other triple is read through the triangle identity
//! `v(a,b,c) = v(0,a,b) ^ v(0,a,c) ^ v(0,b,c)`, with the parity of the
//! permutation that sorted the triple applied as a correction.

mod dense;
mod sparse;

pub use dense::DenseVector;
pub use sparse::SparseVector;

use crate::triple::Triple;
use crate::Taxon;

/// Shared accessors of the dense and sparse cocycle vectors.
pub trait TripleVector: Sized {
    /// All-zero vector over `taxon_count` taxa.
    fn zeros(taxon_count: usize) -> Self;

    fn taxon_count(&self) -> usize;

    /// Stored bit of the base triple `(0, i, j)`, `0 < i < j`.
    fn stored(&self, i: Taxon, j: Taxon) -> bool;

    fn set_stored(&mut self, i: Taxon, j: Taxon, value: bool);

    fn is_zero(&self) -> bool;

    /// Value at an arbitrary triple of distinct taxa.
    fn get(&self, t: Triple) -> bool {
        let (t, odd) = t.ascending();
        let value = if t.i1 == 0 {
            self.stored(t.i2, t.i3)
        } else {
            self.stored(t.i1, t.i2) ^ self.stored(t.i1, t.i3) ^ self.stored(t.i2, t.i3)
        };
        value ^ odd
    }

    /// Make [`TripleVector::get`] return `value` at `t`.
    ///
    /// A triple without taxon 0 is not stored on its own; it is adjusted by
    /// flipping its last base triple `(0, i2, i3)`.
    fn set(&mut self, t: Triple, value: bool) {
        let (asc, odd) = t.ascending();
        if asc.i1 == 0 {
            self.set_stored(asc.i2, asc.i3, value ^ odd);
        } else if self.get(t) != value {
            let current = self.stored(asc.i2, asc.i3);
            self.set_stored(asc.i2, asc.i3, !current);
        }
    }

    /// Restriction onto `taxa`, with `taxa[0]` playing the role of the base
    /// taxon. Taxon `k` of the result is `taxa[k]` of `self`.
    fn select(&self, taxa: &[Taxon]) -> Self {
        let mut out = Self::zeros(taxa.len());
        for i in 1..taxa.len() {
            for j in (i + 1)..taxa.len() {
                out.set_stored(i, j, self.get(Triple::new(taxa[0], taxa[i], taxa[j])));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector_with(taxon_count: usize, ones: &[(Taxon, Taxon)]) -> DenseVector {
        let mut v = DenseVector::zeros(taxon_count);
        for &(i, j) in ones {
            v.set_stored(i, j, true);
        }
        v
    }

    #[test]
    fn test_get_applies_parity_correction() {
        let v = vector_with(4, &[(1, 2)]);
        assert!(v.get(Triple::new(0, 1, 2)));
        assert!(!v.get(Triple::new(1, 0, 2)));
        assert!(v.get(Triple::new(2, 0, 1)));
        assert!(!v.get(Triple::new(0, 1, 3)));
        assert!(v.get(Triple::new(0, 3, 1)));
    }

    #[test]
    fn test_get_uses_triangle_identity() {
        let v = vector_with(5, &[(1, 2), (2, 4)]);
        // (1,2,4) = (0,1,2) ^ (0,1,4) ^ (0,2,4) = 1 ^ 0 ^ 1
        assert!(!v.get(Triple::new(1, 2, 4)));
        // (1,2,3) = 1 ^ 0 ^ 0
        assert!(v.get(Triple::new(1, 2, 3)));
        assert!(!v.get(Triple::new(2, 1, 3)));
    }

    #[test]
    fn test_set_round_trips_through_get() {
        let mut v = DenseVector::zeros(6);
        let triples = [
            Triple::new(3, 1, 5),
            Triple::new(0, 4, 2),
            Triple::new(2, 3, 4),
            Triple::new(5, 0, 1),
        ];
        for t in triples {
            v.set(t, true);
            assert!(v.get(t), "{t} should read back as set");
            v.set(t, false);
            assert!(!v.get(t), "{t} should read back as cleared");
        }
    }

    #[test]
    fn test_select_relabels_onto_subset() {
        let v = vector_with(6, &[(2, 5), (1, 3)]);
        let taxa = [0, 2, 5];
        let small = v.select(&taxa);
        assert_eq!(small.taxon_count(), 3);
        assert!(small.stored(1, 2));

        let shifted = [2, 3, 5, 1];
        let small = v.select(&shifted);
        for i in 0..shifted.len() {
            for j in 0..shifted.len() {
                for k in 0..shifted.len() {
                    if i == j || j == k || i == k {
                        continue;
                    }
                    assert_eq!(
                        small.get(Triple::new(i, j, k)),
                        v.get(Triple::new(shifted[i], shifted[j], shifted[k]))
                    );
                }
            }
        }
    }

    #[test]
    fn test_sparse_and_dense_agree() {
        let dense = vector_with(5, &[(1, 4), (2, 3)]);
        let mut sparse = SparseVector::zeros(5);
        sparse.set_stored(1, 4, true);
        sparse.set_stored(2, 3, true);
        for a in 0..5 {
            for b in 0..5 {
                for c in 0..5 {
                    if a == b || b == c || a == c {
                        continue;
                    }
                    let t = Triple::new(a, b, c);
                    assert_eq!(dense.get(t), sparse.get(t));
                }
            }
        }
        assert_eq!(sparse.to_dense(), dense);
    }
}
