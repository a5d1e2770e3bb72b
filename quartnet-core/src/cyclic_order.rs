use std::fmt;

use crate::triple::Triple;
use crate::vector::{DenseVector, TripleVector};
use crate::{Error, NotCyclicCause, Result, Taxon};

/// A circular arrangement of the taxa `0..n`; `taxa()[p]` sits at
/// position `p`.
///
/// The cocycle of an order has bit 1 at `(0, i, j)` exactly when the
/// positions of `0`, `i`, `j` increase cyclically in that sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclicOrder {
    taxa: Vec<Taxon>,
}

impl CyclicOrder {
    /// `0, 1, ..., n-1`.
    pub fn identity(taxon_count: usize) -> Self {
        Self {
            taxa: (0..taxon_count).collect(),
        }
    }

    /// Order from an explicit permutation of `0..taxa.len()`.
    pub fn from_taxa(taxa: Vec<Taxon>) -> Result<Self> {
        let n = taxa.len();
        let mut seen = vec![false; n];
        for &taxon in &taxa {
            if taxon >= n {
                return Err(Error::TaxonOutOfRange {
                    taxon,
                    taxon_count: n,
                });
            }
            if std::mem::replace(&mut seen[taxon], true) {
                return Err(Error::DuplicateTaxon { taxon });
            }
        }
        Ok(Self { taxa })
    }

    /// Rebuild the order encoded by `v`.
    ///
    /// Taxa are inserted greedily one at a time; afterwards every stored
    /// triple is checked against the result, since a successful greedy
    /// pass alone does not prove the vector is cyclic.
    pub fn from_vector(v: &DenseVector) -> Result<Self> {
        let n = v.taxon_count();
        let mut order = CyclicOrder {
            taxa: Vec::with_capacity(n),
        };
        for taxon in 0..n {
            if !order.add_taxon(taxon, v) {
                tracing::debug!(taxon, "greedy insertion failed");
                return Err(Error::NotCyclic(NotCyclicCause::Insertion { taxon }));
            }
        }
        if let Some(t) = order.consistent_with_vector(v) {
            tracing::debug!(%t, "order contradicts vector");
            return Err(Error::NotCyclic(NotCyclicCause::Violation(t)));
        }
        Ok(order)
    }

    /// Insert `taxon` into the unique gap that agrees with `v` on every
    /// triple `(taxa[0], taxon, x)`. Returns `false` when no gap does.
    pub fn add_taxon(&mut self, taxon: Taxon, v: &DenseVector) -> bool {
        if self.taxa.len() < 2 {
            self.taxa.push(taxon);
            return true;
        }
        let first = self.taxa[0];
        let mut gap = self.taxa.len();
        for j in 1..self.taxa.len() {
            let earlier = v.get(Triple::new(first, taxon, self.taxa[j]));
            if earlier && gap == self.taxa.len() {
                gap = j;
            } else if !earlier && gap != self.taxa.len() {
                // "after taxa[j]" following an earlier "before"
                return false;
            }
        }
        self.taxa.insert(gap, taxon);
        true
    }

    /// First stored triple, in lexicographic order, on which `v` and this
    /// order disagree.
    pub fn consistent_with_vector(&self, v: &DenseVector) -> Option<Triple> {
        let positions = self.positions();
        let index = v.index();
        (0..index.len()).map(|k| (k, index.triple(k))).find_map(|(k, t)| {
            (v.get_index(k) != ascending_positions(&positions, t)).then_some(t)
        })
    }

    /// The cocycle vector of this order.
    pub fn determine_vector(&self) -> DenseVector {
        let positions = self.positions();
        let mut v = DenseVector::new(self.taxa.len());
        let index = v.index().clone();
        for k in 0..index.len() {
            v.set_index(k, ascending_positions(&positions, index.triple(k)));
        }
        v
    }

    /// Reverse the positions `begin..end` in place.
    pub fn reverse(&mut self, begin: usize, end: usize) {
        self.taxa[begin..end].reverse();
    }

    /// Copy with the positions `begin..end` reversed.
    pub fn reversed(&self, begin: usize, end: usize) -> CyclicOrder {
        let mut copy = self.clone();
        copy.reverse(begin, end);
        copy
    }

    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    pub fn taxa(&self) -> &[Taxon] {
        &self.taxa
    }

    pub fn get(&self, position: usize) -> Taxon {
        self.taxa[position]
    }

    /// `positions()[taxon]` is the position of `taxon`.
    pub fn positions(&self) -> Vec<usize> {
        let mut positions = vec![0; self.taxa.len()];
        for (p, &taxon) in self.taxa.iter().enumerate() {
            positions[taxon] = p;
        }
        positions
    }
}

fn ascending_positions(positions: &[usize], t: Triple) -> bool {
    let (_, odd) = Triple::new(positions[t.i1], positions[t.i2], positions[t.i3]).ascending();
    !odd
}

impl fmt::Display for CyclicOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (p, taxon) in self.taxa.iter().enumerate() {
            if p > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{taxon}")?;
        }
        Ok(())
    }
}
