use std::fmt;
use std::sync::Arc;

use crate::cyclic_order::CyclicOrder;
use crate::index::TripleIndex;
use crate::vector::TripleVector;
use crate::{Result, Taxon};

const WORD_BITS: usize = u64::BITS as usize;

/// Bit-packed cocycle vector, one bit per base triple in smart-index order.
#[derive(Clone)]
pub struct DenseVector {
    words: Vec<u64>,
    index: Arc<TripleIndex>,
}

impl DenseVector {
    pub fn new(taxon_count: usize) -> Self {
        let index = TripleIndex::for_taxa(taxon_count);
        Self {
            words: vec![0; index.len().div_ceil(WORD_BITS)],
            index,
        }
    }

    /// Number of stored columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &Arc<TripleIndex> {
        &self.index
    }

    #[inline]
    pub fn get_index(&self, k: usize) -> bool {
        (self.words[k / WORD_BITS] >> (k % WORD_BITS)) & 1 == 1
    }

    #[inline]
    pub fn set_index(&mut self, k: usize, value: bool) {
        let mask = 1u64 << (k % WORD_BITS);
        if value {
            self.words[k / WORD_BITS] |= mask;
        } else {
            self.words[k / WORD_BITS] &= !mask;
        }
    }

    /// XOR `other` into `self`, skipping the words before `start_index`,
    /// which the caller knows to be zero in `other`.
    pub fn add_vector(&mut self, other: &DenseVector, start_index: usize) {
        debug_assert_eq!(self.words.len(), other.words.len());
        let first = start_index / WORD_BITS;
        for (w, o) in self.words[first..].iter_mut().zip(&other.words[first..]) {
            *w ^= *o;
        }
    }

    /// Inner product mod 2.
    pub fn dot(&self, other: &DenseVector) -> bool {
        let ones: u32 = self
            .words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a & b).count_ones())
            .sum();
        ones % 2 == 1
    }

    /// Smallest set column, if any.
    pub fn first_one(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * WORD_BITS + w.trailing_zeros() as usize)
    }

    /// Set columns in increasing order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&k| self.get_index(k))
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// The cyclic order this vector encodes.
    ///
    /// Fails with [`crate::Error::NotCyclic`] when no circular order
    /// realizes the vector.
    pub fn determine_order(&self) -> Result<CyclicOrder> {
        CyclicOrder::from_vector(self)
    }
}

impl TripleVector for DenseVector {
    fn zeros(taxon_count: usize) -> Self {
        Self::new(taxon_count)
    }

    fn taxon_count(&self) -> usize {
        self.index.taxon_count()
    }

    fn stored(&self, i: Taxon, j: Taxon) -> bool {
        self.get_index(self.index.smart(i, j))
    }

    fn set_stored(&mut self, i: Taxon, j: Taxon, value: bool) {
        let k = self.index.smart(i, j);
        self.set_index(k, value);
    }

    fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }
}

impl PartialEq for DenseVector {
    fn eq(&self, other: &Self) -> bool {
        self.taxon_count() == other.taxon_count() && self.words == other.words
    }
}

impl Eq for DenseVector {}

impl fmt::Debug for DenseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DenseVector({}; {})", self.taxon_count(), self)
    }
}

impl fmt::Display for DenseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for k in 0..self.len() {
            f.write_str(if self.get_index(k) { "1" } else { "0" })?;
        }
        Ok(())
    }
}
