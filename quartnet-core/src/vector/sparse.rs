use std::cmp::Ordering;
use std::fmt;

use crate::triple::Triple;
use crate::vector::{DenseVector, TripleVector};
use crate::Taxon;

/// Sorted list of the base triples set to 1, plus one result bit.
///
/// Used as a matrix row when the system is large and sparse: adding two
/// rows is a sorted merge in which equal entries cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseVector {
    taxon_count: usize,
    entries: Vec<Triple>,
    result: bool,
}

impl SparseVector {
    pub fn new(taxon_count: usize) -> Self {
        Self {
            taxon_count,
            entries: Vec::new(),
            result: false,
        }
    }

    /// Build from ascending base triples in any order; entries occurring
    /// twice cancel.
    pub fn from_entries(taxon_count: usize, mut entries: Vec<Triple>, result: bool) -> Self {
        debug_assert!(entries.iter().all(|t| t.i1 == 0 && t.is_ascending()));
        entries.sort_unstable();
        let mut kept: Vec<Triple> = Vec::with_capacity(entries.len());
        for t in entries {
            if kept.last() == Some(&t) {
                kept.pop();
            } else {
                kept.push(t);
            }
        }
        Self {
            taxon_count,
            entries: kept,
            result,
        }
    }

    pub fn entries(&self) -> &[Triple] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn result(&self) -> bool {
        self.result
    }

    pub fn set_result(&mut self, result: bool) {
        self.result = result;
    }

    /// Smallest set triple.
    pub fn leading(&self) -> Option<Triple> {
        self.entries.first().copied()
    }

    pub fn contains(&self, t: Triple) -> bool {
        self.entries.binary_search(&t).is_ok()
    }

    /// XOR `other` into `self`, result bits included.
    pub fn add(&mut self, other: &SparseVector) {
        self.add_tracked(other, |_, _| {});
    }

    /// Like [`SparseVector::add`], reporting every entry that appears
    /// (`true`) or cancels (`false`) in `self`.
    pub fn add_tracked(&mut self, other: &SparseVector, mut changed: impl FnMut(Triple, bool)) {
        let mut merged = Vec::with_capacity(self.entries.len() + other.entries.len());
        let (mut a, mut b) = (0, 0);
        while a < self.entries.len() && b < other.entries.len() {
            match self.entries[a].cmp(&other.entries[b]) {
                Ordering::Less => {
                    merged.push(self.entries[a]);
                    a += 1;
                }
                Ordering::Greater => {
                    merged.push(other.entries[b]);
                    changed(other.entries[b], true);
                    b += 1;
                }
                Ordering::Equal => {
                    changed(self.entries[a], false);
                    a += 1;
                    b += 1;
                }
            }
        }
        merged.extend_from_slice(&self.entries[a..]);
        for &t in &other.entries[b..] {
            merged.push(t);
            changed(t, true);
        }
        self.entries = merged;
        self.result ^= other.result;
    }

    /// Inner product mod 2 with a dense vector over the same taxa.
    pub fn dot(&self, other: &DenseVector) -> bool {
        let index = other.index();
        self.entries
            .iter()
            .filter(|&&t| other.get_index(index.column(t)))
            .count()
            % 2
            == 1
    }

    pub fn to_dense(&self) -> DenseVector {
        let mut dense = DenseVector::new(self.taxon_count);
        let index = dense.index().clone();
        for &t in &self.entries {
            dense.set_index(index.column(t), true);
        }
        dense
    }
}

impl TripleVector for SparseVector {
    fn zeros(taxon_count: usize) -> Self {
        Self::new(taxon_count)
    }

    fn taxon_count(&self) -> usize {
        self.taxon_count
    }

    fn stored(&self, i: Taxon, j: Taxon) -> bool {
        self.contains(Triple::new(0, i, j))
    }

    fn set_stored(&mut self, i: Taxon, j: Taxon, value: bool) {
        let t = Triple::new(0, i, j);
        match (self.entries.binary_search(&t), value) {
            (Err(pos), true) => self.entries.insert(pos, t),
            (Ok(pos), false) => {
                self.entries.remove(pos);
            }
            _ => {}
        }
    }

    fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for SparseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, t) in self.entries.iter().enumerate() {
            if k > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "x{}", t)?;
        }
        if self.entries.is_empty() {
            f.write_str("0")?;
        }
        write!(f, " = {}", u8::from(self.result))
    }
}
