use std::fmt;

use crate::Taxon;

/// An index into the cocycle space: three distinct taxa.
///
/// The derived ordering is lexicographic, which is the column order used by
/// the matrix engines once a triple has been made ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub i1: Taxon,
    pub i2: Taxon,
    pub i3: Taxon,
}

impl Triple {
    pub const fn new(i1: Taxon, i2: Taxon, i3: Taxon) -> Self {
        Self { i1, i2, i3 }
    }

    /// Sort the components ascending with at most three swaps.
    ///
    /// Returns `true` when an odd number of swaps was needed; that bit is
    /// the correction applied when reading a cocycle value through a
    /// non-ascending triple.
    pub fn make_ascending(&mut self) -> bool {
        let mut odd = false;
        if self.i1 > self.i2 {
            std::mem::swap(&mut self.i1, &mut self.i2);
            odd = !odd;
        }
        if self.i2 > self.i3 {
            std::mem::swap(&mut self.i2, &mut self.i3);
            odd = !odd;
        }
        if self.i1 > self.i2 {
            std::mem::swap(&mut self.i1, &mut self.i2);
            odd = !odd;
        }
        odd
    }

    /// Like [`Triple::make_ascending`], but assumes `i1` is already the
    /// smallest component and only orders the other two.
    pub fn make_ascending_alt(&mut self) -> bool {
        debug_assert!(self.i1 < self.i2 && self.i1 < self.i3);
        if self.i2 > self.i3 {
            std::mem::swap(&mut self.i2, &mut self.i3);
            true
        } else {
            false
        }
    }

    /// Ascending copy plus the parity of the permutation that produced it.
    pub fn ascending(mut self) -> (Self, bool) {
        let odd = self.make_ascending();
        (self, odd)
    }

    pub fn is_ascending(&self) -> bool {
        self.i1 < self.i2 && self.i2 < self.i3
    }

    pub fn contains(&self, taxon: Taxon) -> bool {
        self.i1 == taxon || self.i2 == taxon || self.i3 == taxon
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.i1, self.i2, self.i3)
    }
}
