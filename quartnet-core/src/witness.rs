use std::fmt;

use crate::Taxon;

/// Four taxa on which the quartet data leaves the topology open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Witness {
    taxa: [Taxon; 4],
}

impl Witness {
    pub fn new(mut taxa: [Taxon; 4]) -> Self {
        taxa.sort_unstable();
        Self { taxa }
    }

    /// The taxa in ascending order.
    pub fn taxa(&self) -> [Taxon; 4] {
        self.taxa
    }

    pub fn contains(&self, taxon: Taxon) -> bool {
        self.taxa.contains(&taxon)
    }

    pub fn shared(&self, other: &Witness) -> usize {
        self.taxa.iter().filter(|&&t| other.contains(t)).count()
    }

    /// Two witnesses sharing three taxa describe overlapping ambiguities.
    pub fn is_pair(&self, other: &Witness) -> bool {
        self.shared(other) == 3
    }
}

impl fmt::Display for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.taxa;
        write!(f, "{{{a}, {b}, {c}, {d}}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_witness_is_sorted() {
        let w = Witness::new([7, 2, 5, 0]);
        assert_eq!(w.taxa(), [0, 2, 5, 7]);
        assert_eq!(w.to_string(), "{0, 2, 5, 7}");
    }

    #[test]
    fn test_pairs_share_three_taxa() {
        let a = Witness::new([0, 1, 2, 3]);
        let b = Witness::new([1, 2, 3, 4]);
        let c = Witness::new([2, 3, 4, 5]);
        assert!(a.is_pair(&b));
        assert!(!a.is_pair(&c));
        assert!(!a.is_pair(&a));
    }
}
