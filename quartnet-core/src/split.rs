//! Splits of a cyclic order and the two split finders built on them.
//!
//! A range `[start, end)` of the order is a split when reversing it gives
//! an order whose cocycle still satisfies every equation of the reduced
//! system. The level-1 finder accepts crossing splits and assembles a
//! [`Level1Network`]; the tree finder insists on a laminar split family
//! and assembles a binary [`Tree`].

use std::fmt;

use crate::cyclic_order::CyclicOrder;
use crate::matrix::Gf2Matrix;
use crate::network::Level1Network;
use crate::tree::Tree;
use crate::{Error, NotCyclicCause, Result, Taxon};

/// A contiguous range `[start, end)` of positions on a cyclic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Split {
    pub start: usize,
    pub end: usize,
}

impl Split {
    /// Range between two cut positions, given in either order.
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// One side has fewer than two taxa.
    pub fn is_trivial(&self, taxon_count: usize) -> bool {
        self.len() < 2 || taxon_count - self.len() < 2
    }

    /// The ranges overlap without either containing the other.
    pub fn crosses(&self, other: &Split) -> bool {
        (self.start < other.start && other.start < self.end && self.end < other.end)
            || (other.start < self.start && self.start < other.end && other.end < self.end)
    }

    /// `other` lies within `self`.
    pub fn contains(&self, other: &Split) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The taxa on the range side.
    pub fn members<'a>(&self, order: &'a CyclicOrder) -> &'a [Taxon] {
        &order.taxa()[self.start..self.end]
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Whether reversing `[start, end)` of `order` keeps the order's cocycle
/// a solution of `matrix`. The bounds may be given in either order.
pub fn is_split(order: &CyclicOrder, matrix: &dyn Gf2Matrix, start: usize, end: usize) -> bool {
    let split = Split::new(start, end);
    let flipped = order.reversed(split.start, split.end);
    matrix.conforms(&flipped.determine_vector())
}

/// All non-trivial splits of `order`, by increasing start then end.
fn enumerate_splits(order: &CyclicOrder, matrix: &dyn Gf2Matrix) -> Vec<Split> {
    let n = order.len();
    let mut splits = Vec::new();
    for start in 0..n {
        for end in (start + 1)..n {
            let split = Split { start, end };
            if !split.is_trivial(n) && is_split(order, matrix, start, end) {
                tracing::trace!(%split, "split found");
                splits.push(split);
            }
        }
    }
    splits
}

/// Split finder for level-1 networks.
pub struct Level1SplitFinder<'a> {
    order: &'a CyclicOrder,
    matrix: &'a dyn Gf2Matrix,
}

impl<'a> Level1SplitFinder<'a> {
    pub fn new(order: &'a CyclicOrder, matrix: &'a dyn Gf2Matrix) -> Self {
        Self { order, matrix }
    }

    /// Every non-trivial split, crossing ones included.
    pub fn find_list_of_splits(&self) -> Vec<Split> {
        enumerate_splits(self.order, self.matrix)
    }

    /// Start from one circle holding every taxon in order, group the
    /// members of each split under a new node, then collapse circles that
    /// are really edges.
    pub fn reconstruct_network(&self) -> Result<Level1Network> {
        let splits = self.find_list_of_splits();
        tracing::debug!(splits = splits.len(), "assembling level-1 network");
        self.assemble(&splits)
    }

    /// Network from an already enumerated split list.
    pub fn assemble(&self, splits: &[Split]) -> Result<Level1Network> {
        let mut network = Level1Network::circle(self.order.taxa());
        for split in splits {
            network.apply_split(self.order, *split)?;
        }
        network.collapse_trivial_circles();
        Ok(network)
    }
}

/// Split finder for trees: all splits must be pairwise non-crossing.
pub struct TreeSplitFinder<'a> {
    order: &'a CyclicOrder,
    matrix: &'a dyn Gf2Matrix,
}

impl<'a> TreeSplitFinder<'a> {
    pub fn new(order: &'a CyclicOrder, matrix: &'a dyn Gf2Matrix) -> Self {
        Self { order, matrix }
    }

    /// Every non-trivial split; crossing splits mean the data does not
    /// describe a tree.
    pub fn find_list_of_splits(&self) -> Result<Vec<Split>> {
        let splits = enumerate_splits(self.order, self.matrix);
        for (k, first) in splits.iter().enumerate() {
            if let Some(second) = splits[k + 1..].iter().find(|s| first.crosses(s)) {
                return Err(Error::NotCyclic(NotCyclicCause::CrossingSplits {
                    first: *first,
                    second: *second,
                }));
            }
        }
        Ok(splits)
    }

    /// Check the split family is complete (`n - 3` splits, as in a binary
    /// tree), then build the tree by direct recursion.
    pub fn find_splits(&self) -> Result<Tree> {
        let splits = self.find_list_of_splits()?;
        self.check_split_count(&splits)?;
        self.reconstruct_recursive()
    }

    /// Same check as [`TreeSplitFinder::find_splits`], then build from the
    /// enumerated list.
    pub fn find_splits_from_list(&self) -> Result<Tree> {
        let splits = self.find_list_of_splits()?;
        self.check_split_count(&splits)?;
        self.tree_from_splits(&splits)
    }

    /// A binary tree on `n` taxa has `n - 3` non-trivial splits.
    pub fn check_split_count(&self, splits: &[Split]) -> Result<()> {
        let expected = self.order.len().saturating_sub(3);
        if splits.len() != expected {
            return Err(Error::NotCyclic(NotCyclicCause::SplitCount {
                expected,
                found: splits.len(),
            }));
        }
        Ok(())
    }

    /// Recurse over the whole order, cutting each range at the first
    /// position where both halves are splits.
    pub fn reconstruct_recursive(&self) -> Result<Tree> {
        self.recursive_range(0, self.order.len())
    }

    fn recursive_range(&self, start: usize, end: usize) -> Result<Tree> {
        match end - start {
            0 => Err(Error::NoSplitFound { start, end }),
            1 => Ok(Tree::Leaf(self.order.get(start))),
            2 => Ok(Tree::node(
                Tree::Leaf(self.order.get(start)),
                Tree::Leaf(self.order.get(start + 1)),
            )),
            _ => {
                let cut = ((start + 1)..end)
                    .find(|&i| {
                        is_split(self.order, self.matrix, start, i)
                            && is_split(self.order, self.matrix, i, end)
                    })
                    .ok_or(Error::NoSplitFound { start, end })?;
                Ok(Tree::node(
                    self.recursive_range(start, cut)?,
                    self.recursive_range(cut, end)?,
                ))
            }
        }
    }

    /// Build from a non-crossing split list: the taxon at the last position
    /// hangs off the root, and every range is cut by the widest unused
    /// split inside it.
    pub fn tree_from_splits(&self, splits: &[Split]) -> Result<Tree> {
        let n = self.order.len();
        if n < 2 {
            return Err(Error::NoSplitFound { start: 0, end: n });
        }
        let mut used = vec![false; splits.len()];
        let rest = self.from_splits_range(splits, &mut used, 0, n - 1)?;
        Ok(Tree::node(Tree::Leaf(self.order.get(n - 1)), rest))
    }

    fn from_splits_range(
        &self,
        splits: &[Split],
        used: &mut [bool],
        start: usize,
        end: usize,
    ) -> Result<Tree> {
        match end - start {
            1 => return Ok(Tree::Leaf(self.order.get(start))),
            2 => {
                return Ok(Tree::node(
                    Tree::Leaf(self.order.get(start)),
                    Tree::Leaf(self.order.get(start + 1)),
                ))
            }
            _ => {}
        }
        let range = Split { start, end };
        let mut widest: Option<usize> = None;
        for (k, split) in splits.iter().enumerate() {
            if used[k] || *split == range || !range.contains(split) {
                continue;
            }
            if widest.map_or(true, |w| split.len() > splits[w].len()) {
                widest = Some(k);
            }
        }
        let k = widest.ok_or(Error::NoSplitFound { start, end })?;
        used[k] = true;
        let chosen = splits[k];
        let cut = if chosen.start == start {
            chosen.end
        } else if chosen.end == end {
            chosen.start
        } else {
            return Err(Error::NoSplitFound { start, end });
        };
        // the other half is the complementary split of this range
        for (k, split) in splits.iter().enumerate() {
            if *split == (Split { start, end: cut }) || *split == (Split { start: cut, end }) {
                used[k] = true;
            }
        }
        Ok(Tree::node(
            self.from_splits_range(splits, used, start, cut)?,
            self.from_splits_range(splits, used, cut, end)?,
        ))
    }
}
