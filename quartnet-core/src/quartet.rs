use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::Taxon;

/// A four-taxon topology `left | right`: the two taxa of `left` are
/// separated from the two taxa of `right`.
///
/// Equality and hashing go through [`Quartet::canonical`], so all eight
/// symmetric relabelings of a quartet compare equal.
#[derive(Debug, Clone, Copy)]
pub struct Quartet {
    pub left: [Taxon; 2],
    pub right: [Taxon; 2],
}

impl Quartet {
    pub const fn new(l1: Taxon, l2: Taxon, r1: Taxon, r2: Taxon) -> Self {
        Self {
            left: [l1, l2],
            right: [r1, r2],
        }
    }

    /// Both pairs sorted, and the pair holding the smallest taxon first.
    pub fn canonical(&self) -> Quartet {
        let sorted = |[a, b]: [Taxon; 2]| if a <= b { [a, b] } else { [b, a] };
        let left = sorted(self.left);
        let right = sorted(self.right);
        if left[0] <= right[0] {
            Quartet { left, right }
        } else {
            Quartet {
                left: right,
                right: left,
            }
        }
    }

    /// Taxa in `l1 l2 r1 r2` order.
    pub fn taxa(&self) -> [Taxon; 4] {
        [self.left[0], self.left[1], self.right[0], self.right[1]]
    }

    /// Four distinct taxa.
    pub fn is_valid(&self) -> bool {
        let t = self.taxa();
        (0..4).all(|i| ((i + 1)..4).all(|j| t[i] != t[j]))
    }

    pub fn max_taxon(&self) -> Taxon {
        self.taxa().into_iter().max().unwrap_or_default()
    }

    pub fn contains(&self, taxon: Taxon) -> bool {
        self.taxa().contains(&taxon)
    }

    /// Number of taxa the two quartets share.
    pub fn overlap(&self, other: &Quartet) -> usize {
        self.taxa().iter().filter(|t| other.contains(**t)).count()
    }

    /// The eight relabelings that describe the same topology, in a fixed
    /// order: pair swaps first, then the side swap.
    pub fn relabelings(&self) -> [Quartet; 8] {
        let [l1, l2] = self.left;
        let [r1, r2] = self.right;
        [
            Quartet::new(l1, l2, r1, r2),
            Quartet::new(l2, l1, r1, r2),
            Quartet::new(l1, l2, r2, r1),
            Quartet::new(l2, l1, r2, r1),
            Quartet::new(r1, r2, l1, l2),
            Quartet::new(r2, r1, l1, l2),
            Quartet::new(r1, r2, l2, l1),
            Quartet::new(r2, r1, l2, l1),
        ]
    }

    /// Apply a taxon mapping to every position.
    pub fn map(&self, mut f: impl FnMut(Taxon) -> Taxon) -> Quartet {
        Quartet::new(
            f(self.left[0]),
            f(self.left[1]),
            f(self.right[0]),
            f(self.right[1]),
        )
    }
}

impl PartialEq for Quartet {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.canonical(), other.canonical());
        a.left == b.left && a.right == b.right
    }
}

impl Eq for Quartet {}

impl Hash for Quartet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().taxa().hash(state);
    }
}

impl fmt::Display for Quartet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} {}|{} {})",
            self.left[0], self.left[1], self.right[0], self.right[1]
        )
    }
}

/// Error parsing the `(a b|c d)` text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed quartet `{0}`, expected `(a b|c d)`")]
pub struct QuartetSyntaxError(pub String);

impl FromStr for Quartet {
    type Err = QuartetSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || QuartetSyntaxError(s.to_string());
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(err)?;
        let (left, right) = inner.split_once('|').ok_or_else(err)?;
        let pair = |side: &str| -> Result<[Taxon; 2], QuartetSyntaxError> {
            let taxa = side
                .split_whitespace()
                .map(|t| t.parse::<Taxon>().map_err(|_| err()))
                .collect::<Result<Vec<_>, _>>()?;
            match taxa[..] {
                [a, b] => Ok([a, b]),
                _ => Err(err()),
            }
        };
        Ok(Quartet {
            left: pair(left)?,
            right: pair(right)?,
        })
    }
}
