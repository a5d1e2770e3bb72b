use std::collections::BTreeSet;
use std::fmt;

use rand::Rng;

use crate::network::{normalized_side, Level1Network};
use crate::quartet::Quartet;
use crate::{Error, Result, Taxon};

/// Rooted binary tree; read unrooted, its bipartitions are the splits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tree {
    Leaf(Taxon),
    Node(Box<Tree>, Box<Tree>),
}

impl Tree {
    pub fn node(left: Tree, right: Tree) -> Tree {
        Tree::Node(Box::new(left), Box::new(right))
    }

    /// Random tree on `0..taxon_count`: each taxon goes to either side with
    /// probability 1/2, redrawing while a side is empty.
    pub fn random<R: Rng + ?Sized>(taxon_count: usize, rng: &mut R) -> Result<Tree> {
        if taxon_count == 0 {
            return Err(Error::TooFewTaxa { taxon_count });
        }
        let taxa: Vec<Taxon> = (0..taxon_count).collect();
        Ok(Self::random_over(&taxa, rng))
    }

    fn random_over<R: Rng + ?Sized>(taxa: &[Taxon], rng: &mut R) -> Tree {
        if let [only] = taxa {
            return Tree::Leaf(*only);
        }
        loop {
            let (left, right): (Vec<Taxon>, Vec<Taxon>) =
                taxa.iter().partition(|_| rng.gen_bool(0.5));
            if !left.is_empty() && !right.is_empty() {
                return Tree::node(Self::random_over(&left, rng), Self::random_over(&right, rng));
            }
        }
    }

    /// Taxa, left to right.
    pub fn leaves(&self) -> Vec<Taxon> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            match tree {
                Tree::Leaf(t) => out.push(*t),
                Tree::Node(a, b) => {
                    stack.push(b);
                    stack.push(a);
                }
            }
        }
        out
    }

    /// Leaf sets of all proper subtrees.
    fn clusters(&self) -> Vec<Vec<Taxon>> {
        fn walk(tree: &Tree, out: &mut Vec<Vec<Taxon>>) -> Vec<Taxon> {
            match tree {
                Tree::Leaf(t) => vec![*t],
                Tree::Node(a, b) => {
                    let left = walk(a, out);
                    let right = walk(b, out);
                    out.push(left.clone());
                    out.push(right.clone());
                    let mut all = left;
                    all.extend(right);
                    all
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    /// Non-trivial bipartitions, each given by its side without taxon 0.
    /// Two trees on the same taxa are equal as unrooted trees iff their
    /// split sets are.
    pub fn splits(&self) -> BTreeSet<Vec<Taxon>> {
        let n = self.leaves().len();
        self.clusters()
            .into_iter()
            .filter_map(|cluster| normalized_side(cluster, n))
            .collect()
    }

    /// The topology the tree displays on four of its taxa.
    pub fn quartet_on(&self, taxa: [Taxon; 4]) -> Option<Quartet> {
        quartet_from_clusters(&self.clusters(), taxa)
    }

    /// The displayed quartet of every four-taxon subset, in lexicographic
    /// order of the subsets.
    pub fn quartets(&self) -> Vec<Quartet> {
        let clusters = self.clusters();
        let mut taxa = self.leaves();
        taxa.sort_unstable();
        let n = taxa.len();
        let mut out = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                for k in (j + 1)..n {
                    for l in (k + 1)..n {
                        let four = [taxa[i], taxa[j], taxa[k], taxa[l]];
                        if let Some(q) = quartet_from_clusters(&clusters, four) {
                            out.push(q);
                        }
                    }
                }
            }
        }
        out
    }

    pub fn to_network(&self) -> Level1Network {
        Level1Network::from(self)
    }
}

/// A cluster holding exactly two of the four taxa separates them from the
/// other two.
fn quartet_from_clusters(clusters: &[Vec<Taxon>], taxa: [Taxon; 4]) -> Option<Quartet> {
    clusters.iter().find_map(|cluster| {
        let (inside, outside): (Vec<Taxon>, Vec<Taxon>) =
            taxa.iter().partition(|t| cluster.contains(*t));
        match (inside.as_slice(), outside.as_slice()) {
            ([a, b], [c, d]) => Some(Quartet::new(*a, *b, *c, *d).canonical()),
            _ => None,
        }
    })
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tree::Leaf(t) => write!(f, "{t}"),
            Tree::Node(a, b) => write!(f, "({a},{b})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample() -> Tree {
        // ((0,1),(2,(3,4)))
        Tree::node(
            Tree::node(Tree::Leaf(0), Tree::Leaf(1)),
            Tree::node(Tree::Leaf(2), Tree::node(Tree::Leaf(3), Tree::Leaf(4))),
        )
    }

    #[test]
    fn test_display_and_leaves() {
        let tree = sample();
        assert_eq!(tree.to_string(), "((0,1),(2,(3,4)))");
        assert_eq!(tree.leaves(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_splits_ignore_the_root() {
        let tree = sample();
        let expected: BTreeSet<Vec<Taxon>> = [vec![2, 3, 4], vec![3, 4]].into_iter().collect();
        assert_eq!(tree.splits(), expected);

        // rerooting on the edge to 4 gives the same unrooted tree
        let rerooted = Tree::node(
            Tree::node(
                Tree::node(Tree::Leaf(0), Tree::Leaf(1)),
                Tree::Leaf(2),
            ),
            Tree::node(Tree::Leaf(3), Tree::Leaf(4)),
        );
        assert_eq!(rerooted.splits(), expected);
    }

    #[test]
    fn test_quartets() {
        let tree = sample();
        let quartets = tree.quartets();
        assert_eq!(
            quartets,
            vec![
                Quartet::new(0, 1, 2, 3),
                Quartet::new(0, 1, 2, 4),
                Quartet::new(0, 1, 3, 4),
                Quartet::new(0, 2, 3, 4),
                Quartet::new(1, 2, 3, 4),
            ]
        );
        assert_eq!(tree.quartet_on([4, 0, 3, 1]), Some(Quartet::new(0, 1, 3, 4)));
    }

    #[test]
    fn test_random_tree_is_seeded() {
        let a = Tree::random(12, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = Tree::random(12, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
        let mut leaves = a.leaves();
        leaves.sort_unstable();
        assert_eq!(leaves, (0..12).collect::<Vec<_>>());
        assert_eq!(a.splits().len(), 12 - 3);
        assert_eq!(a.quartets().len(), 495);
    }

    #[test]
    fn test_random_needs_a_taxon() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            Tree::random(0, &mut rng),
            Err(Error::TooFewTaxa { taxon_count: 0 })
        ));
        assert_eq!(Tree::random(1, &mut rng).unwrap(), Tree::Leaf(0));
    }
}
