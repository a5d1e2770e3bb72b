#![allow(dead_code)]
//! Shared integration test utilities.

use std::collections::HashSet;
use std::sync::Once;

use quartnet_core::{Quartet, Tree};
use rand::rngs::StdRng;
use rand::SeedableRng;

static INIT_LOGGING: Once = Once::new();

pub const DEFAULT_TEST_SEED: u64 = 0x5EED_0F_7AA5;

pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A random tree on `taxon_count` taxa and every quartet it displays.
pub fn random_tree_with_quartets(taxon_count: usize, seed: u64) -> (Tree, Vec<Quartet>) {
    let tree = Tree::random(taxon_count, &mut seeded(seed)).expect("at least one taxon");
    let quartets = tree.quartets();
    (tree, quartets)
}

pub fn leaf(taxon: usize) -> Tree {
    Tree::Leaf(taxon)
}

pub fn cherry(a: usize, b: usize) -> Tree {
    Tree::node(leaf(a), leaf(b))
}

/// `((p0, p1), p2), ...`
pub fn caterpillar(parts: &[Tree]) -> Tree {
    let mut iter = parts.iter().cloned();
    let first = iter.next().expect("non-empty caterpillar");
    iter.fold(first, Tree::node)
}

/// Quartets of a level-1 network that is one cycle with the given subtrees
/// hanging off it in order: the union over the caterpillars obtained by
/// cutting the cycle at each of its edges.
pub fn cycle_quartets(parts: &[Tree]) -> Vec<Quartet> {
    let mut seen = HashSet::new();
    let mut quartets = Vec::new();
    for r in 0..parts.len() {
        let rotated: Vec<Tree> = parts[r..].iter().chain(&parts[..r]).cloned().collect();
        for q in caterpillar(&rotated).quartets() {
            if seen.insert(q) {
                quartets.push(q);
            }
        }
    }
    quartets
}
