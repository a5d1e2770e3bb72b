//! Conversion between compressed ("smart") column indices and the full
//! `n × n` ("stupid") index of base triples `(0, i, j)`.
//!
//! Tables depend only on the taxon count, so they are built once per count
//! and handed out as shared `Arc`s.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::triple::Triple;
use crate::Taxon;

static TABLES: OnceLock<Mutex<HashMap<usize, Arc<TripleIndex>>>> = OnceLock::new();

/// Immutable smart/stupid index table for one taxon count.
#[derive(Debug)]
pub struct TripleIndex {
    taxon_count: usize,
    smart_to_stupid: Vec<usize>,
    stupid_to_smart: Vec<Option<usize>>,
}

impl TripleIndex {
    /// Shared table for `taxon_count` taxa, built on first use.
    pub fn for_taxa(taxon_count: usize) -> Arc<TripleIndex> {
        let tables = TABLES.get_or_init(|| Mutex::new(HashMap::new()));
        let mut tables = tables.lock();
        tables
            .entry(taxon_count)
            .or_insert_with(|| {
                tracing::trace!(taxon_count, "building triple index table");
                Arc::new(TripleIndex::build(taxon_count))
            })
            .clone()
    }

    fn build(taxon_count: usize) -> Self {
        let n = taxon_count;
        let mut smart_to_stupid = Vec::with_capacity(column_count(n));
        let mut stupid_to_smart = vec![None; n * n];
        for i in 1..n {
            for j in (i + 1)..n {
                stupid_to_smart[n * i + j] = Some(smart_to_stupid.len());
                smart_to_stupid.push(n * i + j);
            }
        }
        Self {
            taxon_count,
            smart_to_stupid,
            stupid_to_smart,
        }
    }

    pub fn taxon_count(&self) -> usize {
        self.taxon_count
    }

    /// Number of stored columns, `(n-1)(n-2)/2`.
    pub fn len(&self) -> usize {
        self.smart_to_stupid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.smart_to_stupid.is_empty()
    }

    /// Smart index of the base triple `(0, i, j)`; requires `0 < i < j < n`.
    #[inline]
    pub fn smart(&self, i: Taxon, j: Taxon) -> usize {
        debug_assert!(0 < i && i < j && j < self.taxon_count);
        match self.stupid_to_smart[self.taxon_count * i + j] {
            Some(k) => k,
            None => unreachable!("({i}, {j}) is not a base pair"),
        }
    }

    /// The base triple stored at smart index `k`.
    #[inline]
    pub fn triple(&self, k: usize) -> Triple {
        let stupid = self.smart_to_stupid[k];
        Triple::new(0, stupid / self.taxon_count, stupid % self.taxon_count)
    }

    /// Smart index of an ascending triple with `i1 == 0`.
    #[inline]
    pub fn column(&self, t: Triple) -> usize {
        debug_assert_eq!(t.i1, 0);
        self.smart(t.i2, t.i3)
    }
}

/// `(n-1)(n-2)/2`, zero for fewer than three taxa.
pub fn column_count(taxon_count: usize) -> usize {
    if taxon_count < 3 {
        0
    } else {
        (taxon_count - 1) * (taxon_count - 2) / 2
    }
}
