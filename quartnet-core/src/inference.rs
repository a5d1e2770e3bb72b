//! Quartet inference from precomputed rules.
//!
//! A rule states that a set of input quartet patterns implies one output
//! pattern; pattern taxa are small placeholders. To resolve a witness the
//! output pattern is laid onto the witness taxa, and the inputs must then
//! be found among the held quartets under some binding of the remaining
//! placeholders.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::matrix::Gf2Matrix;
use crate::quartet::Quartet;
use crate::witness::Witness;
use crate::{Error, NotCyclicCause, Result, Taxon};

/// The 24 orderings of four positions, lexicographic.
const PERMUTATIONS: [[usize; 4]; 24] = [
    [0, 1, 2, 3],
    [0, 1, 3, 2],
    [0, 2, 1, 3],
    [0, 2, 3, 1],
    [0, 3, 1, 2],
    [0, 3, 2, 1],
    [1, 0, 2, 3],
    [1, 0, 3, 2],
    [1, 2, 0, 3],
    [1, 2, 3, 0],
    [1, 3, 0, 2],
    [1, 3, 2, 0],
    [2, 0, 1, 3],
    [2, 0, 3, 1],
    [2, 1, 0, 3],
    [2, 1, 3, 0],
    [2, 3, 0, 1],
    [2, 3, 1, 0],
    [3, 0, 1, 2],
    [3, 0, 2, 1],
    [3, 1, 0, 2],
    [3, 1, 2, 0],
    [3, 2, 0, 1],
    [3, 2, 1, 0],
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRule {
    inputs: Vec<Quartet>,
    output: Quartet,
    pattern_size: usize,
    total_overlap: usize,
}

impl InferenceRule {
    /// Inputs are stored by decreasing score, where an input scores its
    /// overlap with every input (itself included) plus five times the
    /// input count times its overlap with the output. Well-connected
    /// inputs come first so the search binds many placeholders early.
    pub fn new(inputs: Vec<Quartet>, output: Quartet) -> Self {
        let weight = 5 * inputs.len();
        let mut scored: Vec<(usize, Quartet)> = inputs
            .iter()
            .map(|q| {
                let score: usize = inputs.iter().map(|other| q.overlap(other)).sum::<usize>()
                    + weight * q.overlap(&output);
                (score, *q)
            })
            .collect();
        scored.sort_by_key(|&(score, _)| Reverse(score));
        let pattern_size = inputs
            .iter()
            .chain(std::iter::once(&output))
            .map(Quartet::max_taxon)
            .max()
            .map_or(0, |m| m + 1);
        Self {
            total_overlap: scored.iter().map(|&(score, _)| score).sum(),
            inputs: scored.into_iter().map(|(_, q)| q).collect(),
            output,
            pattern_size,
        }
    }

    pub fn inputs(&self) -> &[Quartet] {
        &self.inputs
    }

    pub fn output(&self) -> Quartet {
        self.output
    }

    /// Number of placeholders, the largest one plus one.
    pub fn pattern_size(&self) -> usize {
        self.pattern_size
    }

    pub fn total_overlap(&self) -> usize {
        self.total_overlap
    }

    /// Try to resolve `witness` with this rule against `held`. Returns the
    /// concrete output quartet of the first match.
    ///
    /// Witness orderings are tried in lexicographic order; inputs are
    /// matched depth-first in stored order, each against the held quartets
    /// in order and their eight relabelings in [`Quartet::relabelings`]
    /// order.
    pub fn apply(&self, held: &[Quartet], witness: &Witness) -> Option<Quartet> {
        let taxa = witness.taxa();
        let targets = self.output.taxa();
        PERMUTATIONS.iter().find_map(|perm| {
            let mut matcher = PatternMatcher::new(self.pattern_size);
            for (slot, &p) in perm.iter().enumerate() {
                if !matcher.bind(targets[slot], taxa[p]) {
                    return None;
                }
            }
            matcher
                .search(&self.inputs, held)
                .then(|| self.output.map(|p| matcher.forward[p].unwrap_or(p)).canonical())
        })
    }
}

impl fmt::Display for InferenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (k, q) in self.inputs.iter().enumerate() {
            if k > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{q}")?;
        }
        write!(f, "] -> [{}]", self.output)
    }
}

/// Order rules by input count, then by decreasing total overlap.
pub fn sort_rules(rules: &mut [InferenceRule]) {
    rules.sort_by_key(rule_order);
}

fn rule_order(rule: &InferenceRule) -> (usize, Reverse<usize>) {
    (rule.inputs.len(), Reverse(rule.total_overlap))
}

/// Partial binding of placeholders to taxa, kept injective through the
/// backward map.
struct PatternMatcher {
    forward: Vec<Option<Taxon>>,
    backward: HashMap<Taxon, usize>,
}

#[derive(Default)]
struct Frame {
    candidate: usize,
    bound: Vec<usize>,
}

impl PatternMatcher {
    fn new(pattern_size: usize) -> Self {
        Self {
            forward: vec![None; pattern_size],
            backward: HashMap::new(),
        }
    }

    /// Bind `placeholder` to `taxon` unless either is taken otherwise.
    fn bind(&mut self, placeholder: usize, taxon: Taxon) -> bool {
        match self.forward[placeholder] {
            Some(bound) => bound == taxon,
            None if self.backward.contains_key(&taxon) => false,
            None => {
                self.forward[placeholder] = Some(taxon);
                self.backward.insert(taxon, placeholder);
                true
            }
        }
    }

    fn unbind(&mut self, placeholder: usize) {
        if let Some(taxon) = self.forward[placeholder].take() {
            self.backward.remove(&taxon);
        }
    }

    /// Bind every position of `pattern` onto `concrete`, recording the
    /// newly bound placeholders in `bound`.
    fn bind_quartet(&mut self, pattern: &Quartet, concrete: &Quartet, bound: &mut Vec<usize>) -> bool {
        for (p, c) in pattern.taxa().into_iter().zip(concrete.taxa()) {
            let fresh = self.forward[p].is_none();
            if !self.bind(p, c) {
                return false;
            }
            if fresh {
                bound.push(p);
            }
        }
        true
    }

    /// Depth-first search for a binding under which every pattern is held.
    /// Frame `d` enumerates candidates `held × 8 relabelings` for pattern
    /// `d`; on success the bindings are left in place.
    fn search(&mut self, patterns: &[Quartet], held: &[Quartet]) -> bool {
        if patterns.is_empty() {
            return true;
        }
        let relabelings: Vec<[Quartet; 8]> = patterns.iter().map(Quartet::relabelings).collect();
        let candidates = held.len() * 8;
        let mut frames = vec![Frame::default()];
        while let Some(depth) = frames.len().checked_sub(1) {
            let frame = &mut frames[depth];
            let undo = std::mem::take(&mut frame.bound);
            let c = frame.candidate;
            frame.candidate += 1;
            for p in undo {
                self.unbind(p);
            }
            if c == candidates {
                frames.pop();
                continue;
            }
            let mut bound = Vec::new();
            let ok = self.bind_quartet(&relabelings[depth][c % 8], &held[c / 8], &mut bound);
            frames[depth].bound = bound;
            if ok {
                if depth + 1 == patterns.len() {
                    return true;
                }
                frames.push(Frame::default());
            }
        }
        false
    }
}

/// Adds inferred quartets until no witness is left.
pub struct WitnessResolver<'r> {
    rules: Vec<&'r InferenceRule>,
}

impl<'r> WitnessResolver<'r> {
    /// Use the rules with at most `max_inputs` inputs, in rule order.
    pub fn new(rules: &'r [InferenceRule], max_inputs: usize) -> Self {
        let mut rules: Vec<&InferenceRule> =
            rules.iter().filter(|r| r.inputs.len() <= max_inputs).collect();
        rules.sort_by_key(|r| rule_order(r));
        Self { rules }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Run rules against the open witnesses of `matrix`, adding every new
    /// output to `quartets` and to the matrix. After a round that adds
    /// anything the matrix is reduced, the witnesses recomputed and the
    /// rules restarted from the first. Returns the added quartets.
    ///
    /// Fails with `NotCyclic` if witnesses remain once no rule applies.
    pub fn resolve(
        &self,
        matrix: &mut dyn Gf2Matrix,
        quartets: &mut Vec<Quartet>,
    ) -> Result<Vec<Quartet>> {
        if !matrix.is_reduced() {
            matrix.row_reduce();
        }
        let mut witnesses = matrix.find_witnesses()?;
        let mut held: HashSet<Quartet> = quartets.iter().copied().collect();
        let mut inferred = Vec::new();
        let mut r = 0;
        while !witnesses.is_empty() && r < self.rules.len() {
            let rule = self.rules[r];
            let mut added = Vec::new();
            for witness in &witnesses {
                if let Some(q) = rule.apply(quartets.as_slice(), witness) {
                    if held.insert(q) {
                        tracing::trace!(%witness, quartet = %q, %rule, "quartet inferred");
                        added.push(q);
                    }
                }
            }
            if added.is_empty() {
                r += 1;
                continue;
            }
            matrix.add_quartets(&added)?;
            matrix.row_reduce();
            if !matrix.is_consistent()? {
                return Err(Error::MatrixInconsistent);
            }
            quartets.extend_from_slice(&added);
            inferred.extend(added);
            witnesses = matrix.find_witnesses()?;
            tracing::debug!(
                inferred = inferred.len(),
                witnesses = witnesses.len(),
                "inference round finished"
            );
            r = 0;
        }
        if !witnesses.is_empty() {
            tracing::warn!(
                witnesses = witnesses.len(),
                rules = self.rules.len(),
                "inference exhausted with open witnesses"
            );
            return Err(Error::NotCyclic(NotCyclicCause::OpenWitnesses {
                count: witnesses.len(),
            }));
        }
        Ok(inferred)
    }
}
