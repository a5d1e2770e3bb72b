//! Reconstruction of phylogenetic trees and level-1 networks from quartets.
//!
//! Every quartet becomes one affine equation over GF(2) on the cocycle
//! space of taxon triples. A particular solution of the reduced system is
//! turned into a circular ordering of the taxa, and the contiguous ranges
//! of that ordering that can be flipped without breaking any equation are
//! the splits from which the output network is assembled. When the data
//! leaves the ordering ambiguous, precomputed inference rules add quartets
//! until the ambiguity ("witnesses") disappears.

// Algebra subsystem: triples, cocycle vectors, and the GF(2) engines
pub mod index;
pub mod matrix;
pub mod triple;
pub mod vector;

// Combinatorial subsystem: orders, splits, and the output structures
pub mod cyclic_order;
pub mod network;
pub mod quartet;
pub mod split;
pub mod tree;

// Ambiguity handling and the end-to-end driver
pub mod inference;
pub mod pipeline;
pub mod witness;

// Data exchange and quartet-set manipulation
pub mod io;
pub mod sampling;

// Public algebra API
pub use crate::index::TripleIndex;
pub use crate::matrix::{DenseMatrix, Gf2Matrix, SparseMatrix};
pub use crate::triple::Triple;
pub use crate::vector::{DenseVector, SparseVector, TripleVector};

// Public reconstruction API
pub use crate::cyclic_order::CyclicOrder;
pub use crate::inference::{InferenceRule, WitnessResolver};
pub use crate::network::{Level1Network, NetworkGraph, NodeId, NodeKind};
pub use crate::pipeline::{
    MatrixKind, NoProgress, ProgressListener, ReconstructConfig, Reconstruction, Reconstructor,
    Stage, Target, TreeStrategy,
};
pub use crate::quartet::Quartet;
pub use crate::split::{Level1SplitFinder, Split, TreeSplitFinder};
pub use crate::tree::Tree;
pub use crate::witness::Witness;

/// A taxon label in `0..n`.
pub type Taxon = usize;

// ========================================================================
// Errors
// ========================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Some row reduced to `0 = 1`.
    #[error("quartet constraints are mutually inconsistent")]
    MatrixInconsistent,

    /// No circular order realizes the data; recoverable through inference.
    #[error("solution is not cyclic: {0}")]
    NotCyclic(NotCyclicCause),

    #[error("kernel restricted to {taxa:?} has rank {rank}, more than 3")]
    WitnessRankOverflow { taxa: [Taxon; 4], rank: usize },

    #[error("no split point found in order range [{start}, {end})")]
    NoSplitFound { start: usize, end: usize },

    #[error("split [{start}, {end}) does not match any node of the network")]
    IncompatibleSplit { start: usize, end: usize },

    /// Rows were added after the last reduction pass.
    #[error("matrix has rows added since the last reduction")]
    NotReduced,

    #[error("taxon {taxon} out of range for {taxon_count} taxa")]
    TaxonOutOfRange { taxon: Taxon, taxon_count: usize },

    #[error("taxon {taxon} occurs more than once")]
    DuplicateTaxon { taxon: Taxon },

    #[error("quartet {0} does not have four distinct taxa")]
    InvalidQuartet(Quartet),

    #[error("too few taxa ({taxon_count}) for this operation")]
    TooFewTaxa { taxon_count: usize },
}

impl Error {
    /// Whether adding quartets (through inference) may make a retry succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NotCyclic(_))
    }
}

/// Why a solution vector or split set does not describe a circular order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotCyclicCause {
    #[error("taxon {taxon} has no consistent insertion point")]
    Insertion { taxon: Taxon },

    #[error("triple {0} contradicts the reconstructed order")]
    Violation(Triple),

    #[error("splits {first} and {second} cross")]
    CrossingSplits { first: Split, second: Split },

    #[error("expected {expected} tree splits, found {found}")]
    SplitCount { expected: usize, found: usize },

    #[error("{count} witnesses remain after inference")]
    OpenWitnesses { count: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
