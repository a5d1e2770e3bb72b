//! End-to-end reconstruction: matrix, order, splits, network, with one
//! inference round when the first attempt is ambiguous.

use std::fmt;

use crate::cyclic_order::CyclicOrder;
use crate::inference::{InferenceRule, WitnessResolver};
use crate::matrix::{DenseMatrix, Gf2Matrix, SparseMatrix};
use crate::network::Level1Network;
use crate::quartet::Quartet;
use crate::split::{Level1SplitFinder, Split, TreeSplitFinder};
use crate::tree::Tree;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStrategy {
    /// Cut each range at the first position where both halves are splits.
    #[default]
    Recursive,
    /// Cut each range along the widest enumerated split inside it.
    FromSplits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// Level-1 network; crossing splits become circles.
    #[default]
    Network,
    /// Binary tree; crossing splits are an error.
    Tree(TreeStrategy),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatrixKind {
    #[default]
    Dense,
    Sparse,
}

#[derive(Debug, Clone)]
pub struct ReconstructConfig {
    pub target: Target,
    pub matrix: MatrixKind,
    /// Largest rule input count used; 0 disables inference.
    pub max_rule_inputs: usize,
    pub inference: bool,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            target: Target::Network,
            matrix: MatrixKind::Dense,
            max_rule_inputs: 2,
            inference: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BuildingMatrix,
    ReducingMatrix,
    SolvingVector,
    ReconstructingOrder,
    ResolvingWitnesses,
    FindingSplits,
    AssemblingNetwork,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::BuildingMatrix => "building matrix",
            Stage::ReducingMatrix => "reducing matrix",
            Stage::SolvingVector => "solving vector",
            Stage::ReconstructingOrder => "reconstructing order",
            Stage::ResolvingWitnesses => "resolving witnesses",
            Stage::FindingSplits => "finding splits",
            Stage::AssemblingNetwork => "assembling network",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Notified synchronously as each stage starts.
pub trait ProgressListener {
    fn stage_started(&mut self, stage: Stage);
}

impl<F: FnMut(Stage)> ProgressListener for F {
    fn stage_started(&mut self, stage: Stage) {
        self(stage)
    }
}

/// Listener that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn stage_started(&mut self, _stage: Stage) {}
}

#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub network: Level1Network,
    /// Set for tree targets.
    pub tree: Option<Tree>,
    pub order: CyclicOrder,
    pub splits: Vec<Split>,
    /// Quartets added by inference, in the order they were added.
    pub inferred: Vec<Quartet>,
}

pub struct Reconstructor<'r> {
    config: ReconstructConfig,
    rules: &'r [InferenceRule],
}

impl<'r> Reconstructor<'r> {
    pub fn new(config: ReconstructConfig, rules: &'r [InferenceRule]) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &ReconstructConfig {
        &self.config
    }

    /// Reconstruct from `quartets` over the taxa `0..taxon_count`.
    ///
    /// A recoverable failure of the first attempt starts one inference
    /// round over the witnesses, and the attempt is repeated with the
    /// inferred quartets added. Without witnesses the original error is
    /// returned.
    pub fn run(
        &self,
        taxon_count: usize,
        quartets: &[Quartet],
        progress: &mut dyn ProgressListener,
    ) -> Result<Reconstruction> {
        if taxon_count < 3 {
            return Err(Error::TooFewTaxa { taxon_count });
        }
        let span = tracing::info_span!("reconstruct", taxa = taxon_count, quartets = quartets.len());
        let _guard = span.enter();

        let err = match self.attempt(taxon_count, quartets, progress) {
            Ok(reconstruction) => {
                progress.stage_started(Stage::Done);
                return Ok(reconstruction);
            }
            Err(err) if err.is_recoverable() && self.inference_enabled() => err,
            Err(err) => return Err(err),
        };

        tracing::info!(cause = %err, "first attempt failed, running inference");
        progress.stage_started(Stage::ResolvingWitnesses);
        let mut working = quartets.to_vec();
        let mut matrix = self.build_matrix(taxon_count, &working)?;
        let resolver = WitnessResolver::new(self.rules, self.config.max_rule_inputs);
        let inferred = resolver.resolve(matrix.as_mut(), &mut working)?;
        if inferred.is_empty() {
            return Err(err);
        }
        tracing::info!(inferred = inferred.len(), "retrying with inferred quartets");

        let mut reconstruction = self.attempt(taxon_count, &working, progress)?;
        reconstruction.inferred = inferred;
        progress.stage_started(Stage::Done);
        Ok(reconstruction)
    }

    fn inference_enabled(&self) -> bool {
        self.config.inference && self.config.max_rule_inputs > 0
    }

    fn build_matrix(&self, taxon_count: usize, quartets: &[Quartet]) -> Result<Box<dyn Gf2Matrix>> {
        Ok(match self.config.matrix {
            MatrixKind::Dense => Box::new(DenseMatrix::from_quartets(taxon_count, quartets)?),
            MatrixKind::Sparse => Box::new(SparseMatrix::from_quartets(taxon_count, quartets)?),
        })
    }

    fn attempt(
        &self,
        taxon_count: usize,
        quartets: &[Quartet],
        progress: &mut dyn ProgressListener,
    ) -> Result<Reconstruction> {
        tracing::info!(stage = %Stage::BuildingMatrix);
        progress.stage_started(Stage::BuildingMatrix);
        let mut matrix = self.build_matrix(taxon_count, quartets)?;
        tracing::debug!(
            rows = matrix.row_count(),
            columns = matrix.column_count(),
            "matrix built"
        );

        tracing::info!(stage = %Stage::ReducingMatrix);
        progress.stage_started(Stage::ReducingMatrix);
        matrix.row_reduce();
        if !matrix.is_consistent()? {
            return Err(Error::MatrixInconsistent);
        }
        tracing::debug!(rank = matrix.rank()?, "matrix reduced");

        tracing::info!(stage = %Stage::SolvingVector);
        progress.stage_started(Stage::SolvingVector);
        let vector = matrix.conforming_vector()?;

        tracing::info!(stage = %Stage::ReconstructingOrder);
        progress.stage_started(Stage::ReconstructingOrder);
        let order = CyclicOrder::from_vector(&vector)?;
        tracing::debug!(%order, "order reconstructed");

        tracing::info!(stage = %Stage::FindingSplits);
        progress.stage_started(Stage::FindingSplits);
        let (network, tree, splits) = match self.config.target {
            Target::Network => {
                let finder = Level1SplitFinder::new(&order, matrix.as_ref());
                let splits = finder.find_list_of_splits();
                tracing::debug!(splits = splits.len(), "splits found");

                tracing::info!(stage = %Stage::AssemblingNetwork);
                progress.stage_started(Stage::AssemblingNetwork);
                (finder.assemble(&splits)?, None, splits)
            }
            Target::Tree(strategy) => {
                let finder = TreeSplitFinder::new(&order, matrix.as_ref());
                let splits = finder.find_list_of_splits()?;
                finder.check_split_count(&splits)?;
                tracing::debug!(splits = splits.len(), "splits found");

                tracing::info!(stage = %Stage::AssemblingNetwork);
                progress.stage_started(Stage::AssemblingNetwork);
                let tree = match strategy {
                    TreeStrategy::Recursive => finder.reconstruct_recursive()?,
                    TreeStrategy::FromSplits => finder.tree_from_splits(&splits)?,
                };
                (tree.to_network(), Some(tree), splits)
            }
        };

        Ok(Reconstruction {
            network,
            tree,
            order,
            splits,
            inferred: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotCyclicCause;

    fn q(l1: usize, l2: usize, r1: usize, r2: usize) -> Quartet {
        Quartet::new(l1, l2, r1, r2)
    }

    fn tree_config(strategy: TreeStrategy) -> ReconstructConfig {
        ReconstructConfig {
            target: Target::Tree(strategy),
            ..ReconstructConfig::default()
        }
    }

    fn dyadic_rules() -> Vec<InferenceRule> {
        vec![InferenceRule::new(
            vec![q(0, 1, 2, 3), q(0, 2, 3, 4)],
            q(0, 1, 2, 4),
        )]
    }

    #[test]
    fn test_single_quartet_network() {
        let r = Reconstructor::new(ReconstructConfig::default(), &[])
            .run(4, &[q(0, 1, 2, 3)], &mut NoProgress)
            .unwrap();
        assert_eq!(r.order.taxa(), &[0, 3, 2, 1]);
        assert_eq!(r.splits, vec![Split::new(1, 3)]);
        assert_eq!(r.network.to_string(), "{0, {{3, 2}, 1}}");
        assert!(r.tree.is_none());
        assert!(r.inferred.is_empty());
    }

    #[test]
    fn test_single_quartet_trees() {
        let quartets = [q(0, 1, 2, 3)];
        let recursive = Reconstructor::new(tree_config(TreeStrategy::Recursive), &[])
            .run(4, &quartets, &mut NoProgress)
            .unwrap();
        assert_eq!(recursive.tree.unwrap().to_string(), "(0,((3,2),1))");

        let from_splits = Reconstructor::new(tree_config(TreeStrategy::FromSplits), &[])
            .run(4, &quartets, &mut NoProgress)
            .unwrap();
        let tree = from_splits.tree.unwrap();
        assert_eq!(tree.to_string(), "(1,(0,(3,2)))");
        assert_eq!(from_splits.network.splits(), tree.splits());
    }

    #[test]
    fn test_stages_are_reported_in_order() {
        let mut stages = Vec::new();
        Reconstructor::new(ReconstructConfig::default(), &[])
            .run(4, &[q(0, 1, 2, 3)], &mut |s| stages.push(s))
            .unwrap();
        assert_eq!(
            stages,
            vec![
                Stage::BuildingMatrix,
                Stage::ReducingMatrix,
                Stage::SolvingVector,
                Stage::ReconstructingOrder,
                Stage::FindingSplits,
                Stage::AssemblingNetwork,
                Stage::Done,
            ]
        );
    }

    #[test]
    fn test_inconsistent_quartets() {
        let quartets = [q(0, 1, 2, 3), q(0, 2, 1, 3), q(0, 3, 1, 2)];
        for matrix in [MatrixKind::Dense, MatrixKind::Sparse] {
            let config = ReconstructConfig {
                matrix,
                ..ReconstructConfig::default()
            };
            let err = Reconstructor::new(config, &[])
                .run(4, &quartets, &mut NoProgress)
                .unwrap_err();
            assert!(matches!(err, Error::MatrixInconsistent));
            assert!(!err.is_recoverable());
        }
    }

    #[test]
    fn test_too_few_taxa() {
        let err = Reconstructor::new(ReconstructConfig::default(), &[])
            .run(2, &[], &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::TooFewTaxa { taxon_count: 2 }));
    }

    #[test]
    fn test_inference_resolves_crossing_splits() {
        let quartets = [q(0, 1, 2, 3), q(1, 2, 3, 4)];
        let rules = dyadic_rules();
        let mut stages = Vec::new();
        let r = Reconstructor::new(tree_config(TreeStrategy::Recursive), &rules)
            .run(5, &quartets, &mut |s| stages.push(s))
            .unwrap();
        assert_eq!(r.inferred, vec![q(0, 1, 2, 4), q(0, 2, 3, 4)]);
        assert_eq!(r.tree.unwrap().to_string(), "(0,(((4,3),2),1))");
        assert_eq!(
            r.network.splits(),
            [vec![2, 3, 4], vec![3, 4]].into_iter().collect()
        );
        assert_eq!(stages[5], Stage::ResolvingWitnesses);
        assert_eq!(stages.last(), Some(&Stage::Done));
    }

    #[test]
    fn test_disabled_inference_keeps_the_error() {
        let quartets = [q(0, 1, 2, 3), q(1, 2, 3, 4)];
        let rules = dyadic_rules();
        let config = ReconstructConfig {
            inference: false,
            ..tree_config(TreeStrategy::Recursive)
        };
        let err = Reconstructor::new(config, &rules)
            .run(5, &quartets, &mut NoProgress)
            .unwrap_err();
        match err {
            Error::NotCyclic(NotCyclicCause::CrossingSplits { first, second }) => {
                assert_eq!(first, Split::new(0, 2));
                assert_eq!(second, Split::new(1, 3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_rules_leave_witnesses_open() {
        let quartets = [q(0, 1, 2, 3), q(1, 2, 3, 4)];
        let err = Reconstructor::new(tree_config(TreeStrategy::Recursive), &[])
            .run(5, &quartets, &mut NoProgress)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotCyclic(NotCyclicCause::OpenWitnesses { count: 3 })
        ));
    }

    #[test]
    fn test_network_target_rejects_incompatible_splits() {
        let quartets = [q(0, 1, 2, 3), q(1, 2, 3, 4)];
        let err = Reconstructor::new(ReconstructConfig::default(), &dyadic_rules())
            .run(5, &quartets, &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleSplit { .. }));
    }
}
