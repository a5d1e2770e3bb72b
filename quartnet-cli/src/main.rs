use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use quartnet_core::io::{read_quartet_file, read_rule_file, write_quartets, QuartetSet};
use quartnet_core::sampling::keep_fraction;
use quartnet_core::{
    DenseMatrix, Gf2Matrix, MatrixKind, ReconstructConfig, Reconstructor, SparseMatrix, Stage,
    Target, Tree, TreeStrategy,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::level_filters::LevelFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    match cli.cmd {
        Command::Reconstruct(args) => run_reconstruct(&args),
        Command::Order { file, sparse } => run_order(&file, sparse),
        Command::Witnesses { file, sparse } => run_witnesses(&file, sparse),
        Command::RandomTree {
            taxa,
            seed,
            keep,
            output,
        } => run_random_tree(taxa, seed, keep, output),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "quartnet",
    about = "Reconstruct trees and level-1 networks from quartet topologies"
)]
struct Cli {
    /// More log output (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, action = ArgAction::SetTrue, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline and print the order, splits and network
    Reconstruct(ReconstructArgs),

    /// Print the cyclic order encoded by the solved vector
    Order {
        /// Quartet file
        file: PathBuf,

        /// Use the sparse elimination engine
        #[arg(long, action = ArgAction::SetTrue)]
        sparse: bool,
    },

    /// Print rank, kernel dimension and witnesses of a quartet set
    Witnesses {
        /// Quartet file
        file: PathBuf,

        /// Use the sparse elimination engine
        #[arg(long, action = ArgAction::SetTrue)]
        sparse: bool,
    },

    /// Generate a random tree and write its quartets
    RandomTree {
        /// Number of taxa
        #[arg(long)]
        taxa: usize,

        /// Seed for the random generator
        #[arg(long)]
        seed: Option<u64>,

        /// Keep each quartet with this probability
        #[arg(long)]
        keep: Option<f64>,

        /// Write the quartet file here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ReconstructArgs {
    /// Quartet file
    file: PathBuf,

    /// Require a tree instead of a level-1 network
    #[arg(long, action = ArgAction::SetTrue)]
    tree: bool,

    /// How the tree is assembled from its splits
    #[arg(long, value_enum, default_value_t = StrategyArg::Recursive)]
    strategy: StrategyArg,

    /// Use the sparse elimination engine
    #[arg(long, action = ArgAction::SetTrue)]
    sparse: bool,

    /// Inference rule table
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Ignore rules with more inputs than this
    #[arg(long, default_value_t = 2)]
    max_rule_inputs: usize,

    /// Fail instead of inferring quartets for witnesses
    #[arg(long, action = ArgAction::SetTrue)]
    no_inference: bool,

    /// Print the network as an edge list
    #[arg(long, action = ArgAction::SetTrue)]
    edges: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StrategyArg {
    Recursive,
    FromSplits,
}

impl From<StrategyArg> for TreeStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Recursive => TreeStrategy::Recursive,
            StrategyArg::FromSplits => TreeStrategy::FromSplits,
        }
    }
}

impl ReconstructArgs {
    fn config(&self) -> ReconstructConfig {
        ReconstructConfig {
            target: if self.tree {
                Target::Tree(self.strategy.into())
            } else {
                Target::Network
            },
            matrix: matrix_kind(self.sparse),
            max_rule_inputs: self.max_rule_inputs,
            inference: !self.no_inference,
        }
    }
}

fn matrix_kind(sparse: bool) -> MatrixKind {
    if sparse {
        MatrixKind::Sparse
    } else {
        MatrixKind::Dense
    }
}

/// Logs go to stderr; `-q` keeps errors only, each `-v` opens one level
/// past warnings.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn read_input(file: &Path) -> Result<QuartetSet> {
    read_quartet_file(file).with_context(|| format!("failed to read {}", file.display()))
}

fn reduced_matrix(set: &QuartetSet, sparse: bool) -> Result<Box<dyn Gf2Matrix>> {
    let mut matrix: Box<dyn Gf2Matrix> = match matrix_kind(sparse) {
        MatrixKind::Dense => Box::new(DenseMatrix::new(set.taxon_count)),
        MatrixKind::Sparse => Box::new(SparseMatrix::new(set.taxon_count)),
    };
    matrix.add_quartets(&set.quartets)?;
    matrix.row_reduce();
    Ok(matrix)
}

fn run_reconstruct(args: &ReconstructArgs) -> Result<()> {
    let set = read_input(&args.file)?;
    let rules = match &args.rules {
        Some(path) => read_rule_file(path)
            .with_context(|| format!("failed to read rules from {}", path.display()))?,
        None => Vec::new(),
    };
    let reconstructor = Reconstructor::new(args.config(), &rules);
    let mut progress = |stage: Stage| tracing::info!(%stage, "stage");
    let r = reconstructor
        .run(set.taxon_count, &set.quartets, &mut progress)
        .with_context(|| format!("no reconstruction for {}", args.file.display()))?;

    println!("order: {}", r.order);
    println!("splits ({}):", r.splits.len());
    for split in &r.splits {
        let members: Vec<String> = split
            .members(&r.order)
            .iter()
            .map(|t| t.to_string())
            .collect();
        println!("  {split} {{{}}}", members.join(" "));
    }
    if !r.inferred.is_empty() {
        println!("inferred ({}):", r.inferred.len());
        for q in &r.inferred {
            println!("  {q}");
        }
    }
    if let Some(tree) = &r.tree {
        println!("tree: {tree}");
    }
    if args.edges {
        let graph = r.network.to_graph();
        println!("vertices: {}", graph.vertices.len());
        for (v, label) in graph.vertices.iter().enumerate() {
            if let Some(taxon) = label {
                println!("  {v} = {taxon}");
            }
        }
        for (a, b) in &graph.edges {
            println!("{a} {b}");
        }
    } else {
        println!("network: {}", r.network);
    }
    Ok(())
}

fn run_order(file: &Path, sparse: bool) -> Result<()> {
    let set = read_input(file)?;
    let matrix = reduced_matrix(&set, sparse)?;
    let order = matrix
        .conforming_vector()
        .and_then(|v| v.determine_order())
        .context("quartets do not determine a cyclic order")?;
    println!("{order}");
    Ok(())
}

fn run_witnesses(file: &Path, sparse: bool) -> Result<()> {
    let set = read_input(file)?;
    let matrix = reduced_matrix(&set, sparse)?;
    let kernel = matrix.kernel()?;
    let witnesses = matrix.find_witnesses()?;
    println!("rank: {}", matrix.rank()?);
    println!("kernel dimension: {}", kernel.row_count());
    println!("consistent: {}", matrix.is_consistent()?);
    println!("witnesses ({}):", witnesses.len());
    for w in &witnesses {
        println!("  {w}");
    }
    Ok(())
}

fn run_random_tree(
    taxa: usize,
    seed: Option<u64>,
    keep: Option<f64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let tree = Tree::random(taxa, &mut rng)?;
    let mut quartets = tree.quartets();
    if let Some(fraction) = keep {
        keep_fraction(&mut quartets, fraction, &mut rng);
    }
    tracing::info!(taxa, quartets = quartets.len(), "random tree generated");

    match output {
        Some(path) => {
            println!("{tree}");
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_quartets(BufWriter::new(file), taxa, &quartets)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            // stdout carries the quartet file
            eprintln!("{tree}");
            write_quartets(io::stdout().lock(), taxa, &quartets)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).unwrap()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("quartnet-cli-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_reconstruct_defaults() {
        let cli = parse(&["quartnet", "reconstruct", "data.txt"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        let Command::Reconstruct(args) = cli.cmd else {
            panic!("expected reconstruct");
        };
        assert_eq!(args.file, PathBuf::from("data.txt"));
        let config = args.config();
        assert_eq!(config.target, Target::Network);
        assert_eq!(config.matrix, MatrixKind::Dense);
        assert_eq!(config.max_rule_inputs, 2);
        assert!(config.inference);
        assert!(args.rules.is_none());
    }

    #[test]
    fn test_reconstruct_flags() {
        let cli = parse(&[
            "quartnet",
            "-vv",
            "reconstruct",
            "data.txt",
            "--tree",
            "--strategy",
            "from-splits",
            "--sparse",
            "--rules",
            "rules.txt",
            "--max-rule-inputs",
            "3",
            "--no-inference",
            "--edges",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Reconstruct(args) = cli.cmd else {
            panic!("expected reconstruct");
        };
        assert!(args.edges);
        assert_eq!(args.rules, Some(PathBuf::from("rules.txt")));
        let config = args.config();
        assert_eq!(config.target, Target::Tree(TreeStrategy::FromSplits));
        assert_eq!(config.matrix, MatrixKind::Sparse);
        assert_eq!(config.max_rule_inputs, 3);
        assert!(!config.inference);
    }

    #[test]
    fn test_strategy_without_tree_keeps_network() {
        let cli = parse(&["quartnet", "reconstruct", "f", "--strategy", "from-splits"]);
        let Command::Reconstruct(args) = cli.cmd else {
            panic!("expected reconstruct");
        };
        assert_eq!(args.config().target, Target::Network);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(Cli::try_parse_from(["quartnet", "reconstruct"]).is_err());
        assert!(
            Cli::try_parse_from(["quartnet", "reconstruct", "f", "--strategy", "greedy"]).is_err()
        );
        assert!(Cli::try_parse_from(["quartnet", "-q", "-v", "order", "f"]).is_err());
        assert!(Cli::try_parse_from(["quartnet", "random-tree"]).is_err());
    }

    #[test]
    fn test_random_tree_arguments() {
        let cli = parse(&[
            "quartnet",
            "random-tree",
            "--taxa",
            "9",
            "--seed",
            "7",
            "--keep",
            "0.5",
            "-o",
            "out.txt",
        ]);
        match cli.cmd {
            Command::RandomTree {
                taxa,
                seed,
                keep,
                output,
            } => {
                assert_eq!(taxa, 9);
                assert_eq!(seed, Some(7));
                assert_eq!(keep, Some(0.5));
                assert_eq!(output, Some(PathBuf::from("out.txt")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_order_and_witnesses_flags() {
        let cli = parse(&["quartnet", "witnesses", "q.txt", "--sparse", "-q"]);
        assert!(cli.quiet);
        assert!(matches!(cli.cmd, Command::Witnesses { sparse: true, .. }));
        let cli = parse(&["quartnet", "order", "q.txt"]);
        assert!(matches!(cli.cmd, Command::Order { sparse: false, .. }));
    }

    #[test]
    fn test_generated_file_runs_through_every_command() {
        let path = temp_path("six.txt");
        run_random_tree(6, Some(11), None, Some(path.clone())).unwrap();
        let set = read_quartet_file(&path).unwrap();
        assert_eq!(set.taxon_count, 6);
        assert_eq!(set.quartets.len(), 15);

        let args = ReconstructArgs {
            file: path.clone(),
            tree: true,
            strategy: StrategyArg::FromSplits,
            sparse: true,
            rules: None,
            max_rule_inputs: 2,
            no_inference: false,
            edges: true,
        };
        run_reconstruct(&args).unwrap();
        run_order(&path, false).unwrap();
        run_witnesses(&path, true).unwrap();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = run_order(&temp_path("missing.txt"), false).unwrap_err();
        assert!(err.to_string().contains("failed to read"), "{err}");
    }
}
