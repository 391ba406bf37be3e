use std::path::PathBuf;

use clap::{ArgEnum, Parser};
use log::debug;
use serde::Serialize;

mod error;
pub use error::ParserError;

/// POTTS-rs: recover direct residue-residue couplings from a multiple
/// sequence alignment.
///
/// A 21-state Potts model is fitted to the alignment with an approximate
/// objective (pseudo-likelihood or contrastive divergence), and the norms
/// of the learned pair potentials are post-processed into a contact score
/// matrix.
#[derive(Parser, Debug, Serialize)]
#[clap(name="potts-rs", author, version, about, long_about = None)]
pub struct Cli {
    ///Set the verbosity level (-v -vv -vvv)
    ///
    /// -v: Info  |  -vv: Debug  | -vvv: Trace
    ///
    /// Warnings are emitted even when this flag is off; use --quiet/-q to
    /// disable them.
    #[clap(short='v', long, parse(from_occurrences), global=true)]
    pub verbose: u8,

    /// Disable warnings. Only errors will be displayed.
    #[clap(short='q', long, global=true)]
    pub quiet: bool,

    /// Input alignment file.
    pub alnfile: PathBuf,

    /// Alignment file format.
    #[clap(long, arg_enum, default_value("psicov"))]
    pub aln_format: AlnFormat,

    /// Number of optimizer iterations.
    #[clap(short='n', long, default_value("100"))]
    pub num_iterations: usize,

    /// Initialize the potentials from a raw parameter file.
    #[clap(short='i', long, value_name("RAWFILE"))]
    pub init_from_raw: Option<PathBuf>,

    // ---------------------------- Objective functions
    /// Use the pseudo-log-likelihood objective (default).
    #[clap(long, help_heading("OBJECTIVE FUNCTIONS"))]
    pub ofn_pll: bool,

    /// Use (persistent) contrastive divergence.
    #[clap(long, help_heading("OBJECTIVE FUNCTIONS"))]
    pub ofn_cd: bool,

    /// Use tree-controlled contrastive divergence, loading the tree
    /// topology from TREEFILE and the ancestral sequence from ANCESTORFILE.
    #[clap(long, number_of_values(2), value_names(&["TREEFILE", "ANCESTORFILE"]), help_heading("OBJECTIVE FUNCTIONS"))]
    pub ofn_tree_cd: Option<Vec<PathBuf>>,

    /// Use triplet pseudo-likelihood, picking triplets by STRATEGY and
    /// ranking pair couplings with TRANSFORM.
    #[clap(long, number_of_values(2), value_names(&["STRATEGY", "TRANSFORM"]), help_heading("OBJECTIVE FUNCTIONS"))]
    pub ofn_triplet: Option<Vec<String>>,

    /// Number of Gibbs sweeps per contrastive divergence evaluation.
    #[clap(long, default_value("1"), help_heading("OBJECTIVE FUNCTIONS"))]
    pub cd_gibbs_steps: usize,

    /// Persist the Gibbs chain across evaluations (PCD).
    #[clap(long, help_heading("OBJECTIVE FUNCTIONS"))]
    pub cd_persistent: bool,

    /// Resample a single position per sequence instead of full sweeps.
    #[clap(long, help_heading("OBJECTIVE FUNCTIONS"))]
    pub cd_pll: bool,

    /// Size of the sample alignment (0 keeps the input alignment size).
    #[clap(long, default_value("0"), help_heading("OBJECTIVE FUNCTIONS"))]
    pub cd_samples: usize,

    /// Expected number of mutation sweeps per unit of branch length
    /// (tree-cd only).
    #[clap(long, default_value("20"), help_heading("OBJECTIVE FUNCTIONS"))]
    pub mutation_rate: f64,

    /// Seed for the Gibbs sampler. Unset seeds from entropy.
    #[clap(long, help_heading("OBJECTIVE FUNCTIONS"))]
    pub seed: Option<u64>,

    // ---------------------------- Algorithms
    /// Optimization algorithm.
    #[clap(long, arg_enum, default_value("gd"), help_heading("ALGORITHMS"))]
    pub alg: AlgorithmChoice,

    // ---------------------------- Regularization
    /// L2 coefficients LAMBDA_SINGLE and LAMBDA_PAIR; the effective pair
    /// coefficient is LAMBDA_PAIR * (L - 1).
    #[clap(long, number_of_values(2), value_names(&["LAMBDA_SINGLE", "LAMBDA_PAIR"]), default_values(&["10", "0.2"]), help_heading("REGULARIZATION"))]
    pub reg_l2: Vec<f64>,

    // ---------------------------- Pseudocounts
    /// Pseudocount strategy applied to the empirical frequencies.
    #[clap(long, arg_enum, default_value("submat"), help_heading("PSEUDOCOUNTS"))]
    pub pc_type: PseudocountChoice,

    /// Pseudocount mass N.
    #[clap(long, default_value("1"), value_name("N"), help_heading("PSEUDOCOUNTS"))]
    pub pc_count: f64,

    /// Separate pseudocount mass for pairwise frequencies
    /// (default: same as --pc-count).
    #[clap(long, value_name("N"), help_heading("PSEUDOCOUNTS"))]
    pub pc_pair_count: Option<f64>,

    // ---------------------------- Weighting
    /// Sequence weighting scheme.
    #[clap(long, arg_enum, default_value("simple"), help_heading("WEIGHTING"))]
    pub weighting: WeightingChoice,

    // ---------------------------- Outputs
    /// Write an APC-corrected summed score matrix to MATFILE.
    #[clap(long, value_name("MATFILE"), help_heading("OUTPUT OPTIONS"))]
    pub write_apc_matrix: Option<PathBuf>,

    /// Write a summed score matrix to MATFILE.
    #[clap(short='m', long, value_name("MATFILE"), help_heading("OUTPUT OPTIONS"))]
    pub write_matrix: Option<PathBuf>,

    /// Write the coupling potentials as a flat text file to RAWFILE.
    #[clap(short='r', long, value_name("RAWFILE"), help_heading("OUTPUT OPTIONS"))]
    pub write_raw: Option<PathBuf>,

    /// Write the coupling potentials as a MsgPack file to BRAWFILE.
    #[clap(short='b', long, value_name("BRAWFILE"), help_heading("OUTPUT OPTIONS"))]
    pub write_msgpack: Option<PathBuf>,

    /// Write ranked triplets to TRIPLETFILE.
    #[clap(long, value_name("TRIPLETFILE"), help_heading("OUTPUT OPTIONS"))]
    pub write_triplets: Option<PathBuf>,

    // ---------------------------- Debug options
    /// Write per-iteration optimizer statistics to TRAJECTORYFILE.
    #[clap(long, value_name("TRAJECTORYFILE"), help_heading("DEBUG OPTIONS"))]
    pub write_trajectory: Option<PathBuf>,

    /// Write the sampled alignment to ALNFILE (contrastive divergence only).
    #[clap(long, value_name("ALNFILE"), help_heading("DEBUG OPTIONS"))]
    pub write_cd_alignment: Option<PathBuf>,

    /// Compare the final potentials to a raw parameter file.
    #[clap(short='c', long, value_name("RAWFILE"), help_heading("DEBUG OPTIONS"))]
    pub compare_to_raw: Option<PathBuf>,
}

#[derive(ArgEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlnFormat {
    Psicov,
    Fasta,
}

#[derive(ArgEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlgorithmChoice {
    /// Gradient descent with a decayed step (default).
    Gd,
    /// Polak-Ribiere conjugate gradients with a strong-Wolfe line search.
    Cg,
    /// Numerical gradient cross-check (debugging only).
    Nd,
}

#[derive(ArgEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PseudocountChoice {
    /// Substitution-matrix pseudocounts (default).
    Submat,
    /// Uniform constant pseudocounts.
    Constant,
    /// No pseudocounts.
    None,
}

#[derive(ArgEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WeightingChoice {
    /// Cluster-based inverse weighting at 80% identity (default).
    Simple,
    /// Every sequence counts as one observation.
    Uniform,
}

/// The resolved training objective.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectiveChoice {
    Pll,
    Cd,
    TreeCd { treefile: PathBuf, ancestorfile: PathBuf },
    TripletPll { strategy: String, transform: String },
}

impl Cli {
    /// Resolve the objective selector flags.
    ///
    /// # Errors
    /// When more than one objective is requested.
    pub fn objective(&self) -> Result<ObjectiveChoice, ParserError> {
        let mut choices = Vec::new();
        if self.ofn_pll {
            choices.push(ObjectiveChoice::Pll);
        }
        if self.ofn_cd {
            choices.push(ObjectiveChoice::Cd);
        }
        if let Some(paths) = &self.ofn_tree_cd {
            choices.push(ObjectiveChoice::TreeCd {
                treefile: paths[0].clone(),
                ancestorfile: paths[1].clone(),
            });
        }
        if let Some(args) = &self.ofn_triplet {
            choices.push(ObjectiveChoice::TripletPll {
                strategy: args[0].clone(),
                transform: args[1].clone(),
            });
        }

        match choices.len() {
            0 => Ok(ObjectiveChoice::Pll),
            1 => Ok(choices.pop().expect("non-empty")),
            n => Err(ParserError::MultipleObjectives(n)),
        }
    }

    /// True when the resolved objective is a contrastive divergence flavor.
    pub fn is_cd_objective(&self) -> Result<bool, ParserError> {
        Ok(matches!(
            self.objective()?,
            ObjectiveChoice::Cd | ObjectiveChoice::TreeCd { .. }
        ))
    }

    /// Validate cross-argument constraints. Fatal before anything runs.
    pub fn validate(&self) -> Result<(), ParserError> {
        if self.write_apc_matrix.is_none()
            && self.write_matrix.is_none()
            && self.write_raw.is_none()
            && self.write_msgpack.is_none()
            && self.write_triplets.is_none()
        {
            return Err(ParserError::NoOutputRequested);
        }
        if self.write_cd_alignment.is_some() && !self.is_cd_objective()? {
            return Err(ParserError::CdAlignmentWithoutCd);
        }
        Ok(())
    }

    /// Log the parsed invocation as yaml.
    pub fn serialize(&self) {
        match serde_yaml::to_string(&self) {
            Ok(serialized) => debug!("\n---- Command line args ----\n{}\n---", serialized),
            Err(e) => debug!("Failed to serialize command line arguments: [{e}]"),
        }
    }
}
