use std::fs;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};

use alignment::pseudocounts::{self, PseudocountMode};
use alignment::weighting;
use ccm_io::raw::RawPotts;
use objfun::tree::Tree;
use objfun::{Cd, CdOptions, ObjectiveFunction, Pll, TreeCd};
use optim::{Algorithm, CgOptions, GdOptions, MinimizeOptions, Monitor, NumDiffOptions};
use parser::{AlgorithmChoice, AlnFormat, Cli, ObjectiveChoice, PseudocountChoice, WeightingChoice};
use potts::{PottsParams, L2};
use scoring::triplets::{self, PairTransform, TripletStrategy};

pub mod meta;

/// Run a full inference: alignment in, trained potentials and contact
/// scores out. Returns the process exit code derived from the optimizer
/// report (`0` when the optimizer finished with a positive code, the
/// absolute code otherwise).
pub fn run(cli: &Cli) -> Result<i32> {
    info!("POTTS-rs v{}", env!("CARGO_PKG_VERSION"));

    // ----------------------------- Load and weight the alignment.
    let format = match cli.aln_format {
        AlnFormat::Psicov => ccm_io::msa::AlnFormat::Psicov,
        AlnFormat::Fasta  => ccm_io::msa::AlnFormat::Fasta,
    };
    let (msa, _ids) = ccm_io::msa::read_msa(&cli.alnfile, format)
        .with_context(|| format!("While reading the alignment {:?}", cli.alnfile))?;
    info!("Read {} sequences with {} columns from {:?}", msa.nrow(), msa.ncol(), cli.alnfile);

    let weights = match cli.weighting {
        WeightingChoice::Simple  => weighting::weights_simple(&msa, weighting::DEFAULT_IDENTITY_CUTOFF),
        WeightingChoice::Uniform => weighting::weights_uniform(&msa),
    };
    let neff = weighting::neff(&weights);
    let (min, max) = weights.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &w| {
        (lo.min(w), hi.max(w))
    });
    info!(
        "Reweighted {} sequences to Neff={neff:.6} (min={min:.6}, mean={:.6}, max={max:.6})",
        msa.nrow(),
        neff / msa.nrow() as f64
    );

    // ----------------------------- Pseudocounted frequencies.
    let pc_mode = match cli.pc_type {
        PseudocountChoice::Submat   => PseudocountMode::SubstitutionMatrix,
        PseudocountChoice::Constant => PseudocountMode::Constant,
        PseudocountChoice::None     => PseudocountMode::None,
    };
    let freqs = pseudocounts::calculate_frequencies(&msa, &weights, pc_mode, cli.pc_count, cli.pc_pair_count);

    // ----------------------------- Centering and regularization.
    let init_raw = cli.init_from_raw.as_ref()
        .map(|path| ccm_io::raw::parse(path))
        .transpose()
        .context("While reading the initialization raw file")?;

    let center_v = match &init_raw {
        Some(raw) => PottsParams::v_from_padded(msa.ncol(), &raw.v),
        None      => alignment::centering::calculate(&freqs),
    };
    let lambda_single = cli.reg_l2[0];
    let lambda_pair_base = cli.reg_l2[1];
    let reg = L2::new(lambda_single, lambda_pair_base, msa.ncol(), Some(center_v));

    // ----------------------------- Objective function.
    let objective_choice = cli.objective()?;

    // Triplet selectors are resolved up front: an unknown strategy or
    // transform must fail before any optimization starts.
    let triplet_config: Option<(TripletStrategy, PairTransform)> = match &objective_choice {
        ObjectiveChoice::TripletPll { strategy, transform } => {
            Some((strategy.parse()?, transform.parse()?))
        }
        _ => None,
    };

    let mut objective: Box<dyn ObjectiveFunction> = match &objective_choice {
        ObjectiveChoice::Pll | ObjectiveChoice::TripletPll { .. } => {
            Box::new(Pll::new(msa.clone(), weights.clone(), reg, init_raw.as_ref())?)
        }
        ObjectiveChoice::Cd => {
            let options = CdOptions {
                gibbs_steps: cli.cd_gibbs_steps,
                persistent: cli.cd_persistent,
                pll_style: cli.cd_pll,
                n_samples: cli.cd_samples,
                seed: cli.seed,
            };
            Box::new(Cd::new(msa.clone(), weights.clone(), &freqs, reg, options, init_raw.as_ref())?)
        }
        ObjectiveChoice::TreeCd { treefile, ancestorfile } => {
            let newick = fs::read_to_string(treefile)
                .with_context(|| format!("While reading the tree file {treefile:?}"))?;
            let tree = Tree::from_newick(&newick)
                .with_context(|| format!("While parsing the tree file {treefile:?}"))?;

            let (ancestor, ids) = ccm_io::msa::read_msa(ancestorfile, format)
                .with_context(|| format!("While reading the ancestral sequence {ancestorfile:?}"))?;
            let seq0 = ancestor.row(0).to_vec();

            Box::new(TreeCd::new(
                &msa,
                &freqs,
                reg,
                tree,
                seq0,
                ids.as_deref(),
                cli.mutation_rate,
                cli.seed,
                init_raw.as_ref(),
            )?)
        }
    };

    info!("Will optimize {} variables with {objective}", objective.nvar());

    // ----------------------------- Optimize.
    let algorithm = match cli.alg {
        AlgorithmChoice::Gd => Algorithm::GradientDescent(GdOptions::default()),
        AlgorithmChoice::Cg => Algorithm::ConjugateGradients(CgOptions::default()),
        AlgorithmChoice::Nd => Algorithm::NumericalDifferentiation(NumDiffOptions::default()),
    };
    let monitor = cli.write_trajectory.as_deref()
        .map(Monitor::create)
        .transpose()
        .context("While creating the trajectory file")?;
    let options = MinimizeOptions { max_iters: cli.num_iterations, cancel: None, monitor };

    let x0 = objective.x0();
    let started = Instant::now();
    let (fx, x, report) = optim::minimize(objective.as_mut(), x0, &algorithm, options);
    let runtime = started.elapsed();

    let condition = if report.finished() { "Finished" } else { "Exited" };
    info!("{condition} with {report} (fx = {fx:.6}, {runtime:.2?})");

    // ----------------------------- Finalize and write outputs.
    let meta = meta::assemble(cli, &objective_choice, neff, fx, &report, runtime);
    let result = objective.finalize(&x, meta.clone());

    if let Some(path) = &cli.compare_to_raw {
        let reference = ccm_io::raw::parse(path)
            .with_context(|| format!("While reading the comparison raw file {path:?}"))?;
        if reference.ncol() == result.ncol() {
            info!("Max absolute deviation from {path:?}: {:.6e}", result.max_abs_deviation(&reference));
        } else {
            warn!(
                "Cannot compare potentials to {path:?}: {} columns against {}",
                reference.ncol(),
                result.ncol()
            );
        }
    }

    if let Some(path) = &cli.write_cd_alignment {
        match objective.sampled_alignment() {
            Some(sampled) => {
                info!("Writing sampled alignment to {path:?}");
                ccm_io::msa::write_psicov(path, sampled)?;
            }
            None => warn!("No sampled alignment available to write to {path:?}"),
        }
    }

    write_outputs(cli, &result, triplet_config)?;

    Ok(if report.code > 0 { 0 } else { report.code.abs() })
}

/// Write every requested output file.
fn write_outputs(
    cli: &Cli,
    result: &RawPotts,
    triplet_config: Option<(TripletStrategy, PairTransform)>,
) -> Result<()> {
    let ncol = result.ncol();

    if let Some(path) = &cli.write_matrix {
        info!("Writing summed score matrix to {path:?}");
        let mat = scoring::frobenius_score(&result.w, ncol);
        ccm_io::matrix::write_matrix(path, &mat, ncol, &result.meta)?;
    }

    if let Some(path) = &cli.write_apc_matrix {
        info!("Writing APC-corrected summed score matrix to {path:?}");
        let mat = scoring::apc(&scoring::frobenius_score(&result.w, ncol), ncol);
        ccm_io::matrix::write_matrix(path, &mat, ncol, &result.meta)?;
    }

    if let Some(path) = &cli.write_raw {
        info!("Writing raw-formatted potentials to {path:?}");
        ccm_io::raw::write_oldraw(path, result)?;
    }

    if let Some(path) = &cli.write_msgpack {
        info!("Writing msgpack-formatted potentials to {path:?}");
        ccm_io::raw::write_msgpack(path, result)?;
    }

    if let Some(path) = &cli.write_triplets {
        let (strategy, transform) = triplet_config
            .unwrap_or((TripletStrategy::BestPairs, PairTransform::Frobenius));
        info!("Writing triplets to {path:?}");
        let ranked = triplets::pick_triplets(
            &result.w,
            ncol,
            strategy,
            transform,
            triplets::DEFAULT_MAX_TRIPLETS,
        );
        let mut writer = ccm_io::GenericWriter::new(Some(path))?;
        let lines = std::iter::once(format!("# {}", ranked.len()))
            .chain(ranked.iter().map(ToString::to_string));
        writer.write_iter(lines)?;
    }

    Ok(())
}
