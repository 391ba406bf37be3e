use std::time::Duration;

use serde_json::json;

use ccm_io::raw::Meta;
use optim::OptimReport;
use parser::{Cli, ObjectiveChoice};

/// Assemble the opaque metadata block attached to every output file.
pub fn assemble(
    cli: &Cli,
    objective: &ObjectiveChoice,
    neff: f64,
    fx_final: f64,
    report: &OptimReport,
    runtime: Duration,
) -> Meta {
    let objective_name = match objective {
        ObjectiveChoice::Pll => "pll".to_string(),
        ObjectiveChoice::Cd => "cd".to_string(),
        ObjectiveChoice::TreeCd { treefile, .. } => format!("tree-cd ({})", treefile.display()),
        ObjectiveChoice::TripletPll { strategy, transform } => {
            format!("triplet-pll ({strategy}, {transform})")
        }
    };

    let mut meta = Meta::new();
    meta.insert("version".to_string(), json!(env!("CARGO_PKG_VERSION")));
    meta.insert("program".to_string(), json!("potts-rs"));
    meta.insert("alignment".to_string(), json!(cli.alnfile.display().to_string()));
    meta.insert("objective".to_string(), json!(objective_name));
    meta.insert("algorithm".to_string(), json!(format!("{:?}", cli.alg).to_lowercase()));
    meta.insert("iterations".to_string(), json!(cli.num_iterations));
    meta.insert("lambda_single".to_string(), json!(cli.reg_l2[0]));
    meta.insert("lambda_pair_base".to_string(), json!(cli.reg_l2[1]));
    meta.insert("pseudocounts".to_string(), json!(format!("{:?}", cli.pc_type).to_lowercase()));
    meta.insert("pseudocount_n".to_string(), json!(cli.pc_count));
    meta.insert("weighting".to_string(), json!(format!("{:?}", cli.weighting).to_lowercase()));
    meta.insert("neff".to_string(), json!(neff));
    meta.insert("fx_final".to_string(), json!(fx_final));
    meta.insert("opt_code".to_string(), json!(report.code));
    meta.insert("opt_message".to_string(), json!(report.message));
    meta.insert("runtime_seconds".to_string(), json!(runtime.as_secs_f64()));
    if let Some(seed) = cli.seed {
        meta.insert("seed".to_string(), json!(seed));
    }
    meta
}
