use std::process;

use clap::Parser;

#[macro_use]
extern crate log;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Parse command line arguments and run `potts_rs::run()`
fn main() {
    // ----------------------------- Run CLI Parser
    let cli = parser::Cli::parse();

    // ----------------------------- Init logger.
    logger::init_logger(cli.verbose + (!cli.quiet as u8));

    // ----------------------------- Serialize command line arguments
    cli.serialize();

    // ----------------------------- Validate cross-argument constraints.
    if let Err(e) = cli.validate() {
        error!("{}", e);
        process::exit(1);
    }

    // ----------------------------- Run inference.
    match potts_rs::run(&cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            error!("{:?}", e);
            process::exit(1);
        }
    }
}
