//! Contention benchmark for the spinlock.
//!
//! Spawns a pool of workers that each increment a shared counter, first
//! through the spinlock and then through the blocking mutexes, and prints the
//! final count and elapsed time of every run.

use log::{error, info};
use std::process::ExitCode;

use yield_spinlock::bench;
use yield_spinlock::config::{self, Command, DEFAULT_ITERATIONS, DEFAULT_WORKERS};

fn setup_logger() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "yield_spinlock=info");
    }
    env_logger::init();
}

fn print_help() {
    println!("yield-spinlock v{}", env!("CARGO_PKG_VERSION"));
    println!("Compares a yield/sleep spinlock against blocking mutexes on a shared counter\n");
    println!("USAGE:");
    println!("    yield-spinlock [OPTIONS]\n");
    println!("OPTIONS:");
    println!("    -w, --workers <N>       Worker threads per run (default: {})", DEFAULT_WORKERS);
    println!("    -n, --iterations <N>    Increments per worker (default: {})", DEFAULT_ITERATIONS);
    println!("    -h, --help              Show this help message");
}

fn main() -> ExitCode {
    setup_logger();

    let config = match config::parse_args(std::env::args().skip(1)) {
        Ok(Command::Help) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Ok(Command::Run(config)) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("Try --help for usage");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "running {} workers x {} iterations per lock",
        config.workers, config.iterations
    );
    println!("========test_spin_lock========");

    match bench::run_all(&config) {
        Ok(reports) => {
            let mut consistent = true;
            for report in &reports {
                println!("{}", report);
                consistent &= report.is_consistent();
            }
            if consistent {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("benchmark failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
