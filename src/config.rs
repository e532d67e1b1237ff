//! Benchmark configuration and command-line parsing.

use crate::error::BenchError;

/// Worker threads spawned per run unless overridden.
pub const DEFAULT_WORKERS: usize = 32;

/// Lock/increment/unlock cycles per worker unless overridden.
pub const DEFAULT_ITERATIONS: u64 = 1_000_000;

/// Parameters of a single benchmark run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BenchConfig {
    pub workers: usize,
    pub iterations: u64,
}

impl BenchConfig {
    pub const fn new(workers: usize, iterations: u64) -> Self {
        BenchConfig {
            workers,
            iterations,
        }
    }

    /// Rejects runs that would do no work or whose total overflows a `u64`.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.workers == 0 {
            return Err(BenchError::InvalidConfig("workers must be at least 1"));
        }
        if self.iterations == 0 {
            return Err(BenchError::InvalidConfig("iterations must be at least 1"));
        }
        if self.checked_total().is_none() {
            return Err(BenchError::InvalidConfig("workers * iterations overflows u64"));
        }
        Ok(())
    }

    /// The counter value a correct lock ends with.
    pub fn expected(&self) -> u64 {
        self.checked_total().unwrap_or(u64::MAX)
    }

    fn checked_total(&self) -> Option<u64> {
        (self.workers as u64).checked_mul(self.iterations)
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, DEFAULT_ITERATIONS)
    }
}

/// What the binary was asked to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Run(BenchConfig),
}

/// Parses `-w/--workers N`, `-n/--iterations N` and `-h/--help`.
///
/// `args` must not include the program name.
pub fn parse_args<I>(args: I) -> Result<Command, BenchError>
where
    I: IntoIterator<Item = String>,
{
    let mut config = BenchConfig::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-w" | "--workers" => config.workers = value_of(&arg, args.next())?,
            "-n" | "--iterations" => config.iterations = value_of(&arg, args.next())?,
            _ => return Err(BenchError::InvalidArgument(arg)),
        }
    }

    config.validate()?;
    Ok(Command::Run(config))
}

fn value_of<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, BenchError> {
    let value = value.ok_or_else(|| BenchError::InvalidArgument(format!("{} needs a value", flag)))?;
    value
        .parse()
        .map_err(|_| BenchError::InvalidArgument(format!("{} {}", flag, value)))
}
