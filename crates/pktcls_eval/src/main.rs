//! pktcls evaluation driver.
//!
//! Selects a classification engine, builds its index from a rule file,
//! optionally applies an update rule file, then replays a trace against
//! the index, verifying each packet's matched priority against the
//! expectation recorded in the trace. Every phase is timed and reported.

mod error;

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::Instant,
};

use clap::Parser;

use pktcls_core::prelude::*;
use pktcls_hs::HyperSplit;
use pktcls_io::{load_prefix_rules, load_range_rules, load_trace};
use pktcls_tss::TupleSpace;

use error::{Error, MatchOut};

#[derive(Parser)]
#[command(
    name = "pktcls",
    version,
    about = "Multi-dimensional packet classification evaluation framework"
)]
struct Cli {
    /// Algorithm id: 0 HyperSplit, 1 Tuple Space Search
    #[arg(short = 'a', long = "algorithm", default_value_t = 0)]
    algorithm: u8,

    /// Rule file for building (Classbench range format for -a 0,
    /// prefix format for -a 1)
    #[arg(short = 'r', long = "rule")]
    rule: PathBuf,

    /// Trace file for searching
    #[arg(short = 't', long = "trace")]
    trace: Option<PathBuf>,

    /// Update rule file (prefix format, TSS only)
    #[arg(short = 'u', long = "update")]
    update: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    match cli.algorithm {
        0 => run_phases::<HyperSplit>(cli, |p| load_range_rules(p)),
        1 => run_phases::<TupleSpace>(cli, |p| load_prefix_rules(p)),
        other => Err(Error::UnknownAlgorithm(other)),
    }
}

/// The evaluation sequence shared by both engines: build, optional
/// update, optional search. Rule and trace buffers are dropped as soon as
/// their phase completes; the index is dropped last.
fn run_phases<C: Classifier>(
    cli: &Cli,
    load_rules: impl Fn(&Path) -> pktcls_io::Result<Vec<C::Rule>>,
) -> Result<(), Error> {
    let rules = load_rules(&cli.rule)?;

    log::info!("building");
    let started = Instant::now();
    let mut index = C::build(&rules).map_err(Error::Build)?;
    let elapsed = micros_since(started);
    log::info!("building pass");
    log::info!("time for building: {elapsed}us");
    drop(rules);

    if let Some(path) = &cli.update {
        let delta = load_rules(path)?;

        log::info!("updating");
        let started = Instant::now();
        index.insert_update(&delta).map_err(Error::Update)?;
        let elapsed = micros_since(started);
        log::info!("updating pass");
        log::info!("time for updating: {elapsed}us");
    }

    if let Some(path) = &cli.trace {
        let trace = load_trace(path)?;

        log::info!("searching");
        let started = Instant::now();
        search(&index, &trace)?;
        let elapsed = micros_since(started);
        log::info!("searching pass");
        log::info!("time for searching: {elapsed}us");
        log::info!(
            "searching speed: {}pps",
            trace.len() as u128 * 1_000_000 / elapsed.max(1)
        );
    }

    Ok(())
}

/// Replay the trace, comparing each computed priority with the trace's
/// expectation. The first mismatch stops the run.
fn search<C: Classifier>(index: &C, trace: &[Packet]) -> Result<(), Error> {
    for (i, pkt) in trace.iter().enumerate() {
        let got = index.lookup(pkt);
        if got != pkt.expected {
            log::error!(
                "packet {i} {:?}: expected {}, got {}",
                pkt.val,
                MatchOut(pkt.expected),
                MatchOut(got)
            );
            return Err(Error::SearchMismatch {
                index: i,
                expected: MatchOut(pkt.expected),
                got: MatchOut(got),
            });
        }
    }
    Ok(())
}

fn micros_since(started: Instant) -> u128 {
    started.elapsed().as_micros()
}
