//! Runs one of the built-in programs to its fixed point and prints the facts.
//!
//! Usage: `fixpoint [THREADS]`
//!
//! Settings come from `fixpoint.toml` (or the file named by `FIXPOINT_CONFIG`)
//! and `FIXPOINT_*` environment variables; the optional argument overrides
//! the thread count. Logs go to stderr, filtered by `RUST_LOG`.

use std::io::{self, Write};
use std::process::ExitCode;

use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use fixpoint::builtin::{self, Closure};
use fixpoint::config::{parse_thread_count, OutputFormat, ProgramSpec, Settings};
use fixpoint::fact::Fact;
use fixpoint::rule::Program;
use fixpoint::solver::{ComputeStats, FixedPoint, Solver};
use fixpoint::{FixpointError, Result};

#[derive(Serialize)]
struct Report {
    complete: bool,
    stats: ComputeStats,
    digest: String,
    facts: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rendered: Option<Vec<String>>,
}

enum Rendering {
    Plain,
    Reaches(Closure),
}

impl Rendering {
    fn render(&self, fact: Fact) -> Option<String> {
        match self {
            Rendering::Plain => Some(fact.to_string()),
            Rendering::Reaches(closure) => closure.render(fact),
        }
    }
}

fn build(program: &ProgramSpec) -> Result<(Program, Rendering)> {
    match program {
        ProgramSpec::Successor { seeds, bound } => Ok((builtin::successor(seeds, *bound), Rendering::Plain)),
        ProgramSpec::Closure { edges } => {
            let closure = Closure::new(edges)?;
            Ok((closure.program(), Rendering::Reaches(closure)))
        }
    }
}

fn print(fixed_point: &FixedPoint, stats: ComputeStats, rendering: &Rendering, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    match format {
        OutputFormat::Text => {
            for line in fixed_point.iter().filter_map(|fact| rendering.render(fact)) {
                writeln!(out, "{line}")?;
            }
        }
        OutputFormat::Json => {
            let rendered = match rendering {
                Rendering::Plain => None,
                Rendering::Reaches(_) => Some(fixed_point.iter().filter_map(|fact| rendering.render(fact)).collect()),
            };
            let report = Report {
                complete: fixed_point.is_complete(),
                stats,
                digest: fixed_point.digest(),
                facts: fixed_point.iter().map(Fact::id).collect(),
                rendered,
            };
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn run() -> Result<()> {
    let mut settings = Settings::from_env()?;
    let mut args = std::env::args().skip(1);
    if let Some(arg) = args.next() {
        settings.solver.threads = parse_thread_count(&arg)?;
    }
    if args.next().is_some() {
        return Err(FixpointError::Config(String::from("usage: fixpoint [THREADS]")));
    }

    let (program, rendering) = build(&settings.program)?;
    let mut solver = Solver::with_config(program, settings.solver.clone());
    solver.init(settings.solver.threads)?;
    let stats = match solver.compute() {
        Ok(stats) => stats,
        Err(e) => {
            // release the store, but never print a partial result
            if let Err(end_error) = solver.end() {
                warn!(error = %end_error, "could not release the solver");
            }
            return Err(e);
        }
    };
    let fixed_point = solver.end()?;
    print(&fixed_point, stats, &rendering, settings.output)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fixpoint: {e}");
            ExitCode::FAILURE
        }
    }
}
