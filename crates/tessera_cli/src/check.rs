//! `tessera check`: validate a run without searching.
//!
//! Loads the configuration, application and fabric, then runs engine setup
//! (registry resolution, phase planning, seeding) and reports the findings.

use tessera_diagnostics::DiagnosticSink;

use crate::pipeline::{load_run, render_diagnostics, setup_engine};
use crate::{CheckArgs, GlobalArgs};

/// Runs the `tessera check` command. Returns 0 when setup succeeds.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let run = load_run(args.config.as_deref())?;
    let ops = run.app.op_count();
    let coords = run.arch.coords().len();

    let sink = DiagnosticSink::new();
    let setup = setup_engine(run, &sink);
    let errors = render_diagnostics(&sink, global, args.json);
    let (_, engine) = setup?;

    if !global.quiet && !args.json {
        eprintln!(
            "    Checked {}: {ops} operation(s) on {coords} compute unit(s)",
            engine.app().name()
        );
        eprintln!("    Routing phases: {}", engine.plan());
        eprintln!("    Seed population: {}", engine.population().len());
        eprintln!("    Objectives: {}", engine.objective_names().join(", "));
    }
    Ok(if errors > 0 { 1 } else { 0 })
}
