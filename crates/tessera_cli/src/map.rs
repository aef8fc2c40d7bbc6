//! `tessera map`: run the evolutionary mapper and write a record.
//!
//! 1. Load config, application and fabric
//! 2. Set up the engine and render setup diagnostics
//! 3. Run, stopping early once `--time-limit` elapses
//! 4. Write the record and print the archive summary

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tessera_diagnostics::DiagnosticSink;
use tessera_map::record::write_record;
use tessera_map::{CancelToken, Engine, MappingRecord};
use tracing::info;

use crate::pipeline::{load_run, render_diagnostics, setup_engine};
use crate::{GlobalArgs, MapArgs};

/// Runs the `tessera map` command.
///
/// Returns exit code 0 when at least one valid mapping was archived, 2 when
/// the search finished without one, 1 on setup errors.
pub fn run(args: &MapArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let run = load_run(args.config.as_deref())?;
    let name = run.config.project.name.clone();
    if !global.quiet && !args.json {
        eprintln!(
            "    Mapping {} onto {} ({}x{})",
            run.app.name(),
            run.arch.name(),
            run.config.architecture.width,
            run.config.architecture.height
        );
    }

    let sink = DiagnosticSink::new();
    let setup = setup_engine(run, &sink);
    if render_diagnostics(&sink, global, args.json) > 0 {
        return Ok(1);
    }
    let (root, mut engine) = setup?;

    let cancel = CancelToken::new();
    if let Some(secs) = args.time_limit {
        let token = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            token.cancel();
        });
    }

    let outcome = engine.run(&cancel);
    let generations = outcome.generations;
    let stop = outcome.stop_reason;
    let record = MappingRecord::from_run(&engine, outcome);

    let output = args
        .output
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| root.join(format!("{name}.tsra")));
    write_record(&output, &record)?;
    info!(path = %output.display(), "record written");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary_json(&engine, &record))?);
    } else if !global.quiet {
        eprintln!("    Finished after {generations} generation(s): {stop}");
        print_archive(&engine, &record);
        eprintln!("    Wrote {}", output.display());
    }

    Ok(if record.payload.archive.is_empty() { 2 } else { 0 })
}

fn print_archive(engine: &Engine, record: &MappingRecord) {
    let names = engine.objective_names();
    if record.payload.archive.is_empty() {
        println!("no valid mapping found");
        return;
    }
    println!("{:>4}  {}", "#", names.join("  "));
    for (i, ind) in record.payload.archive.iter().enumerate() {
        let values: Vec<String> = ind
            .fitness()
            .iter()
            .zip(&names)
            .map(|(v, n)| format!("{v:>w$}", w = n.len()))
            .collect();
        println!("{i:>4}  {}", values.join("  "));
    }
}

fn summary_json(engine: &Engine, record: &MappingRecord) -> serde_json::Value {
    let archive: Vec<serde_json::Value> = record
        .payload
        .archive
        .iter()
        .map(|ind| {
            serde_json::json!({
                "fitness": ind.fitness(),
                "mapping": ind.mapping().coords().iter().map(|c| [c.x, c.y]).collect::<Vec<_>>(),
                "pipeline": ind.pipeline(),
            })
        })
        .collect();
    serde_json::json!({
        "objectives": engine.objective_names(),
        "generations": record.payload.fitness_log.len().saturating_sub(1),
        "archive": archive,
    })
}
