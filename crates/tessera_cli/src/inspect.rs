//! `tessera inspect`: summarise a mapping record.

use std::path::Path;

use tessera_map::record::read_record;
use tessera_map::MappingRecord;

use crate::{GlobalArgs, InspectArgs};

/// Runs the `tessera inspect` command.
pub fn run(args: &InspectArgs, _global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let record = read_record(Path::new(&args.record))?;
    if args.json {
        println!("{}", record.to_json()?);
    } else {
        print!("{}", summarize(&record));
    }
    Ok(0)
}

/// Human-readable header and archive fitness table.
fn summarize(record: &MappingRecord) -> String {
    let header = &record.header;
    let mut out = String::new();
    out.push_str(&format!("architecture: {}\n", header.architecture));
    out.push_str(&format!("application:  {}\n", header.application));
    for (name, value) in &header.sim {
        out.push_str(&format!("sim.{name} = {value}\n"));
    }
    let directions: Vec<String> = header
        .objectives
        .iter()
        .zip(&header.weights)
        .map(|(n, &w)| format!("{n} ({})", if w < 0.0 { "min" } else { "max" }))
        .collect();
    out.push_str(&format!("objectives:   {}\n", directions.join(", ")));
    out.push_str(&format!(
        "generations:  {}\n",
        record.payload.fitness_log.len().saturating_sub(1)
    ));
    out.push_str(&format!("archive:      {} mapping(s)\n", record.payload.archive.len()));
    for (i, ind) in record.payload.archive.iter().enumerate() {
        let fitness: Vec<String> = ind.fitness().iter().map(|v| format!("{v}")).collect();
        let cuts: String = ind
            .pipeline()
            .iter()
            .map(|&b| if b { '1' } else { '0' })
            .collect();
        out.push_str(&format!("  [{i}] fitness ({}) cuts {cuts:?}\n", fitness.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tessera_common::Coord;
    use tessera_map::record::{RecordHeader, RecordPayload};
    use tessera_map::{Individual, Mapping};

    #[test]
    fn summary_lists_objectives_and_archive() {
        let mut ind = Individual::new(Mapping::new(vec![Coord::new(0, 0)]), vec![true, false]);
        ind.set_fitness(vec![4.0, 1.0]);
        let record = MappingRecord {
            header: RecordHeader {
                architecture: "mesh".to_string(),
                application: "inc".to_string(),
                sim: BTreeMap::new(),
                objectives: vec!["wire_length".to_string(), "map_width".to_string()],
                weights: vec![-1.0, -1.0],
            },
            payload: RecordPayload {
                archive: vec![ind],
                fitness_log: vec![vec![], vec![vec![4.0, 1.0]]],
            },
        };
        let text = summarize(&record);
        assert!(text.contains("wire_length (min), map_width (min)"));
        assert!(text.contains("generations:  1"));
        assert!(text.contains("[0] fitness (4, 1) cuts \"10\""));
    }
}
