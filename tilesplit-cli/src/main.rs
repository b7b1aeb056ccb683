mod args;
mod encode;
mod pbf_source;

use std::process::ExitCode;

use clap::Parser;
use log::info;

use args::Args;
use encode::encode_element;
use pbf_source::PbfElementSource;
use tilesplit::sink::{MbtilesSink, PbfFileSink};
use tilesplit::{datefile, Engine};

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.to_config()?;
    config.validate()?;

    let appointment_date = match &config.date_file {
        Some(path) if path.exists() => datefile::read_appointment_date(path)?,
        _ => 0,
    };

    let mut engine = Engine::new(config.clone());
    engine.set_appointment_date(appointment_date);

    let source = PbfElementSource::new(config.input.clone());

    if config.mbtiles {
        let mut sink = MbtilesSink::create(
            std::path::Path::new(&config.output),
            config.output.clone(),
            encode_element,
        )?;
        let write_stats = engine.run(&source, &mut sink)?;
        report(&engine, &write_stats, config.timing);
    } else {
        let mut sink = PbfFileSink::new(config.output.clone(), encode_element);
        let write_stats = engine.run(&source, &mut sink)?;
        report(&engine, &write_stats, config.timing);
    }

    if let Some(path) = &config.date_file {
        datefile::write_appointment_date(path, engine.stats().latest_date)?;
    }

    Ok(())
}

fn report(engine: &Engine, write_stats: &tilesplit::WriteStats, timing: bool) {
    let stats = engine.stats();
    info!(
        "nodes={} ways={} (skipped {}) relations={} (skipped {}, unresolved {})",
        stats.nodes_seen,
        stats.ways_seen,
        stats.ways_skipped_missing_node,
        stats.relations_seen,
        stats.relations_skipped_empty,
        stats.unresolved_relation_refs,
    );
    info!("wrote {} tile(s), {} element(s)", write_stats.tiles_written, write_stats.elements_written);
    if timing {
        info!("latest element timestamp: {}", stats.latest_date);
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tilesplit: {err}");
            ExitCode::FAILURE
        }
    }
}
