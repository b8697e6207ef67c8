//! River Runner - command line front end
//!
//! Reads a river network and a stations table, snaps every station onto the river and writes the
//! assembled table.

mod io;
mod logging;
mod settings;

use anyhow::Context;
use clap::Parser;
use river_runner_lib::{Aggregates, RiverRunner};
use settings::{OutputFormat, Settings};
use std::io::Write;

fn main() -> anyhow::Result<()> {
    logging::setup_logging();
    let settings = Settings::parse();
    run(&settings)
}

fn run(settings: &Settings) -> anyhow::Result<()> {
    #[cfg(feature = "profiling")]
    profiling::scope!("river_runner::run");

    let config = settings.snap_config()?;

    let lines = io::read_network(&settings.network)?;
    let table = io::read_stations(&settings.stations, settings.country.as_deref())?;
    let aggregates = match &settings.aggregates {
        Some(path) => io::read_aggregates(path)?,
        None => Aggregates::new(),
    };

    let output = RiverRunner::new(config)
        .run(&lines, &table.stations, &aggregates)
        .context("Snapping failed")?;

    let mut writer = io::create_output(settings.output.as_deref())?;
    match settings.format {
        OutputFormat::Csv => io::write_csv(&mut writer, &output.assembly)?,
        OutputFormat::GeoJson => io::write_geojson(&mut writer, &output.assembly)?,
    }
    writer.flush()?;

    let report = output.assembly.report;
    tracing::info!(
        "Wrote {} stations; dropped {} ({} beyond {} m of the river, {} missing attributes, {} duplicates), skipped {} unreadable and {} filtered rows",
        output.assembly.rows.len(),
        report.dropped(),
        report.unsnapped,
        settings.tolerance,
        report.missing_attributes,
        report.duplicates,
        table.unreadable,
        table.filtered
    );

    Ok(())
}
