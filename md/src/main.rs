//! Lennard-Jones MD command-line interface
//!
//! Reads an optional YAML configuration, applies command-line overrides, runs
//! the simulation and writes the summary report.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

use ljmd::config::{Args, MdConfig};
use ljmd::engine::Simulation;
use ljmd::io::{setup_logging, write_report, write_snapshot};

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let base = match &args.config_file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .wrap_err_with(|| format!("Unable to read configuration file: {}", path))?;
            MdConfig::from_yaml(&content).wrap_err("Failed to parse configuration file")?
        }
        None => MdConfig::default(),
    };
    let config = args.apply(base);
    config
        .validate()
        .wrap_err("Invalid configuration after command-line overrides")?;

    setup_logging(config.output.log_file.as_deref(), args.verbose)?;
    match &args.config_file {
        Some(path) => info!("Configuration read from: {}", path),
        None => info!("No configuration file given, using defaults"),
    }
    info!("Configuration:\n{:#?}", config);

    let mut simulation = Simulation::from_config(&config).wrap_err("Failed to set up the run")?;
    let report = simulation.run().wrap_err("Simulation aborted")?;

    match &config.output.report {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("Unable to create report file: {}", path))?;
            let mut writer = BufWriter::new(file);
            write_report(&mut writer, &report)?;
            writer.flush()?;
            info!("Report written to: {}", path);
        }
        None => {
            let stdout = io::stdout();
            write_report(&mut stdout.lock(), &report)?;
        }
    }

    if let Some(path) = &config.output.final_snapshot {
        write_snapshot(path, simulation.sim_box(), simulation.state())?;
    }

    Ok(())
}
