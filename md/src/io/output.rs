//! Logging setup and the end-of-run summary report

use std::fs::File;
use std::io::Write;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::{
    filter::LevelFilter, fmt::layer, fmt::time::Uptime, layer::SubscriberExt,
    util::SubscriberInitExt, Registry,
};

use crate::averages::{Estimate, Observable};
use crate::engine::RunReport;
use crate::error::{MdError, Result};

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Route log output to `log_file`, or to stdout when absent
pub fn setup_logging(log_file: Option<&str>, verbosity: u8) -> Result<()> {
    let level = level_for(verbosity);
    match log_file {
        Some(path) => {
            let log = File::create(path).map_err(|e| MdError::Io {
                path: path.to_string(),
                source: e,
            })?;
            let file_layer = layer()
                .with_writer(Mutex::new(log))
                .with_timer(Uptime::default())
                .with_ansi(false);
            Registry::default().with(level).with(file_layer).init();
            info!("Log written to: {}", path);
        }
        None => {
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(Uptime::default())
                .with_ansi(true);
            Registry::default().with(level).with(stdout_layer).init();
        }
    }
    Ok(())
}

fn format_estimate(estimate: &Estimate) -> String {
    match estimate.std_error {
        Some(err) => format!("{:>14.6} ± {:<10.6}", estimate.mean, err),
        None => format!("{:>14.6} ± {:<10}", estimate.mean, "n/a"),
    }
}

/// Write the block table and run averages of `report`
pub fn write_report<W: Write>(writer: &mut W, report: &RunReport) -> std::io::Result<()> {
    writeln!(writer, "Lennard-Jones MD summary")?;
    writeln!(writer, "  atoms        {}", report.n_atoms)?;
    writeln!(writer, "  density      {:.6}", report.density)?;
    writeln!(writer, "  box side     {:.6}", report.box_length)?;
    writeln!(writer, "  ensemble     {}", report.ensemble)?;
    writeln!(
        writer,
        "  potential    {} at r_c = {:.4}",
        report.truncation, report.cutoff
    )?;
    writeln!(
        writer,
        "  run          {} blocks x {} steps, dt = {}",
        report.blocks.len(),
        report.steps_per_block,
        report.time_step
    )?;
    writeln!(writer)?;

    write!(writer, "{:>6}", "block")?;
    for obs in Observable::ALL {
        write!(writer, "{:>20}", obs.name())?;
    }
    writeln!(writer)?;
    for block in &report.blocks {
        write!(writer, "{:>6}", block.index)?;
        for obs in Observable::ALL {
            write!(writer, "{:>20.6}", block.get(obs))?;
        }
        writeln!(writer)?;
    }
    writeln!(writer)?;

    writeln!(
        writer,
        "Run averages over {} blocks ({} steps)",
        report.averages.blocks, report.averages.steps
    )?;
    for (obs, estimate) in report.averages.iter() {
        writeln!(writer, "  {:<20}{}", obs.name(), format_estimate(&estimate))?;
    }
    if report.pressure_delta != 0.0 {
        let p = report.averages.get(Observable::PressureShifted);
        writeln!(
            writer,
            "  {:<20}{:>14.6}  (delta correction {:.6})",
            "P (cut)",
            p.mean + report.pressure_delta,
            report.pressure_delta
        )?;
    }
    writeln!(writer)?;

    writeln!(
        writer,
        "Conserved energy per atom: {:.10} -> {:.10} (drift {:.3e})",
        report.initial_energy,
        report.final_energy,
        report.energy_drift()
    )?;
    for caveat in &report.caveats {
        writeln!(writer, "Caveat: {}", caveat)?;
    }
    Ok(())
}
