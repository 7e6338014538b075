//! Plain-text configuration snapshots
//!
//! ```text
//! N
//! L
//! x y z vx vy vz      (N lines)
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Vector3;
use tracing::info;

use crate::error::{MdError, Result};
use crate::pbc::SimulationBox;
use crate::state::ParticleSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub sim_box: SimulationBox,
    pub positions: Vec<Vector3<f64>>,
    pub velocities: Vec<Vector3<f64>>,
}

pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<Snapshot> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let file = File::open(path).map_err(|e| MdError::Io {
        path: label.clone(),
        source: e,
    })?;
    let snapshot = parse_snapshot(BufReader::new(file), &label)?;
    info!(
        "Read {} atoms in a box of side {:.6} from {}",
        snapshot.positions.len(),
        snapshot.sim_box.length(),
        label
    );
    Ok(snapshot)
}

pub fn parse_snapshot<R: BufRead>(reader: R, label: &str) -> Result<Snapshot> {
    let malformed = |line: usize, reason: String| MdError::Snapshot {
        path: label.to_string(),
        line,
        reason,
    };

    let mut lines = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| MdError::Io {
            path: label.to_string(),
            source: e,
        })?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            lines.push((idx + 1, trimmed.to_string()));
        }
    }

    let mut lines = lines.into_iter();
    let (line_no, header) = lines
        .next()
        .ok_or_else(|| malformed(1, "missing atom count".to_string()))?;
    let n_atoms: usize = header
        .parse()
        .map_err(|_| malformed(line_no, format!("invalid atom count '{}'", header)))?;
    if n_atoms == 0 {
        return Err(malformed(line_no, "atom count must be at least 1".to_string()));
    }

    let (line_no, box_line) = lines
        .next()
        .ok_or_else(|| malformed(line_no + 1, "missing box side".to_string()))?;
    let length: f64 = box_line
        .parse()
        .map_err(|_| malformed(line_no, format!("invalid box side '{}'", box_line)))?;
    if !(length.is_finite() && length > 0.0) {
        return Err(malformed(line_no, format!("box side must be positive, got {}", length)));
    }

    // the header is untrusted, never reserve more than the rows present
    let capacity = n_atoms.min(lines.len());
    let mut positions = Vec::with_capacity(capacity);
    let mut velocities = Vec::with_capacity(capacity);
    for (line_no, text) in lines.by_ref().take(n_atoms) {
        let values = text
            .split_whitespace()
            .map(|field| {
                field
                    .parse::<f64>()
                    .ok()
                    .filter(|x| x.is_finite())
                    .ok_or_else(|| malformed(line_no, format!("invalid number '{}'", field)))
            })
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != 6 {
            return Err(malformed(
                line_no,
                format!("expected 6 values, found {}", values.len()),
            ));
        }
        positions.push(Vector3::new(values[0], values[1], values[2]));
        velocities.push(Vector3::new(values[3], values[4], values[5]));
    }

    if positions.len() != n_atoms {
        return Err(malformed(
            0,
            format!("expected {} atoms, found {}", n_atoms, positions.len()),
        ));
    }
    if let Some((line_no, _)) = lines.next() {
        return Err(malformed(line_no, "trailing data after last atom".to_string()));
    }

    Ok(Snapshot {
        sim_box: SimulationBox::new(length),
        positions,
        velocities,
    })
}

pub fn write_snapshot<P: AsRef<Path>>(
    path: P,
    sim_box: &SimulationBox,
    state: &ParticleSet,
) -> Result<()> {
    let path = path.as_ref();
    let io_err = |e| MdError::Io {
        path: path.display().to_string(),
        source: e,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    write_snapshot_to(&mut writer, sim_box, state).map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    info!("Wrote final configuration to {}", path.display());
    Ok(())
}

fn write_snapshot_to<W: Write>(
    writer: &mut W,
    sim_box: &SimulationBox,
    state: &ParticleSet,
) -> std::io::Result<()> {
    writeln!(writer, "{:>15}", state.len())?;
    writeln!(writer, "{:>21.15}", sim_box.length())?;
    for (r, v) in state.positions.iter().zip(&state.velocities) {
        writeln!(
            writer,
            "{:>21.15}{:>21.15}{:>21.15}{:>21.15}{:>21.15}{:>21.15}",
            r.x, r.y, r.z, v.x, v.y, v.z
        )?;
    }
    Ok(())
}
