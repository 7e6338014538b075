use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{MdError, Result};
use crate::pbc::SimulationBox;

/// fcc basis in units of the cubic cell side
const FCC_BASIS: [[f64; 3]; 4] = [
    [0.25, 0.25, 0.25],
    [0.25, 0.75, 0.75],
    [0.75, 0.25, 0.75],
    [0.75, 0.75, 0.25],
];

/// Number of fcc cells per side for `n_atoms = 4 k³`, if any
pub fn fcc_cells(n_atoms: usize) -> Option<usize> {
    let k = ((n_atoms as f64 / 4.0).cbrt()).round() as usize;
    if k > 0 && 4 * k * k * k == n_atoms {
        Some(k)
    } else {
        None
    }
}

/// Face-centred cubic lattice filling the whole box
pub fn fcc_positions(n_atoms: usize, sim_box: &SimulationBox) -> Result<Vec<Vector3<f64>>> {
    let n_cells = fcc_cells(n_atoms).ok_or(MdError::LatticeSize { n_atoms })?;
    let cell = sim_box.length() / n_cells as f64;

    let mut positions = Vec::with_capacity(n_atoms);
    for i in 0..n_cells {
        for j in 0..n_cells {
            for k in 0..n_cells {
                let origin = Vector3::new(i as f64, j as f64, k as f64);
                for b in &FCC_BASIS {
                    positions.push((origin + Vector3::new(b[0], b[1], b[2])) * cell);
                }
            }
        }
    }
    Ok(positions)
}

/// Maxwell-Boltzmann velocities at exactly `temperature` for `dof` degrees of freedom.
///
/// When `remove_drift` is set the centre-of-mass velocity is subtracted before the
/// final rescale.
pub fn maxwell_boltzmann(
    n_atoms: usize,
    temperature: f64,
    mass: f64,
    dof: usize,
    remove_drift: bool,
    seed: Option<u64>,
) -> Vec<Vector3<f64>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let sd = (temperature / mass).sqrt();
    let mut velocities: Vec<Vector3<f64>> = (0..n_atoms)
        .map(|_| {
            Vector3::<f64>::new(
                StandardNormal.sample(&mut rng),
                StandardNormal.sample(&mut rng),
                StandardNormal.sample(&mut rng),
            ) * sd
        })
        .collect();

    if remove_drift && n_atoms > 0 {
        let v_cm: Vector3<f64> = velocities.iter().sum::<Vector3<f64>>() / n_atoms as f64;
        for v in &mut velocities {
            *v -= v_cm;
        }
    }

    // Scale to exact target temperature
    let current = mass * velocities.iter().map(|v| v.norm_squared()).sum::<f64>() / dof as f64;
    if current > 0.0 {
        let scale = (temperature / current).sqrt();
        for v in &mut velocities {
            *v *= scale;
        }
    }

    velocities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{degrees_of_freedom, ParticleSet};
    use approx::assert_relative_eq;

    #[test]
    fn test_fcc_cells() {
        assert_eq!(fcc_cells(4), Some(1));
        assert_eq!(fcc_cells(108), Some(3));
        assert_eq!(fcc_cells(256), Some(4));
        assert_eq!(fcc_cells(100), None);
        assert_eq!(fcc_cells(0), None);
    }

    #[test]
    fn test_fcc_nearest_neighbour_distance() {
        let sim_box = SimulationBox::from_density(256, 0.75);
        let positions = fcc_positions(256, &sim_box).unwrap();
        assert_eq!(positions.len(), 256);

        let cell = sim_box.length() / 4.0;
        let mut min_r = f64::INFINITY;
        for i in 0..positions.len() {
            for k in 0..3 {
                assert!(positions[i][k] >= 0.0 && positions[i][k] < sim_box.length());
            }
            for j in (i + 1)..positions.len() {
                let r = sim_box.minimum_image(positions[i] - positions[j]).norm();
                min_r = min_r.min(r);
            }
        }
        assert_relative_eq!(min_r, cell / 2f64.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn test_wrong_atom_count() {
        let sim_box = SimulationBox::new(5.0);
        assert!(matches!(
            fcc_positions(100, &sim_box),
            Err(MdError::LatticeSize { n_atoms: 100 })
        ));
    }

    #[test]
    fn test_velocities_at_temperature() {
        let n = 108;
        let dof = degrees_of_freedom(n, true);
        let velocities = maxwell_boltzmann(n, 0.8, 1.0, dof, true, Some(42));
        let set = ParticleSet::new(vec![Vector3::zeros(); n], velocities, 1.0);
        assert!(set.total_momentum().norm() < 1e-10);
        assert_relative_eq!(set.temperature(dof), 0.8, max_relative = 1e-12);

        let again = maxwell_boltzmann(n, 0.8, 1.0, dof, true, Some(42));
        assert_eq!(set.velocities, again);
    }
}
