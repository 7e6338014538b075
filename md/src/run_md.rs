use itertools::izip;
use nalgebra::Vector3;

use crate::error::Result;
use crate::lj_pot::PairTotals;
use crate::pbc::SimulationBox;
use crate::state::ParticleSet;

pub trait ForceProvider {
    /// Overwrite `forces` with the forces at `positions` and return the pair sums
    fn compute_forces(
        &self,
        positions: &[Vector3<f64>],
        forces: &mut [Vector3<f64>],
    ) -> Result<PairTotals>;
}

pub trait Integrator {
    /// Advance the particle set by one time step
    fn step(&self, state: &mut ParticleSet) -> Result<PairTotals>;

    fn time_step(&self) -> f64;
}

/// Velocity-Verlet integration (NVE)
pub struct VelocityVerlet<F: ForceProvider> {
    pub provider: F,
    sim_box: SimulationBox,
    dt: f64,
}

impl<F: ForceProvider> VelocityVerlet<F> {
    pub fn new(provider: F, sim_box: SimulationBox, dt: f64) -> Self {
        VelocityVerlet {
            provider,
            sim_box,
            dt,
        }
    }

    /// Fill `state.forces` for the current positions, needed once before the first step
    pub fn prime(&self, state: &mut ParticleSet) -> Result<PairTotals> {
        self.provider
            .compute_forces(&state.positions, &mut state.forces)
    }

    fn half_kick(&self, state: &mut ParticleSet) {
        let scale = 0.5 * self.dt / state.mass;
        for (v, f) in izip!(&mut state.velocities, &state.forces) {
            *v += f * scale;
        }
    }
}

impl<F: ForceProvider> Integrator for VelocityVerlet<F> {
    fn step(&self, state: &mut ParticleSet) -> Result<PairTotals> {
        // Update velocities (first half-step) with the old forces
        self.half_kick(state);

        // Update positions (full step), folded back into the cell
        for (pos, v) in izip!(&mut state.positions, &state.velocities) {
            *pos = self.sim_box.fold(*pos + v * self.dt);
        }

        // Recompute forces
        let totals = self
            .provider
            .compute_forces(&state.positions, &mut state.forces)?;

        // Update velocities (second half-step)
        self.half_kick(state);

        Ok(totals)
    }

    fn time_step(&self) -> f64 {
        self.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Isotropic harmonic well around the box centre, k = 1
    struct Harmonic {
        centre: Vector3<f64>,
    }

    impl ForceProvider for Harmonic {
        fn compute_forces(
            &self,
            positions: &[Vector3<f64>],
            forces: &mut [Vector3<f64>],
        ) -> Result<PairTotals> {
            let mut totals = PairTotals::default();
            for (r, f) in positions.iter().zip(forces.iter_mut()) {
                let d = r - self.centre;
                *f = -d;
                totals.cut += 0.5 * d.norm_squared();
            }
            totals.shifted = totals.cut;
            Ok(totals)
        }
    }

    #[test]
    fn test_harmonic_oscillator_period() {
        let sim_box = SimulationBox::new(10.0);
        let centre = Vector3::new(5.0, 5.0, 5.0);
        let verlet = VelocityVerlet::new(Harmonic { centre }, sim_box, 0.001);
        let mut state = ParticleSet::new(
            vec![centre + Vector3::new(1.0, 0.0, 0.0)],
            vec![Vector3::zeros()],
            1.0,
        );
        verlet.prime(&mut state).unwrap();

        // one full period, 2π
        let steps = (2.0 * std::f64::consts::PI / 0.001).round() as usize;
        for _ in 0..steps {
            verlet.step(&mut state).unwrap();
        }
        assert_relative_eq!(state.positions[0].x, 6.0, epsilon = 1e-4);
        assert_relative_eq!(state.velocities[0].x, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_positions_stay_folded() {
        let sim_box = SimulationBox::new(2.0);
        let verlet = VelocityVerlet::new(
            Harmonic {
                centre: Vector3::new(1.0, 1.0, 1.0),
            },
            sim_box,
            0.05,
        );
        let mut state = ParticleSet::new(
            vec![Vector3::new(1.9, 0.1, 1.0)],
            vec![Vector3::new(3.0, -3.0, 0.0)],
            1.0,
        );
        verlet.prime(&mut state).unwrap();
        for _ in 0..100 {
            verlet.step(&mut state).unwrap();
            for k in 0..3 {
                assert!(state.positions[0][k] >= 0.0 && state.positions[0][k] < 2.0);
            }
        }
    }
}
