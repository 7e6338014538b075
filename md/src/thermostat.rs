//! Velocity thermostats for canonical (NVT) runs.
//!
//! A thermostat is applied once per step, after the second half-kick of the
//! integrator and before the observables are sampled. It only ever touches
//! velocities.

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use tracing::trace;

use crate::state::ParticleSet;

#[derive(Debug)]
pub enum Thermostat {
    /// No thermostat, microcanonical dynamics
    None,
    /// Deterministic rescale to the exact target every `interval` steps
    VelocityRescale { target: f64, interval: usize },
    /// Stochastic collisions with a heat bath at rate `collision_rate` per particle
    Andersen {
        target: f64,
        collision_rate: f64,
        rng: StdRng,
    },
}

impl Thermostat {
    pub fn velocity_rescale(target: f64, interval: usize) -> Self {
        Thermostat::VelocityRescale {
            target,
            interval: interval.max(1),
        }
    }

    pub fn andersen(target: f64, collision_rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Thermostat::Andersen {
            target,
            collision_rate,
            rng,
        }
    }

    pub fn target_temperature(&self) -> Option<f64> {
        match self {
            Thermostat::None => None,
            Thermostat::VelocityRescale { target, .. } | Thermostat::Andersen { target, .. } => {
                Some(*target)
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Thermostat::None => "NVE",
            Thermostat::VelocityRescale { .. } => "NVT (velocity rescaling)",
            Thermostat::Andersen { .. } => "NVT (Andersen)",
        }
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self, Thermostat::None)
    }

    /// Whether the thermostat leaves total momentum untouched
    pub fn conserves_momentum(&self) -> bool {
        !matches!(self, Thermostat::Andersen { .. })
    }

    /// Whether the kinetic-energy fluctuations are pinned, which biases Cv low
    pub fn suppresses_fluctuations(&self) -> bool {
        matches!(self, Thermostat::VelocityRescale { .. })
    }

    /// Apply the thermostat after step `step` (0-based, counted over the whole run).
    /// Returns `true` when velocities were changed.
    pub fn apply(&mut self, state: &mut ParticleSet, step: usize, dt: f64, dof: usize) -> bool {
        match self {
            Thermostat::None => false,
            Thermostat::VelocityRescale { target, interval } => {
                if (step + 1) % *interval != 0 {
                    return false;
                }
                match state.rescale_to_temperature(*target, dof) {
                    Some(lambda) => {
                        trace!("step {}: velocities rescaled by {:.6}", step, lambda);
                        true
                    }
                    None => false,
                }
            }
            Thermostat::Andersen {
                target,
                collision_rate,
                rng,
            } => {
                let probability = *collision_rate * dt;
                let sd = (*target / state.mass).sqrt();
                let mut collisions = 0;
                for v in &mut state.velocities {
                    if rng.gen::<f64>() < probability {
                        *v = Vector3::<f64>::new(
                            StandardNormal.sample(rng),
                            StandardNormal.sample(rng),
                            StandardNormal.sample(rng),
                        ) * sd;
                        collisions += 1;
                    }
                }
                trace!("step {}: {} Andersen collisions", step, collisions);
                collisions > 0
            }
        }
    }
}
