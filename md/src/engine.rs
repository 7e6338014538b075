//! Run driver: owns the particle set and steps it block by block.

use tracing::{debug, info, warn};

use crate::averages::{
    BlockSummary, HeatCapacityMethod, Observable, ObservableAccumulator, RunAverages, StepSample,
};
use crate::config::{InitialConfig, MdConfig};
use crate::error::{MdError, Result};
use crate::io::read_snapshot;
use crate::lattice::{fcc_positions, maxwell_boltzmann};
use crate::lj_pot::{LennardJones, PairTotals, Truncation};
use crate::pbc::SimulationBox;
use crate::run_md::{Integrator, VelocityVerlet};
use crate::state::{degrees_of_freedom, ParticleSet};
use crate::thermostat::Thermostat;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParameters {
    pub time_step: f64,
    pub n_blocks: usize,
    pub steps_per_block: usize,
}

/// Everything a finished run has to say
#[derive(Debug, Clone)]
pub struct RunReport {
    pub n_atoms: usize,
    pub density: f64,
    pub box_length: f64,
    pub truncation: Truncation,
    pub cutoff: f64,
    pub ensemble: &'static str,
    pub time_step: f64,
    pub steps_per_block: usize,
    pub blocks: Vec<BlockSummary>,
    pub averages: RunAverages,
    /// Conserved energy per atom of the run's own truncation, before the first step
    pub initial_energy: f64,
    pub final_energy: f64,
    /// Impulsive correction to add to P (cut&shifted) to get P for the plain cut potential
    pub pressure_delta: f64,
    pub caveats: Vec<String>,
}

impl RunReport {
    pub fn energy_drift(&self) -> f64 {
        self.final_energy - self.initial_energy
    }
}

pub struct Simulation {
    integrator: VelocityVerlet<LennardJones>,
    state: ParticleSet,
    thermostat: Thermostat,
    accumulator: ObservableAccumulator,
    params: RunParameters,
    dof: usize,
    totals: PairTotals,
    steps_done: usize,
}

impl Simulation {
    /// Set up a run from an explicit state.
    ///
    /// Positions are folded into the box and, when `momentum_fixed` is set and the
    /// thermostat conserves momentum, the centre-of-mass drift is removed.
    pub fn new(
        potential: LennardJones,
        mut state: ParticleSet,
        params: RunParameters,
        thermostat: Thermostat,
        momentum_fixed: bool,
    ) -> Result<Self> {
        potential.check_cutoff()?;
        let sim_box = potential.sim_box;
        for r in &mut state.positions {
            *r = sim_box.fold(*r);
        }

        let momentum_fixed = momentum_fixed && thermostat.conserves_momentum();
        if momentum_fixed {
            state.remove_drift();
        }
        let dof = degrees_of_freedom(state.len(), momentum_fixed);
        debug!(
            "{} degrees of freedom (momentum fixed: {})",
            dof, momentum_fixed
        );

        let method = match thermostat.target_temperature() {
            Some(temperature) => HeatCapacityMethod::Canonical { temperature },
            None => HeatCapacityMethod::Microcanonical,
        };
        let accumulator = ObservableAccumulator::new(state.len(), method);

        let integrator = VelocityVerlet::new(potential, sim_box, params.time_step);
        let totals = integrator.prime(&mut state)?;
        if !totals.is_finite() {
            return Err(MdError::NonFinite {
                quantity: "initial forces",
                step: 0,
            });
        }

        Ok(Simulation {
            integrator,
            state,
            thermostat,
            accumulator,
            params,
            dof,
            totals,
            steps_done: 0,
        })
    }

    /// Build the initial state, potential and thermostat described by `config`
    pub fn from_config(config: &MdConfig) -> Result<Self> {
        config.validate()?;
        let system = &config.system;
        let thermostat = config.simulation.ensemble.build_thermostat();

        let (sim_box, state) = match &system.initial {
            InitialConfig::FccLattice { temperature, seed } => {
                let n_atoms = system.n_atoms();
                let sim_box = system.resolve_box(n_atoms)?;
                let positions = fcc_positions(n_atoms, &sim_box)?;
                let dof = degrees_of_freedom(
                    n_atoms,
                    system.fix_momentum && thermostat.conserves_momentum(),
                );
                let velocities = maxwell_boltzmann(
                    n_atoms,
                    *temperature,
                    system.mass,
                    dof,
                    system.fix_momentum,
                    *seed,
                );
                info!(
                    "fcc lattice start: {} atoms, box side {:.6}, T = {:.4}",
                    n_atoms,
                    sim_box.length(),
                    temperature
                );
                (sim_box, ParticleSet::new(positions, velocities, system.mass))
            }
            InitialConfig::Snapshot { path } => {
                let snapshot = read_snapshot(path)?;
                let n_atoms = snapshot.positions.len();
                if let Some(expected) = system.n_atoms {
                    if expected != n_atoms {
                        return Err(MdError::AtomCountMismatch {
                            expected,
                            found: n_atoms,
                        });
                    }
                }
                if system.density.is_some() || system.box_length.is_some() {
                    let expected = system.resolve_box(n_atoms)?.length();
                    let length = snapshot.sim_box.length();
                    if (expected - length).abs() > 1e-9 * expected {
                        return Err(MdError::InconsistentBox {
                            n_atoms,
                            density: snapshot.sim_box.density(n_atoms),
                            box_length: length,
                            expected,
                        });
                    }
                }
                (
                    snapshot.sim_box,
                    ParticleSet::new(snapshot.positions, snapshot.velocities, system.mass),
                )
            }
        };

        let potential = config.potential.build(sim_box);
        let params = RunParameters {
            time_step: config.simulation.time_step,
            n_blocks: config.simulation.n_blocks,
            steps_per_block: config.simulation.steps_per_block,
        };
        Self::new(potential, state, params, thermostat, system.fix_momentum)
    }

    pub fn state(&self) -> &ParticleSet {
        &self.state
    }

    pub fn sim_box(&self) -> &SimulationBox {
        &self.integrator.provider.sim_box
    }

    pub fn potential(&self) -> &LennardJones {
        &self.integrator.provider
    }

    pub fn degrees_of_freedom(&self) -> usize {
        self.dof
    }

    pub fn steps_done(&self) -> usize {
        self.steps_done
    }

    /// Reverse every velocity, used to check time reversibility
    pub fn reverse_velocities(&mut self) {
        for v in &mut self.state.velocities {
            *v = -*v;
        }
    }

    /// K/N plus the potential energy per atom the dynamics actually conserves
    pub fn conserved_energy(&self) -> f64 {
        let truncation = self.integrator.provider.truncation;
        (self.state.kinetic_energy() + self.totals.potential(truncation)) / self.state.len() as f64
    }

    /// Advance one step (integrate, then thermostat) and return the sample
    pub fn step(&mut self) -> Result<StepSample> {
        let step = self.steps_done;
        let totals = self.integrator.step(&mut self.state)?;
        self.thermostat.apply(
            &mut self.state,
            step,
            self.integrator.time_step(),
            self.dof,
        );
        self.steps_done += 1;

        if !totals.is_finite() {
            return Err(MdError::NonFinite {
                quantity: "potential energy",
                step,
            });
        }
        self.totals = totals;

        let sample = self.sample();
        if !sample.kinetic_per_atom.is_finite() {
            return Err(MdError::NonFinite {
                quantity: "kinetic energy",
                step,
            });
        }
        Ok(sample)
    }

    fn sample(&self) -> StepSample {
        let lj = &self.integrator.provider;
        let n = self.state.len() as f64;
        let volume = lj.sim_box.volume();
        let density = n / volume;

        let kinetic = self.state.kinetic_energy();
        let temperature = self.state.temperature(self.dof);
        let pressure_shifted = density * temperature + self.totals.virial / (3.0 * volume);
        let config_temperature = if self.totals.laplacian > 0.0 {
            self.state.force_sq() / self.totals.laplacian
        } else {
            0.0
        };

        StepSample {
            energy_shifted: (kinetic + self.totals.shifted) / n,
            pressure_shifted,
            energy_full: (kinetic + self.totals.cut) / n + lj.potential_lrc(density),
            pressure_full: pressure_shifted + lj.pressure_lrc(density),
            kinetic_temperature: temperature,
            config_temperature,
            kinetic_per_atom: kinetic / n,
        }
    }

    /// Run one block of `steps_per_block` steps and log its means
    pub fn run_block(&mut self) -> Result<BlockSummary> {
        for _ in 0..self.params.steps_per_block {
            let sample = self.step()?;
            self.accumulator.sample(&sample);
        }
        let summary = self.accumulator.end_block();
        info!(
            "Block {:>4}: E/N = {:>10.6} ({:>10.6} full)  P = {:>9.6} ({:>9.6} full)  T = {:.6}  Tc = {:.6}  Cv/N = {:.4}",
            summary.index,
            summary.get(Observable::EnergyShifted),
            summary.get(Observable::EnergyFull),
            summary.get(Observable::PressureShifted),
            summary.get(Observable::PressureFull),
            summary.get(Observable::KineticTemperature),
            summary.get(Observable::ConfigTemperature),
            summary.get(Observable::HeatCapacityShifted),
        );
        Ok(summary)
    }

    /// Run all blocks and collect the report
    pub fn run(&mut self) -> Result<RunReport> {
        let lj = self.integrator.provider.clone();
        let n_atoms = self.state.len();
        let density = lj.sim_box.density(n_atoms);

        let mut caveats = Vec::new();
        if self.thermostat.suppresses_fluctuations() {
            let caveat = "velocity rescaling pins the kinetic energy, so Cv/N from energy \
                          fluctuations is biased low"
                .to_string();
            warn!("{}", caveat);
            caveats.push(caveat);
        }
        if self.params.n_blocks < 2 {
            caveats.push("a single block gives no standard errors".to_string());
        }

        info!(
            "Starting {} run: {} blocks x {} steps, dt = {}, {} at r_c = {}",
            self.thermostat.label(),
            self.params.n_blocks,
            self.params.steps_per_block,
            self.params.time_step,
            lj.truncation,
            lj.cutoff
        );
        let initial_energy = self.conserved_energy();
        info!("Initial conserved energy per atom: {:.10}", initial_energy);

        let mut blocks = Vec::with_capacity(self.params.n_blocks);
        for _ in 0..self.params.n_blocks {
            blocks.push(self.run_block()?);
            debug!(
                "Conserved energy drift per atom: {:.3e}",
                self.conserved_energy() - initial_energy
            );
        }

        let final_energy = self.conserved_energy();
        info!(
            "Run finished after {} steps, conserved energy drift per atom {:.3e}",
            self.steps_done,
            final_energy - initial_energy
        );

        let pressure_delta = match lj.truncation {
            Truncation::Cut => lj.pressure_delta(density),
            Truncation::CutAndShifted | Truncation::Full => 0.0,
        };

        Ok(RunReport {
            n_atoms,
            density,
            box_length: lj.sim_box.length(),
            truncation: lj.truncation,
            cutoff: lj.cutoff,
            ensemble: self.thermostat.label(),
            time_step: self.params.time_step,
            steps_per_block: self.params.steps_per_block,
            blocks,
            averages: self.accumulator.averages(),
            initial_energy,
            final_energy,
            pressure_delta,
            caveats,
        })
    }
}
