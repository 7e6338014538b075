//! Configuration for Lennard-Jones MD runs
//!
//! A run is described by a YAML file with four optional sections; every missing
//! field takes the documented default, so an empty file reproduces the standard
//! workload (256 atoms, ρ = 0.75, T = 1.0, 10 blocks × 1000 steps, dt = 0.005,
//! cut-and-shifted at r_c = 2.5, NVE). Float fields must be written with a
//! fractional part.

mod args;
pub mod strict;

pub use args::{Args, EnsembleArg};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{MdError, Result};
use crate::lattice::fcc_cells;
use crate::lj_pot::{LennardJones, Truncation};
use crate::pbc::SimulationBox;
use crate::thermostat::Thermostat;

/// Configuration for molecular dynamics simulations
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct MdConfig {
    /// System setup parameters
    #[serde(default)]
    pub system: SystemConfig,
    /// Pair potential parameters
    #[serde(default)]
    pub potential: PotentialConfig,
    /// Ensemble and integration parameters
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// System setup configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SystemConfig {
    /// Number of atoms (default 256; taken from the file for snapshot starts)
    #[serde(default)]
    pub n_atoms: Option<usize>,
    /// Number density ρ (default 0.75 when no box length is given)
    #[serde(
        default,
        deserialize_with = "strict::option_real",
        skip_serializing_if = "Option::is_none"
    )]
    pub density: Option<f64>,
    /// Box side L, must agree with N and ρ when both are given
    #[serde(
        default,
        deserialize_with = "strict::option_real",
        skip_serializing_if = "Option::is_none"
    )]
    pub box_length: Option<f64>,
    /// Particle mass
    #[serde(default = "default_mass", deserialize_with = "strict::real")]
    pub mass: f64,
    /// Remove centre-of-mass motion at start and drop three degrees of freedom
    #[serde(default = "default_fix_momentum")]
    pub fix_momentum: bool,
    /// Source of the initial configuration
    #[serde(default)]
    pub initial: InitialConfig,
}

/// Initial configuration options
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum InitialConfig {
    /// fcc lattice with Maxwell-Boltzmann velocities
    #[serde(rename = "fcc_lattice")]
    FccLattice {
        #[serde(default = "default_temperature", deserialize_with = "strict::real")]
        temperature: f64,
        /// Optional random seed
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Positions, velocities and box read from a snapshot file
    #[serde(rename = "snapshot")]
    Snapshot { path: String },
}

/// Potential energy configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PotentialConfig {
    /// Cutoff distance (default: 2.5σ)
    #[serde(default = "default_lj_cutoff", deserialize_with = "strict::real")]
    pub cutoff: f64,
    #[serde(default = "default_truncation")]
    pub truncation: Truncation,
    /// Well depth parameter ε
    #[serde(default = "default_reduced", deserialize_with = "strict::real")]
    pub epsilon: f64,
    /// Collision diameter σ
    #[serde(default = "default_reduced", deserialize_with = "strict::real")]
    pub sigma: f64,
}

/// Simulation configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    #[serde(default = "default_n_blocks")]
    pub n_blocks: usize,
    #[serde(default = "default_steps_per_block")]
    pub steps_per_block: usize,
    /// Time step
    #[serde(default = "default_time_step", deserialize_with = "strict::real")]
    pub time_step: f64,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
}

/// Ensemble configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum EnsembleConfig {
    /// Microcanonical, plain velocity Verlet
    #[serde(rename = "nve")]
    NVE,
    /// Canonical via exact velocity rescaling every `interval` steps
    #[serde(rename = "velocity_rescale")]
    VelocityRescale {
        #[serde(deserialize_with = "strict::real")]
        temperature: f64,
        #[serde(default = "default_rescale_interval")]
        interval: usize,
    },
    /// Canonical via Andersen collisions
    #[serde(rename = "andersen")]
    Andersen {
        #[serde(deserialize_with = "strict::real")]
        temperature: f64,
        /// Collision rate per particle
        #[serde(default = "default_collision_rate", deserialize_with = "strict::real")]
        collision_rate: f64,
        #[serde(default)]
        seed: Option<u64>,
    },
}

/// Output configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Summary report file (stdout when absent)
    #[serde(default)]
    pub report: Option<String>,
    /// Snapshot of the final configuration
    #[serde(default)]
    pub final_snapshot: Option<String>,
    /// Log file (stdout when absent)
    #[serde(default)]
    pub log_file: Option<String>,
}

// Default value functions
fn default_n_atoms() -> usize {
    256
}
fn default_density() -> f64 {
    0.75
}
fn default_mass() -> f64 {
    1.0
}
fn default_fix_momentum() -> bool {
    true
}
fn default_temperature() -> f64 {
    1.0
}
fn default_lj_cutoff() -> f64 {
    2.5
}
fn default_truncation() -> Truncation {
    Truncation::CutAndShifted
}
fn default_reduced() -> f64 {
    1.0
}
fn default_n_blocks() -> usize {
    10
}
fn default_steps_per_block() -> usize {
    1000
}
fn default_time_step() -> f64 {
    0.005
}
fn default_rescale_interval() -> usize {
    1
}
pub(crate) fn default_collision_rate() -> f64 {
    1.0
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            n_atoms: None,
            density: None,
            box_length: None,
            mass: default_mass(),
            fix_momentum: default_fix_momentum(),
            initial: InitialConfig::default(),
        }
    }
}

impl Default for InitialConfig {
    fn default() -> Self {
        InitialConfig::FccLattice {
            temperature: default_temperature(),
            seed: None,
        }
    }
}

impl Default for PotentialConfig {
    fn default() -> Self {
        PotentialConfig {
            cutoff: default_lj_cutoff(),
            truncation: default_truncation(),
            epsilon: default_reduced(),
            sigma: default_reduced(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            n_blocks: default_n_blocks(),
            steps_per_block: default_steps_per_block(),
            time_step: default_time_step(),
            ensemble: EnsembleConfig::default(),
        }
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        EnsembleConfig::NVE
    }
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MdError::InvalidConfig(format!(
            "{} must be a positive finite number, got {}",
            name, value
        )))
    }
}

fn require_nonzero(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        Err(MdError::InvalidConfig(format!("{} must be at least 1", name)))
    } else {
        Ok(())
    }
}

impl SystemConfig {
    pub fn n_atoms(&self) -> usize {
        self.n_atoms.unwrap_or_else(default_n_atoms)
    }

    /// Box implied by N, ρ and L, checking that they agree
    pub fn resolve_box(&self, n_atoms: usize) -> Result<SimulationBox> {
        match (self.density, self.box_length) {
            (None, None) => Ok(SimulationBox::from_density(n_atoms, default_density())),
            (Some(density), None) => Ok(SimulationBox::from_density(n_atoms, density)),
            (None, Some(length)) => Ok(SimulationBox::new(length)),
            (Some(density), Some(length)) => {
                let expected = SimulationBox::from_density(n_atoms, density).length();
                if (expected - length).abs() > 1e-9 * expected {
                    return Err(MdError::InconsistentBox {
                        n_atoms,
                        density,
                        box_length: length,
                        expected,
                    });
                }
                Ok(SimulationBox::new(length))
            }
        }
    }
}

impl PotentialConfig {
    pub fn build(&self, sim_box: SimulationBox) -> LennardJones {
        LennardJones::new(
            self.epsilon,
            self.sigma,
            self.cutoff,
            self.truncation,
            sim_box,
        )
    }
}

impl EnsembleConfig {
    pub fn target_temperature(&self) -> Option<f64> {
        match self {
            EnsembleConfig::NVE => None,
            EnsembleConfig::VelocityRescale { temperature, .. }
            | EnsembleConfig::Andersen { temperature, .. } => Some(*temperature),
        }
    }

    pub fn build_thermostat(&self) -> Thermostat {
        match self {
            EnsembleConfig::NVE => Thermostat::None,
            EnsembleConfig::VelocityRescale {
                temperature,
                interval,
            } => Thermostat::velocity_rescale(*temperature, *interval),
            EnsembleConfig::Andersen {
                temperature,
                collision_rate,
                seed,
            } => Thermostat::andersen(*temperature, *collision_rate, *seed),
        }
    }
}

impl MdConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| MdError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_yaml(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yml::from_str(content)?)
    }

    /// Save configuration to YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yml::to_string(self)?;
        fs::write(path, content).map_err(|e| MdError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Validate configuration parameters.
    ///
    /// Box consistency and the cutoff are checked here for lattice starts; for a
    /// snapshot start they are checked again once the file has been read.
    pub fn validate(&self) -> Result<()> {
        let system = &self.system;
        let n_atoms = system.n_atoms();
        if n_atoms < 2 {
            return Err(MdError::InvalidConfig(format!(
                "at least 2 atoms are needed, got {}",
                n_atoms
            )));
        }
        if let Some(density) = system.density {
            require_positive("density", density)?;
        }
        if let Some(length) = system.box_length {
            require_positive("box_length", length)?;
        }
        require_positive("mass", system.mass)?;

        let potential = &self.potential;
        require_positive("cutoff", potential.cutoff)?;
        require_positive("epsilon", potential.epsilon)?;
        require_positive("sigma", potential.sigma)?;

        let simulation = &self.simulation;
        require_nonzero("n_blocks", simulation.n_blocks)?;
        require_nonzero("steps_per_block", simulation.steps_per_block)?;
        require_positive("time_step", simulation.time_step)?;

        match &simulation.ensemble {
            EnsembleConfig::NVE => {}
            EnsembleConfig::VelocityRescale {
                temperature,
                interval,
            } => {
                require_positive("ensemble temperature", *temperature)?;
                require_nonzero("rescale interval", *interval)?;
            }
            EnsembleConfig::Andersen {
                temperature,
                collision_rate,
                ..
            } => {
                require_positive("ensemble temperature", *temperature)?;
                require_positive("collision_rate", *collision_rate)?;
            }
        }

        if let InitialConfig::FccLattice { temperature, .. } = &system.initial {
            require_positive("initial temperature", *temperature)?;
            if fcc_cells(n_atoms).is_none() {
                return Err(MdError::LatticeSize { n_atoms });
            }
            let sim_box = system.resolve_box(n_atoms)?;
            potential.build(sim_box).check_cutoff()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    const FULL_YAML: &str = r#"
system:
  n_atoms: 108
  density: 0.8
  mass: 1.0
  initial:
    type: fcc_lattice
    temperature: 1.2
    seed: 7
potential:
  cutoff: 2.5
  truncation: cut
simulation:
  n_blocks: 5
  steps_per_block: 200
  time_step: 0.004
  ensemble:
    type: velocity_rescale
    temperature: 1.2
    interval: 10
output:
  report: report.txt
"#;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = MdConfig::from_yaml("{}").unwrap();
        assert_eq!(config, MdConfig::default());
        assert!(config.validate().is_ok());

        assert_eq!(config.system.n_atoms(), 256);
        let sim_box = config.system.resolve_box(256).unwrap();
        assert_relative_eq!(sim_box.density(256), 0.75, epsilon = 1e-12);
        assert_eq!(config.simulation.n_blocks, 10);
        assert_eq!(config.simulation.steps_per_block, 1000);
        assert_eq!(config.simulation.time_step, 0.005);
        assert_eq!(config.potential.cutoff, 2.5);
        assert_eq!(config.potential.truncation, Truncation::CutAndShifted);
        assert_eq!(config.simulation.ensemble, EnsembleConfig::NVE);
    }

    #[test]
    fn test_full_yaml() {
        let config = MdConfig::from_yaml(FULL_YAML).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.system.n_atoms(), 108);
        assert_eq!(config.potential.truncation, Truncation::Cut);
        assert_eq!(
            config.simulation.ensemble,
            EnsembleConfig::VelocityRescale {
                temperature: 1.2,
                interval: 10
            }
        );
        assert_eq!(config.simulation.ensemble.target_temperature(), Some(1.2));
        assert_eq!(config.output.report.as_deref(), Some("report.txt"));
    }

    #[test]
    fn test_strict_numeric_types() {
        // integer field given a fraction
        assert!(MdConfig::from_yaml("simulation:\n  n_blocks: 2.5\n").is_err());
        // float field given a bare integer
        assert!(MdConfig::from_yaml("simulation:\n  time_step: 1\n").is_err());
        assert!(MdConfig::from_yaml("system:\n  density: 1\n").is_err());
        assert!(MdConfig::from_yaml(
            "simulation:\n  ensemble:\n    type: andersen\n    temperature: 2\n"
        )
        .is_err());
        // unknown keys are typos, not silently ignored
        assert!(MdConfig::from_yaml("simulation:\n  timestep: 0.01\n").is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = MdConfig::default();
        assert!(config.validate().is_ok());

        // Invalid time step
        config.simulation.time_step = -0.1;
        assert!(matches!(config.validate(), Err(MdError::InvalidConfig(_))));
        config.simulation.time_step = 0.005;

        config.simulation.steps_per_block = 0;
        assert!(config.validate().is_err());
        config.simulation.steps_per_block = 1000;

        // not 4 k³
        config.system.n_atoms = Some(200);
        assert!(matches!(config.validate(), Err(MdError::LatticeSize { n_atoms: 200 })));
        config.system.n_atoms = None;

        config.simulation.ensemble = EnsembleConfig::Andersen {
            temperature: 1.0,
            collision_rate: 0.0,
            seed: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inconsistent_box() {
        let mut config = MdConfig::default();
        config.system.density = Some(0.75);
        config.system.box_length = Some(10.0);
        assert!(matches!(
            config.validate(),
            Err(MdError::InconsistentBox { n_atoms: 256, .. })
        ));

        config.system.box_length = Some((256.0_f64 / 0.75).cbrt());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cutoff_beyond_half_box() {
        let mut config = MdConfig::default();
        config.system.n_atoms = Some(32);
        // L = (32/0.75)^(1/3) ≈ 3.49
        assert!(matches!(
            config.validate(),
            Err(MdError::CutoffTooLarge { .. })
        ));

        config.potential.truncation = Truncation::Full;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_io() {
        let config = MdConfig::from_yaml(FULL_YAML).unwrap();

        let temp_file = NamedTempFile::new().unwrap();
        config.to_file(temp_file.path()).unwrap();

        let loaded = MdConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded, config);
    }
}
