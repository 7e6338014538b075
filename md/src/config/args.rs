//! Command-line argument parsing for MD runs

use clap::{ArgAction, Parser, ValueEnum};

use super::strict::parse_real;
use super::{default_collision_rate, EnsembleConfig, InitialConfig, MdConfig};
use crate::lj_pot::Truncation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnsembleArg {
    Nve,
    VelocityRescale,
    Andersen,
}

/// Lennard-Jones fluid molecular dynamics with YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file (built-in defaults when absent)
    #[arg(short, long)]
    pub config_file: Option<String>,

    /// Override number of blocks
    #[arg(long)]
    pub blocks: Option<usize>,

    /// Override steps per block
    #[arg(long)]
    pub steps: Option<usize>,

    /// Override time step
    #[arg(long, value_parser = parse_real)]
    pub time_step: Option<f64>,

    /// Override number of atoms
    #[arg(long)]
    pub atoms: Option<usize>,

    /// Override number density (clears any configured box length)
    #[arg(long, value_parser = parse_real)]
    pub density: Option<f64>,

    /// Override box side (clears any configured density)
    #[arg(long, value_parser = parse_real)]
    pub box_length: Option<f64>,

    /// Temperature for the initial velocities and the thermostat
    #[arg(long, value_parser = parse_real)]
    pub temperature: Option<f64>,

    /// Override cutoff radius
    #[arg(long, value_parser = parse_real)]
    pub cutoff: Option<f64>,

    /// Truncation mode (cut, cut_and_shifted or full)
    #[arg(long)]
    pub truncation: Option<Truncation>,

    /// Override ensemble
    #[arg(long, value_enum)]
    pub ensemble: Option<EnsembleArg>,

    /// Random seed for the initial velocities and the Andersen thermostat
    #[arg(long)]
    pub seed: Option<u64>,

    /// Start from a snapshot file instead of an fcc lattice
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Report file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Log file (default: stdout)
    #[arg(long)]
    pub log_file: Option<String>,

    /// Write the final configuration to this snapshot file
    #[arg(long)]
    pub final_snapshot: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Layer the command-line overrides on top of `config`
    pub fn apply(&self, mut config: MdConfig) -> MdConfig {
        let sim = &mut config.simulation;
        if let Some(blocks) = self.blocks {
            sim.n_blocks = blocks;
        }
        if let Some(steps) = self.steps {
            sim.steps_per_block = steps;
        }
        if let Some(dt) = self.time_step {
            sim.time_step = dt;
        }

        let system = &mut config.system;
        if let Some(n_atoms) = self.atoms {
            system.n_atoms = Some(n_atoms);
        }
        if let Some(density) = self.density {
            system.density = Some(density);
            system.box_length = None;
        }
        if let Some(length) = self.box_length {
            system.box_length = Some(length);
            system.density = None;
        }
        if let Some(path) = &self.snapshot {
            system.initial = InitialConfig::Snapshot { path: path.clone() };
        }
        if let InitialConfig::FccLattice { temperature, seed } = &mut system.initial {
            if let Some(t) = self.temperature {
                *temperature = t;
            }
            if self.seed.is_some() {
                *seed = self.seed;
            }
        }

        if let Some(cutoff) = self.cutoff {
            config.potential.cutoff = cutoff;
        }
        if let Some(truncation) = self.truncation {
            config.potential.truncation = truncation;
        }

        let lattice_temperature = match &config.system.initial {
            InitialConfig::FccLattice { temperature, .. } => Some(*temperature),
            InitialConfig::Snapshot { .. } => None,
        };
        let ensemble = &mut config.simulation.ensemble;
        let target = self
            .temperature
            .or(ensemble.target_temperature())
            .or(lattice_temperature)
            .unwrap_or(1.0);
        if let Some(choice) = self.ensemble {
            *ensemble = match (choice, &*ensemble) {
                (EnsembleArg::Nve, _) => EnsembleConfig::NVE,
                (EnsembleArg::VelocityRescale, EnsembleConfig::VelocityRescale { interval, .. }) => {
                    EnsembleConfig::VelocityRescale {
                        temperature: target,
                        interval: *interval,
                    }
                }
                (EnsembleArg::VelocityRescale, _) => EnsembleConfig::VelocityRescale {
                    temperature: target,
                    interval: 1,
                },
                (
                    EnsembleArg::Andersen,
                    EnsembleConfig::Andersen {
                        collision_rate,
                        seed,
                        ..
                    },
                ) => EnsembleConfig::Andersen {
                    temperature: target,
                    collision_rate: *collision_rate,
                    seed: *seed,
                },
                (EnsembleArg::Andersen, _) => EnsembleConfig::Andersen {
                    temperature: target,
                    collision_rate: default_collision_rate(),
                    seed: None,
                },
            };
        }
        match ensemble {
            EnsembleConfig::NVE => {}
            EnsembleConfig::VelocityRescale { temperature, .. } => *temperature = target,
            EnsembleConfig::Andersen {
                temperature, seed, ..
            } => {
                *temperature = target;
                if self.seed.is_some() {
                    *seed = self.seed;
                }
            }
        }

        if self.output.is_some() {
            config.output.report = self.output.clone();
        }
        if self.log_file.is_some() {
            config.output.log_file = self.log_file.clone();
        }
        if self.final_snapshot.is_some() {
            config.output.final_snapshot = self.final_snapshot.clone();
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("ljmd").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_overrides() {
        let args = parse(&[]);
        assert_eq!(args.apply(MdConfig::default()), MdConfig::default());
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--blocks",
            "3",
            "--time-step",
            "0.002",
            "--atoms",
            "108",
            "--density",
            "0.8",
            "--truncation",
            "full",
            "--ensemble",
            "andersen",
            "--temperature",
            "1.5",
            "--seed",
            "11",
            "-vv",
        ]);
        assert_eq!(args.verbose, 2);

        let mut config = MdConfig::default();
        config.system.box_length = Some(7.0);
        let config = args.apply(config);

        assert_eq!(config.simulation.n_blocks, 3);
        assert_eq!(config.simulation.time_step, 0.002);
        assert_eq!(config.system.n_atoms(), 108);
        assert_eq!(config.system.density, Some(0.8));
        assert_eq!(config.system.box_length, None);
        assert_eq!(config.potential.truncation, Truncation::Full);
        assert_eq!(
            config.system.initial,
            InitialConfig::FccLattice {
                temperature: 1.5,
                seed: Some(11)
            }
        );
        assert_eq!(
            config.simulation.ensemble,
            EnsembleConfig::Andersen {
                temperature: 1.5,
                collision_rate: 1.0,
                seed: Some(11)
            }
        );
    }

    #[test]
    fn test_temperature_retargets_thermostat() {
        let mut config = MdConfig::default();
        config.simulation.ensemble = EnsembleConfig::VelocityRescale {
            temperature: 1.0,
            interval: 5,
        };
        let config = parse(&["--temperature", "0.9"]).apply(config);
        assert_eq!(
            config.simulation.ensemble,
            EnsembleConfig::VelocityRescale {
                temperature: 0.9,
                interval: 5
            }
        );
    }

    #[test]
    fn test_integer_float_rejected() {
        assert!(Args::try_parse_from(["ljmd", "--time-step", "1"]).is_err());
        assert!(Args::try_parse_from(["ljmd", "--density", "1"]).is_err());
        assert!(Args::try_parse_from(["ljmd", "--steps", "1.5"]).is_err());
        assert!(Args::try_parse_from(["ljmd", "--truncation", "smooth"]).is_err());
    }
}
