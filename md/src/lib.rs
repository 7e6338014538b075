//! Molecular dynamics of the Lennard-Jones fluid in a cubic periodic box.

pub mod averages;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod lattice;
pub mod lj_pot;
pub mod pbc;
pub mod run_md;
pub mod state;
pub mod thermostat;

pub use averages::{Estimate, Observable, ObservableAccumulator, RunAverages, StepSample};
pub use config::MdConfig;
pub use engine::{RunParameters, RunReport, Simulation};
pub use error::{MdError, Result};
pub use lj_pot::{LennardJones, PairTotals, Truncation};
pub use pbc::SimulationBox;
pub use run_md::{ForceProvider, Integrator, VelocityVerlet};
pub use state::ParticleSet;
pub use thermostat::Thermostat;
