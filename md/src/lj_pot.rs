use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{MdError, Result};
use crate::pbc::SimulationBox;
use crate::run_md::ForceProvider;

/// Pairs closer than this in (σ/r)² carry more than ~100ε and abort the run.
const OVERLAP_SR2: f64 = 1.77;

/// How the pair potential is truncated at the cutoff radius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    /// Zero beyond r_c, discontinuous at r_c
    Cut,
    /// V(r) - V(r_c) inside r_c, continuous (zero) at r_c
    CutAndShifted,
    /// Every minimum-image pair contributes
    Full,
}

impl fmt::Display for Truncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Truncation::Cut => "cut",
            Truncation::CutAndShifted => "cut_and_shifted",
            Truncation::Full => "full",
        };
        f.write_str(name)
    }
}

impl FromStr for Truncation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "cut" => Ok(Truncation::Cut),
            "cut_and_shifted" | "shifted" => Ok(Truncation::CutAndShifted),
            "full" => Ok(Truncation::Full),
            other => Err(format!(
                "unknown truncation '{}', expected one of: cut, cut_and_shifted, full",
                other
            )),
        }
    }
}

/// Aggregates of one force evaluation.
///
/// `cut` is the plain truncated sum, `shifted` subtracts V(r_c) for every pair
/// inside the cutoff. The virial is Σ r_ij·f_ij, the Laplacian is Σ_i ∇²_i V.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairTotals {
    pub cut: f64,
    pub shifted: f64,
    pub virial: f64,
    pub laplacian: f64,
    pub pairs_in_range: usize,
}

impl PairTotals {
    /// Potential energy in the accounting of the given truncation mode
    pub fn potential(&self, truncation: Truncation) -> f64 {
        match truncation {
            Truncation::Cut | Truncation::Full => self.cut,
            Truncation::CutAndShifted => self.shifted,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.cut.is_finite()
            && self.shifted.is_finite()
            && self.virial.is_finite()
            && self.laplacian.is_finite()
    }
}

/// Enumerates unordered pairs `(i, (i + k) mod n)` for `k = 1..=n/2`.
///
/// When `n` is even the last shift `k = n/2` would reach every pair twice over the
/// full index range, so only `i < n/2` is visited there.
#[derive(Debug, Clone)]
pub struct CyclicPairs {
    n: usize,
    shift: usize,
    i: usize,
}

pub fn cyclic_pairs(n: usize) -> CyclicPairs {
    CyclicPairs { n, shift: 1, i: 0 }
}

impl Iterator for CyclicPairs {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.shift <= self.n / 2 {
            let limit = if 2 * self.shift == self.n {
                self.n / 2
            } else {
                self.n
            };
            if self.i < limit {
                let pair = (self.i, (self.i + self.shift) % self.n);
                self.i += 1;
                return Some(pair);
            }
            self.shift += 1;
            self.i = 0;
        }
        None
    }
}

/// Lennard-Jones pair interaction in a cubic periodic box
#[derive(Debug, Clone)]
pub struct LennardJones {
    pub epsilon: f64,
    pub sigma: f64,
    pub cutoff: f64,
    pub truncation: Truncation,
    pub sim_box: SimulationBox,
}

impl LennardJones {
    pub fn new(
        epsilon: f64,
        sigma: f64,
        cutoff: f64,
        truncation: Truncation,
        sim_box: SimulationBox,
    ) -> Self {
        LennardJones {
            epsilon,
            sigma,
            cutoff,
            truncation,
            sim_box,
        }
    }

    /// Reduced units, ε = σ = 1
    pub fn reduced(cutoff: f64, truncation: Truncation, sim_box: SimulationBox) -> Self {
        Self::new(1.0, 1.0, cutoff, truncation, sim_box)
    }

    /// The cutoff sphere must fit inside the minimum-image cell
    pub fn check_cutoff(&self) -> Result<()> {
        if self.truncation == Truncation::Full {
            return Ok(());
        }
        let half_box = 0.5 * self.sim_box.length();
        if self.cutoff > half_box {
            return Err(MdError::CutoffTooLarge {
                cutoff: self.cutoff,
                half_box,
            });
        }
        Ok(())
    }

    fn cutoff_sq(&self) -> f64 {
        match self.truncation {
            Truncation::Full => f64::INFINITY,
            Truncation::Cut | Truncation::CutAndShifted => self.cutoff * self.cutoff,
        }
    }

    /// Untruncated 4ε[(σ/r)¹² − (σ/r)⁶] at squared distance `r2`
    pub fn lj_potential(&self, r2: f64) -> f64 {
        let sr2 = self.sigma * self.sigma / r2;
        let sr6 = sr2 * sr2 * sr2;
        4.0 * self.epsilon * (sr6 * sr6 - sr6)
    }

    /// V(r_c), the constant removed from every pair in cut-and-shifted mode
    pub fn shift(&self) -> f64 {
        match self.truncation {
            Truncation::Full => 0.0,
            Truncation::Cut | Truncation::CutAndShifted => {
                self.lj_potential(self.cutoff * self.cutoff)
            }
        }
    }

    /// Pair energy at distance `r` as seen by the configured truncation
    pub fn pair_potential(&self, r: f64) -> f64 {
        let r2 = r * r;
        if r2 > self.cutoff_sq() {
            return 0.0;
        }
        match self.truncation {
            Truncation::CutAndShifted => self.lj_potential(r2) - self.shift(),
            Truncation::Cut | Truncation::Full => self.lj_potential(r2),
        }
    }

    /// Per-atom energy tail correction for a uniform fluid beyond r_c
    pub fn potential_lrc(&self, density: f64) -> f64 {
        if self.truncation == Truncation::Full {
            return 0.0;
        }
        let sr3 = (self.sigma / self.cutoff).powi(3);
        PI * self.epsilon * self.sigma.powi(3) * density
            * ((8.0 / 9.0) * sr3 * sr3 * sr3 - (8.0 / 3.0) * sr3)
    }

    /// Pressure tail correction for a uniform fluid beyond r_c
    pub fn pressure_lrc(&self, density: f64) -> f64 {
        if self.truncation == Truncation::Full {
            return 0.0;
        }
        let sr3 = (self.sigma / self.cutoff).powi(3);
        PI * self.epsilon * self.sigma.powi(3) * density * density
            * ((32.0 / 9.0) * sr3 * sr3 * sr3 - (16.0 / 3.0) * sr3)
    }

    /// Impulsive pressure term from the step of the plain cut potential at r_c
    pub fn pressure_delta(&self, density: f64) -> f64 {
        if self.truncation == Truncation::Full {
            return 0.0;
        }
        let sr3 = (self.sigma / self.cutoff).powi(3);
        PI * (8.0 / 3.0) * self.epsilon * self.sigma.powi(3) * density * density
            * (sr3 * sr3 * sr3 - sr3)
    }
}

impl ForceProvider for LennardJones {
    fn compute_forces(
        &self,
        positions: &[Vector3<f64>],
        forces: &mut [Vector3<f64>],
    ) -> Result<PairTotals> {
        debug_assert_eq!(positions.len(), forces.len());
        let sigma2 = self.sigma * self.sigma;
        let r_cut2 = self.cutoff_sq();
        let shift = self.shift();

        forces.iter_mut().for_each(|f| *f = Vector3::zeros());
        let mut totals = PairTotals::default();

        for (i, j) in cyclic_pairs(positions.len()) {
            let rij = self.sim_box.minimum_image(positions[i] - positions[j]);
            let r2 = rij.norm_squared();
            if r2 > r_cut2 {
                continue;
            }

            let sr2 = sigma2 / r2;
            if sr2 > OVERLAP_SR2 {
                return Err(MdError::Overlap {
                    i,
                    j,
                    distance: r2.sqrt(),
                });
            }
            let sr6 = sr2 * sr2 * sr2;
            let sr12 = sr6 * sr6;

            let pot = 4.0 * self.epsilon * (sr12 - sr6);
            let vir = 24.0 * self.epsilon * (2.0 * sr12 - sr6);
            let fij = rij * (vir / r2);

            forces[i] += fij;
            forces[j] -= fij;

            totals.cut += pot;
            totals.shifted += pot - shift;
            totals.virial += vir;
            // ∇²v = v'' + 2v'/r, counted once for each partner
            totals.laplacian += 2.0 * 24.0 * self.epsilon * (22.0 * sr12 - 5.0 * sr6) / r2;
            totals.pairs_in_range += 1;
        }

        Ok(totals)
    }
}
