use nalgebra::Vector3;

/// Positions, velocities and forces of N identical particles.
///
/// The run driver owns the set; the integrator moves positions and velocities,
/// the thermostat touches only velocities, the force provider fills `forces`.
#[derive(Debug, Clone)]
pub struct ParticleSet {
    pub positions: Vec<Vector3<f64>>,
    pub velocities: Vec<Vector3<f64>>,
    pub forces: Vec<Vector3<f64>>,
    pub mass: f64,
}

impl ParticleSet {
    pub fn new(positions: Vec<Vector3<f64>>, velocities: Vec<Vector3<f64>>, mass: f64) -> Self {
        debug_assert_eq!(positions.len(), velocities.len());
        let forces = vec![Vector3::zeros(); positions.len()];
        ParticleSet {
            positions,
            velocities,
            forces,
            mass,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocities.iter().map(|v| v.norm_squared()).sum::<f64>()
    }

    pub fn total_momentum(&self) -> Vector3<f64> {
        self.velocities.iter().sum::<Vector3<f64>>() * self.mass
    }

    /// Σ|f_i|², the numerator of the configurational temperature
    pub fn force_sq(&self) -> f64 {
        self.forces.iter().map(|f| f.norm_squared()).sum()
    }

    /// Instantaneous kinetic temperature for `dof` degrees of freedom (k_B = 1)
    pub fn temperature(&self, dof: usize) -> f64 {
        2.0 * self.kinetic_energy() / dof as f64
    }

    /// Remove centre-of-mass motion
    pub fn remove_drift(&mut self) {
        if self.velocities.is_empty() {
            return;
        }
        let v_cm: Vector3<f64> =
            self.velocities.iter().sum::<Vector3<f64>>() / self.velocities.len() as f64;
        for v in &mut self.velocities {
            *v -= v_cm;
        }
    }

    /// Scale every velocity so the kinetic temperature equals `target`.
    /// Returns the applied factor, or `None` when the set is at rest.
    pub fn rescale_to_temperature(&mut self, target: f64, dof: usize) -> Option<f64> {
        let current = self.temperature(dof);
        if current <= 0.0 {
            return None;
        }
        let lambda = (target / current).sqrt();
        for v in &mut self.velocities {
            *v *= lambda;
        }
        Some(lambda)
    }
}

/// Degrees of freedom of N particles, less three when total momentum is pinned
pub fn degrees_of_freedom(n_atoms: usize, momentum_fixed: bool) -> usize {
    let dof = 3 * n_atoms;
    if momentum_fixed && n_atoms > 1 {
        dof - 3
    } else {
        dof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_set() -> ParticleSet {
        let positions = vec![Vector3::zeros(); 3];
        let velocities = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(0.5, 0.5, -1.0),
        ];
        ParticleSet::new(positions, velocities, 2.0)
    }

    #[test]
    fn test_kinetic_energy() {
        let set = sample_set();
        // 0.5 * 2 * (1 + 4 + 1.5)
        assert_relative_eq!(set.kinetic_energy(), 6.5, epsilon = 1e-12);
        assert_relative_eq!(set.temperature(9), 13.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_remove_drift() {
        let mut set = sample_set();
        set.remove_drift();
        assert!(set.total_momentum().norm() < 1e-12);
    }

    #[test]
    fn test_rescale_hits_target() {
        let mut set = sample_set();
        set.remove_drift();
        let dof = degrees_of_freedom(set.len(), true);
        let lambda = set.rescale_to_temperature(0.7, dof).unwrap();
        assert!(lambda > 0.0);
        assert_relative_eq!(set.temperature(dof), 0.7, epsilon = 1e-12);

        let mut resting = ParticleSet::new(vec![Vector3::zeros(); 2], vec![Vector3::zeros(); 2], 1.0);
        assert!(resting.rescale_to_temperature(1.0, 6).is_none());
    }

    #[test]
    fn test_degrees_of_freedom() {
        assert_eq!(degrees_of_freedom(256, true), 765);
        assert_eq!(degrees_of_freedom(256, false), 768);
        assert_eq!(degrees_of_freedom(1, true), 3);
    }
}
