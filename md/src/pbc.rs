use nalgebra::Vector3;

/// Cubic periodic cell of side `length`.
///
/// Stored positions live in `[0, L)` on every axis (see [`SimulationBox::fold`]);
/// pair separations live in `[-L/2, L/2]` (see [`SimulationBox::minimum_image`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationBox {
    length: f64,
}

impl SimulationBox {
    pub fn new(length: f64) -> Self {
        SimulationBox { length }
    }

    /// Box holding `n_atoms` at number density `density`
    pub fn from_density(n_atoms: usize, density: f64) -> Self {
        Self::new((n_atoms as f64 / density).cbrt())
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn volume(&self) -> f64 {
        self.length * self.length * self.length
    }

    pub fn density(&self, n_atoms: usize) -> f64 {
        n_atoms as f64 / self.volume()
    }

    /// Fold a stored coordinate back into the canonical cell `[0, L)`.
    pub fn fold(&self, mut r: Vector3<f64>) -> Vector3<f64> {
        let l = self.length;
        for k in 0..3 {
            r[k] -= l * (r[k] / l).floor();
            // r/l can round across an integer, leaving r a few ulps outside the cell
            if r[k] >= l {
                r[k] -= l;
            }
            if r[k] < 0.0 {
                r[k] += l;
            }
            // -ulp + L rounds to L
            if r[k] >= l {
                r[k] = 0.0;
            }
        }
        r
    }

    /// Apply minimum-image convention to a separation vector
    pub fn minimum_image(&self, mut d: Vector3<f64>) -> Vector3<f64> {
        let l = self.length;
        for k in 0..3 {
            d[k] -= l * (d[k] / l).round();
        }
        d
    }
}
