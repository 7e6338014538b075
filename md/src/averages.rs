//! Block averaging of per-step observables.
//!
//! Every step contributes one [`StepSample`]. Within a block the samples are
//! reduced to means; the block means in turn give the run mean and its
//! standard error `sqrt(s²/n_blocks)`. The heat capacity is a fluctuation
//! property, so it is computed from the variance over the whole (unblocked)
//! trajectory, with the per-block values only used for its error bar.

/// Streaming mean and variance (Welford)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance, the fluctuation ⟨x²⟩ − ⟨x⟩²
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Unbiased sample variance, undefined below two samples
    pub fn sample_variance(&self) -> Option<f64> {
        if self.count < 2 {
            None
        } else {
            Some(self.m2 / (self.count - 1) as f64)
        }
    }

    /// Standard error of the mean treating every sample as independent
    pub fn standard_error(&self) -> Option<f64> {
        self.sample_variance()
            .map(|var| (var / self.count as f64).sqrt())
    }
}

/// Reported quantities, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observable {
    EnergyShifted,
    PressureShifted,
    EnergyFull,
    PressureFull,
    KineticTemperature,
    ConfigTemperature,
    HeatCapacityShifted,
    HeatCapacityFull,
}

const N_SAMPLED: usize = 6;
const N_OBSERVABLES: usize = 8;

impl Observable {
    pub const ALL: [Observable; N_OBSERVABLES] = [
        Observable::EnergyShifted,
        Observable::PressureShifted,
        Observable::EnergyFull,
        Observable::PressureFull,
        Observable::KineticTemperature,
        Observable::ConfigTemperature,
        Observable::HeatCapacityShifted,
        Observable::HeatCapacityFull,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Observable::EnergyShifted => "E/N (cut&shifted)",
            Observable::PressureShifted => "P (cut&shifted)",
            Observable::EnergyFull => "E/N (full)",
            Observable::PressureFull => "P (full)",
            Observable::KineticTemperature => "T (kin)",
            Observable::ConfigTemperature => "T (con)",
            Observable::HeatCapacityShifted => "Cv/N (cut&shifted)",
            Observable::HeatCapacityFull => "Cv/N (full)",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Instantaneous values recorded once per step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepSample {
    pub energy_shifted: f64,
    pub pressure_shifted: f64,
    pub energy_full: f64,
    pub pressure_full: f64,
    pub kinetic_temperature: f64,
    pub config_temperature: f64,
    /// K/N, drives the microcanonical heat capacity
    pub kinetic_per_atom: f64,
}

impl StepSample {
    fn sampled(&self) -> [f64; N_SAMPLED] {
        [
            self.energy_shifted,
            self.pressure_shifted,
            self.energy_full,
            self.pressure_full,
            self.kinetic_temperature,
            self.config_temperature,
        ]
    }
}

/// Fluctuation formula used for Cv
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeatCapacityMethod {
    /// NVE: from kinetic-energy fluctuations, Cv/N = 9 / (6 − 4N·Var(K/N)/T²)
    Microcanonical,
    /// NVT: from total-energy fluctuations, Cv/N = N·Var(E/N)/T²
    Canonical { temperature: f64 },
}

#[derive(Debug, Clone, Copy, Default)]
struct Fluctuations {
    kinetic: RunningStats,
    energy_shifted: RunningStats,
    energy_full: RunningStats,
    temperature: RunningStats,
}

impl Fluctuations {
    fn push(&mut self, sample: &StepSample) {
        self.kinetic.push(sample.kinetic_per_atom);
        self.energy_shifted.push(sample.energy_shifted);
        self.energy_full.push(sample.energy_full);
        self.temperature.push(sample.kinetic_temperature);
    }

    /// (cut&shifted, full) heat capacity per atom.
    ///
    /// The microcanonical formula diverges once 4N·Var(K/N)/T² reaches 6, which
    /// short blocks can hit; such an estimate is NaN.
    fn heat_capacity(&self, method: HeatCapacityMethod, n_atoms: usize) -> (f64, f64) {
        let n = n_atoms as f64;
        match method {
            HeatCapacityMethod::Microcanonical => {
                let t = self.temperature.mean();
                let denominator = 6.0 - 4.0 * n * self.kinetic.variance() / (t * t);
                let cv = if denominator > 0.0 && denominator.is_finite() {
                    9.0 / denominator
                } else {
                    f64::NAN
                };
                (cv, cv)
            }
            HeatCapacityMethod::Canonical { temperature } => {
                let t2 = temperature * temperature;
                (
                    n * self.energy_shifted.variance() / t2,
                    n * self.energy_full.variance() / t2,
                )
            }
        }
    }
}

/// Mean and standard error of one observable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub mean: f64,
    pub std_error: Option<f64>,
}

/// Means of one finished block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSummary {
    pub index: usize,
    pub steps: u64,
    values: [f64; N_OBSERVABLES],
}

impl BlockSummary {
    pub fn get(&self, observable: Observable) -> f64 {
        self.values[observable.index()]
    }
}

/// Final run statistics
#[derive(Debug, Clone, PartialEq)]
pub struct RunAverages {
    pub blocks: usize,
    pub steps: u64,
    values: [Estimate; N_OBSERVABLES],
}

impl RunAverages {
    pub fn get(&self, observable: Observable) -> Estimate {
        self.values[observable.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Observable, Estimate)> + '_ {
        Observable::ALL.iter().map(move |&obs| (obs, self.get(obs)))
    }
}

#[derive(Debug, Clone)]
pub struct ObservableAccumulator {
    n_atoms: usize,
    method: HeatCapacityMethod,
    block: [RunningStats; N_SAMPLED],
    block_fluctuations: Fluctuations,
    trajectory: Fluctuations,
    block_means: [RunningStats; N_OBSERVABLES],
    blocks_done: usize,
}

impl ObservableAccumulator {
    pub fn new(n_atoms: usize, method: HeatCapacityMethod) -> Self {
        ObservableAccumulator {
            n_atoms,
            method,
            block: [RunningStats::default(); N_SAMPLED],
            block_fluctuations: Fluctuations::default(),
            trajectory: Fluctuations::default(),
            block_means: [RunningStats::default(); N_OBSERVABLES],
            blocks_done: 0,
        }
    }

    pub fn sample(&mut self, sample: &StepSample) {
        for (stats, value) in self.block.iter_mut().zip(sample.sampled()) {
            stats.push(value);
        }
        self.block_fluctuations.push(sample);
        self.trajectory.push(sample);
    }

    /// Steps sampled so far in the open block
    pub fn block_steps(&self) -> u64 {
        self.block[0].count()
    }

    /// Close the open block, fold its means into the run statistics and start a new one
    pub fn end_block(&mut self) -> BlockSummary {
        let steps = self.block_steps();
        let mut values = [0.0; N_OBSERVABLES];
        for (value, stats) in values.iter_mut().zip(&self.block) {
            *value = stats.mean();
        }
        let (cv_shifted, cv_full) = self
            .block_fluctuations
            .heat_capacity(self.method, self.n_atoms);
        values[Observable::HeatCapacityShifted.index()] = cv_shifted;
        values[Observable::HeatCapacityFull.index()] = cv_full;

        if steps > 0 {
            // a NaN block Cv carries no information for the error bar
            for (stats, &value) in self.block_means.iter_mut().zip(&values) {
                if value.is_finite() {
                    stats.push(value);
                }
            }
            self.blocks_done += 1;
        }

        self.block = [RunningStats::default(); N_SAMPLED];
        self.block_fluctuations = Fluctuations::default();

        BlockSummary {
            index: self.blocks_done,
            steps,
            values,
        }
    }

    pub fn blocks_done(&self) -> usize {
        self.blocks_done
    }

    /// Run means with block-average errors. Cv comes from the whole trajectory.
    pub fn averages(&self) -> RunAverages {
        let mut values = [Estimate {
            mean: 0.0,
            std_error: None,
        }; N_OBSERVABLES];
        for (estimate, stats) in values.iter_mut().zip(&self.block_means) {
            *estimate = Estimate {
                mean: stats.mean(),
                std_error: stats.standard_error(),
            };
        }
        let (cv_shifted, cv_full) = self.trajectory.heat_capacity(self.method, self.n_atoms);
        values[Observable::HeatCapacityShifted.index()].mean = cv_shifted;
        values[Observable::HeatCapacityFull.index()].mean = cv_full;

        RunAverages {
            blocks: self.blocks_done,
            steps: self.trajectory.kinetic.count(),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_with_energy(e: f64, ke: f64, t: f64) -> StepSample {
        StepSample {
            energy_shifted: e,
            pressure_shifted: 1.0,
            energy_full: e - 0.5,
            pressure_full: 0.5,
            kinetic_temperature: t,
            config_temperature: t,
            kinetic_per_atom: ke,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::new();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.push(x);
        }
        assert_eq!(stats.count(), 8);
        assert_relative_eq!(stats.mean(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(stats.variance(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(stats.sample_variance().unwrap(), 32.0 / 7.0, epsilon = 1e-12);
        assert_relative_eq!(stats.standard_error().unwrap(), (32.0 / 7.0 / 8.0_f64).sqrt(), epsilon = 1e-12);

        let mut single = RunningStats::new();
        single.push(1.0);
        assert!(single.standard_error().is_none());
    }

    #[test]
    fn test_block_means_and_error() {
        let mut acc = ObservableAccumulator::new(10, HeatCapacityMethod::Canonical { temperature: 1.0 });
        // three blocks with means 1, 2, 3
        for block in 0..3 {
            let centre = (block + 1) as f64;
            acc.sample(&sample_with_energy(centre - 0.5, 1.5, 1.0));
            acc.sample(&sample_with_energy(centre + 0.5, 1.5, 1.0));
            let summary = acc.end_block();
            assert_eq!(summary.index, block + 1);
            assert_eq!(summary.steps, 2);
            assert_relative_eq!(summary.get(Observable::EnergyShifted), centre, epsilon = 1e-12);
            assert_relative_eq!(summary.get(Observable::EnergyFull), centre - 0.5, epsilon = 1e-12);
            // Cv within the block: N * 0.25 / T²
            assert_relative_eq!(summary.get(Observable::HeatCapacityShifted), 2.5, epsilon = 1e-12);
        }

        let averages = acc.averages();
        assert_eq!(averages.blocks, 3);
        assert_eq!(averages.steps, 6);
        let energy = averages.get(Observable::EnergyShifted);
        assert_relative_eq!(energy.mean, 2.0, epsilon = 1e-12);
        // s² of (1, 2, 3) is 1, error sqrt(1/3)
        assert_relative_eq!(energy.std_error.unwrap(), (1.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
        let pressure = averages.get(Observable::PressureShifted);
        assert_relative_eq!(pressure.std_error.unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_heat_capacity_uses_full_trajectory_variance() {
        let n_atoms = 10;
        let mut acc = ObservableAccumulator::new(n_atoms, HeatCapacityMethod::Canonical { temperature: 2.0 });
        // constant within each block, so block-internal variance vanishes
        for block in 0..4 {
            let e = if block % 2 == 0 { -1.0 } else { 1.0 };
            for _ in 0..5 {
                acc.sample(&sample_with_energy(e, 1.5, 2.0));
            }
            let summary = acc.end_block();
            assert_relative_eq!(summary.get(Observable::HeatCapacityShifted), 0.0, epsilon = 1e-12);
        }
        let cv = acc.averages().get(Observable::HeatCapacityShifted);
        // Var(E/N) = 1 over the trajectory, Cv/N = 10 * 1 / 4
        assert_relative_eq!(cv.mean, 2.5, epsilon = 1e-12);
        assert_relative_eq!(cv.std_error.unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_microcanonical_heat_capacity() {
        let mut acc = ObservableAccumulator::new(100, HeatCapacityMethod::Microcanonical);
        // no kinetic fluctuations: Cv/N = 9/6
        for _ in 0..10 {
            acc.sample(&sample_with_energy(-3.0, 1.5, 1.0));
        }
        acc.end_block();
        let averages = acc.averages();
        assert_relative_eq!(averages.get(Observable::HeatCapacityShifted).mean, 1.5, epsilon = 1e-12);
        assert_relative_eq!(averages.get(Observable::HeatCapacityFull).mean, 1.5, epsilon = 1e-12);

        // Var(K/N) = 0.0025 at T = 1 with N = 100: 9 / (6 - 1) = 1.8
        let mut acc = ObservableAccumulator::new(100, HeatCapacityMethod::Microcanonical);
        acc.sample(&sample_with_energy(-3.0, 1.45, 1.0));
        acc.sample(&sample_with_energy(-3.0, 1.55, 1.0));
        acc.end_block();
        assert_relative_eq!(acc.averages().get(Observable::HeatCapacityShifted).mean, 1.8, epsilon = 1e-12);
    }

    #[test]
    fn test_divergent_microcanonical_block() {
        let mut acc = ObservableAccumulator::new(100, HeatCapacityMethod::Microcanonical);
        // 4N·Var(K/N)/T² = 100 > 6
        acc.sample(&sample_with_energy(-3.0, 1.0, 1.0));
        acc.sample(&sample_with_energy(-3.0, 2.0, 1.0));
        let summary = acc.end_block();
        assert!(summary.get(Observable::HeatCapacityShifted).is_nan());

        for _ in 0..2 {
            for _ in 0..4 {
                acc.sample(&sample_with_energy(-3.0, 1.5, 1.0));
            }
            let summary = acc.end_block();
            assert_relative_eq!(summary.get(Observable::HeatCapacityShifted), 1.5, epsilon = 1e-12);
        }

        let averages = acc.averages();
        assert_eq!(averages.blocks, 3);
        let cv = averages.get(Observable::HeatCapacityShifted);
        assert_relative_eq!(cv.std_error.unwrap(), 0.0, epsilon = 1e-12);
        assert!(averages.get(Observable::EnergyShifted).std_error.is_some());
    }

    #[test]
    fn test_empty_block_is_not_counted() {
        let mut acc = ObservableAccumulator::new(4, HeatCapacityMethod::Microcanonical);
        let summary = acc.end_block();
        assert_eq!(summary.steps, 0);
        assert_eq!(acc.blocks_done(), 0);
    }

    #[test]
    fn test_observable_names_in_report_order() {
        let names: Vec<_> = Observable::ALL.iter().map(|o| o.name()).collect();
        assert_eq!(names[0], "E/N (cut&shifted)");
        assert_eq!(names[7], "Cv/N (full)");
        for (i, obs) in Observable::ALL.iter().enumerate() {
            assert_eq!(obs.index(), i);
        }
    }
}
