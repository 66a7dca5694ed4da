//! Running LOLP / EPNS estimators and the coefficient-of-variation stopping
//! statistic.

use serde::{Deserialize, Serialize};

/// Running sums over Monte Carlo samples.
///
/// The LOLP indicator is 0/1, so its second moment equals its sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityAccumulator {
    pub samples: usize,
    pub sum_lolp: f64,
    pub sum_epns: f64,
    pub sum2_epns: f64,
}

impl ReliabilityAccumulator {
    /// Record one sample's total shed; shedding at or below `shed_tolerance`
    /// is not a loss of load.
    pub fn record(&mut self, shed: f64, shed_tolerance: f64) {
        self.samples += 1;
        if shed > shed_tolerance {
            self.sum_lolp += 1.0;
            self.sum_epns += shed;
            self.sum2_epns += shed * shed;
        }
    }

    /// Fold another accumulator in. Sums only, so merge order does not
    /// change the totals beyond floating-point rounding.
    pub fn merge(&mut self, other: &ReliabilityAccumulator) {
        self.samples += other.samples;
        self.sum_lolp += other.sum_lolp;
        self.sum_epns += other.sum_epns;
        self.sum2_epns += other.sum2_epns;
    }

    pub fn lolp(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.sum_lolp / self.samples as f64
        }
    }

    pub fn epns(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.sum_epns / self.samples as f64
        }
    }

    /// `max(cv(LOLP), cv(EPNS))` clipped to 1, where
    /// `var = (Σx² − n·mean²) / (n(n−1))`.
    ///
    /// `None` before two samples or while no loss of load was seen.
    pub fn beta(&self) -> Option<f64> {
        let n = self.samples as f64;
        let lolp = self.lolp();
        let epns = self.epns();
        if self.samples < 2 || lolp <= 0.0 || epns <= 0.0 {
            return None;
        }
        let cv = |sum2: f64, mean: f64| {
            let var = ((sum2 - n * mean * mean) / (n * (n - 1.0))).max(0.0);
            var.sqrt() / mean
        };
        let beta = cv(self.sum_lolp, lolp).max(cv(self.sum2_epns, epns));
        Some(beta.min(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_shedding_gives_zero_indices() {
        let mut acc = ReliabilityAccumulator::default();
        for _ in 0..10 {
            acc.record(0.0, 1e-6);
        }
        assert_eq!(acc.lolp(), 0.0);
        assert_eq!(acc.epns(), 0.0);
        assert_eq!(acc.beta(), None);
    }

    #[test]
    fn test_beta_matches_closed_form() {
        // 1 shed sample of 0.5 out of 4
        let mut acc = ReliabilityAccumulator::default();
        for shed in [0.0, 0.5, 0.0, 0.0] {
            acc.record(shed, 1e-6);
        }
        assert_eq!(acc.lolp(), 0.25);
        assert_eq!(acc.epns(), 0.125);
        // var_lolp = (1 - 4·0.0625)/12 = 0.0625, cv = 0.25/0.25 = 1
        assert!((acc.beta().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_beta_shrinks_with_samples() {
        let mut acc = ReliabilityAccumulator::default();
        for i in 0..400 {
            acc.record(if i % 2 == 0 { 0.3 } else { 0.0 }, 1e-6);
        }
        let beta = acc.beta().unwrap();
        assert!(beta < 0.06, "beta = {beta}");
    }

    #[test]
    fn test_merge_adds_sums() {
        let mut a = ReliabilityAccumulator::default();
        let mut b = ReliabilityAccumulator::default();
        a.record(0.2, 0.0);
        b.record(0.0, 0.0);
        b.record(0.4, 0.0);
        a.merge(&b);
        assert_eq!(a.samples, 3);
        assert!((a.epns() - 0.2).abs() < 1e-12);
        assert!((a.lolp() - 2.0 / 3.0).abs() < 1e-12);
    }
}
