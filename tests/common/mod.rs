//! Common fixtures for the tracking integration tests

#![allow(dead_code)]

use nalgebra::{vector, Vector3};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use sqtrack::models::TrackerSensor;
use sqtrack::types::spaces::{StateCovariance, StateVector};

pub const DT: f64 = 0.1;
pub const SIGMA_RANGE: f64 = 0.05;
pub const SIGMA_BIAS: f64 = 0.02;
pub const SIGMA_ACCEL: f64 = 0.05;

/// Four trackers on the unit square at height 1, looking down at a target
/// moving near the ground plane.
pub fn tracker_positions() -> [Vector3<f64>; 4] {
    [
        Vector3::new(0.0, 0.0, 1.0),
        Vector3::new(1.0, 0.0, 1.0),
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(0.0, 1.0, 1.0),
    ]
}

pub fn sensors() -> Vec<TrackerSensor<f64>> {
    tracker_positions()
        .iter()
        .map(|p| TrackerSensor::new(*p, SIGMA_RANGE, SIGMA_RANGE))
        .collect()
}

/// Truth trajectory: constant velocity from (0.25, 0.25, 0).
pub fn truth_at(step: usize) -> Vector3<f64> {
    let start = Vector3::new(0.25, 0.25, 0.0);
    let velocity = Vector3::new(0.05, -0.02, 0.01);
    start + velocity * (DT * step as f64)
}

/// Fixed per-tracker position biases, deterministic so test expectations
/// are reproducible.
pub fn tracker_biases(noise: &Normal<f64>, rng: &mut StdRng) -> Vec<Vector3<f64>> {
    tracker_positions()
        .iter()
        .map(|_| Vector3::new(noise.sample(rng), noise.sample(rng), noise.sample(rng)))
        .collect()
}

/// One range per tracker, measured from the biased tracker positions with
/// additive noise.
pub fn noisy_ranges(
    target: &Vector3<f64>,
    biases: &[Vector3<f64>],
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> Vec<f64> {
    tracker_positions()
        .iter()
        .zip(biases.iter())
        .map(|(position, bias)| (target - (position + bias)).norm() + noise.sample(rng))
        .collect()
}

/// One bearing-component pair per tracker (first two components of the
/// unit line of sight from the biased tracker), with additive noise.
pub fn noisy_bearings(
    target: &Vector3<f64>,
    biases: &[Vector3<f64>],
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> Vec<(f64, f64)> {
    tracker_positions()
        .iter()
        .zip(biases.iter())
        .map(|(position, bias)| {
            let los = (target - (position + bias)).normalize();
            (los[0] + noise.sample(rng), los[1] + noise.sample(rng))
        })
        .collect()
}

/// Noiseless, bias-free ranges for exactness tests.
pub fn exact_ranges(target: &Vector3<f64>) -> Vec<f64> {
    tracker_positions()
        .iter()
        .map(|position| (target - position).norm())
        .collect()
}

/// A diffuse prior centered off the truth, shared by every variant.
pub fn diffuse_prior() -> (StateVector<f64, 6>, StateCovariance<f64, 6>) {
    (
        StateVector::from_array([0.4, 0.4, 0.2, 0.0, 0.0, 0.0]),
        StateCovariance::from_diagonal(&vector![1.0, 1.0, 1.0, 0.1, 0.1, 0.1]),
    )
}

pub fn position_error(mean: &StateVector<f64, 6>, truth: &Vector3<f64>) -> f64 {
    let p = Vector3::new(*mean.index(0), *mean.index(1), *mean.index(2));
    (p - truth).norm()
}
