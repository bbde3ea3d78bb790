//! Cross-variant equivalence tests
//!
//! Every filter variant implements the same Bayesian recursion in a
//! different numerical form. On a linear measurement model they must all
//! produce the same posterior, to within accumulated rounding.

#![cfg(feature = "alloc")]

mod common;

use common::{diffuse_prior, SIGMA_ACCEL, SIGMA_RANGE};
use nalgebra::Vector3;
use sqtrack::filters::kalman::{KalmanState, LinearizedKalmanFilter};
use sqtrack::filters::schmidt::{SchmidtKalmanFilter, SchmidtState};
use sqtrack::filters::srif::{
    BiasSrifFilter, BiasSrifObservation, BiasSrifState, CovarianceRecovery, SrifFilter,
    SrifObservation, SrifState,
};
use sqtrack::filters::ud::{UdFilter, UdState};
use sqtrack::models::ConstantVelocity3D;
use sqtrack::types::spaces::ConsiderCovariance;
use sqtrack::types::transforms::{ConsiderRow, ObservationRow};

/// Three fixed linear "sensors" spanning the position axes.
fn linear_rows() -> [ObservationRow<f64, 6>; 3] {
    [
        ObservationRow::from_row([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ObservationRow::from_row([0.0, 0.6, 0.8, 0.0, 0.0, 0.0]),
        ObservationRow::from_row([0.5, -0.5, 0.5, 0.0, 0.0, 0.0]),
    ]
}

/// A synthetic linear measurement per row, per step.
fn linear_measurement(step: usize, row_idx: usize) -> f64 {
    0.1 + 0.03 * step as f64 + 0.05 * row_idx as f64
}

#[test]
fn test_kalman_ud_and_srif_agree_on_linear_model() {
    let motion = ConstantVelocity3D::new(SIGMA_ACCEL);
    let kalman = LinearizedKalmanFilter::new(motion.clone());
    let ud = UdFilter::new(motion.clone());
    let srif = SrifFilter::new(motion);

    let (mean, cov) = diffuse_prior();
    let mut k_state = KalmanState::new(mean, cov.clone());
    let mut u_state = UdState::from_covariance(mean, &cov).unwrap();
    let mut s_state = SrifState::from_covariance(mean, &cov).unwrap();

    let obs_var = SIGMA_RANGE * SIGMA_RANGE;

    for step in 0..50 {
        k_state = kalman.predict(&k_state, 0.1);
        u_state = ud.predict(&u_state, 0.1);
        s_state = srif.predict(&s_state, 0.1);

        // Sequential variants recompute the residual against the running
        // mean; the SRIF takes the whole set against the predicted mean.
        // On a linear model both orders give the exact posterior.
        for (idx, row) in linear_rows().iter().enumerate() {
            let z = linear_measurement(step, idx);
            let residual = z - row.observe(&k_state.mean);
            k_state = kalman.update_scalar(&k_state, row, residual, obs_var).unwrap();

            let residual = z - row.observe(&u_state.mean);
            u_state = ud.update_scalar(&u_state, row, residual, obs_var).unwrap();
        }
        let observations: Vec<SrifObservation<f64>> = linear_rows()
            .iter()
            .enumerate()
            .map(|(idx, row)| SrifObservation {
                row: row.clone(),
                residual: linear_measurement(step, idx) - row.observe(&s_state.mean),
                sigma: SIGMA_RANGE,
            })
            .collect();
        s_state = srif.update(&s_state, &observations).unwrap();
    }

    let p_kalman = k_state.covariance.as_matrix().clone();
    let p_ud = u_state.covariance().as_matrix().clone();
    let p_srif = s_state.info.covariance().unwrap().as_matrix().clone();

    for i in 0..6 {
        assert!(
            (k_state.mean.index(i) - u_state.mean.index(i)).abs() < 1e-8,
            "U-D mean diverged from Kalman at component {}",
            i
        );
        assert!(
            (k_state.mean.index(i) - s_state.mean.index(i)).abs() < 1e-8,
            "SRIF mean diverged from Kalman at component {}",
            i
        );
        for j in 0..6 {
            assert!((p_kalman[(i, j)] - p_ud[(i, j)]).abs() < 1e-8);
            assert!((p_kalman[(i, j)] - p_srif[(i, j)]).abs() < 1e-8);
        }
    }
}

#[test]
fn test_schmidt_with_zero_consider_matches_kalman() {
    let motion = ConstantVelocity3D::new(SIGMA_ACCEL);
    let kalman = LinearizedKalmanFilter::new(motion.clone());
    let schmidt =
        SchmidtKalmanFilter::with_default_deflation(motion, ConsiderCovariance::<f64, 3>::zeros());

    let (mean, cov) = diffuse_prior();
    let mut k_state = KalmanState::new(mean, cov.clone());
    let mut s_state = SchmidtState::new(mean, cov);

    let obs_var = SIGMA_RANGE * SIGMA_RANGE;
    let bias_row = ConsiderRow::from_row([-0.6, -0.8, 0.0]);

    for step in 0..50 {
        k_state = kalman.predict(&k_state, 0.1);
        s_state = schmidt.predict(&s_state, 0.1);

        for (idx, row) in linear_rows().iter().enumerate() {
            let z = linear_measurement(step, idx);
            let residual = z - row.observe(&k_state.mean);
            k_state = kalman.update_scalar(&k_state, row, residual, obs_var).unwrap();

            let residual = z - row.observe(&s_state.mean);
            s_state = schmidt
                .update_scalar(&s_state, row, &bias_row, residual, obs_var)
                .unwrap();
        }
    }

    for i in 0..6 {
        assert!((k_state.mean.index(i) - s_state.mean.index(i)).abs() < 1e-9);
        for j in 0..6 {
            let a = k_state.covariance.as_matrix()[(i, j)];
            let b = s_state.covariance.as_matrix()[(i, j)];
            assert!((a - b).abs() < 1e-9);
        }
    }
}

#[test]
fn test_bias_srif_with_negligible_bias_matches_plain_srif() {
    let motion = ConstantVelocity3D::new(SIGMA_ACCEL);
    let plain = SrifFilter::new(motion.clone());
    let biased = BiasSrifFilter::new(motion, CovarianceRecovery::Bierman);

    let (mean, cov) = diffuse_prior();
    let tiny = ConsiderCovariance::from_diagonal(&Vector3::repeat(1e-16));
    let mut p_state = SrifState::from_covariance(mean, &cov).unwrap();
    let mut b_state = BiasSrifState::from_covariances(mean, &cov, &tiny).unwrap();

    let bias_row = ConsiderRow::from_row([-1.0, 0.0, 0.0]);

    for step in 0..20 {
        p_state = plain.predict(&p_state, 0.1);
        b_state = biased.predict(&b_state, 0.1);

        let plain_obs: Vec<SrifObservation<f64>> = linear_rows()
            .iter()
            .enumerate()
            .map(|(idx, row)| SrifObservation {
                row: row.clone(),
                residual: linear_measurement(step, idx) - row.observe(&p_state.mean),
                sigma: SIGMA_RANGE,
            })
            .collect();
        let bias_obs: Vec<BiasSrifObservation<f64>> = linear_rows()
            .iter()
            .enumerate()
            .map(|(idx, row)| BiasSrifObservation {
                row: row.clone(),
                bias_row: bias_row.clone(),
                residual: linear_measurement(step, idx) - row.observe(&b_state.mean),
                sigma: SIGMA_RANGE,
            })
            .collect();

        p_state = plain.update(&p_state, &plain_obs).unwrap();
        b_state = biased.update(&b_state, &bias_obs).unwrap();
    }

    let p_plain = p_state.info.covariance().unwrap();
    let p_bias = biased.covariance(&b_state).unwrap();

    for i in 0..6 {
        assert!((p_state.mean.index(i) - b_state.mean.index(i)).abs() < 1e-7);
        for j in 0..6 {
            assert!((p_plain.as_matrix()[(i, j)] - p_bias.as_matrix()[(i, j)]).abs() < 1e-7);
        }
    }
}
