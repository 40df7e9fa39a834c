//! Constant-velocity Kalman filter over the XYSR box state.
//!
//! State is `[cx, cy, s, r, vx, vy, vs]`: center, area, aspect ratio and the
//! velocities of the first three. Aspect ratio is assumed constant.

use ndarray::{Array1, Array2, s};

use crate::error::TrackerError;

pub const STATE_DIM: usize = 7;
pub const MEASUREMENT_DIM: usize = 4;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    process_noise: Array2<f64>,
    measurement_noise: Array2<f64>,
    initial_covariance: Array2<f64>,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut motion_mat = Array2::<f64>::eye(STATE_DIM);
        for i in 0..3 {
            motion_mat[[i, MEASUREMENT_DIM + i]] = 1.0;
        }

        let mut update_mat = Array2::<f64>::zeros((MEASUREMENT_DIM, STATE_DIM));
        for i in 0..MEASUREMENT_DIM {
            update_mat[[i, i]] = 1.0;
        }

        // Size is noisier than position.
        let mut measurement_noise = Array2::<f64>::eye(MEASUREMENT_DIM);
        measurement_noise.slice_mut(s![2.., 2..]).mapv_inplace(|v| v * 10.0);

        // Velocities are unobserved at initiation.
        let mut initial_covariance = Array2::<f64>::eye(STATE_DIM);
        initial_covariance
            .slice_mut(s![4.., 4..])
            .mapv_inplace(|v| v * 1000.0);
        initial_covariance.mapv_inplace(|v| v * 10.0);

        // Area changes slowly.
        let mut process_noise = Array2::<f64>::eye(STATE_DIM);
        process_noise[[STATE_DIM - 1, STATE_DIM - 1]] *= 0.01;
        process_noise.slice_mut(s![4.., 4..]).mapv_inplace(|v| v * 0.01);

        Self {
            motion_mat,
            update_mat,
            process_noise,
            measurement_noise,
            initial_covariance,
        }
    }

    /// Create a track state from an unassociated XYSR measurement.
    pub fn initiate(&self, measurement: [f64; 4]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::<f64>::zeros(STATE_DIM);
        for i in 0..MEASUREMENT_DIM {
            mean[i] = measurement[i];
        }
        (mean, self.initial_covariance.clone())
    }

    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let new_mean = self.motion_mat.dot(mean);
        let new_covariance =
            self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + &self.process_noise;

        (new_mean, new_covariance)
    }

    /// Project the state distribution into measurement space.
    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + &self.measurement_noise;

        (mean_proj, covariance_proj)
    }

    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Result<(Array1<f64>, Array2<f64>), TrackerError> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let measurement_arr = Array1::from_vec(measurement.to_vec());
        let innovation = measurement_arr - projected_mean;

        // K = P * H^T * S^-1
        let s_inv = invert_4x4(&projected_cov).ok_or(TrackerError::SingularInnovation)?;
        let pht = covariance.dot(&self.update_mat.t()); // 7x4
        let kalman_gain = pht.dot(&s_inv); // 7x4

        let new_mean = mean + &kalman_gain.dot(&innovation);

        // Joseph form update.
        let i_kh = Array2::<f64>::eye(STATE_DIM) - kalman_gain.dot(&self.update_mat);
        let new_covariance = i_kh.dot(covariance).dot(&i_kh.t())
            + kalman_gain.dot(&self.measurement_noise).dot(&kalman_gain.t());

        Ok((new_mean, new_covariance))
    }
}

/// Invert a 4x4 matrix using nalgebra (pure Rust).
fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let nm = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]);
    let inv = nm.try_inverse()?;
    Some(Array2::from_shape_fn((4, 4), |(i, j)| inv[(i, j)]))
}
