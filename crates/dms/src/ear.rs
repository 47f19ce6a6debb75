//! Eye Aspect Ratio

use crate::landmarks::EyeLandmarks;
use crate::DmsError;

/// Eye Aspect Ratio: summed vertical lid distances over twice the corner
/// distance. Lower means more closed.
///
/// Fails with `DegenerateGeometry` when both corners coincide.
pub fn calculate_ear(eye: &EyeLandmarks) -> Result<f64, DmsError> {
    let p = eye.points();
    let a = p[1].distance(&p[5]);
    let b = p[2].distance(&p[4]);
    let c = p[0].distance(&p[3]);

    if c == 0.0 {
        return Err(DmsError::DegenerateGeometry);
    }

    Ok((a + b) / (2.0 * c))
}

/// Mean of both eyes, the per-frame signal fed to the scorer
pub fn mean_ear(left: f64, right: f64) -> f64 {
    (left + right) / 2.0
}
