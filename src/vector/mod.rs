//! Vector math over fixed-dimension embedding vectors.
//!
//! All caption and query vectors in the system are produced by the same
//! fixed-dimension encoder, so every comparator here requires equal-length
//! inputs and fails fast otherwise.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VectorError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Cosine distance assigned when either input has no direction (zero
/// magnitude); the worst value in the [0, 2] range.
pub const MAX_COSINE_DISTANCE: f32 = 2.0;

fn check_dimensions(a: &[f32], b: &[f32]) -> Result<(), VectorError> {
    if a.len() != b.len() {
        return Err(VectorError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Inner product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> Result<f32, VectorError> {
    check_dimensions(a, b)?;
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Cosine distance (`1 - cosine_similarity`) between two equal-length
/// vectors. Lower is more similar; range is [0, 2].
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32, VectorError> {
    let inner = dot(a, b)?;
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(MAX_COSINE_DISTANCE);
    }

    Ok(1.0 - inner / (mag_a * mag_b))
}

/// Euclidean (L2) distance between two equal-length vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32, VectorError> {
    check_dimensions(a, b)?;
    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert_eq!(dot(&a, &b).unwrap(), 32.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = [1.0, 2.0];
        let b = [1.0, 2.0, 3.0];

        let err = dot(&a, &b).unwrap_err();
        assert_eq!(
            err,
            VectorError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
        assert!(cosine_distance(&a, &b).is_err());
        assert!(euclidean_distance(&a, &b).is_err());
    }

    #[test]
    fn test_cosine_distance_identical() {
        let a = [0.5, 0.5, 0.0];
        let d = cosine_distance(&a, &a).unwrap();
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_orthogonal() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        let d = cosine_distance(&a, &b).unwrap();
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_opposite() {
        let a = [1.0, 0.0];
        let b = [-1.0, 0.0];
        let d = cosine_distance(&a, &b).unwrap();
        assert!((d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_zero_vector() {
        let a = [0.0, 0.0];
        let b = [1.0, 1.0];
        assert_eq!(cosine_distance(&a, &b).unwrap(), MAX_COSINE_DISTANCE);
    }

    #[test]
    fn test_euclidean_distance() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert!((euclidean_distance(&a, &b).unwrap() - 5.0).abs() < 1e-6);
    }
}
