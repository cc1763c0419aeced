//! Embedding vectors and the similarity math over them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a raw feature vector cannot be turned into a unit vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DegenerateEmbedding {
    #[error("feature vector is empty")]
    Empty,
    #[error("feature vector has zero norm")]
    ZeroNorm,
    #[error("feature vector contains non-finite values")]
    NonFinite,
}

/// An embedding scaled to L2 norm 1.0.
///
/// The only way to build one is [`UnitVector::normalize`], so a value of this type never
/// carries NaN or infinity and never has zero length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct UnitVector(Vec<f32>);

impl UnitVector {
    /// Scales `raw` to unit length: `v' = v / ||v||₂`.
    pub fn normalize(mut raw: Vec<f32>) -> Result<Self, DegenerateEmbedding> {
        if raw.is_empty() {
            return Err(DegenerateEmbedding::Empty);
        }
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(DegenerateEmbedding::NonFinite);
        }
        let norm = l2_norm(&raw);
        if norm == 0.0 || !norm.is_finite() {
            return Err(DegenerateEmbedding::ZeroNorm);
        }
        for v in raw.iter_mut() {
            *v /= norm;
        }
        Ok(Self(raw))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dims(&self) -> usize {
        self.0.len()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl TryFrom<Vec<f32>> for UnitVector {
    type Error = DegenerateEmbedding;

    fn try_from(raw: Vec<f32>) -> Result<Self, Self::Error> {
        Self::normalize(raw)
    }
}

impl From<UnitVector> for Vec<f32> {
    fn from(v: UnitVector) -> Self {
        v.0
    }
}

/// Two vectors of different widths were compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("vector length mismatch: {left} vs {right}")]
pub struct LengthMismatch {
    pub left: usize,
    pub right: usize,
}

/// Euclidean norm, accumulated in f64.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter()
        .map(|x| {
            let x = f64::from(*x);
            x * x
        })
        .sum::<f64>()
        .sqrt() as f32
}

/// Cosine similarity `dot(a,b) / (||a|| * ||b||)`.
///
/// A zero denominator is clamped to 1.0, so a zero vector scores 0 rather than NaN.
/// Widths must match.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, LengthMismatch> {
    if a.len() != b.len() {
        return Err(LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let mut denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        denom = 1.0;
    }
    Ok(((dot / denom) as f32).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_norm() {
        let v = UnitVector::normalize(vec![3.0, 4.0]).unwrap();
        assert_eq!(v.as_slice(), &[0.6, 0.8]);
        assert!((l2_norm(v.as_slice()) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_rejects_zero_vector() {
        assert_eq!(
            UnitVector::normalize(vec![0.0; 512]),
            Err(DegenerateEmbedding::ZeroNorm)
        );
    }

    #[test]
    fn normalize_rejects_nan_and_empty() {
        assert_eq!(
            UnitVector::normalize(vec![1.0, f32::NAN]),
            Err(DegenerateEmbedding::NonFinite)
        );
        assert_eq!(UnitVector::normalize(vec![]), Err(DegenerateEmbedding::Empty));
    }

    #[test]
    fn deserializing_normalizes() {
        let v: UnitVector = serde_json::from_str("[0.0, 2.0]").unwrap();
        assert_eq!(v.as_slice(), &[0.0, 1.0]);
        assert!(serde_json::from_str::<UnitVector>("[0.0, 0.0]").is_err());
    }

    #[test]
    fn cosine_of_identical_and_opposite() {
        let a = [1.0, 2.0, 3.0];
        let b = [-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&a, &b).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector_scores_zero() {
        let score = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn cosine_rejects_mismatched_widths() {
        assert_eq!(
            cosine_similarity(&[1.0, 0.0], &[1.0]),
            Err(LengthMismatch { left: 2, right: 1 })
        );
    }
}
