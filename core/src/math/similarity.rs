//! Vector similarity. Grounded on the teacher's
//! `memory-core/src/embeddings/similarity.rs`: one `cosine_similarity`
//! shared by the synergy engine's device-embedding augmentation (§4.4), the
//! entity resolver's semantic signal (§4.7), and the retrieval cache's
//! nearest-neighbor lookup (§4.9).

/// Cosine similarity rescaled from `[-1,1]` to `[0,1]`. Returns `0.0` for
/// mismatched dimensions or zero vectors rather than panicking, since
/// callers treat "no similarity" and "incomparable" the same way.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let mag_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    ((dot / (mag_a * mag_b)) + 1.0) / 2.0
}

/// Raw (not rescaled) cosine similarity in `[-1,1]`, used where callers need
/// the signed value directly (e.g. combined with other signed features).
#[must_use]
pub fn cosine_similarity_signed(a: &[f32], b: &[f32]) -> f64 {
    cosine_similarity(a, b) * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_half() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((cosine_similarity(&a, &b) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn mismatched_dimensions_yield_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn zero_vector_yields_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
