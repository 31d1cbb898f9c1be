//! Small vector math helpers shared by the embedding, cache, and
//! datastore crates.

/// Scale a vector to unit length in place. Zero vectors are left as-is.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two vectors. Returns 0.0 on dimension
/// mismatch or zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector_alone() {
        let mut v = vec![0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.5, 0.5, 0.7];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn mismatched_dimensions_score_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn cosine_stays_in_range(
                a in proptest::collection::vec(-100.0f32..100.0, 1..64),
                b in proptest::collection::vec(-100.0f32..100.0, 1..64),
            ) {
                if a.len() == b.len() {
                    let s = cosine_similarity(&a, &b);
                    prop_assert!((-1.0 - 1e-6..=1.0 + 1e-6).contains(&s));
                    let t = cosine_similarity(&b, &a);
                    prop_assert!((s - t).abs() < 1e-9);
                }
            }

            #[test]
            fn normalized_vectors_are_unit_or_zero(
                mut v in proptest::collection::vec(-100.0f32..100.0, 1..64),
            ) {
                normalize(&mut v);
                let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                prop_assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-3);
            }
        }
    }
}
