/// Cosine similarity of two equal-length vectors. Returns `None` when the
/// lengths differ, and `0.0` when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let (mut dot, mut na, mut nb) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return Some(0.0);
    }
    Some(dot / (na.sqrt() * nb.sqrt()))
}

/// Element-wise mean of vectors that all have `dimensions` entries.
pub fn centroid<'a, I>(vectors: I, dimensions: usize) -> Option<Vec<f32>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut sum = vec![0.0_f64; dimensions];
    let mut count = 0_u32;
    for v in vectors {
        if v.len() != dimensions {
            continue;
        }
        for (acc, x) in sum.iter_mut().zip(v) {
            *acc += f64::from(*x);
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let n = f64::from(count);
    #[allow(clippy::cast_possible_truncation)]
    Some(sum.into_iter().map(|s| (s / n) as f32).collect())
}

/// Most frequent length among `lengths`; ties go to the length seen first.
pub fn dominant_dimension<I>(lengths: I) -> Option<usize>
where
    I: IntoIterator<Item = usize>,
{
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for len in lengths {
        match counts.iter_mut().find(|(l, _)| *l == len) {
            Some((_, c)) => *c += 1,
            None => counts.push((len, 1)),
        }
    }
    let mut best: Option<(usize, usize)> = None;
    for (len, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((len, count));
        }
    }
    best.map(|(len, _)| len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_and_opposite_vectors() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 4.0, 6.0];
        let c = [-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&a, &b).unwrap_or_default() - 1.0).abs() < 1e-9);
        assert!((cosine_similarity(&a, &c).unwrap_or_default() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_rejects_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), Some(0.0));
    }

    #[test]
    fn centroid_skips_other_dimensions() {
        let a = [1.0_f32, 0.0];
        let b = [0.0_f32, 1.0];
        let c = [5.0_f32, 5.0, 5.0];
        let mean = centroid([&a[..], &b[..], &c[..]], 2);
        assert_eq!(mean, Some(vec![0.5, 0.5]));
        assert_eq!(centroid([&c[..]], 2), None);
    }

    #[test]
    fn dominant_dimension_prefers_majority_then_first_seen() {
        assert_eq!(dominant_dimension([3, 4, 4]), Some(4));
        assert_eq!(dominant_dimension([4, 3, 3, 4]), Some(4));
        assert_eq!(dominant_dimension(std::iter::empty()), None);
    }
}
