use crate::error::{ClusterError, Result};
use std::collections::HashMap;
use std::hash::Hash;

fn pairs(n: u64) -> f64 {
    (n * n.saturating_sub(1) / 2) as f64
}

struct Contingency {
    n: u64,
    same_both: f64,
    same_a: f64,
    same_b: f64,
}

fn contingency<A: Eq + Hash, B: Eq + Hash>(a: &[A], b: &[B]) -> Result<Contingency> {
    if a.len() != b.len() {
        return Err(ClusterError::InvalidArgument(format!(
            "cannot compare partitions of {} and {} points",
            a.len(),
            b.len()
        )));
    }

    let mut joint = HashMap::new();
    let mut rows = HashMap::new();
    let mut cols = HashMap::new();
    for (x, y) in a.iter().zip(b) {
        *joint.entry((x, y)).or_insert(0u64) += 1;
        *rows.entry(x).or_insert(0u64) += 1;
        *cols.entry(y).or_insert(0u64) += 1;
    }

    Ok(Contingency {
        n: a.len() as u64,
        same_both: joint.values().map(|&c| pairs(c)).sum(),
        same_a: rows.values().map(|&c| pairs(c)).sum(),
        same_b: cols.values().map(|&c| pairs(c)).sum(),
    })
}

/// Fraction of point pairs on which two labelings agree (both together or both apart).
/// Fewer than two points agree trivially.
pub fn rand_index<A: Eq + Hash, B: Eq + Hash>(a: &[A], b: &[B]) -> Result<f64> {
    let c = contingency(a, b)?;
    let total = pairs(c.n);
    if total == 0.0 {
        return Ok(1.0);
    }
    let agree = total + 2.0 * c.same_both - c.same_a - c.same_b;
    Ok(agree / total)
}

/// Rand index corrected for chance (Hubert and Arabie). 1 for identical partitions, around 0
/// for independent ones.
pub fn adjusted_rand_index<A: Eq + Hash, B: Eq + Hash>(a: &[A], b: &[B]) -> Result<f64> {
    let c = contingency(a, b)?;
    let total = pairs(c.n);
    if total == 0.0 {
        return Ok(1.0);
    }
    let expected = c.same_a * c.same_b / total;
    let max = 0.5 * (c.same_a + c.same_b);
    if max == expected {
        // both labelings are all-singletons or all-one-cluster
        return Ok(if c.same_both == expected { 1.0 } else { 0.0 });
    }
    Ok((c.same_both - expected) / (max - expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identical_up_to_relabeling() {
        let a = [0, 0, 1, 1, 2, 2];
        let b = ["x", "x", "z", "z", "y", "y"];
        assert_abs_diff_eq!(rand_index(&a, &b).unwrap(), 1.0);
        assert_abs_diff_eq!(adjusted_rand_index(&a, &b).unwrap(), 1.0);
    }

    #[test]
    fn test_known_values() {
        let a = [0, 0, 0, 1, 1, 1];
        let b = [0, 0, 1, 1, 2, 2];
        // 15 pairs: 6 together in a, 3 together in b, 2 together in both
        assert_abs_diff_eq!(rand_index(&a, &b).unwrap(), 10.0 / 15.0, epsilon = 1e-12);
        let expected = 6.0 * 3.0 / 15.0;
        let ari = (2.0 - expected) / (4.5 - expected);
        assert_abs_diff_eq!(adjusted_rand_index(&a, &b).unwrap(), ari, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate() {
        assert_eq!(rand_index::<u32, u32>(&[], &[]).unwrap(), 1.0);
        assert_eq!(adjusted_rand_index(&[1], &[5]).unwrap(), 1.0);
        assert_eq!(adjusted_rand_index(&[0, 1, 2], &[0, 1, 2]).unwrap(), 1.0);
        assert!(rand_index(&[0, 1], &[0]).is_err());
    }
}
