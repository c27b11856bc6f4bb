//! Approximate text matching for OCR output that is close to, but not
//! exactly, the expected text.

use crate::error::VerifyError;

/// Absorbs floating-point error when a score lands exactly on the threshold.
pub const THRESHOLD_SLACK: f64 = 1e-9;

/// Case-insensitive edit distance over Unicode scalar values.
///
/// Insertions, deletions, substitutions and swaps of two adjacent
/// characters each cost one edit (optimal string alignment), so
/// `"Hello World"` and `"Hello Wrold"` are one edit apart.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // rows i-2, i-1 and i of the DP matrix
    let mut prev2: Vec<usize> = vec![0; b.len() + 1];
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(prev2[j - 2] + 1);
            }
            curr[j] = best;
        }
        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// `1 - distance / max(len(a), len(b))`; two empty strings score 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let len_a = a.to_lowercase().chars().count();
    let len_b = b.to_lowercase().chars().count();
    let max_len = len_a.max(len_b);
    if max_len == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / max_len as f64
}

/// Best score of `expected` against the whole output and each of its lines.
pub fn best_match(output: &str, expected: &str) -> f64 {
    std::iter::once(output.trim())
        .chain(output.lines().map(str::trim))
        .map(|candidate| similarity(candidate, expected))
        .fold(0.0, f64::max)
}

pub fn assert_approximate(output: &str, expected: &str, threshold: f64) -> Result<f64, VerifyError> {
    let best = best_match(output, expected);
    if best + THRESHOLD_SLACK >= threshold {
        Ok(best)
    } else {
        Err(VerifyError::BelowThreshold {
            expected: expected.to_string(),
            best,
            threshold,
            output: output.to_string(),
        })
    }
}
