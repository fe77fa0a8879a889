//! Shared math utilities.

/// Index of the largest score.
///
/// Ties resolve to the lowest index and NaN entries are never selected.
/// Returns `None` for an empty slice or one containing only NaN.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}
