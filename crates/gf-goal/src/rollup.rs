// rollup.rs — Integer arithmetic behind progress aggregation.
//
// Everything here is exact: no floats, so a mean of [33, 33, 34] is 33
// and 2 of 3 tasks done is 67 on every platform.

/// Clamp an arbitrary caller-supplied value into a progress percentage.
pub fn clamp_progress(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

/// `numerator / denominator` rounded half-up to the nearest integer.
///
/// Returns `None` for a zero denominator.
pub fn round_half_up(numerator: u64, denominator: u64) -> Option<u64> {
    if denominator == 0 {
        return None;
    }
    Some((2 * numerator + denominator) / (2 * denominator))
}

/// Rounded arithmetic mean of child progress values.
///
/// `None` when there are no values: a childless node is never aggregated.
pub fn mean_progress(values: impl IntoIterator<Item = u8>) -> Option<u8> {
    let (sum, count) = values
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), v| (sum + u64::from(v), count + 1));
    round_half_up(sum, count).map(|mean| mean.min(100) as u8)
}

/// Percentage of `done` out of `total`, rounded half-up.
pub fn completion_percent(done: usize, total: usize) -> Option<u8> {
    round_half_up(done as u64 * 100, total as u64).map(|pct| pct.min(100) as u8)
}
