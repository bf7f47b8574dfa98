/// Default target row count a single reduce job is sized for.
pub const R_TARGET: u64 = 16_000_000;
const K_MIN: u32 = 2;
const K_MAX: u32 = 256;

/// Picks how many map outputs feed a single reduce job.
///
/// Rounds `R_TARGET / shard_count` to the nearest power of two and clamps
/// to `[K_MIN, K_MAX]`. The caller passes the table's shard count as a
/// proxy for rows-per-reducer at the map level, not an actual row count.
pub fn fanout(shard_count: u64) -> u32 {
    let denom = shard_count.max(1);
    let ratio = R_TARGET as f64 / denom as f64;
    if ratio <= 1.0 {
        return K_MIN;
    }
    let k = 1u64 << ratio.log2().round() as u32;
    (k as u32).clamp(K_MIN, K_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_minimum() {
        assert_eq!(fanout(R_TARGET * 10), K_MIN);
    }

    #[test]
    fn clamps_to_maximum() {
        assert_eq!(fanout(1), K_MAX);
    }

    #[test]
    fn rounds_to_nearest_power_of_two() {
        // R_TARGET / 100_000 = 160 -> nearest power of two is 128.
        assert_eq!(fanout(100_000), 128);
    }

    #[test]
    fn ten_shards_clamps_to_k_max() {
        assert_eq!(fanout(10), K_MAX);
    }
}
