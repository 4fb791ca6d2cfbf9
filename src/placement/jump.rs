//! Jump consistent hash.
//!
//! Maps a 64-bit key to a bucket in `[0, n)` so that growing `n -> n + 1`
//! moves only `1/(n + 1)` of the keys, all of them into the new bucket, and
//! every bucket receives an equal share. No ring state is kept.
//!
//! Reference: Lamping & Veach, "A Fast, Minimal Memory, Consistent Hash
//! Algorithm" (2014).

/// Hash `key` to a bucket in `[0, num_buckets)`.
///
/// # Panics
///
/// Panics if `num_buckets` is 0. Callers validate the bucket table first and
/// report [`Error::InvalidArgument`](crate::Error::InvalidArgument).
pub fn jump_bucket(mut key: u64, num_buckets: u32) -> u32 {
    assert!(num_buckets > 0, "num_buckets must be > 0");

    let num_buckets = i64::from(num_buckets);
    let mut b: i64 = -1;
    let mut j: i64 = 0;

    while j < num_buckets {
        b = j;
        key = key.wrapping_mul(2_862_933_555_777_941_757).wrapping_add(1);
        j = ((b.wrapping_add(1) as f64)
            * (((1_i64 << 31) as f64) / (((key >> 33).wrapping_add(1)) as f64)))
            as i64;
    }

    b as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrambled(i: u64) -> u64 {
        i.wrapping_mul(0x9e37_79b9_7f4a_7c15)
    }

    #[test]
    fn stays_in_range() {
        for n in 1..64 {
            for i in 0..256 {
                assert!(jump_bucket(scrambled(i), n) < n);
            }
        }
    }

    #[test]
    fn is_deterministic() {
        for i in 0..1024 {
            let key = scrambled(i);
            assert_eq!(jump_bucket(key, 7), jump_bucket(key, 7));
        }
    }

    #[test]
    fn single_bucket_takes_everything() {
        for i in 0..256 {
            assert_eq!(jump_bucket(scrambled(i), 1), 0);
        }
    }

    #[test]
    fn growth_only_moves_keys_into_the_new_bucket() {
        for n in 1..32u32 {
            for i in 0..2048 {
                let key = scrambled(i);
                let before = jump_bucket(key, n);
                let after = jump_bucket(key, n + 1);
                assert!(
                    after == before || after == n,
                    "key {i} moved {before} -> {after} when growing {n} -> {}",
                    n + 1
                );
            }
        }
    }

    #[test]
    fn distributes_roughly_evenly() {
        let n = 10u32;
        let samples = 100_000u64;
        let mut counts = vec![0u64; n as usize];
        for i in 0..samples {
            counts[jump_bucket(scrambled(i), n) as usize] += 1;
        }
        let expected = samples / u64::from(n);
        for (bucket, &count) in counts.iter().enumerate() {
            assert!(
                count > expected * 7 / 10 && count < expected * 13 / 10,
                "bucket {bucket} holds {count} of {samples} keys"
            );
        }
    }
}
