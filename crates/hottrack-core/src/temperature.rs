//! The temperature function.
//!
//! Distills the six heat criteria of an [`AccessFreq`] down into a single
//! u32 temperature: read/write counts, read/write recency, and read/write
//! inter-arrival averages, each normalised by a power-of-two divider and
//! weighted by a power-of-two coefficient before the (wrapping) sum.
//!
//! The top [`MAP_BITS`] bits of the temperature select the map bucket, so
//! recent, frequent, short-interval access pushes an item toward hot buckets
//! while long-idle items drift into bucket 0.

use crate::freq::AccessFreq;

/// Number of temperature bits that select a map bucket.
pub const MAP_BITS: u32 = 8;
/// Number of temperature buckets per item kind.
pub const MAP_SIZE: usize = 1 << MAP_BITS;

/// NRR/NRW heat unit = 2^X accesses.
pub const NRR_MULTIPLIER_POWER: u32 = 20;
pub const NRR_COEFF_POWER: u32 = 0;
pub const NRW_MULTIPLIER_POWER: u32 = 20;
pub const NRW_COEFF_POWER: u32 = 0;

/// LTR/LTW heat unit = 2^X ns of age.
pub const LTR_DIVIDER_POWER: u32 = 30;
pub const LTR_COEFF_POWER: u32 = 1;
pub const LTW_DIVIDER_POWER: u32 = 30;
pub const LTW_COEFF_POWER: u32 = 1;

/// AVR/AVW cold unit = 2^X ns of average inter-arrival delta.
pub const AVR_DIVIDER_POWER: u32 = 40;
pub const AVR_COEFF_POWER: u32 = 0;
pub const AVW_DIVIDER_POWER: u32 = 40;
pub const AVW_COEFF_POWER: u32 = 0;

/// Computes the current temperature of a frequency record.
pub fn temperature(freq: &AccessFreq, now_ns: u64) -> u32 {
    let snap = freq.snapshot();

    let nrr = count_heat(snap.nr_reads, NRR_MULTIPLIER_POWER, NRR_COEFF_POWER);
    let nrw = count_heat(snap.nr_writes, NRW_MULTIPLIER_POWER, NRW_COEFF_POWER);

    let ltr = recency_heat(now_ns, snap.last_read_ns, LTR_DIVIDER_POWER, LTR_COEFF_POWER);
    let ltw = recency_heat(now_ns, snap.last_write_ns, LTW_DIVIDER_POWER, LTW_COEFF_POWER);

    let avr = cadence_heat(snap.avg_delta_reads, AVR_DIVIDER_POWER, AVR_COEFF_POWER);
    let avw = cadence_heat(snap.avg_delta_writes, AVW_DIVIDER_POWER, AVW_COEFF_POWER);

    nrr.wrapping_add(nrw)
        .wrapping_add(ltr)
        .wrapping_add(ltw)
        .wrapping_add(avr)
        .wrapping_add(avw)
}

/// Map bucket selected by a temperature: its top [`MAP_BITS`] bits.
pub fn bucket_of(temp: u32) -> usize {
    (temp >> (32 - MAP_BITS)) as usize
}

/// Access-count criterion: the counter scaled up, then weighted down.
fn count_heat(count: u32, multiplier: u32, coeff: u32) -> u32 {
    count.wrapping_shl(multiplier) >> (3 - coeff)
}

/// Recency criterion: `2^32` minus the shifted age, floored at 0 once the
/// age leaves u32 range. A zero timestamp means *never accessed* and is
/// treated as infinitely old, so it contributes nothing.
fn recency_heat(now_ns: u64, last_ns: u64, divider: u32, coeff: u32) -> u32 {
    let age = if last_ns == 0 {
        u64::MAX
    } else {
        now_ns.saturating_sub(last_ns)
    };
    let cold = age >> divider;
    if cold >= 1 << 32 {
        0
    } else {
        (((1u64 << 32) - cold) >> (3 - coeff)) as u32
    }
}

/// Inter-arrival criterion: the inverted average, saturated into u32 range.
fn cadence_heat(avg_delta: u64, divider: u32, coeff: u32) -> u32 {
    let mut heat = (u64::MAX - avg_delta) >> divider;
    if heat >= 1 << 32 {
        heat = u32::MAX as u64;
    }
    (heat >> (3 - coeff)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freq::AccessKind;

    #[test]
    fn test_pristine_record_is_temperature_zero() {
        let freq = AccessFreq::new();
        // regardless of the clock: never-accessed recency and maximal
        // averages contribute nothing
        assert_eq!(temperature(&freq, 1), 0);
        assert_eq!(temperature(&freq, u64::MAX / 2), 0);
        assert_eq!(bucket_of(temperature(&freq, 123_456_789)), 0);
    }

    #[test]
    fn test_just_accessed_item_is_hot() {
        let freq = AccessFreq::new();
        let now = 10_000_000;
        freq.record(now, AccessKind::Read);

        let temp = temperature(&freq, now);
        // zero age: the read-recency criterion alone contributes 2^30
        assert!(temp >= 1 << 30);
        assert!(bucket_of(temp) > 0);
    }

    #[test]
    fn test_recency_decays_to_zero_for_ancient_access() {
        let freq = AccessFreq::new();
        freq.record(1_000, AccessKind::Read);

        let cold_now = 1_000 + (1u64 << 62);
        let temp = temperature(&freq, cold_now);
        // recency gone; the count and cadence criteria that remain stay
        // below one bucket unit
        let residual = count_heat(1, NRR_MULTIPLIER_POWER, NRR_COEFF_POWER)
            + cadence_heat(freq.avg_delta_reads(), AVR_DIVIDER_POWER, AVR_COEFF_POWER);
        assert_eq!(temp, residual);
        assert_eq!(bucket_of(temp), 0);
    }

    #[test]
    fn test_more_reads_strictly_hotter() {
        // monotone heating: with now fixed, a higher read count yields a
        // strictly higher count contribution
        let now = 50_000;

        let few = AccessFreq::new();
        let many = AccessFreq::new();
        few.record(now, AccessKind::Read);
        for _ in 0..10 {
            many.record(now, AccessKind::Read);
        }

        assert!(temperature(&many, now) > temperature(&few, now));
    }

    #[test]
    fn test_count_heat_weighting() {
        // one access = 2^20 scaled, >> 3 with a zero coefficient
        assert_eq!(count_heat(1, 20, 0), 1 << 17);
        assert_eq!(count_heat(4, 20, 0), 1 << 19);
    }

    #[test]
    fn test_recency_heat_full_when_age_zero() {
        // (2^32 - 0) >> (3 - 1)
        assert_eq!(recency_heat(5_000, 5_000, LTR_DIVIDER_POWER, LTR_COEFF_POWER), 1 << 30);
    }

    #[test]
    fn test_recency_heat_never_accessed_is_zero() {
        assert_eq!(recency_heat(1 << 40, 0, LTR_DIVIDER_POWER, LTR_COEFF_POWER), 0);
    }

    #[test]
    fn test_recency_heat_saturates_at_large_age() {
        let age_beyond_u32 = (1u64 << 32) << LTR_DIVIDER_POWER;
        assert_eq!(
            recency_heat(age_beyond_u32 + 10, 10, LTR_DIVIDER_POWER, LTR_COEFF_POWER),
            0
        );
    }

    #[test]
    fn test_cadence_heat_maximal_average_is_zero() {
        assert_eq!(cadence_heat(u64::MAX, AVR_DIVIDER_POWER, AVR_COEFF_POWER), 0);
    }

    #[test]
    fn test_cadence_heat_small_average_contributes() {
        let heat = cadence_heat(1_000, AVR_DIVIDER_POWER, AVR_COEFF_POWER);
        assert!(heat > 0);
        // (u64::MAX - small) >> 40 stays within u32 range, >> 3
        assert_eq!(heat, ((u64::MAX - 1_000) >> 40 >> 3) as u32);
    }

    #[test]
    fn test_bucket_of_uses_top_bits() {
        assert_eq!(bucket_of(0), 0);
        assert_eq!(bucket_of(1 << 24), 1);
        assert_eq!(bucket_of(0xFF00_0000), 255);
        assert_eq!(bucket_of(u32::MAX), 255);
    }
}
