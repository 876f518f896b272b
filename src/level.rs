// Experience-to-level curve

/// Experience needed to leave level 1
pub const FIRST_THRESHOLD: f64 = 50.0;

/// Per-level growth before the bonus (+5%)
pub const BASE_GROWTH: f64 = 1.05;

/// Cap on the additive growth bonus (+10%, so 15% growth at most)
pub const MAX_BONUS: f64 = 0.10;

/// Highest reachable level
pub const MAX_LEVEL: u32 = 9999;

/// Largest cumulative experience the curve reports (2^53 - 1)
pub const MAX_SAFE_XP: u64 = 9_007_199_254_740_991;

const THRESHOLD_GUARD: f64 = 1e18;

/// Growth bonus applied when entering `level`
pub fn bonus_at(level: u32) -> f64 {
    let bonus = (level.saturating_sub(1)) as f64 / 10.0 * 0.01;
    bonus.min(MAX_BONUS)
}

/// The threshold sequence: yields the integer experience span of level 1, 2, 3, ...
///
/// Every consumer replays its own copy so that level lookups and cumulative
/// sums walk identical spans.
#[derive(Debug, Clone)]
pub struct Thresholds {
    level: u32,
    threshold: f64,
}

impl Thresholds {
    pub fn new() -> Self {
        Self {
            level: 1,
            threshold: FIRST_THRESHOLD,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Thresholds {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.level >= MAX_LEVEL || self.threshold > THRESHOLD_GUARD {
            return None;
        }

        let span = self.threshold.round() as u64;
        self.level += 1;
        self.threshold *= BASE_GROWTH + bonus_at(self.level);

        Some(span)
    }
}

/// Level reached with `total_xp` experience
pub fn calculate_level(total_xp: u64) -> u32 {
    let mut level = 1;
    let mut remaining = total_xp;

    for span in Thresholds::new() {
        if remaining < span {
            break;
        }
        remaining -= span;
        level += 1;
    }

    level.min(MAX_LEVEL)
}

/// Cumulative experience required to reach `level`
///
/// Saturates at `MAX_SAFE_XP`: every level past the last one reachable below
/// it reports `MAX_SAFE_XP`, so `calculate_level` maps it back to that level.
pub fn experience_for_level(level: u32) -> u64 {
    if level <= 1 {
        return 0;
    }

    let steps = (level - 1) as usize;
    let mut total: u64 = 0;
    let mut taken = 0;

    for span in Thresholds::new().take(steps) {
        total = total.saturating_add(span);
        taken += 1;
        if total > MAX_SAFE_XP {
            return MAX_SAFE_XP;
        }
    }

    // The curve ended before reaching `level`
    if taken < steps {
        return MAX_SAFE_XP;
    }

    total
}

/// Experience span of `level` (from reaching it to reaching the next one)
pub fn total_xp_for_next_level(level: u32) -> u64 {
    let level = level.max(1);
    experience_for_level(level + 1).saturating_sub(experience_for_level(level))
}

/// Experience still missing before leaving `level`; 0 at the cap
pub fn xp_remaining(level: u32, current_xp: u64) -> u64 {
    if level >= MAX_LEVEL {
        return 0;
    }

    let next = experience_for_level(level + 1);
    next.saturating_sub(current_xp.max(experience_for_level(level)))
}

/// Fraction of the current level already earned, in [0, 1]
pub fn progress_to_next(level: u32, current_xp: u64) -> f64 {
    if level >= MAX_LEVEL {
        return 1.0;
    }

    let floor = experience_for_level(level);
    let need = total_xp_for_next_level(level);
    let have = current_xp.saturating_sub(floor);

    if need == 0 || have >= need {
        return 1.0;
    }
    have as f64 / need as f64
}
