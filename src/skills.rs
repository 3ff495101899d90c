//! Crafting level curve.
//!
//! Levels follow the classic RuneScape XP thresholds (level 2 at 83 XP,
//! level 99 at roughly 13 million). Recipes gate on the level alone; XP is
//! what gets stored.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const MAX_LEVEL: u32 = 99;

/// Cumulative XP needed for each level; index 0 is unused
fn thresholds() -> &'static [i64] {
    static TABLE: OnceLock<Vec<i64>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = vec![0; MAX_LEVEL as usize + 1];
        let mut points = 0.0;
        for level in 2..=MAX_LEVEL as usize {
            let previous = (level - 1) as f64;
            points += (previous + 300.0 * 2f64.powf(previous / 7.0)) / 4.0;
            table[level] = points.floor() as i64;
        }
        table
    })
}

/// XP at which `level` is reached (clamped to 1..=99)
pub fn xp_threshold(level: u32) -> i64 {
    thresholds()[level.clamp(1, MAX_LEVEL) as usize]
}

/// Highest level whose threshold `xp` has reached
pub fn level_at(xp: i64) -> u32 {
    let reached = thresholds()[1..].partition_point(|&threshold| threshold <= xp);
    (reached as u32).max(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub level: u32,
    pub xp: i64,
}

impl Skill {
    /// A skill sitting exactly on the threshold of `level`
    pub fn new(level: u32) -> Self {
        let level = level.clamp(1, MAX_LEVEL);
        Self {
            level,
            xp: xp_threshold(level),
        }
    }

    /// Rebuild from stored XP; the level is always derived, never trusted
    pub fn from_xp(xp: i64) -> Self {
        let xp = xp.max(0);
        Self {
            level: level_at(xp),
            xp,
        }
    }

    /// Fraction of the way from this level to the next
    pub fn progress_in_level(&self) -> f32 {
        if self.level >= MAX_LEVEL {
            return 1.0;
        }
        let floor = xp_threshold(self.level);
        let span = xp_threshold(self.level + 1) - floor;
        ((self.xp - floor) as f32 / span as f32).clamp(0.0, 1.0)
    }
}
