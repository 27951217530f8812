//! Static level tier table.
//!
//! Tiers never change at runtime, so they live in code rather than in a
//! table nobody writes to. Lookups are pure and lock-free.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub level: i32,
    pub name: &'static str,
    /// Half-open score range: reaching `start_score` enters this tier,
    /// reaching `end_score` makes the next one available.
    pub start_score: i64,
    pub end_score: i64,
    pub energy_limit: i32,
    pub nitro: i32,
    pub recharging_speed: i32,
    pub coin_farming: i32,
    /// Daily gamebot capacity, in hours.
    pub gamebot_hours: i32,
    pub fractal: Option<i32>,
    /// XP cost to advance from the previous tier into this one.
    pub xp_to_upgrade: Option<i64>,
    pub ton_to_upgrade: Option<f64>,
}

pub const TIERS: [Tier; 4] = [
    Tier {
        level: 1,
        name: "Bronze",
        start_score: 0,
        end_score: 10_000,
        energy_limit: 3,
        nitro: 5,
        recharging_speed: 6,
        coin_farming: 3,
        gamebot_hours: 3,
        fractal: None,
        xp_to_upgrade: None,
        ton_to_upgrade: None,
    },
    Tier {
        level: 2,
        name: "Silver",
        start_score: 10_000,
        end_score: 100_000,
        energy_limit: 4,
        nitro: 5,
        recharging_speed: 6,
        coin_farming: 6,
        gamebot_hours: 4,
        fractal: None,
        xp_to_upgrade: Some(2_000),
        ton_to_upgrade: Some(0.01),
    },
    Tier {
        level: 3,
        name: "Gold",
        start_score: 100_000,
        end_score: 250_000,
        energy_limit: 5,
        nitro: 5,
        recharging_speed: 6,
        coin_farming: 9,
        gamebot_hours: 4,
        fractal: Some(100),
        xp_to_upgrade: Some(5_000),
        ton_to_upgrade: Some(0.02),
    },
    Tier {
        level: 4,
        name: "Platinum",
        start_score: 250_000,
        end_score: 500_000,
        energy_limit: 5,
        nitro: 5,
        recharging_speed: 6,
        coin_farming: 12,
        gamebot_hours: 4,
        fractal: Some(100),
        xp_to_upgrade: Some(10_000),
        ton_to_upgrade: Some(0.03),
    },
];

/// Tier for a level, falling back to the highest tier for levels past the
/// end of the table.
pub fn tier_for_level(level: i32) -> &'static Tier {
    TIERS
        .iter()
        .find(|t| t.level == level)
        .unwrap_or(&TIERS[TIERS.len() - 1])
}

pub fn next_tier(level: i32) -> Option<&'static Tier> {
    TIERS.iter().find(|t| t.level == level + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_lookup() {
        assert_eq!(tier_for_level(1).name, "Bronze");
        assert_eq!(tier_for_level(3).name, "Gold");
    }

    #[test]
    fn out_of_range_falls_back_to_highest() {
        assert_eq!(tier_for_level(99).name, "Platinum");
        assert_eq!(tier_for_level(0).name, "Platinum");
    }

    #[test]
    fn next_tier_walks_the_table() {
        assert_eq!(next_tier(1).unwrap().level, 2);
        assert_eq!(next_tier(3).unwrap().level, 4);
        assert!(next_tier(4).is_none());
    }

    #[test]
    fn ranges_are_contiguous() {
        for pair in TIERS.windows(2) {
            assert_eq!(pair[0].end_score, pair[1].start_score);
        }
    }
}
