//! Consecutive-login streak and gamebot passive accrual.
//!
//! Both are driven purely by the delta between the previously persisted
//! auth timestamp and the client-reported one. There is no timer anywhere;
//! the next check-in settles whatever time has passed.

use chrono::{DateTime, NaiveDate};
use uuid::Uuid;

use crate::game::rewards::{consecutive_days_drop, DropOutcome, DropRng};
use crate::game::tiers::tier_for_level;
use crate::models::{Skin, User};

/// Income rate: 100 currency units per 60 worked minutes.
const GAMEBOT_REWARD_PER_HOUR: i64 = 100;

pub fn date_of(ts: i64) -> NaiveDate {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakResult {
    pub dropped: bool,
    pub reward: Option<DropOutcome>,
}

/// Applies one check-in to the streak counter.
///
/// Same calendar date leaves the counter alone, the immediately following
/// date increments it, any other gap resets it to 1 and flags the drop.
/// When today's result has not been shown to the client yet, the streak
/// reward is attempted as a side effect. The counter is capped at 2: going
/// past resets it, which means the reward cadence repeats every other day.
///
/// Reads the previous date from `user.auth_date`; the caller must not
/// overwrite that field until after the accrual pass.
pub fn update_streak(
    user: &mut User,
    new_date: NaiveDate,
    shown_today: bool,
    droppable: &[Skin],
    owned: &[Uuid],
    rng: &mut dyn DropRng,
) -> StreakResult {
    let last_date = date_of(user.auth_date);
    let mut dropped = false;

    if new_date == last_date {
        // nothing
    } else if Some(new_date) == last_date.succ_opt() {
        user.days_in_row += 1;
    } else {
        user.days_in_row = 1;
        dropped = true;
    }

    let reward = if !shown_today {
        consecutive_days_drop(user, droppable, owned, rng)
    } else {
        None
    };

    if user.days_in_row > 2 {
        user.days_in_row = 1;
        dropped = true;
    }

    StreakResult { dropped, reward }
}

/// Settles gamebot income for the elapsed interval.
///
/// Inactive on the starting tier. Crossing a calendar day boundary forfeits
/// whatever was pending and restarts the day's capacity. Within a day,
/// intervals longer than a minute accrue `floor(elapsed/60) - 1` paid
/// minutes (the first minute is always unpaid), clamped to the tier's
/// remaining daily capacity.
pub fn accrue_gamebot(user: &mut User, now_ts: i64) {
    let tier = tier_for_level(user.current_level);
    if tier.level == 1 {
        return;
    }

    let last_ts = user.auth_date;
    if date_of(now_ts) > date_of(last_ts) {
        user.gamebot_worked_minutes = 0;
        user.gamebot_reward = 0;
        return;
    }

    let elapsed = now_ts - last_ts;
    if elapsed <= 60 {
        return;
    }

    let active_minutes = (elapsed / 60 - 1).max(0);
    let capacity_minutes =
        (i64::from(tier.gamebot_hours) * 60 - i64::from(user.gamebot_worked_minutes)).max(0);
    let worked = active_minutes.min(capacity_minutes);

    user.gamebot_worked_minutes += worked as i32;
    user.gamebot_reward += worked * GAMEBOT_REWARD_PER_HOUR / 60;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rewards::FixedRng;
    use crate::models::test_user;

    const DAY: i64 = 86_400;
    // 2024-01-10 00:00:00 UTC
    const BASE: i64 = 1_704_844_800;

    fn rng() -> FixedRng {
        FixedRng { roll: 0.0, pick: 0 }
    }

    fn streak(user: &mut User, new_ts: i64, shown: bool) -> StreakResult {
        update_streak(user, date_of(new_ts), shown, &[], &[], &mut rng())
    }

    #[test]
    fn same_day_leaves_streak_unchanged() {
        let mut user = test_user();
        user.auth_date = BASE;
        user.days_in_row = 1;
        let res = streak(&mut user, BASE + 3_600, true);
        assert_eq!(user.days_in_row, 1);
        assert!(!res.dropped);
    }

    #[test]
    fn next_day_increments_by_one() {
        let mut user = test_user();
        user.auth_date = BASE;
        user.days_in_row = 1;
        let res = streak(&mut user, BASE + DAY, true);
        assert_eq!(user.days_in_row, 2);
        assert!(!res.dropped);
    }

    #[test]
    fn gap_resets_and_flags_drop() {
        let mut user = test_user();
        user.auth_date = BASE;
        user.days_in_row = 2;
        let res = streak(&mut user, BASE + 5 * DAY, true);
        assert_eq!(user.days_in_row, 1);
        assert!(res.dropped);
    }

    #[test]
    fn negative_gap_resets_too() {
        let mut user = test_user();
        user.auth_date = BASE;
        user.days_in_row = 2;
        let res = streak(&mut user, BASE - 2 * DAY, true);
        assert_eq!(user.days_in_row, 1);
        assert!(res.dropped);
    }

    #[test]
    fn streak_never_exceeds_two() {
        let mut user = test_user();
        user.auth_date = BASE;
        user.days_in_row = 2;
        let res = streak(&mut user, BASE + DAY, true);
        assert_eq!(user.days_in_row, 1);
        assert!(res.dropped);
    }

    #[test]
    fn reaching_two_unshown_grants_the_drop() {
        let mut user = test_user();
        user.auth_date = BASE;
        user.days_in_row = 1;
        let res = streak(&mut user, BASE + DAY, false);
        assert_eq!(user.days_in_row, 2);
        assert!(matches!(
            res.reward,
            Some(DropOutcome::Xp { amount: 1_000, .. })
        ));
        assert_eq!(user.score, 1_000);
    }

    #[test]
    fn shown_today_suppresses_the_drop() {
        let mut user = test_user();
        user.auth_date = BASE;
        user.days_in_row = 1;
        let res = streak(&mut user, BASE + DAY, true);
        assert_eq!(user.days_in_row, 2);
        assert_eq!(res.reward, None);
        assert_eq!(user.score, 0);
    }

    #[test]
    fn gamebot_inactive_on_starting_tier() {
        let mut user = test_user();
        user.auth_date = BASE;
        accrue_gamebot(&mut user, BASE + 600);
        assert_eq!(user.gamebot_worked_minutes, 0);
        assert_eq!(user.gamebot_reward, 0);
    }

    #[test]
    fn day_boundary_resets_pending_income() {
        let mut user = test_user();
        user.current_level = 2;
        user.auth_date = BASE;
        user.gamebot_worked_minutes = 90;
        user.gamebot_reward = 150;
        accrue_gamebot(&mut user, BASE + DAY + 10);
        assert_eq!(user.gamebot_worked_minutes, 0);
        assert_eq!(user.gamebot_reward, 0);
    }

    #[test]
    fn first_minute_is_unpaid() {
        let mut user = test_user();
        user.current_level = 2;
        user.auth_date = BASE;
        // 90s elapsed: floor(90/60) - 1 = 0 paid minutes
        accrue_gamebot(&mut user, BASE + 90);
        assert_eq!(user.gamebot_worked_minutes, 0);
        assert_eq!(user.gamebot_reward, 0);
    }

    #[test]
    fn accrual_pays_per_minute_past_the_grace() {
        let mut user = test_user();
        user.current_level = 2;
        user.auth_date = BASE;
        // 61 minutes elapsed: 60 paid minutes, 100 units
        accrue_gamebot(&mut user, BASE + 61 * 60);
        assert_eq!(user.gamebot_worked_minutes, 60);
        assert_eq!(user.gamebot_reward, 100);
    }

    #[test]
    fn accrual_clamps_to_tier_capacity() {
        let mut user = test_user();
        user.current_level = 2;
        user.auth_date = BASE;
        user.gamebot_worked_minutes = 4 * 60 - 30;
        // hours of idle time, but only 30 capacity minutes left today
        accrue_gamebot(&mut user, BASE + 10 * 3_600);
        assert_eq!(user.gamebot_worked_minutes, 4 * 60);
        assert_eq!(user.gamebot_reward, 30 * 100 / 60);
    }

    #[test]
    fn accrual_is_monotonic_within_a_day() {
        let mut user = test_user();
        user.current_level = 2;
        user.auth_date = BASE;
        accrue_gamebot(&mut user, BASE + 10 * 60);
        let first = user.gamebot_reward;
        user.auth_date = BASE + 10 * 60;
        accrue_gamebot(&mut user, BASE + 25 * 60);
        assert!(user.gamebot_reward >= first);
        assert_eq!(user.gamebot_worked_minutes, 9 + 14);
    }
}
