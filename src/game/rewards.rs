//! Reward ledger: claimable buckets and the streak drop.

use rand::Rng;
use uuid::Uuid;

use crate::game::credit_score;
use crate::models::{Skin, User};

pub const STREAK_XP_REWARD: i64 = 1_000;
const XP_DROP_CHANCE: f64 = 0.15;

/// Random source for drop decisions. Injected so tests can force a draw.
pub trait DropRng {
    /// Uniform draw in `[0, 1)`.
    fn roll(&mut self) -> f64;
    /// Uniform index in `[0, len)`.
    fn pick(&mut self, len: usize) -> usize;
}

/// Production source backed by the thread-local generator.
pub struct ThreadDropRng;

impl DropRng for ThreadDropRng {
    fn roll(&mut self) -> f64 {
        rand::thread_rng().gen()
    }

    fn pick(&mut self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// What a streak evaluation handed out, delivered inline in the check-in
/// response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Currency credited immediately; `new_score` is the balance after it.
    Xp { amount: i64, new_score: i64 },
    /// A droppable skin the user did not own yet. The caller records the
    /// ownership edge; no currency moves.
    Skin { skin_id: Uuid },
}

/// Streak drop, fired only when the streak sits at exactly 2 days. With
/// probability 0.15 the grant is currency; otherwise a random droppable
/// skin the user does not own, falling back to currency when none is left.
pub fn consecutive_days_drop(
    user: &mut User,
    droppable: &[Skin],
    owned: &[Uuid],
    rng: &mut dyn DropRng,
) -> Option<DropOutcome> {
    if user.days_in_row != 2 {
        return None;
    }

    if rng.roll() < XP_DROP_CHANCE {
        return Some(grant_xp(user));
    }

    let available: Vec<&Skin> = droppable
        .iter()
        .filter(|skin| !owned.contains(&skin.id))
        .collect();

    if available.is_empty() {
        return Some(grant_xp(user));
    }

    let skin = available[rng.pick(available.len())];
    Some(DropOutcome::Skin { skin_id: skin.id })
}

fn grant_xp(user: &mut User) -> DropOutcome {
    credit_score(user, STREAK_XP_REWARD);
    DropOutcome::Xp {
        amount: STREAK_XP_REWARD,
        new_score: user.score,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Referral,
    Gamebot,
}

/// Atomically moves a bucket's balance into `score` and zeroes it, returning
/// the amount that was passed. Claiming an empty bucket returns 0.
pub fn claim(user: &mut User, bucket: Bucket) -> i64 {
    let amount = match bucket {
        Bucket::Referral => std::mem::take(&mut user.reward),
        Bucket::Gamebot => std::mem::take(&mut user.gamebot_reward),
    };
    credit_score(user, amount);
    amount
}

/// Dismisses pending gamebot income without crediting it.
pub fn drop_gamebot(user: &mut User) -> i64 {
    std::mem::take(&mut user.gamebot_reward)
}

/// Deterministic source for tests: always returns the configured values.
#[cfg(test)]
pub(crate) struct FixedRng {
    pub roll: f64,
    pub pick: usize,
}

#[cfg(test)]
impl DropRng for FixedRng {
    fn roll(&mut self) -> f64 {
        self.roll
    }

    fn pick(&mut self, len: usize) -> usize {
        self.pick.min(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_user;

    fn skin(name: &str, droppable: bool) -> Skin {
        Skin {
            id: Uuid::new_v4(),
            name: name.to_string(),
            required_xp: 500,
            price_ton: 0.5,
            open_from: 0,
            is_droppable: droppable,
        }
    }

    #[test]
    fn no_drop_unless_streak_is_exactly_two() {
        let mut user = test_user();
        let mut rng = FixedRng { roll: 0.0, pick: 0 };
        user.days_in_row = 1;
        assert_eq!(consecutive_days_drop(&mut user, &[], &[], &mut rng), None);
        user.days_in_row = 3;
        assert_eq!(consecutive_days_drop(&mut user, &[], &[], &mut rng), None);
    }

    #[test]
    fn low_roll_grants_currency_inline() {
        let mut user = test_user();
        user.days_in_row = 2;
        let skins = [skin("Aurora", true)];
        let mut rng = FixedRng { roll: 0.10, pick: 0 };
        let drop = consecutive_days_drop(&mut user, &skins, &[], &mut rng);
        assert_eq!(
            drop,
            Some(DropOutcome::Xp {
                amount: 1_000,
                new_score: 1_000
            })
        );
        assert_eq!(user.score, 1_000);
    }

    #[test]
    fn high_roll_grants_an_unowned_skin_without_currency() {
        let mut user = test_user();
        user.days_in_row = 2;
        let skins = [skin("Aurora", true), skin("Obsidian", true)];
        let owned = [skins[0].id];
        let mut rng = FixedRng { roll: 0.90, pick: 0 };
        let drop = consecutive_days_drop(&mut user, &skins, &owned, &mut rng);
        assert_eq!(
            drop,
            Some(DropOutcome::Skin {
                skin_id: skins[1].id
            })
        );
        assert_eq!(user.score, 0);
    }

    #[test]
    fn skin_drop_falls_back_to_currency_when_all_owned() {
        let mut user = test_user();
        user.days_in_row = 2;
        let skins = [skin("Aurora", true)];
        let owned = [skins[0].id];
        let mut rng = FixedRng { roll: 0.90, pick: 0 };
        let drop = consecutive_days_drop(&mut user, &skins, &owned, &mut rng);
        assert!(matches!(drop, Some(DropOutcome::Xp { amount: 1_000, .. })));
        assert_eq!(user.score, 1_000);
    }

    #[test]
    fn claim_moves_balance_into_score_once() {
        let mut user = test_user();
        user.reward = 2_000;
        assert_eq!(claim(&mut user, Bucket::Referral), 2_000);
        assert_eq!(user.score, 2_000);
        assert_eq!(user.reward, 0);

        // second claim is a no-op, not an error
        assert_eq!(claim(&mut user, Bucket::Referral), 0);
        assert_eq!(user.score, 2_000);
    }

    #[test]
    fn claiming_an_empty_bucket_returns_zero() {
        let mut user = test_user();
        assert_eq!(claim(&mut user, Bucket::Gamebot), 0);
        assert_eq!(user.score, 0);
    }

    #[test]
    fn gamebot_drop_discards_without_credit() {
        let mut user = test_user();
        user.gamebot_reward = 700;
        assert_eq!(drop_gamebot(&mut user), 700);
        assert_eq!(user.gamebot_reward, 0);
        assert_eq!(user.score, 0);
    }
}
