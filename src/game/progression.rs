//! Level progression: tier resolution, XP distance, upgrade transitions.

use crate::game::tiers::{next_tier, tier_for_level, Tier};
use crate::game::GameError;
use crate::models::User;

pub fn status_of(user: &User) -> &'static Tier {
    tier_for_level(user.current_level)
}

/// XP still missing to reach the next tier's score threshold. Zero once the
/// threshold is met or when the user sits on the highest tier.
pub fn xp_to_next_level(user: &User) -> i64 {
    match next_tier(user.current_level) {
        Some(next) => (next.start_score - user.score).max(0),
        None => 0,
    }
}

/// The client shows the upgrade button once the high-water mark clears the
/// next tier's threshold, regardless of spendable balance.
pub fn upgrade_available(user: &User) -> bool {
    next_tier(user.current_level)
        .map(|next| user.max_score >= next.start_score)
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Upgraded,
    /// Precondition unmet; a normal negative answer, not an error.
    NotEligible,
}

/// Advances the user one tier.
///
/// Eligibility requires the high-water mark to have cleared the current
/// tier's end score and a next tier to exist. A non-empty payment proof
/// waives the XP cost (the premium path); otherwise the next tier's
/// `xp_to_upgrade` is debited from `score`, failing with
/// [`GameError::InsufficientXp`] when the balance is short. Either the level
/// and score both change or neither does.
pub fn upgrade(user: &mut User, payment_proof: Option<&str>) -> Result<UpgradeOutcome, GameError> {
    let current = tier_for_level(user.current_level);
    let next = match next_tier(user.current_level) {
        Some(next) => next,
        None => return Ok(UpgradeOutcome::NotEligible),
    };

    if user.max_score < current.end_score {
        return Ok(UpgradeOutcome::NotEligible);
    }

    if matches!(payment_proof, Some(proof) if !proof.is_empty()) {
        user.current_level += 1;
        return Ok(UpgradeOutcome::Upgraded);
    }

    let xp_cost = next.xp_to_upgrade.unwrap_or(0);
    if user.score < xp_cost {
        return Err(GameError::InsufficientXp);
    }

    user.score -= xp_cost;
    user.current_level += 1;
    Ok(UpgradeOutcome::Upgraded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_user;

    #[test]
    fn xp_to_next_level_never_negative() {
        let mut user = test_user();
        user.score = 50_000;
        assert_eq!(xp_to_next_level(&user), 0);

        user.score = 4_000;
        assert_eq!(xp_to_next_level(&user), 6_000);

        user.current_level = 4;
        assert_eq!(xp_to_next_level(&user), 0);
    }

    #[test]
    fn upgrade_gated_on_max_score_not_balance() {
        let mut user = test_user();
        user.score = 1_000_000;
        user.max_score = 9_999;
        assert_eq!(upgrade(&mut user, None), Ok(UpgradeOutcome::NotEligible));
        assert_eq!(user.current_level, 1);
        assert_eq!(user.score, 1_000_000);
    }

    #[test]
    fn upgrade_debits_xp_and_advances() {
        let mut user = test_user();
        user.max_score = 12_000;
        user.score = 2_500;
        assert_eq!(upgrade(&mut user, None), Ok(UpgradeOutcome::Upgraded));
        assert_eq!(user.score, 500);
        assert_eq!(user.current_level, 2);
    }

    #[test]
    fn upgrade_with_short_balance_is_an_error() {
        let mut user = test_user();
        user.max_score = 12_000;
        user.score = 1_999;
        assert_eq!(upgrade(&mut user, None), Err(GameError::InsufficientXp));
        assert_eq!(user.current_level, 1);
        assert_eq!(user.score, 1_999);
    }

    #[test]
    fn payment_proof_waives_the_cost() {
        let mut user = test_user();
        user.max_score = 12_000;
        user.score = 0;
        assert_eq!(upgrade(&mut user, Some("boc")), Ok(UpgradeOutcome::Upgraded));
        assert_eq!(user.current_level, 2);
        assert_eq!(user.score, 0);
    }

    #[test]
    fn empty_payment_proof_does_not_waive() {
        let mut user = test_user();
        user.max_score = 12_000;
        user.score = 0;
        assert_eq!(upgrade(&mut user, Some("")), Err(GameError::InsufficientXp));
    }

    #[test]
    fn no_upgrade_past_the_last_tier() {
        let mut user = test_user();
        user.current_level = 4;
        user.max_score = 10_000_000;
        user.score = 10_000_000;
        assert_eq!(upgrade(&mut user, None), Ok(UpgradeOutcome::NotEligible));
        assert_eq!(user.current_level, 4);
    }

    #[test]
    fn upgrade_available_tracks_next_threshold() {
        let mut user = test_user();
        user.max_score = 9_999;
        assert!(!upgrade_available(&user));
        user.max_score = 10_000;
        assert!(upgrade_available(&user));
        user.current_level = 4;
        assert!(!upgrade_available(&user));
    }
}
