//! Purchase and claim rules for the skin and quest catalogs.
//!
//! Ownership and progress edges live in the store; these functions hold the
//! eligibility decisions so the handlers stay plain CRUD.

use uuid::Uuid;

use crate::game::{credit_score, GameError};
use crate::models::{Skin, User};

/// XP purchase: the tier gate (`open_from` against the high-water mark) and
/// the balance must both clear. Debits `score`; the caller records the
/// ownership edge.
pub fn purchase_with_xp(user: &mut User, skin: &Skin) -> Result<(), GameError> {
    if user.max_score < skin.open_from || user.score < skin.required_xp {
        return Err(GameError::NotEligible);
    }
    user.score -= skin.required_xp;
    Ok(())
}

/// TON purchase: payment verification happens outside this service, so any
/// non-empty proof token is accepted as settled.
pub fn purchase_with_ton(proof: Option<&str>) -> Result<(), GameError> {
    match proof {
        Some(p) if !p.is_empty() => Ok(()),
        _ => Err(GameError::NotEligible),
    }
}

/// Activates an owned skin, or clears the active skin when `skin_id` is
/// `None`.
pub fn set_active_skin(
    user: &mut User,
    skin_id: Option<Uuid>,
    owned: bool,
) -> Result<(), GameError> {
    match skin_id {
        Some(id) => {
            if !owned {
                return Err(GameError::NotOwned);
            }
            user.active_skin_id = Some(id);
        }
        None => user.active_skin_id = None,
    }
    Ok(())
}

/// Claims a quest or subtask reward: completion must hold and the claim
/// flag must still be clear. On success the flag flips and the reward is
/// credited, exactly once.
pub fn claim_task_reward(
    user: &mut User,
    completed: bool,
    reward_claimed: &mut bool,
    reward: i64,
) -> Result<i64, GameError> {
    if !completed {
        return Err(GameError::NotComplete);
    }
    if *reward_claimed {
        return Err(GameError::AlreadyClaimed);
    }
    *reward_claimed = true;
    credit_score(user, reward);
    Ok(reward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_user;

    fn skin(required_xp: i64, open_from: i64) -> Skin {
        Skin {
            id: Uuid::new_v4(),
            name: "Aurora".to_string(),
            required_xp,
            price_ton: 1.5,
            open_from,
            is_droppable: false,
        }
    }

    #[test]
    fn xp_purchase_needs_tier_gate_and_balance() {
        let mut user = test_user();
        user.score = 5_000;
        user.max_score = 5_000;

        // gate not reached
        assert_eq!(
            purchase_with_xp(&mut user, &skin(1_000, 10_000)),
            Err(GameError::NotEligible)
        );
        // balance short
        assert_eq!(
            purchase_with_xp(&mut user, &skin(6_000, 0)),
            Err(GameError::NotEligible)
        );
        assert_eq!(user.score, 5_000);

        assert_eq!(purchase_with_xp(&mut user, &skin(1_000, 0)), Ok(()));
        assert_eq!(user.score, 4_000);
        // spending never touches the high-water mark
        assert_eq!(user.max_score, 5_000);
    }

    #[test]
    fn ton_purchase_accepts_any_non_empty_proof() {
        assert_eq!(purchase_with_ton(Some("te6cck...")), Ok(()));
        assert_eq!(purchase_with_ton(Some("")), Err(GameError::NotEligible));
        assert_eq!(purchase_with_ton(None), Err(GameError::NotEligible));
    }

    #[test]
    fn active_skin_requires_ownership() {
        let mut user = test_user();
        let id = Uuid::new_v4();
        assert_eq!(
            set_active_skin(&mut user, Some(id), false),
            Err(GameError::NotOwned)
        );
        assert_eq!(user.active_skin_id, None);

        assert_eq!(set_active_skin(&mut user, Some(id), true), Ok(()));
        assert_eq!(user.active_skin_id, Some(id));

        assert_eq!(set_active_skin(&mut user, None, false), Ok(()));
        assert_eq!(user.active_skin_id, None);
    }

    #[test]
    fn task_reward_claims_exactly_once() {
        let mut user = test_user();
        let mut claimed = false;

        assert_eq!(
            claim_task_reward(&mut user, false, &mut claimed, 300),
            Err(GameError::NotComplete)
        );
        assert_eq!(user.score, 0);

        assert_eq!(claim_task_reward(&mut user, true, &mut claimed, 300), Ok(300));
        assert_eq!(user.score, 300);
        assert!(claimed);

        assert_eq!(
            claim_task_reward(&mut user, true, &mut claimed, 300),
            Err(GameError::AlreadyClaimed)
        );
        assert_eq!(user.score, 300);
    }
}
