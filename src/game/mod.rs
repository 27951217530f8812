//! The progression and reward economy engine.
//!
//! Everything in this module operates on an in-memory [`User`] aggregate and
//! static catalog data. No I/O happens here: handlers load the row, run the
//! engine, and persist the result in a single write-back.

pub mod catalog;
pub mod progression;
pub mod rewards;
pub mod streak;
pub mod tiers;

use thiserror::Error;

use crate::models::User;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    #[error("not eligible")]
    NotEligible,
    #[error("not enough xp")]
    InsufficientXp,
    #[error("skin not owned")]
    NotOwned,
    #[error("not started")]
    NotStarted,
    #[error("not completed")]
    NotComplete,
    #[error("reward already claimed")]
    AlreadyClaimed,
}

/// Credits score and keeps the high-water mark in lockstep. Every reward
/// path goes through here; spends debit `score` directly and leave
/// `max_score` alone.
pub fn credit_score(user: &mut User, amount: i64) {
    user.score += amount;
    if user.score > user.max_score {
        user.max_score = user.score;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_user;

    #[test]
    fn credit_raises_high_water_mark() {
        let mut user = test_user();
        credit_score(&mut user, 500);
        assert_eq!(user.score, 500);
        assert_eq!(user.max_score, 500);
    }

    #[test]
    fn credit_keeps_existing_high_water_mark() {
        let mut user = test_user();
        user.score = 100;
        user.max_score = 5000;
        credit_score(&mut user, 200);
        assert_eq!(user.score, 300);
        assert_eq!(user.max_score, 5000);
    }
}
