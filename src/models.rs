use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Aggregate root: one row in `users`. Engines mutate this in memory and the
/// owning handler writes it back once per request.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub tg_id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub is_premium: Option<bool>,
    pub tg_image: Option<String>,
    pub score: i64,
    pub max_score: i64,
    pub current_level: i32,
    pub days_in_row: i32,
    pub auth_date: i64,
    pub is_days_shown: bool,
    pub register_date: DateTime<Utc>,
    pub reward: i64,
    pub gamebot_worked_minutes: i32,
    pub gamebot_reward: i64,
    pub active_skin_id: Option<Uuid>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Skin {
    pub id: Uuid,
    pub name: String,
    pub required_xp: i64,
    pub price_ton: f64,
    pub open_from: i64,
    pub is_droppable: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Quest {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub reward: i64,
    pub valid_by: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Subtask {
    pub id: Uuid,
    pub quest_id: Uuid,
    pub name: String,
    pub description: String,
    pub reward: i64,
    pub link: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserQuest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quest_id: Uuid,
    pub completed: bool,
    pub reward_claimed: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSubtask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subtask_id: Uuid,
    pub completed: bool,
    pub reward_claimed: bool,
}

#[cfg(test)]
pub(crate) fn test_user() -> User {
    User {
        id: Uuid::new_v4(),
        tg_id: "100".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        username: None,
        is_premium: None,
        tg_image: None,
        score: 0,
        max_score: 0,
        current_level: 1,
        days_in_row: 1,
        auth_date: 0,
        is_days_shown: false,
        register_date: Utc::now(),
        reward: 0,
        gamebot_worked_minutes: 0,
        gamebot_reward: 0,
        active_skin_id: None,
        address: None,
    }
}
