//! Quest catalog with lazily materialized per-user progress.

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::game::{catalog, GameError};
use crate::handlers::skins::UserIdQuery;
use crate::handlers::{bad_request, db_err, error_code, not_found};
use crate::models::{Quest, Subtask, User, UserQuest, UserSubtask};

fn subtask_json(subtask: &Subtask, progress: &UserSubtask) -> serde_json::Value {
    json!({
        "id": subtask.id,
        "name": subtask.name,
        "description": subtask.description,
        "reward": subtask.reward,
        "link": subtask.link,
        "completed": progress.completed,
        "reward_claimed": progress.reward_claimed,
    })
}

/// `GET /quests?user_id=` — non-expired quests with progress.
///
/// Progress edges are created on first view and never overwritten, so a
/// user's earlier completions survive re-listing. Quest completion is
/// always derived from the subtask edges.
pub async fn get_quests(
    query: web::Query<UserIdQuery>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(query.user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_err)?;
    let user = match user {
        Some(user) => user,
        None => return Ok(not_found("user_not_found")),
    };

    let mut tx = pool.begin().await.map_err(db_err)?;
    let quests: Vec<Quest> = sqlx::query_as("SELECT * FROM quests WHERE valid_by > NOW()")
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

    let mut body = Vec::with_capacity(quests.len());
    for quest in quests {
        sqlx::query(
            "INSERT INTO user_quests (id, user_id, quest_id) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, quest_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(quest.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let user_quest: UserQuest = sqlx::query_as(
            "SELECT * FROM user_quests WHERE user_id = $1 AND quest_id = $2",
        )
        .bind(user.id)
        .bind(quest.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let subtasks: Vec<Subtask> = sqlx::query_as("SELECT * FROM subtasks WHERE quest_id = $1")
            .bind(quest.id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;

        let mut completed_subtasks = 0;
        let mut subtask_bodies = Vec::with_capacity(subtasks.len());
        for subtask in &subtasks {
            sqlx::query(
                "INSERT INTO user_subtasks (id, user_id, subtask_id) VALUES ($1, $2, $3)
                 ON CONFLICT (user_id, subtask_id) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(user.id)
            .bind(subtask.id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            let progress: UserSubtask = sqlx::query_as(
                "SELECT * FROM user_subtasks WHERE user_id = $1 AND subtask_id = $2",
            )
            .bind(user.id)
            .bind(subtask.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

            if progress.completed {
                completed_subtasks += 1;
            }
            subtask_bodies.push(subtask_json(subtask, &progress));
        }

        body.push(json!({
            "id": quest.id,
            "name": quest.name,
            "description": quest.description,
            "reward": quest.reward,
            "valid_by": quest.valid_by,
            "completed": completed_subtasks == subtasks.len(),
            "reward_claimed": user_quest.reward_claimed,
            "total_subtasks": subtasks.len(),
            "completed_subtasks": completed_subtasks,
            "subtasks": subtask_bodies,
        }));
    }
    tx.commit().await.map_err(db_err)?;

    Ok(HttpResponse::Ok().json(body))
}

async fn quest_counts(
    pool: &PgPool,
    user_id: Uuid,
    quest_id: Uuid,
) -> Result<(i64, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subtasks WHERE quest_id = $1")
        .bind(quest_id)
        .fetch_one(pool)
        .await?;
    let completed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_subtasks us
         JOIN subtasks s ON s.id = us.subtask_id
         WHERE us.user_id = $1 AND s.quest_id = $2 AND us.completed = TRUE",
    )
    .bind(user_id)
    .bind(quest_id)
    .fetch_one(pool)
    .await?;
    Ok((total, completed))
}

/// `POST /subtasks/{subtask_id}/complete?user_id=` — idempotent.
pub async fn complete_subtask(
    path: web::Path<Uuid>,
    query: web::Query<UserIdQuery>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(query.user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_err)?;
    let user = match user {
        Some(user) => user,
        None => return Ok(not_found("user_not_found")),
    };

    let subtask: Option<Subtask> = sqlx::query_as("SELECT * FROM subtasks WHERE id = $1")
        .bind(*path)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_err)?;
    let subtask = match subtask {
        Some(subtask) => subtask,
        None => return Ok(not_found("subtask_not_found")),
    };

    let progress: UserSubtask = sqlx::query_as(
        "INSERT INTO user_subtasks (id, user_id, subtask_id, completed) VALUES ($1, $2, $3, TRUE)
         ON CONFLICT (user_id, subtask_id) DO UPDATE SET completed = TRUE
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(subtask.id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(db_err)?;

    let (total, completed) = quest_counts(&pool, user.id, subtask.quest_id)
        .await
        .map_err(db_err)?;

    let mut body = subtask_json(&subtask, &progress);
    body["total_subtasks"] = json!(total);
    body["completed_subtasks"] = json!(completed);
    Ok(HttpResponse::Ok().json(body))
}

/// `POST /subtasks/{subtask_id}/claim-reward?user_id=`.
pub async fn claim_subtask_reward(
    path: web::Path<Uuid>,
    query: web::Query<UserIdQuery>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(query.user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
    let mut user = match user {
        Some(user) => user,
        None => return Ok(not_found("user_not_found")),
    };

    let subtask: Option<Subtask> = sqlx::query_as("SELECT * FROM subtasks WHERE id = $1")
        .bind(*path)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
    let subtask = match subtask {
        Some(subtask) => subtask,
        None => return Ok(not_found("subtask_not_found")),
    };

    let progress: Option<UserSubtask> = sqlx::query_as(
        "SELECT * FROM user_subtasks WHERE user_id = $1 AND subtask_id = $2 FOR UPDATE",
    )
    .bind(user.id)
    .bind(subtask.id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_err)?;
    let mut progress = match progress {
        Some(progress) => progress,
        None => return Ok(bad_request(error_code(GameError::NotStarted))),
    };

    if let Err(e) = catalog::claim_task_reward(
        &mut user,
        progress.completed,
        &mut progress.reward_claimed,
        subtask.reward,
    ) {
        return Ok(bad_request(error_code(e)));
    }

    sqlx::query("UPDATE user_subtasks SET reward_claimed = TRUE WHERE id = $1")
        .bind(progress.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
    sqlx::query("UPDATE users SET score = $1, max_score = $2 WHERE id = $3")
        .bind(user.score)
        .bind(user.max_score)
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
    tx.commit().await.map_err(db_err)?;

    let (total, completed) = quest_counts(&pool, user.id, subtask.quest_id)
        .await
        .map_err(db_err)?;

    let mut body = subtask_json(&subtask, &progress);
    body["total_subtasks"] = json!(total);
    body["completed_subtasks"] = json!(completed);
    body["new_score"] = json!(user.score);
    Ok(HttpResponse::Ok().json(body))
}

/// `POST /quests/{quest_id}/claim-reward?user_id=`.
pub async fn claim_quest_reward(
    path: web::Path<Uuid>,
    query: web::Query<UserIdQuery>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(query.user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
    let mut user = match user {
        Some(user) => user,
        None => return Ok(not_found("user_not_found")),
    };

    let quest: Option<Quest> = sqlx::query_as("SELECT * FROM quests WHERE id = $1")
        .bind(*path)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
    let quest = match quest {
        Some(quest) => quest,
        None => return Ok(not_found("quest_not_found")),
    };

    let user_quest: Option<UserQuest> = sqlx::query_as(
        "SELECT * FROM user_quests WHERE user_id = $1 AND quest_id = $2 FOR UPDATE",
    )
    .bind(user.id)
    .bind(quest.id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_err)?;
    let mut user_quest = match user_quest {
        Some(user_quest) => user_quest,
        None => return Ok(bad_request(error_code(GameError::NotStarted))),
    };

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subtasks WHERE quest_id = $1")
        .bind(quest.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
    let completed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_subtasks us
         JOIN subtasks s ON s.id = us.subtask_id
         WHERE us.user_id = $1 AND s.quest_id = $2 AND us.completed = TRUE",
    )
    .bind(user.id)
    .bind(quest.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    if let Err(e) = catalog::claim_task_reward(
        &mut user,
        completed == total,
        &mut user_quest.reward_claimed,
        quest.reward,
    ) {
        return Ok(bad_request(error_code(e)));
    }

    sqlx::query("UPDATE user_quests SET reward_claimed = TRUE WHERE id = $1")
        .bind(user_quest.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
    sqlx::query("UPDATE users SET score = $1, max_score = $2 WHERE id = $3")
        .bind(user.score)
        .bind(user.max_score)
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
    tx.commit().await.map_err(db_err)?;

    Ok(HttpResponse::Ok().json(json!({
        "id": quest.id,
        "name": quest.name,
        "description": quest.description,
        "reward": quest.reward,
        "valid_by": quest.valid_by,
        "completed": true,
        "reward_claimed": true,
        "total_subtasks": total,
        "completed_subtasks": completed,
        "new_score": user.score,
    })))
}
