//! Check-in orchestrator, reward claims, upgrades, wallet address.

use actix_web::{web, HttpResponse, Result as ActixResult};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::game::rewards::{self, Bucket, DropOutcome, ThreadDropRng};
use crate::game::streak::{self, date_of};
use crate::game::tiers::next_tier;
use crate::game::progression;
use crate::handlers::{bad_request, db_err, error_code, not_found};
use crate::models::{Skin, User};

pub const REFERRAL_BONUS: i64 = 1_000;
pub const REFERRAL_CAP: i64 = 150;

#[derive(Debug, Deserialize)]
pub struct UserData {
    pub tg_id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub is_premium: Option<bool>,
    pub tg_image: Option<String>,
    /// Client-reported "now", Unix seconds. All streak and gamebot math
    /// runs off this value.
    pub auth_date: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReferrerQuery {
    pub referrer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub level: i32,
    pub status_name: String,
    pub energy_limit: i32,
    pub nitro: i32,
    pub recharging_speed: i32,
    pub coin_farming: i32,
    pub gamebot: i32,
    pub fractal: Option<i32>,
    pub points_to_next_level: i64,
    pub xp_to_upgrade: Option<i64>,
    pub ton_to_upgrade: Option<f64>,
    pub upgrade_available: bool,
}

pub(crate) fn status_block(user: &User) -> StatusResponse {
    let tier = progression::status_of(user);
    let next = next_tier(user.current_level);
    StatusResponse {
        level: tier.level,
        status_name: tier.name.to_string(),
        energy_limit: tier.energy_limit,
        nitro: tier.nitro,
        recharging_speed: tier.recharging_speed,
        coin_farming: tier.coin_farming,
        gamebot: tier.gamebot_hours,
        fractal: tier.fractal,
        points_to_next_level: progression::xp_to_next_level(user),
        xp_to_upgrade: next.and_then(|t| t.xp_to_upgrade),
        ton_to_upgrade: next.and_then(|t| t.ton_to_upgrade),
        upgrade_available: progression::upgrade_available(user),
    }
}

async fn referral_info(pool: &PgPool, user: &User) -> Result<serde_json::Value, sqlx::Error> {
    let referrer = sqlx::query(
        "SELECT u.id, u.tg_id, u.first_name, u.last_name, u.username, u.is_premium
         FROM referrals r
         JOIN users u ON u.id = r.referrer_id
         WHERE r.referred_user_id = $1",
    )
    .bind(user.id)
    .fetch_optional(pool)
    .await?
    .map(|r| {
        json!({
            "id": r.get::<Uuid, _>(0),
            "tg_id": r.get::<String, _>(1),
            "first_name": r.get::<String, _>(2),
            "last_name": r.get::<String, _>(3),
            "username": r.get::<Option<String>, _>(4),
            "is_premium": r.get::<Option<bool>, _>(5),
        })
    });

    let referred_users: Vec<serde_json::Value> = sqlx::query(
        "SELECT u.id, u.tg_id, u.first_name, u.last_name, u.username, u.is_premium, u.score
         FROM referrals r
         JOIN users u ON u.id = r.referred_user_id
         WHERE r.referrer_id = $1",
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|r| {
        json!({
            "id": r.get::<Uuid, _>(0),
            "tg_id": r.get::<String, _>(1),
            "first_name": r.get::<String, _>(2),
            "last_name": r.get::<String, _>(3),
            "username": r.get::<Option<String>, _>(4),
            "is_premium": r.get::<Option<bool>, _>(5),
            "score": r.get::<i64, _>(6),
        })
    })
    .collect();

    Ok(json!({ "referrer": referrer, "referred_users": referred_users }))
}

pub(crate) async fn user_response(
    pool: &PgPool,
    user: &User,
    is_days_dropped: bool,
    drop_reward: Option<serde_json::Value>,
) -> Result<serde_json::Value, sqlx::Error> {
    let referrals = referral_info(pool, user).await?;
    Ok(json!({
        "id": user.id,
        "tg_id": user.tg_id,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "username": user.username,
        "is_premium": user.is_premium,
        "tg_image": user.tg_image,
        "score": user.score,
        "max_score": user.max_score,
        "status": status_block(user),
        "days_in_row": user.days_in_row,
        "auth_date": user.auth_date,
        "register_date": user.register_date,
        "is_days_shown": user.is_days_shown,
        "is_days_dropped": is_days_dropped,
        "reward": user.reward,
        "gamebot_worked_minutes": user.gamebot_worked_minutes,
        "gamebot_reward": user.gamebot_reward,
        "active_skin_id": user.active_skin_id,
        "address": user.address,
        "drop_reward": drop_reward,
        "referrals": referrals,
    }))
}

async fn drop_reward_json(
    pool: &PgPool,
    reward: Option<DropOutcome>,
) -> Result<Option<serde_json::Value>, sqlx::Error> {
    match reward {
        None => Ok(None),
        Some(DropOutcome::Xp { amount, new_score }) => Ok(Some(json!({
            "type": "xp",
            "amount": amount,
            "new_score": new_score,
        }))),
        Some(DropOutcome::Skin { skin_id }) => {
            let skin: Option<Skin> = sqlx::query_as("SELECT * FROM skins WHERE id = $1")
                .bind(skin_id)
                .fetch_optional(pool)
                .await?;
            Ok(skin.map(|s| {
                json!({
                    "type": "skin",
                    "skin": {
                        "id": s.id,
                        "name": s.name,
                        "required_xp": s.required_xp,
                        "price_ton": s.price_ton,
                        "open_from": s.open_from,
                        "owned": true,
                    },
                })
            }))
        }
    }
}

/// `PUT /users` — the once-per-session check-in.
///
/// Creates the user on first sight (crediting the referrer when one is
/// supplied), otherwise settles the streak and gamebot accrual against the
/// stored timestamp and refreshes the profile. All state lands in a single
/// write-back inside one row-locked transaction.
pub async fn create_or_update_user(
    body: web::Json<UserData>,
    query: web::Query<ReferrerQuery>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    let data = body.into_inner();

    let mut tx = pool.begin().await.map_err(db_err)?;
    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE tg_id = $1 FOR UPDATE")
        .bind(&data.tg_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

    let mut is_days_dropped = false;
    let mut reward = None;

    let user = if let Some(mut user) = existing {
        let new_date = date_of(data.auth_date);
        let last_date = date_of(user.auth_date);
        let shown_today = new_date <= last_date;
        user.is_days_shown = shown_today;

        // catalog context for a possible skin drop
        let (droppable, owned) = if shown_today {
            (Vec::new(), Vec::new())
        } else {
            let droppable: Vec<Skin> =
                sqlx::query_as("SELECT * FROM skins WHERE is_droppable = TRUE")
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(db_err)?;
            let owned: Vec<Uuid> =
                sqlx::query_scalar("SELECT skin_id FROM user_skins WHERE user_id = $1")
                    .bind(user.id)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(db_err)?;
            (droppable, owned)
        };

        let outcome = streak::update_streak(
            &mut user,
            new_date,
            shown_today,
            &droppable,
            &owned,
            &mut ThreadDropRng,
        );
        is_days_dropped = outcome.dropped;

        if let Some(DropOutcome::Skin { skin_id }) = outcome.reward {
            sqlx::query("INSERT INTO user_skins (id, user_id, skin_id) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(user.id)
                .bind(skin_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
        reward = outcome.reward;

        streak::accrue_gamebot(&mut user, data.auth_date);

        user.first_name = data.first_name;
        user.last_name = data.last_name;
        user.username = data.username;
        user.is_premium = data.is_premium;
        user.tg_image = data.tg_image;
        user.auth_date = data.auth_date;

        sqlx::query(
            "UPDATE users
             SET first_name = $1, last_name = $2, username = $3, is_premium = $4,
                 tg_image = $5, auth_date = $6, is_days_shown = $7, days_in_row = $8,
                 score = $9, max_score = $10, gamebot_worked_minutes = $11,
                 gamebot_reward = $12
             WHERE id = $13",
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(user.is_premium)
        .bind(&user.tg_image)
        .bind(user.auth_date)
        .bind(user.is_days_shown)
        .bind(user.days_in_row)
        .bind(user.score)
        .bind(user.max_score)
        .bind(user.gamebot_worked_minutes)
        .bind(user.gamebot_reward)
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        user
    } else {
        let referrer: Option<User> = match &query.referrer_id {
            Some(referrer_tg_id) => sqlx::query_as("SELECT * FROM users WHERE tg_id = $1")
                .bind(referrer_tg_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?,
            None => None,
        };

        let initial_score: i64 = if referrer.is_some() { 1_000 } else { 0 };
        let register_date: DateTime<Utc> =
            DateTime::from_timestamp(data.auth_date, 0).unwrap_or_else(Utc::now);

        let user: User = sqlx::query_as(
            "INSERT INTO users (id, tg_id, first_name, last_name, username, is_premium,
                                tg_image, score, max_score, days_in_row, auth_date,
                                is_days_shown, register_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, 1, $9, FALSE, $10)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.tg_id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.username)
        .bind(data.is_premium)
        .bind(&data.tg_image)
        .bind(initial_score)
        .bind(data.auth_date)
        .bind(register_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        if let Some(referrer) = referrer {
            let made: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM referrals WHERE referrer_id = $1")
                .bind(referrer.id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;

            if made < REFERRAL_CAP {
                sqlx::query("UPDATE users SET reward = reward + $1 WHERE id = $2")
                    .bind(REFERRAL_BONUS)
                    .bind(referrer.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_err)?;
                sqlx::query(
                    "INSERT INTO referrals (id, referrer_id, referred_user_id)
                     VALUES ($1, $2, $3)",
                )
                .bind(Uuid::new_v4())
                .bind(referrer.id)
                .bind(user.id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
        }

        info!("registered user {}", user.tg_id);
        user
    };

    tx.commit().await.map_err(db_err)?;

    let drop_reward = drop_reward_json(&pool, reward).await.map_err(db_err)?;
    let body = user_response(&pool, &user, is_days_dropped, drop_reward)
        .await
        .map_err(db_err)?;
    Ok(HttpResponse::Ok().json(body))
}

async fn claim_bucket(pool: &PgPool, user_id: Uuid, bucket: Bucket) -> Result<Option<(User, i64)>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

    let mut user = match user {
        Some(user) => user,
        None => return Ok(None),
    };

    let passed = rewards::claim(&mut user, bucket);
    sqlx::query(
        "UPDATE users SET score = $1, max_score = $2, reward = $3, gamebot_reward = $4
         WHERE id = $5",
    )
    .bind(user.score)
    .bind(user.max_score)
    .bind(user.reward)
    .bind(user.gamebot_reward)
    .bind(user.id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Some((user, passed)))
}

/// `POST /users/{user_id}/claim` — referral bucket.
pub async fn claim_referral_reward(
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    match claim_bucket(&pool, *path, Bucket::Referral).await.map_err(db_err)? {
        Some((user, passed)) => Ok(HttpResponse::Ok().json(json!({
            "message": "Reward claimed successfully",
            "new_score": user.score,
            "reward_passed": passed,
        }))),
        None => Ok(not_found("user_not_found")),
    }
}

/// `POST /gamebot/{user_id}/claim` — collect pending idle income.
pub async fn claim_gamebot_reward(
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    match claim_bucket(&pool, *path, Bucket::Gamebot).await.map_err(db_err)? {
        Some((user, passed)) => Ok(HttpResponse::Ok().json(json!({
            "message": "Reward claimed successfully",
            "new_score": user.score,
            "reward_passed": passed,
        }))),
        None => Ok(not_found("user_not_found")),
    }
}

/// `POST /gamebot/{user_id}/drop` — dismiss pending idle income.
pub async fn drop_gamebot_reward(
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(*path)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

    let mut user = match user {
        Some(user) => user,
        None => return Ok(not_found("user_not_found")),
    };

    rewards::drop_gamebot(&mut user);
    sqlx::query("UPDATE users SET gamebot_reward = 0 WHERE id = $1")
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
    tx.commit().await.map_err(db_err)?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Reward dropped" })))
}

#[derive(Debug, Deserialize)]
pub struct UpgradeLevelRequest {
    /// Opaque payment proof. Non-empty waives the XP cost.
    pub boc: Option<String>,
}

/// `POST /users/{user_id}/upgrade-level`.
pub async fn upgrade_level(
    path: web::Path<Uuid>,
    body: web::Json<UpgradeLevelRequest>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(*path)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

    let mut user = match user {
        Some(user) => user,
        None => return Ok(not_found("user_not_found")),
    };

    match progression::upgrade(&mut user, body.boc.as_deref()) {
        Ok(progression::UpgradeOutcome::Upgraded) => {
            sqlx::query("UPDATE users SET score = $1, current_level = $2 WHERE id = $3")
                .bind(user.score)
                .bind(user.current_level)
                .bind(user.id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            tx.commit().await.map_err(db_err)?;

            info!("user {} upgraded to level {}", user.tg_id, user.current_level);
            Ok(HttpResponse::Ok().json(json!({
                "message": "User upgraded successfully",
                "new_level": user.current_level,
                "score": user.score,
                "user_status": status_block(&user),
                "points_to_next_level": progression::xp_to_next_level(&user),
            })))
        }
        Ok(progression::UpgradeOutcome::NotEligible) => {
            Ok(HttpResponse::Ok().json(json!({ "message": "User not eligible for upgrade" })))
        }
        Err(e) => Ok(bad_request(error_code(e))),
    }
}

#[derive(Debug, Deserialize)]
pub struct SetAddressRequest {
    pub address: String,
}

/// `PUT /users/{user_id}/address` — store the TON wallet address.
pub async fn set_address(
    path: web::Path<Uuid>,
    body: web::Json<SetAddressRequest>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    let user: Option<User> = sqlx::query_as(
        "UPDATE users SET address = $1 WHERE id = $2 RETURNING *",
    )
    .bind(&body.address)
    .bind(*path)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(db_err)?;

    match user {
        Some(user) => {
            let body = user_response(&pool, &user, false, None).await.map_err(db_err)?;
            Ok(HttpResponse::Ok().json(body))
        }
        None => Ok(not_found("user_not_found")),
    }
}

/// `DELETE /users/{user_id}/address`.
pub async fn delete_address(
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    let user: Option<User> = sqlx::query_as(
        "UPDATE users SET address = NULL WHERE id = $1 RETURNING *",
    )
    .bind(*path)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(db_err)?;

    match user {
        Some(user) => {
            let body = user_response(&pool, &user, false, None).await.map_err(db_err)?;
            Ok(HttpResponse::Ok().json(body))
        }
        None => Ok(not_found("user_not_found")),
    }
}
