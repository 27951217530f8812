//! Schema bootstrap and catalog seeding.

use chrono::{Duration, Utc};
use log::info;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn init_db(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS skins (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            required_xp BIGINT NOT NULL,
            price_ton DOUBLE PRECISION NOT NULL,
            open_from BIGINT NOT NULL,
            is_droppable BOOLEAN NOT NULL DEFAULT FALSE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            tg_id TEXT UNIQUE NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            username TEXT,
            is_premium BOOLEAN,
            tg_image TEXT,
            score BIGINT NOT NULL DEFAULT 0,
            max_score BIGINT NOT NULL DEFAULT 0,
            current_level INT NOT NULL DEFAULT 1,
            days_in_row INT NOT NULL DEFAULT 1,
            auth_date BIGINT NOT NULL DEFAULT 0,
            is_days_shown BOOLEAN NOT NULL DEFAULT FALSE,
            register_date TIMESTAMPTZ NOT NULL,
            reward BIGINT NOT NULL DEFAULT 0,
            gamebot_worked_minutes INT NOT NULL DEFAULT 0,
            gamebot_reward BIGINT NOT NULL DEFAULT 0,
            active_skin_id UUID REFERENCES skins(id),
            address TEXT
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS referrals (
            id UUID PRIMARY KEY,
            referrer_id UUID NOT NULL REFERENCES users(id),
            referred_user_id UUID NOT NULL REFERENCES users(id),
            UNIQUE(referrer_id, referred_user_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_skins (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(id),
            skin_id UUID NOT NULL REFERENCES skins(id),
            UNIQUE(user_id, skin_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS quests (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            reward BIGINT NOT NULL,
            valid_by TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS subtasks (
            id UUID PRIMARY KEY,
            quest_id UUID NOT NULL REFERENCES quests(id),
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            reward BIGINT NOT NULL,
            link TEXT
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_quests (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(id),
            quest_id UUID NOT NULL REFERENCES quests(id),
            completed BOOLEAN NOT NULL DEFAULT FALSE,
            reward_claimed BOOLEAN NOT NULL DEFAULT FALSE,
            UNIQUE(user_id, quest_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_subtasks (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(id),
            subtask_id UUID NOT NULL REFERENCES subtasks(id),
            completed BOOLEAN NOT NULL DEFAULT FALSE,
            reward_claimed BOOLEAN NOT NULL DEFAULT FALSE,
            UNIQUE(user_id, subtask_id)
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seeds the skin and quest catalogs on first boot. Existing rows win.
pub async fn seed_catalog(pool: &PgPool) -> Result<(), sqlx::Error> {
    let skins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM skins")
        .fetch_one(pool)
        .await?;

    if skins == 0 {
        let defaults: [(&str, i64, f64, i64, bool); 5] = [
            ("Classic", 0, 0.0, 0, false),
            ("Aurora", 2_500, 0.5, 10_000, true),
            ("Obsidian", 5_000, 1.0, 10_000, true),
            ("Fractal", 12_000, 2.0, 100_000, true),
            ("Imperial", 30_000, 5.0, 250_000, false),
        ];
        for (name, required_xp, price_ton, open_from, is_droppable) in defaults {
            sqlx::query(
                "INSERT INTO skins (id, name, required_xp, price_ton, open_from, is_droppable)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(required_xp)
            .bind(price_ton)
            .bind(open_from)
            .bind(is_droppable)
            .execute(pool)
            .await?;
        }
        info!("seeded {} default skins", defaults.len());
    }

    let quests: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quests")
        .fetch_one(pool)
        .await?;

    if quests == 0 {
        let quest_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO quests (id, name, description, reward, valid_by)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(quest_id)
        .bind("Welcome to Shift")
        .bind("Get set up and earn your first bonus")
        .bind(2_000_i64)
        .bind(Utc::now() + Duration::days(365))
        .execute(pool)
        .await?;

        let subtasks: [(&str, &str, i64, Option<&str>); 3] = [
            (
                "Join the channel",
                "Follow the official announcements channel",
                500,
                Some("https://t.me/shift_announcements"),
            ),
            (
                "Invite a friend",
                "Share your referral link with one friend",
                1_000,
                None,
            ),
            ("First tap", "Open the app and earn your first coins", 250, None),
        ];
        for (name, description, reward, link) in subtasks {
            sqlx::query(
                "INSERT INTO subtasks (id, quest_id, name, description, reward, link)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(quest_id)
            .bind(name)
            .bind(description)
            .bind(reward)
            .bind(link)
            .execute(pool)
            .await?;
        }
        info!("seeded starter quest");
    }

    Ok(())
}
