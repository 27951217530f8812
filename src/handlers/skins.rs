//! Skin catalog: listing, purchase, active-skin selection.

use actix_web::{web, HttpResponse, Result as ActixResult};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::game::catalog;
use crate::handlers::{bad_request, db_err, error_code, not_found};
use crate::models::{Skin, User};

#[derive(Debug, Serialize)]
pub struct SkinResponse {
    pub id: Uuid,
    pub name: String,
    pub required_xp: i64,
    pub price_ton: f64,
    pub open_from: i64,
    pub owned: bool,
}

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// `GET /skins?user_id=` — the whole catalog with ownership flags.
pub async fn get_skins(
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

    let skins: Vec<Skin> = sqlx::query_as("SELECT * FROM skins ORDER BY required_xp")
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_err)?;
    let owned: Vec<Uuid> = sqlx::query_scalar("SELECT skin_id FROM user_skins WHERE user_id = $1")
        .bind(user.id)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_err)?;

    let body: Vec<SkinResponse> = skins
        .into_iter()
        .map(|s| SkinResponse {
            owned: owned.contains(&s.id),
            id: s.id,
            name: s.name,
            required_xp: s.required_xp,
            price_ton: s.price_ton,
            open_from: s.open_from,
        })
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseSkinRequest {
    pub tg_id: String,
    pub skin_id: Uuid,
    /// Either `xp` or `ton`.
    pub purchase_type: String,
    /// Payment proof for TON purchases; validity is established outside
    /// this service.
    pub check_str: Option<String>,
}

/// `POST /skins/purchase`.
pub async fn purchase_skin(
    body: web::Json<PurchaseSkinRequest>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE tg_id = $1 FOR UPDATE")
        .bind(&body.tg_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
    let mut user = match user {
        Some(user) => user,
        None => return Ok(not_found("user_not_found")),
    };

    let skin: Option<Skin> = sqlx::query_as("SELECT * FROM skins WHERE id = $1")
        .bind(body.skin_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
    let skin = match skin {
        Some(skin) => skin,
        None => return Ok(not_found("skin_not_found")),
    };

    let purchase = match body.purchase_type.as_str() {
        "xp" => catalog::purchase_with_xp(&mut user, &skin),
        "ton" => catalog::purchase_with_ton(body.check_str.as_deref()),
        _ => return Ok(bad_request("invalid_purchase_type")),
    };

    if let Err(e) = purchase {
        return Ok(bad_request(error_code(e)));
    }

    sqlx::query(
        "INSERT INTO user_skins (id, user_id, skin_id) VALUES ($1, $2, $3)
         ON CONFLICT (user_id, skin_id) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(skin.id)
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;

    sqlx::query("UPDATE users SET score = $1 WHERE id = $2")
        .bind(user.score)
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
    tx.commit().await.map_err(db_err)?;

    info!("user {} purchased skin {}", user.tg_id, skin.name);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Skin purchased successfully",
        "skin": skin,
        "score": user.score,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveSkinRequest {
    pub tg_id: String,
}

/// `POST /skins/{skin_id}/set-active` — `"0"` clears the active skin.
pub async fn set_active_skin(
    path: web::Path<String>,
    body: web::Json<SetActiveSkinRequest>,
    pool: web::Data<PgPool>,
) -> ActixResult<HttpResponse> {
    let skin_id = if path.as_str() == "0" {
        None
    } else {
        match Uuid::parse_str(&path) {
            Ok(id) => Some(id),
            Err(_) => return Ok(bad_request("invalid_skin_id")),
        }
    };

    let mut tx = pool.begin().await.map_err(db_err)?;
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE tg_id = $1 FOR UPDATE")
        .bind(&body.tg_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
    let mut user = match user {
        Some(user) => user,
        None => return Ok(not_found("user_not_found")),
    };

    let owned = match skin_id {
        Some(id) => {
            let owned: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM user_skins WHERE user_id = $1 AND skin_id = $2",
            )
            .bind(user.id)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
            owned > 0
        }
        None => false,
    };

    if let Err(e) = catalog::set_active_skin(&mut user, skin_id, owned) {
        return Ok(bad_request(error_code(e)));
    }

    sqlx::query("UPDATE users SET active_skin_id = $1 WHERE id = $2")
        .bind(user.active_skin_id)
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
    tx.commit().await.map_err(db_err)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Skin set as active successfully",
        "active_skin_id": user.active_skin_id,
    })))
}
