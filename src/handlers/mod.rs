//! actix-web route handlers. All SQL lives here; game rules live in
//! [`crate::game`].

pub mod quests;
pub mod skins;
pub mod users;

use actix_web::HttpResponse;
use serde_json::json;

use crate::game::GameError;

pub(crate) fn db_err(e: sqlx::Error) -> actix_web::Error {
    log::error!("database error: {e}");
    actix_web::error::ErrorInternalServerError("database error")
}

pub(crate) fn bad_request(code: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "ok": false, "error": code }))
}

pub(crate) fn not_found(code: &str) -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "ok": false, "error": code }))
}

pub(crate) fn error_code(e: GameError) -> &'static str {
    match e {
        GameError::NotEligible => "not_eligible",
        GameError::InsufficientXp => "insufficient_xp",
        GameError::NotOwned => "skin_not_owned",
        GameError::NotStarted => "not_started",
        GameError::NotComplete => "not_completed",
        GameError::AlreadyClaimed => "already_claimed",
    }
}
