//! Telegram WebApp init-data validation.
//!
//! The payment/identity boundary proper lives outside this service; this is
//! the placeholder signature check on the raw init data Telegram hands the
//! mini-app. Enabled with `TELEGRAM_AUTH=1`, otherwise requests pass
//! through untouched.

use std::rc::Rc;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::ErrorUnauthorized;
use actix_web::Error;
use chrono::Utc;
use futures::future::{ready, LocalBoxFuture, Ready};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error as ThisError;

type HmacSha256 = Hmac<Sha256>;

/// Signed init data is rejected once its `auth_date` is older than this.
const INIT_DATA_LIFETIME_SECS: i64 = 3_600;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing or malformed authorization header")]
    MissingHeader,
    #[error("init data carries no hash")]
    MissingHash,
    #[error("init data signature mismatch")]
    BadSignature,
    #[error("init data expired, re-fetch it from Telegram")]
    Expired,
}

/// Verifies the `hash` field of Telegram WebApp init data.
///
/// Pairs are sorted, joined as `key=value` lines with the hash excluded,
/// and signed with HMAC-SHA256 under the secret derived from the bot token
/// per the Bot API contract.
pub fn validate_init_data(bot_token: &str, raw: &str, now: i64) -> Result<(), AuthError> {
    let mut hash = None;
    let mut auth_date = None;
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        if key == "hash" {
            hash = Some(value.into_owned());
            continue;
        }
        if key == "auth_date" {
            auth_date = value.parse::<i64>().ok();
        }
        pairs.push((key.into_owned(), value.into_owned()));
    }

    let hash = hash.ok_or(AuthError::MissingHash)?;
    pairs.sort();
    let data_check: Vec<String> = pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();

    let mut secret =
        HmacSha256::new_from_slice(b"WebAppData").map_err(|_| AuthError::BadSignature)?;
    secret.update(bot_token.as_bytes());
    let secret_key = secret.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key).map_err(|_| AuthError::BadSignature)?;
    mac.update(data_check.join("\n").as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if expected != hash {
        return Err(AuthError::BadSignature);
    }

    match auth_date {
        Some(ts) if now - ts <= INIT_DATA_LIFETIME_SECS => Ok(()),
        _ => Err(AuthError::Expired),
    }
}

/// Opt-in middleware checking `Authorization: tma <init-data>` on every
/// request. Constructed with no token it is a pass-through.
#[derive(Clone)]
pub struct TelegramAuth {
    token: Option<String>,
}

impl TelegramAuth {
    pub fn from_env() -> Self {
        let enabled = std::env::var("TELEGRAM_AUTH")
            .map(|v| v == "1")
            .unwrap_or(false);
        let token = if enabled {
            std::env::var("BOT_TOKEN").ok()
        } else {
            None
        };
        Self { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for TelegramAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = TelegramAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TelegramAuthMiddleware {
            service: Rc::new(service),
            token: self.token.clone(),
        }))
    }
}

pub struct TelegramAuthMiddleware<S> {
    service: Rc<S>,
    token: Option<String>,
}

impl<S, B> Service<ServiceRequest> for TelegramAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let token = self.token.clone();

        Box::pin(async move {
            if let Some(token) = token {
                let checked = req
                    .headers()
                    .get("Authorization")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|h| h.strip_prefix("tma "))
                    .ok_or(AuthError::MissingHeader)
                    .and_then(|raw| validate_init_data(&token, raw, Utc::now().timestamp()));

                if let Err(e) = checked {
                    return Err(ErrorUnauthorized(e.to_string()));
                }
            }
            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "12345:TEST_TOKEN";

    /// Builds raw init data signed the way Telegram signs it.
    fn signed(pairs: &[(&str, &str)]) -> String {
        let mut sorted: Vec<(&str, &str)> = pairs.to_vec();
        sorted.sort();
        let data_check: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();

        let mut secret = HmacSha256::new_from_slice(b"WebAppData").unwrap();
        secret.update(TOKEN.as_bytes());
        let secret_key = secret.finalize().into_bytes();
        let mut mac = HmacSha256::new_from_slice(&secret_key).unwrap();
        mac.update(data_check.join("\n").as_bytes());
        let hash = hex::encode(mac.finalize().into_bytes());

        let mut encoded = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in pairs {
            encoded.append_pair(k, v);
        }
        encoded.append_pair("hash", &hash);
        encoded.finish()
    }

    #[test]
    fn valid_signature_passes() {
        let raw = signed(&[
            ("auth_date", "1000"),
            ("query_id", "AAE"),
            ("user", r#"{"id":100,"first_name":"Test"}"#),
        ]);
        assert_eq!(validate_init_data(TOKEN, &raw, 1500), Ok(()));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let raw = signed(&[("auth_date", "1000"), ("query_id", "AAE")]);
        let tampered = raw.replace("AAE", "AAF");
        assert_eq!(
            validate_init_data(TOKEN, &tampered, 1500),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn missing_hash_is_rejected() {
        assert_eq!(
            validate_init_data(TOKEN, "auth_date=1000&query_id=AAE", 1500),
            Err(AuthError::MissingHash)
        );
    }

    #[test]
    fn stale_auth_date_is_rejected() {
        let raw = signed(&[("auth_date", "1000"), ("query_id", "AAE")]);
        assert_eq!(
            validate_init_data(TOKEN, &raw, 1000 + INIT_DATA_LIFETIME_SECS + 1),
            Err(AuthError::Expired)
        );
    }
}
