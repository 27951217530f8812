mod auth;
mod bot;
mod db;
mod game;
mod handlers;
mod models;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8000".to_string())
        .parse()
        .unwrap_or(8000);

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await?;
    info!("database connection pool created");

    db::init_db(&pool).await?;
    db::seed_catalog(&pool).await?;
    info!("database initialized");

    if std::env::var("BOT_TOKEN").is_ok() {
        let bot_pool = pool.clone();
        tokio::spawn(async move {
            if let Err(e) = bot::run_bot(bot_pool).await {
                error!("Telegram bot failed: {e}");
            }
        });
    } else {
        info!("BOT_TOKEN not set, running without the Telegram bot");
    }

    let telegram_auth = auth::TelegramAuth::from_env();

    info!("starting server on 0.0.0.0:{port}");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .wrap(telegram_auth.clone())
            .app_data(web::Data::new(pool.clone()))
            .route("/users", web::put().to(handlers::users::create_or_update_user))
            .route(
                "/users/{user_id}/claim",
                web::post().to(handlers::users::claim_referral_reward),
            )
            .route(
                "/gamebot/{user_id}/claim",
                web::post().to(handlers::users::claim_gamebot_reward),
            )
            .route(
                "/gamebot/{user_id}/drop",
                web::post().to(handlers::users::drop_gamebot_reward),
            )
            .route(
                "/users/{user_id}/upgrade-level",
                web::post().to(handlers::users::upgrade_level),
            )
            .route(
                "/users/{user_id}/address",
                web::put().to(handlers::users::set_address),
            )
            .route(
                "/users/{user_id}/address",
                web::delete().to(handlers::users::delete_address),
            )
            .route("/skins", web::get().to(handlers::skins::get_skins))
            .route("/skins/purchase", web::post().to(handlers::skins::purchase_skin))
            .route(
                "/skins/{skin_id}/set-active",
                web::post().to(handlers::skins::set_active_skin),
            )
            .route("/quests", web::get().to(handlers::quests::get_quests))
            .route(
                "/subtasks/{subtask_id}/complete",
                web::post().to(handlers::quests::complete_subtask),
            )
            .route(
                "/subtasks/{subtask_id}/claim-reward",
                web::post().to(handlers::quests::claim_subtask_reward),
            )
            .route(
                "/quests/{quest_id}/claim-reward",
                web::post().to(handlers::quests::claim_quest_reward),
            )
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    Ok(())
}
