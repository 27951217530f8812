//! Telegram bot companion for the mini-app.

use std::sync::Arc;

use log::info;
use sqlx::{PgPool, Row};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};
use teloxide::utils::command::BotCommands;

use crate::game::tiers::tier_for_level;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Shift bot commands")]
enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "open the mini app")]
    Open,
    #[command(description = "show your progress")]
    Stats,
}

pub async fn run_bot(pool: PgPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let token = std::env::var("BOT_TOKEN")?;
    let bot = Bot::new(token);

    info!("starting Telegram bot");

    let handler = Update::filter_message()
        .filter_command::<Command>()
        .endpoint(command_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![Arc::new(pool)])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    pool: Arc<PgPool>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => start_cmd(bot, msg).await,
        Command::Open => open_cmd(bot, msg).await,
        Command::Stats => stats_cmd(bot, msg, &pool).await,
    }
}

async fn start_cmd(bot: Bot, msg: Message) -> ResponseResult<()> {
    let name = msg
        .from()
        .map(|u| u.full_name())
        .unwrap_or_else(|| "there".to_string());
    bot.send_message(msg.chat.id, format!("Hello, {name}! Use /open to play."))
        .await?;
    Ok(())
}

async fn open_cmd(bot: Bot, msg: Message) -> ResponseResult<()> {
    let webapp_url = std::env::var("WEBAPP_URL").ok();
    let url = match webapp_url.and_then(|u| url::Url::parse(&u).ok()) {
        Some(url) => url,
        None => {
            bot.send_message(msg.chat.id, "The app is not configured yet.")
                .await?;
            return Ok(());
        }
    };

    let markup = InlineKeyboardMarkup::new([[InlineKeyboardButton::web_app(
        "Open",
        WebAppInfo { url },
    )]]);
    bot.send_message(msg.chat.id, "Welcome to the app:")
        .reply_markup(markup)
        .await?;
    Ok(())
}

async fn stats_cmd(bot: Bot, msg: Message, pool: &PgPool) -> ResponseResult<()> {
    let tg_id = match msg.from() {
        Some(user) => user.id.to_string(),
        None => return Ok(()),
    };

    let row = sqlx::query(
        "SELECT score, current_level, days_in_row, gamebot_reward FROM users WHERE tg_id = $1",
    )
    .bind(&tg_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None);

    let text = match row {
        Some(r) => {
            let score: i64 = r.get(0);
            let level: i32 = r.get(1);
            let days: i32 = r.get(2);
            let pending: i64 = r.get(3);
            let tier = tier_for_level(level);
            format!(
                "🏅 {tier_name} (level {level})\n💰 Score: {score}\n🔥 Streak: {days} day(s)\n🤖 Gamebot pending: {pending}",
                tier_name = tier.name,
            )
        }
        None => "No profile yet — open the app first with /open.".to_string(),
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
