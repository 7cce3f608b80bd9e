use std::sync::Arc;

use anyhow::Result;
use courier_app::platform::telegram::{self, TelegramSink};
use courier_app::platform::{logging, AppConfig, EffectRunner, Sessions};
use courier_engine::{Pipeline, PreferenceStore, ReqwestFetcher, RonPreferenceStore, SmtpDelivery};
use courier_logging::courier_info;
use teloxide::Bot;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    logging::initialize(config.log_file.as_deref(), false);

    let token = config.require_telegram_token()?;
    let smtp = config.require_smtp()?;
    let delivery = SmtpDelivery::new(smtp.settings(config.fetch_timeout))?;
    let sender = delivery.sender().to_string();

    let prefs: Arc<dyn PreferenceStore> = Arc::new(RonPreferenceStore::open(&config.state_dir));
    let pipeline = Pipeline::new(Arc::new(ReqwestFetcher::new(config.fetch_settings())));
    let bot = Bot::new(token);

    let runner = Arc::new(EffectRunner::new(
        Sessions::new(prefs.clone(), Some(sender.clone())),
        prefs,
        pipeline,
        Arc::new(delivery),
        Arc::new(TelegramSink::new(bot.clone())),
    ));

    courier_info!(
        "courier-bot starting; state in {:?}, sending as {}",
        config.state_dir,
        sender
    );
    telegram::run(bot, runner).await;
    Ok(())
}
