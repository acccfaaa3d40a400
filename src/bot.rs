use teloxide::adaptors::throttle::Limits;
use teloxide::adaptors::Throttle;
use teloxide::prelude::*;
use teloxide::Bot;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::error::{BotResult, HandlerResult};
use crate::handler::get_handler;
use crate::state::AppState;

pub struct BotService {
    pub bot: Throttle<Bot>,
    pub state: AppState,
}

impl BotService {
    pub fn new(config: AppConfig) -> BotResult<Self> {
        let bot = Bot::new(config.telegram.token.clone()).throttle(Limits::default());
        let state = AppState::new(config, bot.clone())?;

        Ok(Self { bot, state })
    }

    pub async fn start(&self) -> HandlerResult<()> {
        info!("Testing connection to Telegram API...");
        match self.bot.get_me().await {
            Ok(me) => info!("Connected to Telegram API as @{}", me.username()),
            Err(e) => {
                error!("Failed to connect to Telegram API: {:?}", e);
                return Err(anyhow::anyhow!("Failed to connect to Telegram API: {}", e).into());
            }
        }

        self.state.artifacts.prepare().await?;
        info!(
            "Scratch directory ready at {}, platforms: {:?}",
            self.state.artifacts.scratch_dir().display(),
            self.state.platform_registry.get_supported_platforms()
        );

        let sweep = self.spawn_ticket_sweep();

        Dispatcher::builder(self.bot.clone(), get_handler())
            .dependencies(dptree::deps![self.state.clone()])
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        sweep.abort();
        Ok(())
    }

    fn spawn_ticket_sweep(&self) -> JoinHandle<()> {
        let delivery = self.state.delivery.clone();
        let delivery_config = &self.state.config.delivery;
        let period = delivery_config.ticket_sweep_interval;
        let ttl = chrono::Duration::from_std(delivery_config.ticket_ttl).unwrap_or_else(|_| chrono::Duration::hours(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                delivery.sweep(ttl);
            }
        })
    }
}
