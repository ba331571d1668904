use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use whatsapp_group_relay::{
    config::Config,
    schedule::{Clock, SystemClock},
    server::{self, AppState},
    whatsapp::{AutomationSettings, WhatsAppWebSender},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored if missing)
    let _ = dotenvy::dotenv();

    // Load configuration from environment
    let config = Config::from_env()?;

    // Initialize logging; debug mode also traces every HTTP request
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if config.debug {
        filter = filter
            .add_directive("whatsapp_group_relay=debug".parse()?)
            .add_directive("tower_http=debug".parse()?);
    } else {
        filter = filter.add_directive("whatsapp_group_relay=info".parse()?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting WhatsApp group relay (debug: {})", config.debug);
    info!("Target group: {}", config.group_id);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sender = WhatsAppWebSender::new(
        AutomationSettings::from_config(&config),
        Arc::clone(&clock),
    );
    let state = AppState::new(config.group_id.clone(), clock, Arc::new(sender));

    server::serve(&config, state).await
}
