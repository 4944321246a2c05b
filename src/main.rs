use stable_diffusion_cat::{
    logger::{self, LoggerConfig},
    ChatSink, EnvSettings, GeneratorConfig, MessageKind, StableDiffusionCat,
};
use std::env;
use std::sync::Arc;

/// Stands in for the host's websocket: notifications go to the log.
struct LogSink;

impl ChatSink for LogSink {
    fn send(&self, content: &str, kind: MessageKind) {
        match kind {
            MessageKind::ChatToken => log::info!("💬 {}", content),
            MessageKind::Chat => log::warn!("💬 {}", content),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let log_config = match env::var("SD_CAT_LOG_JSON").as_deref() {
        Ok("1") | Ok("true") => LoggerConfig::production(),
        _ => LoggerConfig::development(),
    };
    logger::init_with_config(log_config)?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    match env::var("WIZMODEL_API_KEY") {
        Ok(key) if !key.is_empty() => {
            let prefix: String = key.chars().take(5).collect();
            log::info!("API key starts with: {}...", prefix);
        }
        _ => log::warn!("⚠️  WIZMODEL_API_KEY is not set, requests will be refused"),
    }

    let message = env::args().skip(1).collect::<Vec<_>>().join(" ");
    if message.is_empty() {
        log::error!("❌ Usage: stable-diffusion-cat <message ending in *>");
        return Ok(());
    }

    let config = GeneratorConfig::from_env();
    log::info!("⚙️  Endpoint: {}", config.endpoint);
    log::info!("⚙️  Assets root: {}", config.assets_root.display());

    let plugin = StableDiffusionCat::new(Arc::new(EnvSettings::new()), config)?;

    match plugin.fast_reply(&message, &LogSink).await {
        Some(reply) => println!("{}", reply),
        None => log::info!("Message does not end in '*', nothing to generate"),
    }

    Ok(())
}
