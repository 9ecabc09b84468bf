//! hamkor server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `HAMKOR_*`
//! environment variables, opens the SQLite store, serves the HTTP API and,
//! when a bot token is configured, runs the Telegram bot alongside it.
//!
//! Nested settings use a double underscore in the environment, e.g.
//! `HAMKOR_SERVICE__DAILY_IMAGE_LIMIT=10`.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, bail};
use clap::Parser;
use hamkor_api::ApiState;
use hamkor_server::{ChatChannel, ImageKitHost, Images, ServerConfig, imagekit};
use hamkor_service::{binder::ChatBinder, session::SessionTokens};
use hamkor_store_sqlite::SqliteStore;
use hamkor_telegram::{Bot, TelegramClient};
use tokio::{net::TcpListener, sync::watch};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Hamkor marketplace backend")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg: ServerConfig = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("HAMKOR")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if cfg.jwt_secret.trim().is_empty() {
    bail!("jwt_secret must be set (config.toml or HAMKOR_JWT_SECRET)");
  }

  let store = SqliteStore::open(&cfg.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.database_path))?;
  let store = Arc::new(store);

  // Chat channel.
  let telegram = match &cfg.telegram_bot_token {
    Some(token) => {
      let client =
        TelegramClient::new(&cfg.telegram_api_base, token, cfg.telegram_request_timeout())
          .context("failed to build Telegram client")?;
      Some(Arc::new(client))
    }
    None => {
      warn!("telegram_bot_token not set; codes and notifications will not be delivered");
      None
    }
  };
  let chat = Arc::new(match &telegram {
    Some(client) => ChatChannel::Telegram(client.clone()),
    None => ChatChannel::Disabled,
  });

  // Image host.
  let images = Arc::new(match &cfg.imagekit_private_key {
    Some(key) => Images::ImageKit(
      ImageKitHost::new(
        cfg.imagekit_upload_url.clone(),
        cfg.imagekit_files_url.clone(),
        key.clone(),
        cfg.imagekit_folder.clone(),
        imagekit::UPLOAD_TIMEOUT,
      )
      .context("failed to build ImageKit client")?,
    ),
    None => {
      warn!("imagekit_private_key not set; image messages are disabled");
      Images::Disabled
    }
  });

  let tokens = SessionTokens::new(&cfg.jwt_secret, cfg.service.token_ttl());
  let state = ApiState::new(store.clone(), chat, images, tokens, cfg.service.clone());

  let (stop_tx, stop_rx) = watch::channel(false);

  let bot_task = telegram.map(|client| {
    let binder = ChatBinder::new(store.clone(), client.clone(), cfg.service.clone());
    let bot = Arc::new(Bot::new(client, binder, cfg.bot.clone()));
    let mut stop = stop_rx.clone();
    tokio::spawn(async move {
      bot
        .run(async move {
          let _ = stop.wait_for(|stopped| *stopped).await;
        })
        .await;
    })
  });

  let app = hamkor_server::router(state);
  let address = format!("{}:{}", cfg.host, cfg.port);

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async move {
      if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
      }
      info!("shutting down");
      let _ = stop_tx.send(true);
    })
    .await
    .context("server error")?;

  if let Some(task) = bot_task {
    task.await.context("bot task panicked")?;
  }
  Ok(())
}
