use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use lablink_chat::api::server::start_server;
use lablink_chat::api::types::ApiContext;
use lablink_chat::chat::{ChatService, SqliteNotifier};
use lablink_chat::realtime::RoomHub;
use lablink_chat::{config, db};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if let Err(e) = run().await {
        tracing::error!(error = %e, "fatal");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(config::data_dir())?;
    let conn = db::open_database(&config::database_path())?;
    let db = Arc::new(Mutex::new(conn));

    let hub = Arc::new(RoomHub::new());
    let notifier = Arc::new(SqliteNotifier::new(db.clone()));
    let chat = Arc::new(ChatService::new(db, hub, notifier));
    let ctx = ApiContext::new(chat);

    let addr = std::env::var("LABLINK_CHAT_ADDR")
        .unwrap_or_else(|_| config::DEFAULT_BIND_ADDR.to_string())
        .parse()?;
    let mut server = start_server(ctx, addr).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.shutdown();
    Ok(())
}
