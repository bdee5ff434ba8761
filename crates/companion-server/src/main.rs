use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use companion_api::{AppState, AppStateInner};
use companion_llm::{GenerationConfig, GoogleAiClient};
use companion_mail::{MailConfig, SmtpMailer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "companion_server=debug,companion_api=debug,companion_db=debug,tower_http=debug"
                        .into()
                }),
        )
        .init();

    // Config
    let db_path = std::env::var("COMPANION_DB_PATH").unwrap_or_else(|_| "companion.db".into());
    let host = std::env::var("COMPANION_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("COMPANION_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;

    // Init database and upstream collaborators
    let db = companion_db::Database::open(&PathBuf::from(&db_path))?;
    let mailer = SmtpMailer::new(MailConfig::from_env())?;
    let generator = GoogleAiClient::new(GenerationConfig::from_env())?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        mailer: Arc::new(mailer),
        generator: Arc::new(generator),
    });

    let app = companion_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Companion API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
