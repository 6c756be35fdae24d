use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stocklist::api::{router, AppState};
use stocklist::config::Config;
use stocklist::db::{connect, StockRepo};
use stocklist::error::Result;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = connect(&cfg.db_path).await?;
    let repo = StockRepo::new(pool);
    info!("Database ready at {} ({} stocks)", cfg.db_path, repo.count().await?);

    // --- Operator allow-list notice ---
    if cfg.allowed_operators.is_empty() {
        warn!("ALLOWED_OPERATORS not set: nobody can create, edit or delete stocks. Example: ALLOWED_OPERATORS=ops@example.com");
    } else {
        info!("{} operator(s) allowed", cfg.allowed_operators.len());
    }
    if cfg.oauth_client_id.is_none() {
        warn!("OAUTH_CLIENT_ID not set: ID token audience is not checked");
    }
    if cfg.strict_validation {
        info!("Strict validation on: warnings reject writes");
    }

    // --- HTTP API server ---
    let state = AppState::new(&cfg, repo)?;
    let app = router(state, &cfg.allowed_origins);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
