//! Lactron - milk-quality batch monitoring engine

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lactron::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxBatchRepository, SqlxHistoryRepository, SqlxReadingRepository,
            SqlxSecurityQuestionRepository, SqlxSessionRepository, SqlxUserRepository,
        },
    },
    services::{
        BatchService, HistoryService, HttpPredictor, ReadingService, RecoveryService, UserService,
    },
};

/// How often expired sessions are swept
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lactron=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Lactron monitoring engine...");

    // Load configuration
    let config = Config::load(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let question_repo = SqlxSecurityQuestionRepository::boxed(pool.clone());
    let batch_repo = SqlxBatchRepository::boxed(pool.clone());
    let reading_repo = SqlxReadingRepository::boxed(pool.clone());
    let history_repo = SqlxHistoryRepository::boxed(pool.clone());

    // Initialize services
    let predictor = Arc::new(HttpPredictor::new(&config.predictor)?);
    tracing::info!("Predictor endpoint: {}", config.predictor.url);

    let user_service = Arc::new(UserService::new(
        user_repo.clone(),
        session_repo,
        question_repo.clone(),
    ));
    let recovery_service = Arc::new(RecoveryService::new(
        pool.clone(),
        user_repo,
        question_repo,
    ));
    let batch_service = Arc::new(BatchService::new(batch_repo));
    let reading_service = Arc::new(ReadingService::new(reading_repo, predictor));
    let history_service = Arc::new(HistoryService::new(history_repo));

    let state = AppState {
        user_service: user_service.clone(),
        recovery_service,
        batch_service,
        reading_service,
        history_service,
    };

    // Sweep expired sessions in the background
    {
        let user_service = user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
                SESSION_CLEANUP_INTERVAL_SECS,
            ));
            loop {
                interval.tick().await;
                if let Err(e) = user_service.cleanup_expired_sessions().await {
                    tracing::warn!("Session cleanup failed: {}", e);
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
