// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use axum::{ServiceExt, extract::Request};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use yamdb::config::Config;
use yamdb::models::user::Role;
use yamdb::routes;
use yamdb::state::AppState;
use yamdb::utils::mail::{Email, FileMailer, LogMailer, Mailer};
use yamdb::utils::token::generate_confirmation_code;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (and .env, if present)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries: {}", e);
                    return Err(e.into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    let mailer: Arc<dyn Mailer> = match &config.mail_dir {
        Some(dir) => {
            tracing::info!("Writing outgoing mail to {}", dir.display());
            Arc::new(FileMailer::new(dir))
        }
        None => Arc::new(LogMailer),
    };

    // Seed Admin User
    if let Err(e) = seed_admin_user(&pool, &config, mailer.as_ref()).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let state = AppState {
        pool,
        config: config.clone(),
        mailer,
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);

    // Start the server
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;

    Ok(())
}

/// Creates the configured superuser admin on first start and mails its confirmation code.
async fn seed_admin_user(
    pool: &PgPool,
    config: &Config,
    mailer: &dyn Mailer,
) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(username), Some(email)) = (&config.admin_username, &config.admin_email) else {
        return Ok(());
    };

    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(pool)
        .await?;

    if exists {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", username);
    let code = generate_confirmation_code();

    sqlx::query(
        r#"
        INSERT INTO users (username, email, role, is_staff, is_superuser, confirmation_code)
        VALUES ($1, $2, $3, TRUE, TRUE, $4)
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(Role::Admin.as_str())
    .bind(&code)
    .execute(pool)
    .await?;

    mailer
        .send(&Email::confirmation(&config.email_address, email, &code))
        .await?;
    tracing::info!("Admin user created successfully.");

    Ok(())
}
