use std::{sync::Arc, time::Duration};

use chrono_tz::Tz;
use engine::{LogChannel, NotificationChannel, Notifier, SystemClock};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod scheduler;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "expensemate={level},telegram_notifier={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let tz: Tz = settings
        .app
        .timezone
        .parse()
        .map_err(|err| format!("invalid timezone {}: {err}", settings.app.timezone))?;

    let db = parse_database(&settings.database).await?;

    let channel: Arc<dyn NotificationChannel> = match &settings.telegram {
        Some(telegram) => {
            tracing::info!("Found telegram settings...");
            Arc::new(
                telegram_notifier::TelegramChannel::builder()
                    .token(&telegram.token)
                    .build()?,
            )
        }
        None => {
            tracing::info!("No telegram settings, notifications go to the log");
            Arc::new(LogChannel)
        }
    };
    let notifier = Notifier::new(
        channel,
        Duration::from_secs(settings.notifier.timeout_secs.max(1)),
    );

    let engine = engine::Engine::builder()
        .database(db)
        .notifier(notifier)
        .clock(SystemClock::new(tz))
        .build()
        .await?;

    scheduler::spawn(&mut tasks, Arc::new(engine), &settings.scheduler);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down..."),
        _ = tasks.join_next() => tracing::error!("a scheduled job stopped unexpectedly"),
    }
    tasks.shutdown().await;

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
