#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Category, Engine, ExpenseInput, FixedClock, Money, NotificationChannel, NotificationError,
    Notifier, OutgoingMessage, Recipient,
};
use migration::MigratorTrait;

/// Channel that records every delivered message.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
}

impl RecordingChannel {
    pub fn messages(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects_containing(&self, needle: &str) -> usize {
        self.messages()
            .iter()
            .filter(|(_, m)| m.subject.contains(needle))
            .count()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn deliver(
        &self,
        recipient: &Recipient,
        message: &OutgoingMessage,
    ) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.user_id.clone(), message.clone()));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn money(raw: &str) -> Money {
    raw.parse().unwrap()
}

pub fn expense(description: &str, amount: &str, category: Category, on: NaiveDate) -> ExpenseInput {
    ExpenseInput {
        description: description.to_string(),
        amount: Some(money(amount)),
        category: Some(category),
        date: Some(on),
        notes: None,
    }
}

pub async fn database() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn insert_user(db: &DatabaseConnection, username: &str, created_at: DateTime<Utc>) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, telegram_id, created_at) VALUES (?, ?, ?)",
        vec![username.into(), None::<String>.into(), created_at.into()],
    ))
    .await
    .unwrap();
}

/// Engine frozen on `today`, with `alice` registered long ago.
pub async fn engine_on(today: NaiveDate) -> (Engine, DatabaseConnection, Arc<RecordingChannel>) {
    let db = database().await;
    insert_user(&db, "alice", long_ago()).await;
    let channel = Arc::new(RecordingChannel::default());
    let engine = Engine::builder()
        .database(db.clone())
        .notifier(Notifier::new(channel.clone(), Duration::from_secs(5)))
        .clock(FixedClock::on(today))
        .build()
        .await
        .unwrap();
    (engine, db, channel)
}

/// A second engine over the same database, frozen on another day.
pub async fn engine_at(db: &DatabaseConnection, today: NaiveDate) -> Engine {
    Engine::builder()
        .database(db.clone())
        .clock(FixedClock::on(today))
        .build()
        .await
        .unwrap()
}

pub fn long_ago() -> DateTime<Utc> {
    date(2020, 1, 1).and_hms_opt(0, 0, 0).unwrap().and_utc()
}
