use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;

use engine::{
    Badge, BadgeType, Category, DeliveryOutcome, Engine, FixedClock, MessageFormat,
    NotificationChannel, NotificationError, Notifier, OutgoingMessage, Recipient,
};

mod common;
use common::{database, date, expense, insert_user, long_ago};

/// Rejects every rich message, accepts plain ones.
#[derive(Default)]
struct RichRejectingChannel {
    delivered: Mutex<Vec<MessageFormat>>,
}

#[async_trait]
impl NotificationChannel for RichRejectingChannel {
    async fn deliver(
        &self,
        _recipient: &Recipient,
        message: &OutgoingMessage,
    ) -> Result<(), NotificationError> {
        match message.format {
            MessageFormat::Rich => Err(NotificationError::Rejected("bad markup".to_string())),
            MessageFormat::Plain => {
                self.delivered.lock().unwrap().push(message.format);
                Ok(())
            }
        }
    }
}

#[derive(Default)]
struct BrokenChannel {
    attempts: AtomicUsize,
}

#[async_trait]
impl NotificationChannel for BrokenChannel {
    async fn deliver(
        &self,
        _recipient: &Recipient,
        _message: &OutgoingMessage,
    ) -> Result<(), NotificationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotificationError::Transport("connection reset".to_string()))
    }
}

struct SlowChannel;

#[async_trait]
impl NotificationChannel for SlowChannel {
    async fn deliver(
        &self,
        _recipient: &Recipient,
        _message: &OutgoingMessage,
    ) -> Result<(), NotificationError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

fn badge() -> Badge {
    Badge {
        id: 1,
        user_id: "alice".to_string(),
        badge_type: BadgeType::EarlyBird,
        earned_at: Utc::now(),
        active: true,
        streak_count: None,
    }
}

#[tokio::test]
async fn rich_failure_falls_back_to_plain() {
    let channel = Arc::new(RichRejectingChannel::default());
    let notifier = Notifier::new(channel.clone(), Duration::from_secs(1));

    let outcome = notifier
        .send_badge_awarded(&Recipient::new("alice"), &badge())
        .await;
    assert_eq!(outcome, DeliveryOutcome::Degraded);
    assert!(outcome.is_delivered());
    assert_eq!(*channel.delivered.lock().unwrap(), vec![MessageFormat::Plain]);
}

#[tokio::test]
async fn total_failure_is_reported_not_raised() {
    let channel = Arc::new(BrokenChannel::default());
    let notifier = Notifier::new(channel.clone(), Duration::from_secs(1));

    let outcome = notifier
        .send_badge_awarded(&Recipient::new("alice"), &badge())
        .await;
    assert_eq!(outcome, DeliveryOutcome::Failed);
    assert_eq!(channel.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_channel_times_out() {
    let notifier = Notifier::new(Arc::new(SlowChannel), Duration::from_millis(50));
    let outcome = notifier
        .send_badge_awarded(&Recipient::new("alice"), &badge())
        .await;
    assert_eq!(outcome, DeliveryOutcome::Failed);
}

#[tokio::test]
async fn delivery_failures_do_not_undo_engine_writes() {
    let db = database().await;
    insert_user(&db, "alice", long_ago()).await;
    let channel = Arc::new(BrokenChannel::default());
    let engine = Engine::builder()
        .database(db)
        .notifier(Notifier::new(channel.clone(), Duration::from_secs(1)))
        .clock(FixedClock::on(date(2026, 3, 15)))
        .build()
        .await
        .unwrap();

    let ym = engine.clock().current_month();
    engine
        .save_budget("alice", ym, "100".parse().unwrap())
        .await
        .unwrap();
    engine
        .create_expense(
            "alice",
            expense("Headphones", "250", Category::Shopping, date(2026, 3, 10)),
        )
        .await
        .unwrap();

    let budget = engine.budget("alice", ym).await.unwrap().unwrap();
    assert!(budget.alert80_sent);
    assert!(budget.alert100_sent);
    assert!(channel.attempts.load(Ordering::SeqCst) >= 4);
}
