//! Periodic jobs.
//!
//! Each trigger runs in its own task and awaits its job inline, so a trigger
//! never has two executions in flight. Ticks missed while a slow job runs are
//! skipped, not queued.

use std::{future::Future, sync::Arc, time::Duration};

use engine::Engine;
use tokio::{task::JoinSet, time::MissedTickBehavior};

use crate::settings::Scheduler;

pub fn spawn(tasks: &mut JoinSet<()>, engine: Arc<Engine>, settings: &Scheduler) {
    every(
        tasks,
        "alert sweep",
        settings.alert_sweep_secs,
        engine.clone(),
        |engine| async move {
            if let Err(err) = engine.process_pending_alerts().await {
                tracing::error!("alert sweep failed: {err}");
            }
        },
    );

    every(
        tasks,
        "badge sweep",
        settings.badge_sweep_secs,
        engine.clone(),
        |engine| async move {
            if let Err(err) = engine.process_all_eligible_badges().await {
                tracing::error!("badge sweep failed: {err}");
            }
        },
    );

    every(
        tasks,
        "daily badge sweep",
        settings.daily_sweep_secs,
        engine.clone(),
        |engine| async move {
            if let Err(err) = engine.process_daily_badges().await {
                tracing::error!("daily badge sweep failed: {err}");
            }
        },
    );

    // The first tick fires at startup, so a month boundary crossed while the
    // process was down is still handled.
    let scope = settings.reset_scope;
    every(
        tasks,
        "new month reset",
        settings.month_check_secs,
        engine,
        move |engine| async move {
            match engine.reset_alerts_for_new_month(scope).await {
                Ok(Some(cleared)) => tracing::info!(budgets = cleared, "monthly reset done"),
                Ok(None) => {}
                Err(err) => tracing::error!("monthly reset failed: {err}"),
            }
        },
    );
}

fn every<F, Fut>(
    tasks: &mut JoinSet<()>,
    name: &'static str,
    secs: u64,
    engine: Arc<Engine>,
    job: F,
) where
    F: Fn(Arc<Engine>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = Duration::from_secs(secs.max(1));
    tasks.spawn(async move {
        tracing::info!(job = name, every_secs = period.as_secs(), "scheduled");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            tracing::debug!(job = name, "running");
            job(engine.clone()).await;
        }
    });
}
