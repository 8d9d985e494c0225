use std::collections::HashSet;

use chrono::Duration;
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, Statement, TransactionTrait,
    prelude::*,
};

use crate::{
    Badge, BadgeLevel, BadgeSummary, BadgeType, EngineError, LeaderboardEntry, ResultEngine,
    badges,
};

use super::{Engine, require_user, with_tx};

/// Rules swept by [`Engine::process_all_eligible_badges`].
const PERIODIC_RULES: [BadgeType; 6] = [
    BadgeType::BudgetHero,
    BadgeType::ConsistentSaver,
    BadgeType::ExpenseTracker,
    BadgeType::CategoryMaster,
    BadgeType::MonthlyPlanner,
    BadgeType::SavingsChampion,
];

/// Rules swept by [`Engine::process_daily_badges`].
const DAILY_RULES: [BadgeType; 2] = [BadgeType::SpendingStreakMaintainer, BadgeType::EarlyBird];

const RECENT_BADGE_DAYS: i64 = 30;

/// Result of a bulk badge sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BadgeSweep {
    /// Candidates returned by the eligibility queries.
    pub eligible: u64,
    /// Badges actually created (a concurrent award wins the race otherwise).
    pub awarded: u64,
    /// Candidates skipped because awarding failed.
    pub failed: u64,
}

/// `CASE badge_type WHEN ... THEN points ... END` over the static catalogue.
fn points_case_sql() -> String {
    let arms: String = BadgeType::ALL
        .iter()
        .map(|t| format!(" WHEN '{}' THEN {}", t.as_str(), t.points()))
        .collect();
    format!("CASE badge_type{arms} ELSE 0 END")
}

impl Engine {
    /// Award `badge_type` to `user_id` unless an active one already exists.
    ///
    /// Existence check and insert are a single conflict-safe statement, so
    /// concurrent callers create at most one active badge. Returns the new
    /// badge, or `None` when nothing was created.
    pub async fn award_badge(
        &self,
        user_id: &str,
        badge_type: BadgeType,
    ) -> ResultEngine<Option<Badge>> {
        let streak_count = match badge_type {
            BadgeType::SpendingStreakMaintainer => {
                Some(i32::try_from(self.current_streak(user_id).await?).unwrap_or(i32::MAX))
            }
            _ => None,
        };
        let now = self.clock.now();

        let badge = with_tx!(self, |db_tx| {
            require_user(&db_tx, user_id).await?;
            let inserted = db_tx
                .execute(Statement::from_sql_and_values(
                    db_tx.get_database_backend(),
                    "INSERT INTO badges (user_id, badge_type, earned_at, active, streak_count) \
                     VALUES (?, ?, ?, ?, ?) \
                     ON CONFLICT DO NOTHING",
                    vec![
                        user_id.into(),
                        badge_type.as_str().into(),
                        now.into(),
                        true.into(),
                        streak_count.into(),
                    ],
                ))
                .await?
                .rows_affected();
            if inserted == 0 {
                return Ok(None);
            }

            let model = badges::Entity::find()
                .filter(badges::Column::UserId.eq(user_id))
                .filter(badges::Column::BadgeType.eq(badge_type.as_str()))
                .filter(badges::Column::Active.eq(true))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("badge {badge_type}")))?;
            Badge::try_from(model).map(Some)
        })?;

        if let Some(badge) = &badge {
            let recipient = self.recipient(user_id).await;
            let outcome = self.notifier.send_badge_awarded(&recipient, badge).await;
            tracing::info!(
                user = user_id,
                badge = badge_type.as_str(),
                points = badge.points(),
                ?outcome,
                "badge awarded"
            );
        }
        Ok(badge)
    }

    /// Evaluate every rule for `user_id` and award the newly satisfied ones.
    pub async fn check_and_award_badges(&self, user_id: &str) -> ResultEngine<Vec<Badge>> {
        let facts = self.eligibility_facts(user_id).await?;
        let held: HashSet<BadgeType> = self
            .badges(user_id, true)
            .await?
            .into_iter()
            .map(|b| b.badge_type)
            .collect();

        let mut awarded = Vec::new();
        for badge_type in BadgeType::ALL {
            if held.contains(&badge_type) || !facts.satisfies(badge_type) {
                continue;
            }
            if let Some(badge) = self.award_badge(user_id, badge_type).await? {
                awarded.push(badge);
            }
        }
        Ok(awarded)
    }

    /// Bulk sweep over the budget and volume rules.
    pub async fn process_all_eligible_badges(&self) -> ResultEngine<BadgeSweep> {
        self.sweep_rules(&PERIODIC_RULES).await
    }

    /// Bulk sweep over the rules that depend on the calendar rather than on
    /// a new expense: logging streaks and recent registrations.
    pub async fn process_daily_badges(&self) -> ResultEngine<BadgeSweep> {
        self.sweep_rules(&DAILY_RULES).await
    }

    async fn sweep_rules(&self, rules: &[BadgeType]) -> ResultEngine<BadgeSweep> {
        let mut sweep = BadgeSweep::default();
        for &badge_type in rules {
            let users = self.users_eligible_for(badge_type).await?;
            sweep.eligible += users.len() as u64;
            for user_id in users {
                match self.award_badge(&user_id, badge_type).await {
                    Ok(Some(_)) => sweep.awarded += 1,
                    Ok(None) => {}
                    Err(err) => {
                        sweep.failed += 1;
                        tracing::error!(
                            user = %user_id,
                            badge = badge_type.as_str(),
                            error = %err,
                            "badge award failed"
                        );
                    }
                }
            }
        }
        tracing::info!(
            eligible = sweep.eligible,
            awarded = sweep.awarded,
            failed = sweep.failed,
            "badge sweep done"
        );
        Ok(sweep)
    }

    /// Badges of `user_id`, newest first.
    pub async fn badges(&self, user_id: &str, active_only: bool) -> ResultEngine<Vec<Badge>> {
        let mut query = badges::Entity::find().filter(badges::Column::UserId.eq(user_id));
        if active_only {
            query = query.filter(badges::Column::Active.eq(true));
        }
        query
            .order_by_desc(badges::Column::EarnedAt)
            .order_by_desc(badges::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Badge::try_from)
            .collect()
    }

    /// Soft-revoke a badge. Revoking an inactive badge is a no-op.
    pub async fn deactivate_badge(&self, badge_id: i64, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = badges::Entity::find_by_id(badge_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("badge {badge_id}")))?;
            if model.user_id != user_id {
                return Err(EngineError::Unauthorized(format!(
                    "badge {badge_id} belongs to another user"
                )));
            }
            if model.active {
                badges::ActiveModel {
                    id: ActiveValue::Unchanged(model.id),
                    active: ActiveValue::Set(false),
                    ..Default::default()
                }
                .update(&db_tx)
                .await?;
                tracing::info!(user = user_id, badge = %model.badge_type, "badge revoked");
            }
            Ok(())
        })
    }

    /// Sum of the points of the active badges of `user_id`.
    pub async fn total_points(&self, user_id: &str) -> ResultEngine<i64> {
        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            format!(
                "SELECT COALESCE(SUM({}), 0) AS sum FROM badges WHERE user_id = ? AND active = ?",
                points_case_sql()
            ),
            vec![user_id.into(), true.into()],
        );
        match self.database.query_one(stmt).await? {
            Some(row) => Ok(row.try_get("", "sum")?),
            None => Ok(0),
        }
    }

    /// Competition rank: `1 +` the number of other users with strictly more
    /// active-badge points. Ties share a rank.
    pub async fn user_rank(&self, user_id: &str) -> ResultEngine<u64> {
        let points = self.total_points(user_id).await?;
        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            format!(
                "SELECT COUNT(*) AS cnt FROM (\
                     SELECT user_id, SUM({}) AS total FROM badges \
                     WHERE active = ? GROUP BY user_id\
                 ) t \
                 WHERE t.total > ? AND t.user_id <> ?",
                points_case_sql()
            ),
            vec![true.into(), points.into(), user_id.into()],
        );
        let higher: i64 = match self.database.query_one(stmt).await? {
            Some(row) => row.try_get("", "cnt")?,
            None => 0,
        };
        Ok(higher.max(0) as u64 + 1)
    }

    pub async fn user_badge_level(&self, user_id: &str) -> ResultEngine<BadgeLevel> {
        Ok(BadgeLevel::from_points(self.total_points(user_id).await?))
    }

    pub async fn badge_summary(&self, user_id: &str) -> ResultEngine<BadgeSummary> {
        let active = self.badges(user_id, true).await?;
        let total_points = self.total_points(user_id).await?;
        let since = self.clock.now() - Duration::days(RECENT_BADGE_DAYS);

        Ok(BadgeSummary {
            active_badges: active.len() as u64,
            total_points,
            rank: self.user_rank(user_id).await?,
            level: BadgeLevel::from_points(total_points),
            recent_badges: active.into_iter().filter(|b| b.earned_at > since).collect(),
        })
    }

    /// Top `limit` users by active-badge points. Equal totals share a rank and
    /// are listed by user id.
    pub async fn leaderboard(&self, limit: u64) -> ResultEngine<Vec<LeaderboardEntry>> {
        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            format!(
                "SELECT user_id, SUM({}) AS total FROM badges \
                 WHERE active = ? \
                 GROUP BY user_id \
                 ORDER BY total DESC, user_id ASC \
                 LIMIT ?",
                points_case_sql()
            ),
            vec![true.into(), (limit.min(i64::MAX as u64) as i64).into()],
        );

        let mut entries: Vec<LeaderboardEntry> = Vec::new();
        for (idx, row) in self.database.query_all(stmt).await?.into_iter().enumerate() {
            let user_id: String = row.try_get("", "user_id")?;
            let points: i64 = row.try_get("", "total")?;
            let rank = match entries.last() {
                Some(prev) if prev.points == points => prev.rank,
                _ => idx as u64 + 1,
            };
            entries.push(LeaderboardEntry {
                user_id,
                points,
                rank,
                level: BadgeLevel::from_points(points),
            });
        }
        Ok(entries)
    }
}
