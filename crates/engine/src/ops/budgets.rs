use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, Statement, TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};

use crate::{
    AlertOutcome, AlertSweep, Budget, BudgetStats, EngineError, Money, ResetScope, ResultEngine,
    Threshold, YearMonth, budgets,
};

use super::{Engine, require_user, with_tx};

fn period_filter(user_id: &str, ym: YearMonth) -> sea_orm::Condition {
    sea_orm::Condition::all()
        .add(budgets::Column::UserId.eq(user_id))
        .add(budgets::Column::BudgetYear.eq(ym.year()))
        .add(budgets::Column::BudgetMonth.eq(ym.month() as i32))
}

/// Clear the alert flags of flagged budgets, all months or just `period`.
async fn clear_alert_flags<C: ConnectionTrait>(
    db: &C,
    period: Option<YearMonth>,
) -> ResultEngine<u64> {
    let mut update = budgets::Entity::update_many()
        .col_expr(budgets::Column::Alert80Sent, Expr::value(false))
        .col_expr(budgets::Column::Alert100Sent, Expr::value(false))
        .filter(
            sea_orm::Condition::any()
                .add(budgets::Column::Alert80Sent.eq(true))
                .add(budgets::Column::Alert100Sent.eq(true)),
        );
    if let Some(ym) = period {
        update = update
            .filter(budgets::Column::BudgetYear.eq(ym.year()))
            .filter(budgets::Column::BudgetMonth.eq(ym.month() as i32));
    }
    Ok(update.exec(db).await?.rows_affected)
}

/// Refresh `spent_minor` from the expense ledger in one statement, so two
/// concurrent refreshes of the same budget cannot interleave a stale sum.
async fn refresh_spent<C: ConnectionTrait>(
    db: &C,
    budget_id: i64,
    user_id: &str,
    ym: YearMonth,
    now: DateTimeUtc,
) -> ResultEngine<()> {
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE budgets SET spent_minor = (\
             SELECT COALESCE(SUM(e.amount_minor), 0) FROM expenses e \
             WHERE e.user_id = ? AND e.expense_date >= ? AND e.expense_date < ?\
         ), updated_at = ? \
         WHERE id = ?",
        vec![
            user_id.into(),
            ym.first_day().into(),
            ym.end_exclusive().into(),
            now.into(),
            budget_id.into(),
        ],
    ))
    .await?;
    Ok(())
}

impl Engine {
    /// Create or update the budget for `(user_id, ym)`.
    ///
    /// Saving an existing month updates its limit; the spent amount is always
    /// recomputed and alerts are re-evaluated against the new limit.
    pub async fn save_budget(
        &self,
        user_id: &str,
        ym: YearMonth,
        amount: Money,
    ) -> ResultEngine<Budget> {
        if !amount.is_positive() {
            return Err(EngineError::Validation(
                "budget amount must be > 0".to_string(),
            ));
        }
        let now = self.clock.now();
        let budget = with_tx!(self, |db_tx| {
            require_user(&db_tx, user_id).await?;

            let active = budgets::ActiveModel {
                id: ActiveValue::NotSet,
                user_id: ActiveValue::Set(user_id.to_string()),
                budget_month: ActiveValue::Set(ym.month() as i32),
                budget_year: ActiveValue::Set(ym.year()),
                amount_minor: ActiveValue::Set(amount.cents()),
                spent_minor: ActiveValue::Set(0),
                alert80_sent: ActiveValue::Set(false),
                alert100_sent: ActiveValue::Set(false),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            };
            budgets::Entity::insert(active)
                .on_conflict(
                    OnConflict::columns([
                        budgets::Column::UserId,
                        budgets::Column::BudgetYear,
                        budgets::Column::BudgetMonth,
                    ])
                    .update_columns([budgets::Column::AmountMinor, budgets::Column::UpdatedAt])
                    .to_owned(),
                )
                .exec_without_returning(&db_tx)
                .await?;

            let model = budgets::Entity::find()
                .filter(period_filter(user_id, ym))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("budget {ym}")))?;
            refresh_spent(&db_tx, model.id, user_id, ym, now).await?;
            self.load_budget(&db_tx, model.id).await
        })?;

        tracing::info!(user = user_id, period = %ym, amount = %amount, "budget saved");
        self.evaluate_alerts(&budget).await?;
        self.load_budget(&self.database, budget.id).await
    }

    /// Return the budget for `(user_id, ym)`, if any.
    pub async fn budget(&self, user_id: &str, ym: YearMonth) -> ResultEngine<Option<Budget>> {
        budgets::Entity::find()
            .filter(period_filter(user_id, ym))
            .one(&self.database)
            .await?
            .map(Budget::try_from)
            .transpose()
    }

    pub async fn current_budget(&self, user_id: &str) -> ResultEngine<Option<Budget>> {
        self.budget(user_id, self.clock.current_month()).await
    }

    /// All budgets of `user_id`, newest period first.
    pub async fn budgets(&self, user_id: &str) -> ResultEngine<Vec<Budget>> {
        budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .order_by_desc(budgets::Column::BudgetYear)
            .order_by_desc(budgets::Column::BudgetMonth)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Budget::try_from)
            .collect()
    }

    pub async fn delete_budget(&self, budget_id: i64, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = budgets::Entity::find_by_id(budget_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("budget {budget_id}")))?;
            if model.user_id != user_id {
                return Err(EngineError::Unauthorized(format!(
                    "budget {budget_id} belongs to another user"
                )));
            }
            budgets::Entity::delete_by_id(budget_id).exec(&db_tx).await?;
            Ok(())
        })
    }

    /// Recompute the spent amount of `(user_id, ym)` from its expenses, then
    /// evaluate alerts. Fails with `NotFound` when no budget exists.
    pub async fn recompute_spent(&self, user_id: &str, ym: YearMonth) -> ResultEngine<Budget> {
        let budget = self
            .refresh_budget(user_id, ym)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("budget {ym} for {user_id}")))?;
        self.evaluate_alerts(&budget).await?;
        self.load_budget(&self.database, budget.id).await
    }

    /// Like [`Engine::recompute_spent`], but a missing budget is not an error.
    pub(crate) async fn recompute_if_budgeted(
        &self,
        user_id: &str,
        ym: YearMonth,
    ) -> ResultEngine<Option<AlertOutcome>> {
        match self.refresh_budget(user_id, ym).await? {
            Some(budget) => self.evaluate_alerts(&budget).await.map(Some),
            None => Ok(None),
        }
    }

    async fn refresh_budget(&self, user_id: &str, ym: YearMonth) -> ResultEngine<Option<Budget>> {
        let now = self.clock.now();
        let budget = with_tx!(self, |db_tx| {
            let Some(model) = budgets::Entity::find()
                .filter(period_filter(user_id, ym))
                .one(&db_tx)
                .await?
            else {
                return Ok(None);
            };
            refresh_spent(&db_tx, model.id, user_id, ym, now).await?;
            self.load_budget(&db_tx, model.id).await.map(Some)
        })?;
        if let Some(budget) = &budget {
            tracing::debug!(
                user = user_id,
                period = %ym,
                spent = %budget.spent,
                limit = %budget.amount,
                "budget recomputed"
            );
        }
        Ok(budget)
    }

    /// Send the 80% and 100% alerts that `budget` has reached and not yet sent.
    ///
    /// Both thresholds are checked in the same call, 80% first. Each flag is
    /// claimed with a conditional update; only the caller that flips it from
    /// `false` to `true` sends the notification.
    pub async fn evaluate_alerts(&self, budget: &Budget) -> ResultEngine<AlertOutcome> {
        let mut outcome = AlertOutcome::default();
        let mut notified = budget.clone();
        for threshold in Threshold::ALL {
            if !budget.reaches(threshold) || budget.alert_sent(threshold) {
                continue;
            }
            if !self.claim_alert(budget.id, threshold).await? {
                continue;
            }
            match threshold {
                Threshold::Warning80 => {
                    notified.alert80_sent = true;
                    outcome.sent80 = true;
                }
                Threshold::Exceeded100 => {
                    notified.alert100_sent = true;
                    outcome.sent100 = true;
                }
            }
            self.notify_threshold(&notified, threshold).await;
        }
        Ok(outcome)
    }

    async fn claim_alert(&self, budget_id: i64, threshold: Threshold) -> ResultEngine<bool> {
        let column = threshold.column();
        let res = budgets::Entity::update_many()
            .col_expr(column, Expr::value(true))
            .col_expr(budgets::Column::UpdatedAt, Expr::value(self.clock.now()))
            .filter(budgets::Column::Id.eq(budget_id))
            .filter(column.eq(false))
            .exec(&self.database)
            .await?;
        Ok(res.rows_affected == 1)
    }

    async fn notify_threshold(&self, budget: &Budget, threshold: Threshold) {
        let recipient = self.recipient(&budget.user_id).await;
        let outcome = self
            .notifier
            .send_budget_threshold_alert(&recipient, budget, threshold)
            .await;
        tracing::info!(
            user = %budget.user_id,
            period = %budget.period,
            threshold = threshold.percent(),
            ?outcome,
            "budget alert sent"
        );
    }

    /// Clear both alert flags on every budget, whatever its month.
    ///
    /// Returns the number of budgets that had at least one flag set.
    pub async fn reset_all_alert_flags(&self) -> ResultEngine<u64> {
        let cleared = clear_alert_flags(&self.database, None).await?;
        tracing::info!(budgets = cleared, "alert flags reset (all months)");
        Ok(cleared)
    }

    /// Clear both alert flags on the budgets of `ym` only.
    pub async fn reset_alert_flags_for(&self, ym: YearMonth) -> ResultEngine<u64> {
        let cleared = clear_alert_flags(&self.database, Some(ym)).await?;
        tracing::info!(budgets = cleared, period = %ym, "alert flags reset");
        Ok(cleared)
    }

    /// The new-month reset, run at most once per calendar month across
    /// restarts. The month is recorded in `alert_resets` in the same
    /// transaction as the reset.
    ///
    /// Returns `None` when this month's reset already happened.
    pub async fn reset_alerts_for_new_month(
        &self,
        scope: ResetScope,
    ) -> ResultEngine<Option<u64>> {
        let ym = self.clock.current_month();
        let now = self.clock.now();
        let cleared = with_tx!(self, |db_tx| {
            let claimed = db_tx
                .execute(Statement::from_sql_and_values(
                    db_tx.get_database_backend(),
                    "INSERT INTO alert_resets (reset_year, reset_month, reset_at) \
                     VALUES (?, ?, ?) \
                     ON CONFLICT DO NOTHING",
                    vec![ym.year().into(), (ym.month() as i32).into(), now.into()],
                ))
                .await?
                .rows_affected();
            if claimed == 0 {
                return Ok(None);
            }
            let period = match scope {
                ResetScope::All => None,
                ResetScope::CurrentMonth => Some(ym),
            };
            clear_alert_flags(&db_tx, period).await
        })?;
        tracing::info!(budgets = cleared, period = %ym, ?scope, "new month, alert flags reset");
        Ok(Some(cleared))
    }

    /// Budgets at or above `threshold` whose alert has not been sent.
    pub async fn budgets_needing_alert(
        &self,
        threshold: Threshold,
    ) -> ResultEngine<Vec<Budget>> {
        budgets::Entity::find()
            .filter(threshold.column().eq(false))
            .filter(budgets::Column::AmountMinor.gt(0))
            .filter(Expr::cust_with_values(
                "spent_minor * 100 >= amount_minor * ?",
                [threshold.percent()],
            ))
            .order_by_asc(budgets::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Budget::try_from)
            .collect()
    }

    pub async fn budgets_needing_alert80(&self) -> ResultEngine<Vec<Budget>> {
        self.budgets_needing_alert(Threshold::Warning80).await
    }

    pub async fn budgets_needing_alert100(&self) -> ResultEngine<Vec<Budget>> {
        self.budgets_needing_alert(Threshold::Exceeded100).await
    }

    /// Bulk alert dispatch. Safe to run concurrently with inline recomputes:
    /// the flag claim decides who notifies.
    pub async fn process_pending_alerts(&self) -> ResultEngine<AlertSweep> {
        let mut sweep = AlertSweep::default();
        for threshold in Threshold::ALL {
            for budget in self.budgets_needing_alert(threshold).await? {
                if !self.claim_alert(budget.id, threshold).await? {
                    continue;
                }
                let mut notified = budget;
                match threshold {
                    Threshold::Warning80 => {
                        notified.alert80_sent = true;
                        sweep.sent80 += 1;
                    }
                    Threshold::Exceeded100 => {
                        notified.alert100_sent = true;
                        sweep.sent100 += 1;
                    }
                }
                self.notify_threshold(&notified, threshold).await;
            }
        }
        tracing::info!(sent80 = sweep.sent80, sent100 = sweep.sent100, "alert sweep done");
        Ok(sweep)
    }

    pub async fn budget_stats(&self, user_id: &str) -> ResultEngine<BudgetStats> {
        let all = self.budgets(user_id).await?;
        let current = self.clock.current_month();
        let total = all.len() as u64;

        let (average_limit, average_spent_percentage) = if all.is_empty() {
            (Money::ZERO, 0.0)
        } else {
            let limit_sum: Money = all.iter().map(|b| b.amount).sum();
            let pct_sum: f64 = all.iter().map(Budget::spent_percentage).sum();
            (
                Money::new(limit_sum.cents() / all.len() as i64),
                pct_sum / all.len() as f64,
            )
        };

        Ok(BudgetStats {
            total_budgets: total,
            average_limit,
            average_spent_percentage,
            within_limit_count: all.iter().filter(|b| b.is_within_limit()).count() as u64,
            current_status: all
                .iter()
                .find(|b| b.period == current)
                .map(Budget::status),
        })
    }

    async fn load_budget<C: ConnectionTrait>(
        &self,
        db: &C,
        budget_id: i64,
    ) -> ResultEngine<Budget> {
        let model = budgets::Entity::find_by_id(budget_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("budget {budget_id}")))?;
        Budget::try_from(model)
    }
}
