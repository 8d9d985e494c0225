//! Badge eligibility: the per-user facts behind each rule, and the bulk
//! queries that find every user currently eligible for a rule.

use chrono::{DateTime, Days, Duration, Utc};
use sea_orm::{
    ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, Statement, Value, prelude::*,
    sea_query::Expr,
};

use crate::{BadgeType, Budget, Category, EngineError, ResultEngine, budgets, util};

use super::{Engine, require_user};

/// Number of trailing calendar days (today included) for the streak badge.
pub(crate) const STREAK_DAYS: u64 = 7;
/// How long after registration the Early Bird badge stays reachable.
const EARLY_BIRD_DAYS: i64 = 7;
const EXPENSE_TRACKER_MIN: u64 = 50;
const MONTHLY_PLANNER_MIN: u64 = 6;
const CONSISTENT_SAVER_MONTHS: usize = 3;

/// Aggregated state of one user, enough to decide every rule.
#[derive(Clone, Debug)]
pub(crate) struct EligibilityFacts {
    pub current_budget: Option<Budget>,
    /// Most recent budgets up to the current month, newest first.
    pub recent_budgets: Vec<Budget>,
    pub streak_days: u64,
    pub expense_count: u64,
    pub distinct_categories: usize,
    pub budget_count: u64,
    pub registered_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl EligibilityFacts {
    pub(crate) fn satisfies(&self, badge_type: BadgeType) -> bool {
        match badge_type {
            BadgeType::BudgetHero => self.current_budget.as_ref().is_some_and(|b| {
                has_positive_percentage(b) && util::below_percent(b.spent, b.amount, 80)
            }),
            BadgeType::SavingsChampion => self.current_budget.as_ref().is_some_and(|b| {
                has_positive_percentage(b) && util::at_most_percent(b.spent, b.amount, 50)
            }),
            BadgeType::ConsistentSaver => {
                self.recent_budgets.len() >= CONSISTENT_SAVER_MONTHS
                    && self
                        .recent_budgets
                        .iter()
                        .take(CONSISTENT_SAVER_MONTHS)
                        .all(Budget::is_within_limit)
            }
            BadgeType::SpendingStreakMaintainer => self.streak_days >= STREAK_DAYS,
            BadgeType::ExpenseTracker => self.expense_count >= EXPENSE_TRACKER_MIN,
            BadgeType::CategoryMaster => self.distinct_categories >= Category::ALL.len(),
            BadgeType::MonthlyPlanner => self.budget_count >= MONTHLY_PLANNER_MIN,
            BadgeType::EarlyBird => {
                self.registered_at > self.now - Duration::days(EARLY_BIRD_DAYS)
                    && self.expense_count >= 1
            }
        }
    }
}

/// The spent percentage lies strictly above zero.
fn has_positive_percentage(budget: &Budget) -> bool {
    budget.amount.is_positive() && budget.spent.is_positive()
}

impl Engine {
    pub(crate) async fn eligibility_facts(&self, user_id: &str) -> ResultEngine<EligibilityFacts> {
        let user = require_user(&self.database, user_id).await?;
        let now = self.clock.now();
        let today = self.clock.today();
        let current = self.clock.current_month();

        let recent_budgets = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(Expr::cust_with_values(
                "(budget_year * 12 + budget_month) <= ?",
                [current.ordinal()],
            ))
            .order_by_desc(budgets::Column::BudgetYear)
            .order_by_desc(budgets::Column::BudgetMonth)
            .limit(CONSISTENT_SAVER_MONTHS as u64)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Budget::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        let current_budget = recent_budgets
            .first()
            .filter(|b| b.period == current)
            .cloned();

        let streak_from = today
            .checked_sub_days(Days::new(STREAK_DAYS - 1))
            .ok_or_else(|| EngineError::Validation("date out of range".to_string()))?;

        Ok(EligibilityFacts {
            current_budget,
            recent_budgets,
            streak_days: self
                .distinct_expense_days(user_id, streak_from, today)
                .await?,
            expense_count: self.expense_count(user_id).await?,
            distinct_categories: self.distinct_categories(user_id).await?.len(),
            budget_count: self.budget_count(user_id).await?,
            registered_at: user.created_at,
            now,
        })
    }

    /// Whether `user_id` currently satisfies the rule of `badge_type`,
    /// regardless of already holding the badge.
    pub async fn is_eligible(&self, user_id: &str, badge_type: BadgeType) -> ResultEngine<bool> {
        Ok(self.eligibility_facts(user_id).await?.satisfies(badge_type))
    }

    /// Users satisfying the rule of `badge_type` who do not hold an active
    /// badge of that type, ordered by user id.
    pub async fn users_eligible_for(&self, badge_type: BadgeType) -> ResultEngine<Vec<String>> {
        let current = self.clock.current_month();
        let today = self.clock.today();

        let (inner, mut values): (&str, Vec<Value>) = match badge_type {
            BadgeType::BudgetHero => (
                "SELECT b.user_id AS user_id FROM budgets b \
                 WHERE b.budget_year = ? AND b.budget_month = ? \
                   AND b.amount_minor > 0 AND b.spent_minor > 0 \
                   AND b.spent_minor * 100 < b.amount_minor * 80",
                vec![current.year().into(), (current.month() as i32).into()],
            ),
            BadgeType::SavingsChampion => (
                "SELECT b.user_id AS user_id FROM budgets b \
                 WHERE b.budget_year = ? AND b.budget_month = ? \
                   AND b.amount_minor > 0 AND b.spent_minor > 0 \
                   AND b.spent_minor * 100 <= b.amount_minor * 50",
                vec![current.year().into(), (current.month() as i32).into()],
            ),
            BadgeType::ConsistentSaver => (
                "SELECT r.user_id AS user_id FROM (\
                     SELECT user_id, spent_minor, amount_minor, \
                            ROW_NUMBER() OVER (\
                                PARTITION BY user_id \
                                ORDER BY budget_year DESC, budget_month DESC\
                            ) AS rn \
                     FROM budgets \
                     WHERE (budget_year * 12 + budget_month) <= ?\
                 ) r \
                 WHERE r.rn <= ? \
                 GROUP BY r.user_id \
                 HAVING COUNT(*) = ? \
                    AND SUM(CASE WHEN r.spent_minor <= r.amount_minor THEN 1 ELSE 0 END) = ?",
                vec![
                    current.ordinal().into(),
                    (CONSISTENT_SAVER_MONTHS as i64).into(),
                    (CONSISTENT_SAVER_MONTHS as i64).into(),
                    (CONSISTENT_SAVER_MONTHS as i64).into(),
                ],
            ),
            BadgeType::SpendingStreakMaintainer => {
                let from = today
                    .checked_sub_days(Days::new(STREAK_DAYS - 1))
                    .ok_or_else(|| EngineError::Validation("date out of range".to_string()))?;
                (
                    "SELECT e.user_id AS user_id FROM expenses e \
                     WHERE e.expense_date >= ? AND e.expense_date <= ? \
                     GROUP BY e.user_id \
                     HAVING COUNT(DISTINCT e.expense_date) >= ?",
                    vec![from.into(), today.into(), (STREAK_DAYS as i64).into()],
                )
            }
            BadgeType::ExpenseTracker => (
                "SELECT e.user_id AS user_id FROM expenses e \
                 GROUP BY e.user_id \
                 HAVING COUNT(*) >= ?",
                vec![(EXPENSE_TRACKER_MIN as i64).into()],
            ),
            BadgeType::CategoryMaster => (
                "SELECT e.user_id AS user_id FROM expenses e \
                 GROUP BY e.user_id \
                 HAVING COUNT(DISTINCT e.category) >= ?",
                vec![(Category::ALL.len() as i64).into()],
            ),
            BadgeType::MonthlyPlanner => (
                "SELECT b.user_id AS user_id FROM budgets b \
                 GROUP BY b.user_id \
                 HAVING COUNT(*) >= ?",
                vec![(MONTHLY_PLANNER_MIN as i64).into()],
            ),
            BadgeType::EarlyBird => (
                "SELECT u.username AS user_id FROM users u \
                 WHERE u.created_at > ? \
                   AND EXISTS (SELECT 1 FROM expenses e WHERE e.user_id = u.username)",
                vec![(self.clock.now() - Duration::days(EARLY_BIRD_DAYS)).into()],
            ),
        };

        let sql = format!(
            "SELECT c.user_id AS user_id FROM ({inner}) c \
             WHERE NOT EXISTS (\
                 SELECT 1 FROM badges bd \
                 WHERE bd.user_id = c.user_id AND bd.badge_type = ? AND bd.active = ?\
             ) \
             ORDER BY c.user_id"
        );
        values.push(badge_type.as_str().into());
        values.push(true.into());

        let rows = self
            .database
            .query_all(Statement::from_sql_and_values(
                self.database.get_database_backend(),
                sql,
                values,
            ))
            .await?;
        rows.into_iter()
            .map(|row| row.try_get::<String>("", "user_id").map_err(EngineError::from))
            .collect()
    }
}
