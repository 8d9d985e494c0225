//! Read-only projections over the expense ledger.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Days, NaiveDate};
use sea_orm::{
    ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement, prelude::*,
};

use crate::{
    Category, Expense, ExpenseFilter, ExpenseStats, Money, ResultEngine, YearMonth, budgets,
    expenses,
};

use super::Engine;

/// Length of the monthly trend window, current month included.
const TREND_MONTHS: u32 = 12;

impl Engine {
    /// Expenses of `user_id` dated within `ym`, newest first.
    pub async fn expenses_in_month(
        &self,
        user_id: &str,
        ym: YearMonth,
    ) -> ResultEngine<Vec<Expense>> {
        self.list_expenses(user_id, &ExpenseFilter::month(ym)).await
    }

    pub async fn monthly_total(&self, user_id: &str, ym: YearMonth) -> ResultEngine<Money> {
        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM expenses \
             WHERE user_id = ? AND expense_date >= ? AND expense_date < ?",
            vec![
                user_id.into(),
                ym.first_day().into(),
                ym.end_exclusive().into(),
            ],
        );
        let sum: i64 = match self.database.query_one(stmt).await? {
            Some(row) => row.try_get("", "sum")?,
            None => 0,
        };
        Ok(Money::new(sum))
    }

    /// Spend per category for `ym`. Categories without expenses are absent.
    pub async fn category_spending(
        &self,
        user_id: &str,
        ym: YearMonth,
    ) -> ResultEngine<BTreeMap<Category, Money>> {
        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            "SELECT category, SUM(amount_minor) AS sum \
             FROM expenses \
             WHERE user_id = ? AND expense_date >= ? AND expense_date < ? \
             GROUP BY category",
            vec![
                user_id.into(),
                ym.first_day().into(),
                ym.end_exclusive().into(),
            ],
        );
        let mut out = BTreeMap::new();
        for row in self.database.query_all(stmt).await? {
            let category: String = row.try_get("", "category")?;
            let sum: i64 = row.try_get("", "sum")?;
            out.insert(Category::try_from(category.as_str())?, Money::new(sum));
        }
        Ok(out)
    }

    /// Spend per month over the trailing twelve months (current included),
    /// keyed `YYYY-MM`. Every month of the window is present, zero-filled.
    pub async fn monthly_trend(&self, user_id: &str) -> ResultEngine<BTreeMap<String, Money>> {
        let last = self.clock.current_month();
        let first = last.minus_months(TREND_MONTHS - 1);

        let mut by_month: BTreeMap<YearMonth, Money> = (0..TREND_MONTHS)
            .map(|offset| (first.plus_months(offset), Money::ZERO))
            .collect();
        for (date, amount) in self
            .daily_sums(user_id, first.first_day(), last.end_exclusive())
            .await?
        {
            *by_month.entry(YearMonth::of(date)).or_default() += amount;
        }

        Ok(by_month
            .into_iter()
            .map(|(ym, amount)| (ym.to_string(), amount))
            .collect())
    }

    /// Spend per day-of-month for the current month.
    pub async fn daily_breakdown(&self, user_id: &str) -> ResultEngine<BTreeMap<u32, Money>> {
        self.daily_breakdown_for(user_id, self.clock.current_month())
            .await
    }

    /// Spend per day-of-month for `ym`. Days without expenses are absent.
    pub async fn daily_breakdown_for(
        &self,
        user_id: &str,
        ym: YearMonth,
    ) -> ResultEngine<BTreeMap<u32, Money>> {
        Ok(self
            .daily_sums(user_id, ym.first_day(), ym.end_exclusive())
            .await?
            .into_iter()
            .map(|(date, amount)| (date.day(), amount))
            .collect())
    }

    /// Number of distinct days with at least one expense in `[from, to]`.
    pub async fn distinct_expense_days(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<u64> {
        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            "SELECT COUNT(DISTINCT expense_date) AS cnt \
             FROM expenses \
             WHERE user_id = ? AND expense_date >= ? AND expense_date <= ?",
            vec![user_id.into(), from.into(), to.into()],
        );
        let count: i64 = match self.database.query_one(stmt).await? {
            Some(row) => row.try_get("", "cnt")?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    /// Consecutive days with expenses ending today (0 if nothing today).
    pub async fn current_streak(&self, user_id: &str) -> ResultEngine<u32> {
        let today = self.clock.today();
        let dates: Vec<NaiveDate> = expenses::Entity::find()
            .select_only()
            .column(expenses::Column::ExpenseDate)
            .distinct()
            .filter(expenses::Column::UserId.eq(user_id))
            .filter(expenses::Column::ExpenseDate.lte(today))
            .order_by_desc(expenses::Column::ExpenseDate)
            .into_tuple()
            .all(&self.database)
            .await?;

        let mut streak = 0;
        let mut expected = Some(today);
        for date in dates {
            if Some(date) != expected {
                break;
            }
            streak += 1;
            expected = date.checked_sub_days(Days::new(1));
        }
        Ok(streak)
    }

    /// Every category `user_id` has ever used.
    pub async fn distinct_categories(&self, user_id: &str) -> ResultEngine<BTreeSet<Category>> {
        let codes: Vec<String> = expenses::Entity::find()
            .select_only()
            .column(expenses::Column::Category)
            .distinct()
            .filter(expenses::Column::UserId.eq(user_id))
            .into_tuple()
            .all(&self.database)
            .await?;
        codes
            .iter()
            .map(|code| Category::try_from(code.as_str()))
            .collect()
    }

    /// The `limit` largest expenses, optionally restricted to one month.
    /// Equal amounts keep insertion order.
    pub async fn top_expenses(
        &self,
        user_id: &str,
        period: Option<YearMonth>,
        limit: u64,
    ) -> ResultEngine<Vec<Expense>> {
        let mut query = expenses::Entity::find().filter(expenses::Column::UserId.eq(user_id));
        if let Some(ym) = period {
            query = query
                .filter(expenses::Column::ExpenseDate.gte(ym.first_day()))
                .filter(expenses::Column::ExpenseDate.lt(ym.end_exclusive()));
        }
        query
            .order_by_desc(expenses::Column::AmountMinor)
            .order_by_asc(expenses::Column::Id)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Expense::try_from)
            .collect()
    }

    /// Expenses dated on or after `days` days before today, newest first.
    pub async fn recent_expenses(&self, user_id: &str, days: u32) -> ResultEngine<Vec<Expense>> {
        let from = self
            .clock
            .today()
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        let filter = ExpenseFilter {
            from: Some(from),
            ..ExpenseFilter::default()
        };
        self.list_expenses(user_id, &filter).await
    }

    /// Lifetime number of expenses per category. Unused categories are absent.
    pub async fn category_usage(&self, user_id: &str) -> ResultEngine<BTreeMap<Category, u64>> {
        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            "SELECT category, COUNT(*) AS cnt FROM expenses WHERE user_id = ? GROUP BY category",
            vec![user_id.into()],
        );
        let mut out = BTreeMap::new();
        for row in self.database.query_all(stmt).await? {
            let category: String = row.try_get("", "category")?;
            let count: i64 = row.try_get("", "cnt")?;
            out.insert(Category::try_from(category.as_str())?, count.max(0) as u64);
        }
        Ok(out)
    }

    /// The `limit` categories with the highest spend in `ym`, largest first.
    pub async fn top_spending_categories(
        &self,
        user_id: &str,
        ym: YearMonth,
        limit: usize,
    ) -> ResultEngine<Vec<(Category, Money)>> {
        let mut ranked: Vec<(Category, Money)> = self
            .category_spending(user_id, ym)
            .await?
            .into_iter()
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Mean of the per-day totals of `ym`, counting only days with expenses.
    /// Fractions of a cent are truncated.
    pub async fn average_daily_spending(
        &self,
        user_id: &str,
        ym: YearMonth,
    ) -> ResultEngine<Money> {
        let days = self
            .daily_sums(user_id, ym.first_day(), ym.end_exclusive())
            .await?;
        if days.is_empty() {
            return Ok(Money::ZERO);
        }
        let total: Money = days.iter().map(|(_, amount)| *amount).sum();
        Ok(Money::new(total.cents() / days.len() as i64))
    }

    pub async fn expense_stats(&self, user_id: &str) -> ResultEngine<ExpenseStats> {
        let ym = self.clock.current_month();
        let current_month_count = expenses::Entity::find()
            .filter(expenses::Column::UserId.eq(user_id))
            .filter(expenses::Column::ExpenseDate.gte(ym.first_day()))
            .filter(expenses::Column::ExpenseDate.lt(ym.end_exclusive()))
            .count(&self.database)
            .await?;
        let total_amount = self.lifetime_total(user_id).await?;

        Ok(ExpenseStats {
            total_count: self.expense_count(user_id).await?,
            current_month_count,
            total_amount,
            current_month_total: self.monthly_total(user_id, ym).await?,
            average_daily: self.average_daily_spending(user_id, ym).await?,
            top_category: self
                .top_spending_categories(user_id, ym, 1)
                .await?
                .first()
                .map(|(category, _)| *category),
        })
    }

    /// Lifetime number of expenses.
    pub async fn expense_count(&self, user_id: &str) -> ResultEngine<u64> {
        Ok(expenses::Entity::find()
            .filter(expenses::Column::UserId.eq(user_id))
            .count(&self.database)
            .await?)
    }

    /// Lifetime number of budgets.
    pub async fn budget_count(&self, user_id: &str) -> ResultEngine<u64> {
        Ok(budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .count(&self.database)
            .await?)
    }

    async fn lifetime_total(&self, user_id: &str) -> ResultEngine<Money> {
        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum FROM expenses WHERE user_id = ?",
            vec![user_id.into()],
        );
        let sum: i64 = match self.database.query_one(stmt).await? {
            Some(row) => row.try_get("", "sum")?,
            None => 0,
        };
        Ok(Money::new(sum))
    }

    async fn daily_sums(
        &self,
        user_id: &str,
        from: NaiveDate,
        to_exclusive: NaiveDate,
    ) -> ResultEngine<Vec<(NaiveDate, Money)>> {
        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            "SELECT expense_date, SUM(amount_minor) AS sum \
             FROM expenses \
             WHERE user_id = ? AND expense_date >= ? AND expense_date < ? \
             GROUP BY expense_date \
             ORDER BY expense_date",
            vec![user_id.into(), from.into(), to_exclusive.into()],
        );
        self.database
            .query_all(stmt)
            .await?
            .into_iter()
            .map(|row| -> ResultEngine<(NaiveDate, Money)> {
                let date: NaiveDate = row.try_get("", "expense_date")?;
                let sum: i64 = row.try_get("", "sum")?;
                Ok((date, Money::new(sum)))
            })
            .collect()
    }
}
