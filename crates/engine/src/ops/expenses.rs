use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func, LikeExpr},
};

use crate::{
    EngineError, Expense, ExpenseFilter, ExpenseInput, ResultEngine, YearMonth, expenses,
};

use super::{Engine, require_user, with_tx};

async fn require_owned_expense<C: ConnectionTrait>(
    db: &C,
    expense_id: i64,
    user_id: &str,
) -> ResultEngine<expenses::Model> {
    let model = expenses::Entity::find_by_id(expense_id)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("expense {expense_id}")))?;
    if model.user_id != user_id {
        return Err(EngineError::Unauthorized(format!(
            "expense {expense_id} belongs to another user"
        )));
    }
    Ok(model)
}

fn validate_list_filter(filter: &ExpenseFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

/// `%keyword%` in lower case, with LIKE wildcards in the keyword escaped.
fn search_pattern(keyword: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape('\\')
}

impl Engine {
    /// Record a new expense and run the post-mutation pipeline (budget
    /// recompute, alerts, badges).
    pub async fn create_expense(
        &self,
        user_id: &str,
        input: ExpenseInput,
    ) -> ResultEngine<Expense> {
        let input = input.validate()?;
        let now = self.clock.now();
        let expense = with_tx!(self, |db_tx| {
            require_user(&db_tx, user_id).await?;
            let model = expenses::new_active_model(user_id, &input, now)
                .insert(&db_tx)
                .await?;
            Expense::try_from(model)
        })?;

        tracing::debug!(
            user = user_id,
            expense = expense.id,
            amount = %expense.amount,
            "expense created"
        );
        self.after_expense_change(user_id, &[expense.period()])
            .await?;
        Ok(expense)
    }

    /// Replace the fields of an expense. When the date moves to another
    /// month, both months are recomputed.
    pub async fn update_expense(
        &self,
        expense_id: i64,
        user_id: &str,
        input: ExpenseInput,
    ) -> ResultEngine<Expense> {
        let input = input.validate()?;
        let now = self.clock.now();
        let (previous, expense) = with_tx!(self, |db_tx| {
            let model = require_owned_expense(&db_tx, expense_id, user_id).await?;
            let previous = YearMonth::of(model.expense_date);

            let active = expenses::ActiveModel {
                id: ActiveValue::Unchanged(model.id),
                description: ActiveValue::Set(input.description.clone()),
                amount_minor: ActiveValue::Set(input.amount.cents()),
                category: ActiveValue::Set(input.category.as_str().to_string()),
                expense_date: ActiveValue::Set(input.date),
                notes: ActiveValue::Set(input.notes.clone()),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            let model = active.update(&db_tx).await?;
            Ok::<_, EngineError>((previous, Expense::try_from(model)?))
        })?;

        let current = expense.period();
        if previous == current {
            self.after_expense_change(user_id, &[current]).await?;
        } else {
            self.after_expense_change(user_id, &[previous, current])
                .await?;
        }
        Ok(expense)
    }

    pub async fn delete_expense(&self, expense_id: i64, user_id: &str) -> ResultEngine<()> {
        let period = with_tx!(self, |db_tx| {
            let model = require_owned_expense(&db_tx, expense_id, user_id).await?;
            expenses::Entity::delete_by_id(expense_id)
                .exec(&db_tx)
                .await?;
            Ok::<_, EngineError>(YearMonth::of(model.expense_date))
        })?;

        tracing::debug!(user = user_id, expense = expense_id, "expense deleted");
        self.after_expense_change(user_id, &[period]).await
    }

    /// Return an expense owned by `user_id`.
    pub async fn expense(&self, expense_id: i64, user_id: &str) -> ResultEngine<Expense> {
        let model = require_owned_expense(&self.database, expense_id, user_id).await?;
        Expense::try_from(model)
    }

    /// List expenses of `user_id`, newest first.
    pub async fn list_expenses(
        &self,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> ResultEngine<Vec<Expense>> {
        validate_list_filter(filter)?;

        let mut query = expenses::Entity::find().filter(expenses::Column::UserId.eq(user_id));
        if let Some(from) = filter.from {
            query = query.filter(expenses::Column::ExpenseDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(expenses::Column::ExpenseDate.lt(to));
        }
        if let Some(category) = filter.category {
            query = query.filter(expenses::Column::Category.eq(category.as_str()));
        }
        if let Some(keyword) = crate::util::normalize_optional_text(filter.search.as_deref()) {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(expenses::Column::Description)))
                    .like(search_pattern(&keyword)),
            );
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        query
            .order_by_desc(expenses::Column::ExpenseDate)
            .order_by_desc(expenses::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Expense::try_from)
            .collect()
    }

    /// The expense lifecycle pipeline: recompute each affected month's budget
    /// (when one exists), evaluate its alerts, then re-check badges.
    async fn after_expense_change(
        &self,
        user_id: &str,
        periods: &[YearMonth],
    ) -> ResultEngine<()> {
        for ym in periods {
            self.recompute_if_budgeted(user_id, *ym).await?;
        }
        self.check_and_award_badges(user_id).await?;
        Ok(())
    }
}
