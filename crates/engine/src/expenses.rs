//! Expenses.
//!
//! An `Expense` is a single spending event owned by one user. Amounts are
//! always positive; the autoincrement `id` doubles as insertion order.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{Category, EngineError, Money, ResultEngine, YearMonth};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: String,
    pub description: String,
    pub amount: Money,
    pub category: Category,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn period(&self) -> YearMonth {
        YearMonth::of(self.date)
    }
}

/// User-provided fields for creating or editing an expense.
///
/// Optional fields exist so that missing input is reported as a
/// [`EngineError::Validation`] rather than coerced to a default.
#[derive(Clone, Debug, Default)]
pub struct ExpenseInput {
    pub description: String,
    pub amount: Option<Money>,
    pub category: Option<Category>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// An [`ExpenseInput`] that passed validation.
#[derive(Clone, Debug)]
pub(crate) struct ValidExpense {
    pub description: String,
    pub amount: Money,
    pub category: Category,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl ExpenseInput {
    pub(crate) fn validate(self) -> ResultEngine<ValidExpense> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(EngineError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        let amount = self
            .amount
            .ok_or_else(|| EngineError::Validation("amount is required".to_string()))?;
        if !amount.is_positive() {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }
        let category = self
            .category
            .ok_or_else(|| EngineError::Validation("category is required".to_string()))?;
        let date = self
            .date
            .ok_or_else(|| EngineError::Validation("date is required".to_string()))?;

        Ok(ValidExpense {
            description: description.to_string(),
            amount,
            category,
            date,
            notes: crate::util::normalize_optional_text(self.notes.as_deref()),
        })
    }
}

/// Filters for listing expenses.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`). `search` is a
/// case-insensitive substring of the description; blank means no filter.
#[derive(Clone, Debug, Default)]
pub struct ExpenseFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<Category>,
    pub search: Option<String>,
    pub limit: Option<u64>,
}

impl ExpenseFilter {
    /// All expenses dated within `ym`.
    pub fn month(ym: YearMonth) -> Self {
        Self {
            from: Some(ym.first_day()),
            to: Some(ym.end_exclusive()),
            ..Self::default()
        }
    }
}

/// Spending overview of one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExpenseStats {
    pub total_count: u64,
    pub current_month_count: u64,
    pub total_amount: Money,
    pub current_month_total: Money,
    /// Mean of the per-day totals over the days of the current month that
    /// have expenses.
    pub average_daily: Money,
    pub top_category: Option<Category>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub description: String,
    pub amount_minor: i64,
    pub category: String,
    pub expense_date: Date,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Username",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            description: model.description,
            amount: Money::new(model.amount_minor),
            category: Category::try_from(model.category.as_str())?,
            date: model.expense_date,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

pub(crate) fn new_active_model(
    user_id: &str,
    input: &ValidExpense,
    now: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        user_id: ActiveValue::Set(user_id.to_string()),
        description: ActiveValue::Set(input.description.clone()),
        amount_minor: ActiveValue::Set(input.amount.cents()),
        category: ActiveValue::Set(input.category.as_str().to_string()),
        expense_date: ActiveValue::Set(input.date),
        notes: ActiveValue::Set(input.notes.clone()),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ExpenseInput {
        ExpenseInput {
            description: "  Lunch ".to_string(),
            amount: Some(Money::new(1250)),
            category: Some(Category::Food),
            date: NaiveDate::from_ymd_opt(2024, 3, 1),
            notes: Some("   ".to_string()),
        }
    }

    #[test]
    fn validate_trims_text() {
        let valid = input().validate().unwrap();
        assert_eq!(valid.description, "Lunch");
        assert_eq!(valid.notes, None);
    }

    #[test]
    fn validate_rejects_missing_or_non_positive_fields() {
        let cases = [
            ExpenseInput {
                description: " ".to_string(),
                ..input()
            },
            ExpenseInput {
                amount: None,
                ..input()
            },
            ExpenseInput {
                amount: Some(Money::ZERO),
                ..input()
            },
            ExpenseInput {
                amount: Some(Money::new(-5)),
                ..input()
            },
            ExpenseInput {
                category: None,
                ..input()
            },
            ExpenseInput {
                date: None,
                ..input()
            },
        ];
        for case in cases {
            assert!(matches!(case.validate(), Err(EngineError::Validation(_))));
        }
    }
}
