//! Monthly budgets and their threshold state.
//!
//! A `Budget` caches the month's spent amount (`spent`) and carries two
//! one-shot alert flags. Flags only move `false -> true`; clearing them is the
//! job of the explicit monthly reset.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, YearMonth, util};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: String,
    pub period: YearMonth,
    pub amount: Money,
    pub spent: Money,
    pub alert80_sent: bool,
    pub alert100_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Display-only; alert decisions use [`Budget::reaches`].
    pub fn spent_percentage(&self) -> f64 {
        util::percentage(self.spent, self.amount)
    }

    pub fn remaining(&self) -> Money {
        self.amount - self.spent
    }

    pub fn is_within_limit(&self) -> bool {
        self.spent <= self.amount
    }

    pub fn reaches(&self, threshold: Threshold) -> bool {
        util::reaches_percent(self.spent, self.amount, threshold.percent())
    }

    pub fn status(&self) -> BudgetStatus {
        BudgetStatus::classify(self.spent, self.amount)
    }

    pub fn alert_sent(&self, threshold: Threshold) -> bool {
        match threshold {
            Threshold::Warning80 => self.alert80_sent,
            Threshold::Exceeded100 => self.alert100_sent,
        }
    }
}

/// Which budgets the new-month reset clears.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    /// Every budget, past months included.
    #[default]
    All,
    /// Only the budgets of the month that just started.
    CurrentMonth,
}

/// The two alert levels of a budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Threshold {
    Warning80,
    Exceeded100,
}

impl Threshold {
    /// Evaluation order: the 80% alert always goes out before the 100% one.
    pub const ALL: [Threshold; 2] = [Self::Warning80, Self::Exceeded100];

    pub const fn percent(self) -> i64 {
        match self {
            Self::Warning80 => 80,
            Self::Exceeded100 => 100,
        }
    }

    pub(crate) fn column(self) -> Column {
        match self {
            Self::Warning80 => Column::Alert80Sent,
            Self::Exceeded100 => Column::Alert100Sent,
        }
    }
}

/// Display classification of a budget. It never gates alerts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
    Safe,
    Moderate,
    Warning,
    Exceeded,
}

impl BudgetStatus {
    pub fn classify(spent: Money, limit: Money) -> Self {
        if util::reaches_percent(spent, limit, 100) {
            Self::Exceeded
        } else if util::reaches_percent(spent, limit, 80) {
            Self::Warning
        } else if util::reaches_percent(spent, limit, 50) {
            Self::Moderate
        } else {
            Self::Safe
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Moderate => "MODERATE",
            Self::Warning => "WARNING",
            Self::Exceeded => "EXCEEDED",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Safe => "#28a745",
            Self::Moderate => "#ffc107",
            Self::Warning => "#fd7e14",
            Self::Exceeded => "#dc3545",
        }
    }
}

/// Which alerts a single evaluation sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertOutcome {
    pub sent80: bool,
    pub sent100: bool,
}

/// Result of the bulk alert sweep: number of alerts dispatched per level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSweep {
    pub sent80: u64,
    pub sent100: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetStats {
    pub total_budgets: u64,
    pub average_limit: Money,
    pub average_spent_percentage: f64,
    pub within_limit_count: u64,
    pub current_status: Option<BudgetStatus>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub budget_month: i32,
    pub budget_year: i32,
    pub amount_minor: i64,
    pub spent_minor: i64,
    pub alert80_sent: bool,
    pub alert100_sent: bool,
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

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let month = u32::try_from(model.budget_month).map_err(|_| {
            EngineError::Validation(format!("invalid budget month: {}", model.budget_month))
        })?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            period: YearMonth::new(model.budget_year, month)?,
            amount: Money::new(model.amount_minor),
            spent: Money::new(model.spent_minor),
            alert80_sent: model.alert80_sent,
            alert100_sent: model.alert100_sent,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(spent: i64, limit: i64) -> BudgetStatus {
        BudgetStatus::classify(Money::new(spent), Money::new(limit))
    }

    #[test]
    fn status_breakpoints() {
        assert_eq!(status(4_999, 10_000), BudgetStatus::Safe);
        assert_eq!(status(5_000, 10_000), BudgetStatus::Moderate);
        assert_eq!(status(7_999, 10_000), BudgetStatus::Moderate);
        assert_eq!(status(8_000, 10_000), BudgetStatus::Warning);
        assert_eq!(status(9_999, 10_000), BudgetStatus::Warning);
        assert_eq!(status(10_000, 10_000), BudgetStatus::Exceeded);
        assert_eq!(status(1_000, 0), BudgetStatus::Safe);
    }

    #[test]
    fn status_colors() {
        assert_eq!(BudgetStatus::Exceeded.color(), "#dc3545");
        assert_eq!(BudgetStatus::Safe.as_str(), "SAFE");
    }
}
