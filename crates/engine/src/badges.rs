//! Badges: static reward catalogue plus the awarded records.
//!
//! Reward values live in `const` lookup tables keyed by [`BadgeType`], so they
//! cannot drift at runtime. Awarded badges are never deleted: revoking one
//! flips `active` to `false` and keeps the row for history.

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeType {
    BudgetHero,
    ConsistentSaver,
    SpendingStreakMaintainer,
    ExpenseTracker,
    CategoryMaster,
    MonthlyPlanner,
    SavingsChampion,
    EarlyBird,
}

/// Tier label. Used both as the static label of a badge type and as the
/// level a user reaches from their total points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BadgeLevel {
    Beginner,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl BadgeLevel {
    /// `<50` Beginner, `<100` Bronze, `<250` Silver, `<500` Gold, `<1000`
    /// Platinum, otherwise Diamond.
    pub fn from_points(points: i64) -> Self {
        match points {
            i64::MIN..50 => Self::Beginner,
            50..100 => Self::Bronze,
            100..250 => Self::Silver,
            250..500 => Self::Gold,
            500..1000 => Self::Platinum,
            _ => Self::Diamond,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
            Self::Diamond => "Diamond",
        }
    }
}

impl fmt::Display for BadgeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata for a [`BadgeType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BadgeInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub level: BadgeLevel,
    pub points: i64,
}

impl BadgeType {
    pub const ALL: [BadgeType; 8] = [
        Self::BudgetHero,
        Self::ConsistentSaver,
        Self::SpendingStreakMaintainer,
        Self::ExpenseTracker,
        Self::CategoryMaster,
        Self::MonthlyPlanner,
        Self::SavingsChampion,
        Self::EarlyBird,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BudgetHero => "BUDGET_HERO",
            Self::ConsistentSaver => "CONSISTENT_SAVER",
            Self::SpendingStreakMaintainer => "SPENDING_STREAK_MAINTAINER",
            Self::ExpenseTracker => "EXPENSE_TRACKER",
            Self::CategoryMaster => "CATEGORY_MASTER",
            Self::MonthlyPlanner => "MONTHLY_PLANNER",
            Self::SavingsChampion => "SAVINGS_CHAMPION",
            Self::EarlyBird => "EARLY_BIRD",
        }
    }

    pub const fn info(self) -> BadgeInfo {
        match self {
            Self::BudgetHero => BadgeInfo {
                name: "Budget Hero",
                description: "Spent less than 80% of monthly budget",
                icon: "🏆",
                color: "#FFD700",
                level: BadgeLevel::Gold,
                points: 100,
            },
            Self::ConsistentSaver => BadgeInfo {
                name: "Consistent Saver",
                description: "Stayed within budget for 3 consecutive months",
                icon: "💰",
                color: "#32CD32",
                level: BadgeLevel::Platinum,
                points: 200,
            },
            Self::SpendingStreakMaintainer => BadgeInfo {
                name: "Spending Streak Maintainer",
                description: "Logged expenses daily for 7+ days",
                icon: "📊",
                color: "#4169E1",
                level: BadgeLevel::Silver,
                points: 75,
            },
            Self::ExpenseTracker => BadgeInfo {
                name: "Expense Tracker",
                description: "Added 50+ expenses",
                icon: "📝",
                color: "#FF6347",
                level: BadgeLevel::Bronze,
                points: 50,
            },
            Self::CategoryMaster => BadgeInfo {
                name: "Category Master",
                description: "Used all expense categories",
                icon: "🎯",
                color: "#9370DB",
                level: BadgeLevel::Silver,
                points: 80,
            },
            Self::MonthlyPlanner => BadgeInfo {
                name: "Monthly Planner",
                description: "Set budget for 6 consecutive months",
                icon: "📅",
                color: "#20B2AA",
                level: BadgeLevel::Gold,
                points: 120,
            },
            Self::SavingsChampion => BadgeInfo {
                name: "Savings Champion",
                description: "Saved 50% or more of budget for a month",
                icon: "🏅",
                color: "#FF1493",
                level: BadgeLevel::Diamond,
                points: 300,
            },
            Self::EarlyBird => BadgeInfo {
                name: "Early Bird",
                description: "First expense logged within first week of joining",
                icon: "🌅",
                color: "#FFA500",
                level: BadgeLevel::Bronze,
                points: 25,
            },
        }
    }

    pub const fn points(self) -> i64 {
        self.info().points
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<&str> for BadgeType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let upper = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| EngineError::Validation(format!("invalid badge type: {value}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: i64,
    pub user_id: String,
    pub badge_type: BadgeType,
    pub earned_at: DateTime<Utc>,
    pub active: bool,
    pub streak_count: Option<i32>,
}

impl Badge {
    pub fn points(&self) -> i64 {
        self.badge_type.points()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeSummary {
    pub active_badges: u64,
    pub total_points: i64,
    pub rank: u64,
    pub level: BadgeLevel,
    /// Active badges earned in the last 30 days, newest first.
    pub recent_badges: Vec<Badge>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub points: i64,
    pub rank: u64,
    pub level: BadgeLevel,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "badges")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub badge_type: String,
    pub earned_at: DateTimeUtc,
    pub active: bool,
    pub streak_count: Option<i32>,
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

impl TryFrom<Model> for Badge {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            badge_type: BadgeType::try_from(model.badge_type.as_str())?,
            earned_at: model.earned_at,
            active: model.active,
            streak_count: model.streak_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_breakpoints() {
        assert_eq!(BadgeLevel::from_points(0), BadgeLevel::Beginner);
        assert_eq!(BadgeLevel::from_points(49), BadgeLevel::Beginner);
        assert_eq!(BadgeLevel::from_points(50), BadgeLevel::Bronze);
        assert_eq!(BadgeLevel::from_points(100), BadgeLevel::Silver);
        assert_eq!(BadgeLevel::from_points(249), BadgeLevel::Silver);
        assert_eq!(BadgeLevel::from_points(250), BadgeLevel::Gold);
        assert_eq!(BadgeLevel::from_points(500), BadgeLevel::Platinum);
        assert_eq!(BadgeLevel::from_points(999), BadgeLevel::Platinum);
        assert_eq!(BadgeLevel::from_points(1000), BadgeLevel::Diamond);
    }

    #[test]
    fn catalogue_points() {
        let total: i64 = BadgeType::ALL.iter().map(|t| t.points()).sum();
        assert_eq!(total, 950);
        assert_eq!(BadgeType::SavingsChampion.info().level, BadgeLevel::Diamond);
        assert_eq!(
            BadgeType::try_from("expense_tracker").unwrap(),
            BadgeType::ExpenseTracker
        );
    }
}
