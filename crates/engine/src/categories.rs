//! Expense categories.
//!
//! The set is closed: metadata (display name, icon, color) is static and
//! cannot be changed at runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Food,
    Travel,
    Rent,
    Utilities,
    Entertainment,
    Healthcare,
    Shopping,
    Education,
    Groceries,
    Insurance,
    Investment,
    Other,
}

/// Static display data for a [`Category`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CategoryInfo {
    pub display_name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Self::Food,
        Self::Travel,
        Self::Rent,
        Self::Utilities,
        Self::Entertainment,
        Self::Healthcare,
        Self::Shopping,
        Self::Education,
        Self::Groceries,
        Self::Insurance,
        Self::Investment,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "FOOD",
            Self::Travel => "TRAVEL",
            Self::Rent => "RENT",
            Self::Utilities => "UTILITIES",
            Self::Entertainment => "ENTERTAINMENT",
            Self::Healthcare => "HEALTHCARE",
            Self::Shopping => "SHOPPING",
            Self::Education => "EDUCATION",
            Self::Groceries => "GROCERIES",
            Self::Insurance => "INSURANCE",
            Self::Investment => "INVESTMENT",
            Self::Other => "OTHER",
        }
    }

    pub const fn info(self) -> CategoryInfo {
        let (display_name, icon, color) = match self {
            Self::Food => ("Food & Dining", "🍽️", "#FF6B6B"),
            Self::Travel => ("Travel & Transport", "🚗", "#4ECDC4"),
            Self::Rent => ("Rent & Housing", "🏠", "#45B7D1"),
            Self::Utilities => ("Utilities", "⚡", "#96CEB4"),
            Self::Entertainment => ("Entertainment", "🎬", "#FFEAA7"),
            Self::Healthcare => ("Healthcare", "🏥", "#DDA0DD"),
            Self::Shopping => ("Shopping", "🛍️", "#98D8C8"),
            Self::Education => ("Education", "📚", "#F7DC6F"),
            Self::Groceries => ("Groceries", "🛒", "#82E0AA"),
            Self::Insurance => ("Insurance", "🛡️", "#AED6F1"),
            Self::Investment => ("Investment", "📈", "#F8C471"),
            Self::Other => ("Other", "📝", "#D5DBDB"),
        };
        CategoryInfo {
            display_name,
            icon,
            color,
        }
    }

    pub fn display_name(self) -> &'static str {
        self.info().display_name
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl TryFrom<&str> for Category {
    type Error = EngineError;

    /// Accepts the stored code (`FOOD`) case-insensitively.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let upper = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| EngineError::Validation(format!("invalid category: {value}")))
    }
}
