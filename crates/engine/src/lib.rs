pub use badges::{Badge, BadgeInfo, BadgeLevel, BadgeSummary, BadgeType, LeaderboardEntry};
pub use budgets::{
    AlertOutcome, AlertSweep, Budget, BudgetStats, BudgetStatus, ResetScope, Threshold,
};
pub use categories::{Category, CategoryInfo};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::EngineError;
pub use expenses::{Expense, ExpenseFilter, ExpenseInput, ExpenseStats};
pub use money::Money;
pub use notify::{
    DeliveryOutcome, LogChannel, MessageFormat, NotificationChannel, NotificationError, Notifier,
    OutgoingMessage, Recipient,
};
pub use ops::{BadgeSweep, Engine, EngineBuilder};
pub use period::YearMonth;
pub use users::User;

mod badges;
mod budgets;
mod categories;
mod clock;
mod error;
mod expenses;
mod money;
pub mod notify;
mod ops;
mod period;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
