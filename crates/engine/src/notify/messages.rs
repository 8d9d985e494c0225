//! Message rendering for budget alerts and badge awards.

use crate::{Badge, Budget, Threshold};

use super::{MessageFormat, OutgoingMessage};

pub fn budget_alert(
    budget: &Budget,
    threshold: Threshold,
    format: MessageFormat,
) -> OutgoingMessage {
    let pct = budget.spent_percentage();
    let period = budget.period;
    let (subject, body) = match (threshold, format) {
        (Threshold::Warning80, MessageFormat::Rich) => (
            format!("⚠️ Budget alert: 80% of your {period} budget used"),
            format!(
                "<b>Heads up!</b>\nYou have spent <b>{}</b> of your <b>{}</b> budget for {period} ({pct:.1}%).\nRemaining: <b>{}</b>",
                budget.spent,
                budget.amount,
                budget.remaining()
            ),
        ),
        (Threshold::Warning80, MessageFormat::Plain) => (
            format!("Budget alert: 80% of your {period} budget used"),
            format!(
                "You have spent {} of your {} budget for {period} ({pct:.1}%). Remaining: {}",
                budget.spent,
                budget.amount,
                budget.remaining()
            ),
        ),
        (Threshold::Exceeded100, MessageFormat::Rich) => (
            format!("🚨 Budget exceeded for {period}"),
            format!(
                "<b>Budget limit reached!</b>\nYou have spent <b>{}</b> against a budget of <b>{}</b> for {period} ({pct:.1}%).\nOver by: <b>{}</b>",
                budget.spent,
                budget.amount,
                budget.spent - budget.amount
            ),
        ),
        (Threshold::Exceeded100, MessageFormat::Plain) => (
            format!("Budget exceeded for {period}"),
            format!(
                "You have spent {} against a budget of {} for {period} ({pct:.1}%). Over by: {}",
                budget.spent,
                budget.amount,
                budget.spent - budget.amount
            ),
        ),
    };
    OutgoingMessage {
        subject,
        body,
        format,
    }
}

pub fn badge_awarded(badge: &Badge, format: MessageFormat) -> OutgoingMessage {
    let info = badge.badge_type.info();
    let (subject, body) = match format {
        MessageFormat::Rich => (
            format!("{} New badge: {}", info.icon, info.name),
            format!(
                "<b>Congratulations!</b>\nYou earned {} <b>{}</b> ({}, +{} points).\n<i>{}</i>",
                info.icon, info.name, info.level, info.points, info.description
            ),
        ),
        MessageFormat::Plain => (
            format!("New badge: {}", info.name),
            format!(
                "Congratulations! You earned {} ({}, +{} points). {}",
                info.name, info.level, info.points, info.description
            ),
        ),
    };
    OutgoingMessage {
        subject,
        body,
        format,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{BadgeType, Money, YearMonth};

    fn budget(spent: i64) -> Budget {
        Budget {
            id: 1,
            user_id: "alice".to_string(),
            period: YearMonth::new(2024, 3).unwrap(),
            amount: Money::new(1_000_000),
            spent: Money::new(spent),
            alert80_sent: false,
            alert100_sent: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn warning_mentions_amounts_and_period() {
        let msg = budget_alert(&budget(900_000), Threshold::Warning80, MessageFormat::Plain);
        assert!(msg.subject.contains("2024-03"));
        assert!(msg.body.contains("9000.00"));
        assert!(msg.body.contains("10000.00"));
        assert!(msg.body.contains("90.0%"));
        assert!(!msg.body.contains('<'));
    }

    #[test]
    fn exceeded_reports_overrun() {
        let msg = budget_alert(&budget(1_100_000), Threshold::Exceeded100, MessageFormat::Rich);
        assert!(msg.body.contains("<b>1000.00</b>"));
        assert_eq!(msg.format, MessageFormat::Rich);
    }

    #[test]
    fn badge_message_carries_points() {
        let badge = Badge {
            id: 7,
            user_id: "alice".to_string(),
            badge_type: BadgeType::ExpenseTracker,
            earned_at: Utc::now(),
            active: true,
            streak_count: None,
        };
        let msg = badge_awarded(&badge, MessageFormat::Plain);
        assert_eq!(msg.subject, "New badge: Expense Tracker");
        assert!(msg.body.contains("+50 points"));
    }
}
