use engine::notify::{MessageFormat, NotificationError, OutgoingMessage, Recipient};
use teloxide::types::ChatId;

pub(crate) fn chat_id(recipient: &Recipient) -> Result<ChatId, NotificationError> {
    let raw = recipient
        .telegram_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NotificationError::NoRecipient(recipient.user_id.clone()))?;
    raw.parse::<i64>()
        .map(ChatId)
        .map_err(|_| NotificationError::Rejected(format!("invalid telegram chat id: {raw}")))
}

/// Subject on the first line, body below.
pub(crate) fn text(message: &OutgoingMessage) -> String {
    match message.format {
        MessageFormat::Rich => format!(
            "<b>{}</b>\n\n{}",
            escape_html(&message.subject),
            message.body
        ),
        MessageFormat::Plain => format!("{}\n\n{}", message.subject, message.body),
    }
}

/// Escapes the characters Telegram's HTML parse mode treats as markup.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(telegram_id: Option<&str>) -> Recipient {
        Recipient {
            user_id: "alice".to_string(),
            telegram_id: telegram_id.map(ToString::to_string),
        }
    }

    #[test]
    fn chat_id_requires_numeric_id() {
        assert_eq!(chat_id(&recipient(Some(" 42 "))).unwrap(), ChatId(42));
        assert_eq!(
            chat_id(&recipient(None)),
            Err(NotificationError::NoRecipient("alice".to_string()))
        );
        assert!(matches!(
            chat_id(&recipient(Some("@alice"))),
            Err(NotificationError::Rejected(_))
        ));
    }

    #[test]
    fn rich_text_escapes_subject_only() {
        let message = OutgoingMessage {
            subject: "Food & Dining".to_string(),
            body: "<b>ok</b>".to_string(),
            format: MessageFormat::Rich,
        };
        assert_eq!(text(&message), "<b>Food &amp; Dining</b>\n\n<b>ok</b>");
    }

    #[test]
    fn plain_text_is_untouched() {
        let message = OutgoingMessage {
            subject: "A & B".to_string(),
            body: "body".to_string(),
            format: MessageFormat::Plain,
        };
        assert_eq!(text(&message), "A & B\n\nbody");
    }
}
