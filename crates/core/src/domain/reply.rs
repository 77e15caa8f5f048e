use serde::{Deserialize, Serialize};

use crate::domain::record::LogRecord;

pub const REPLY_COLOR: &str = "#ef4631";
pub const REPLY_TITLE: &str = "Burnout Barometer";
pub const FALLBACK_DECORATION: &str = "Acknowledged";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Visible only to the user who invoked the command.
    Ephemeral,
    InChannel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub color: String,
    pub title: String,
    pub text: String,
}

/// Slack message returned in response to the slash command.
/// See https://api.slack.com/docs/message-formatting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub response_type: ResponseType,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

pub fn format_reply(record: &LogRecord, decoration: Option<&str>) -> ReplyMessage {
    let body = decoration
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(FALLBACK_DECORATION);

    ReplyMessage {
        response_type: ResponseType::Ephemeral,
        text: format!("Received: {} ({})", record.measure, record.notes),
        attachments: vec![Attachment {
            color: REPLY_COLOR.to_owned(),
            title: REPLY_TITLE.to_owned(),
            text: body.to_owned(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;
    use serde_json::json;

    use super::{format_reply, ResponseType, FALLBACK_DECORATION, REPLY_COLOR, REPLY_TITLE};
    use crate::domain::record::LogRecord;

    fn record() -> LogRecord {
        LogRecord {
            timestamp: Utc
                .timestamp_opt(1_579_324_284, 0)
                .unwrap()
                .with_timezone(&Tz::Asia__Manila),
            user_id: "UA1DXYCL2".to_owned(),
            measure: 4,
            notes: "hello world".to_owned(),
        }
    }

    #[test]
    fn reply_is_ephemeral_acknowledgment() {
        let reply = format_reply(&record(), None);

        assert_eq!(reply.response_type, ResponseType::Ephemeral);
        assert_eq!(reply.text, "Received: 4 (hello world)");
        assert_eq!(reply.attachments.len(), 1);
        assert_eq!(reply.attachments[0].color, REPLY_COLOR);
        assert_eq!(reply.attachments[0].title, REPLY_TITLE);
        assert_eq!(reply.attachments[0].text, FALLBACK_DECORATION);
    }

    #[test]
    fn decoration_becomes_attachment_body() {
        let reply = format_reply(&record(), Some("Rest is productive."));
        assert_eq!(reply.attachments[0].text, "Rest is productive.");
    }

    #[test]
    fn blank_decoration_falls_back() {
        let reply = format_reply(&record(), Some("   "));
        assert_eq!(reply.attachments[0].text, FALLBACK_DECORATION);
    }

    #[test]
    fn serializes_to_slack_message_shape() {
        let value = serde_json::to_value(format_reply(&record(), None)).expect("serialize");

        assert_eq!(
            value,
            json!({
                "response_type": "ephemeral",
                "text": "Received: 4 (hello world)",
                "attachments": [{
                    "color": "#ef4631",
                    "title": "Burnout Barometer",
                    "text": "Acknowledged"
                }]
            })
        );
    }
}
