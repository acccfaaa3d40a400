use teloxide::types::{Message, MessageEntityKind};

use crate::{error::HandlerResult, service::ReplyTarget, state::AppState};

/// Links found in a message, in the order they appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageUrls(pub Vec<String>);

impl MessageUrls {
    pub fn from_message(msg: Message) -> Option<Self> {
        let urls = message_urls(&msg);
        (!urls.is_empty()).then_some(Self(urls))
    }
}

/// URL and text-link entities of the text, or of the caption for media messages.
pub fn message_urls(msg: &Message) -> Vec<String> {
    let entities = msg
        .parse_entities()
        .or_else(|| msg.parse_caption_entities())
        .unwrap_or_default();

    entities
        .iter()
        .filter_map(|entity| match entity.kind() {
            MessageEntityKind::Url => Some(entity.text().to_string()),
            MessageEntityKind::TextLink { url } => Some(url.to_string()),
            _ => None,
        })
        .collect()
}

pub async fn handle_message_urls(msg: Message, urls: MessageUrls, state: AppState) -> HandlerResult<()> {
    let target = ReplyTarget {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
    };

    debug!("Message {} in chat {} has {} link(s)", msg.id, msg.chat.id, urls.0.len());
    let sent = state.direct.handle_urls(target, &urls.0).await;
    if sent > 0 {
        info!("Sent {} video(s) to chat {}", sent, msg.chat.id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(json: serde_json::Value) -> Message {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_urls_in_text_order() {
        let msg = message(serde_json::json!({
            "message_id": 7,
            "date": 1_700_000_000,
            "chat": { "id": 42, "type": "private", "first_name": "Ann" },
            "from": { "id": 42, "is_bot": false, "first_name": "Ann" },
            "text": "see https://x.com/a/status/1 and https://vk.com/video-1_2",
            "entities": [
                { "type": "url", "offset": 4, "length": 24 },
                { "type": "url", "offset": 33, "length": 24 }
            ]
        }));

        assert_eq!(
            message_urls(&msg),
            vec!["https://x.com/a/status/1".to_string(), "https://vk.com/video-1_2".to_string()]
        );
        assert!(MessageUrls::from_message(msg).is_some());
    }

    #[test]
    fn test_message_without_links_is_filtered_out() {
        let msg = message(serde_json::json!({
            "message_id": 8,
            "date": 1_700_000_000,
            "chat": { "id": 42, "type": "private", "first_name": "Ann" },
            "from": { "id": 42, "is_bot": false, "first_name": "Ann" },
            "text": "hello"
        }));

        assert!(message_urls(&msg).is_empty());
        assert_eq!(MessageUrls::from_message(msg), None);
    }
}
