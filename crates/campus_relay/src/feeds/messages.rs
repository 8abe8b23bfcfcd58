use super::{Feed, FeedContext, Notification, SeenSet};
use crate::canvas::Conversation;
use crate::preferences::Category;
use async_trait::async_trait;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct MessageNotice {
    pub conversation_id: u64,
    pub sender_name: String,
    pub subject: String,
    pub body: String,
}

impl From<Conversation> for MessageNotice {
    fn from(conversation: Conversation) -> Self {
        let sender_name = conversation
            .participants
            .first()
            .and_then(|p| p.name.clone())
            .unwrap_or_else(|| "Unknown Sender".to_string());

        Self {
            conversation_id: conversation.id,
            sender_name,
            subject: conversation.subject.unwrap_or_else(|| "No Subject".to_string()),
            body: conversation.last_message.unwrap_or_else(|| "No Content".to_string()),
        }
    }
}

impl MessageNotice {
    pub fn render(&self) -> String {
        format!(
            "📧 **New Inbox Message!**\n**From:** {}\n**Subject:** {}\n**Message:** {}",
            self.sender_name, self.subject, self.body
        )
    }
}

/// Polls the token holder's inbox.
pub struct MessageFeed {
    ctx: FeedContext,
    seen: SeenSet,
}

impl MessageFeed {
    pub fn new(ctx: FeedContext, seen: SeenSet) -> Self {
        Self { ctx, seen }
    }
}

#[async_trait]
impl Feed for MessageFeed {
    fn category(&self) -> Category {
        Category::Messages
    }

    async fn poll(&self) -> Vec<Notification> {
        let now = self.ctx.clock.now();
        self.seen.prune(now);

        let conversations = match self.ctx.source.conversations().await {
            Ok(conversations) => conversations,
            Err(e) => {
                warn!(error = %e, "Skipping inbox poll");
                return Vec::new();
            }
        };

        conversations
            .into_iter()
            .filter(|c| self.seen.insert_new(c.id, now))
            .map(|c| Notification::Message(c.into()))
            .collect()
    }

    fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
