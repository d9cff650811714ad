//! In-process broadcast groups, one per room name.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::frames::ChatFrame;

/// Group key for a room name.
pub fn group_key(room_name: &str) -> String {
    format!("chat_{room_name}")
}

#[derive(Clone)]
pub struct BroadcastGroups {
    groups: Arc<RwLock<HashMap<String, broadcast::Sender<ChatFrame>>>>,
    capacity: usize,
}

impl BroadcastGroups {
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Register a new member; the group is created on first join.
    pub async fn join(&self, key: &str) -> broadcast::Receiver<ChatFrame> {
        let mut groups = self.groups.write().await;
        let sender = groups
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        let receiver = sender.subscribe();
        debug!(group = key, members = sender.receiver_count(), "joined broadcast group");
        receiver
    }

    /// Drop `receiver` and forget the group once nobody is left in it.
    pub async fn leave(&self, key: &str, receiver: broadcast::Receiver<ChatFrame>) {
        let mut groups = self.groups.write().await;
        drop(receiver);
        if let Some(sender) = groups.get(key) {
            if sender.receiver_count() == 0 {
                groups.remove(key);
                debug!(group = key, "broadcast group closed");
            }
        }
    }

    /// Send to every member; returns how many receivers were reached.
    pub async fn publish(&self, key: &str, frame: ChatFrame) -> usize {
        let groups = self.groups.read().await;
        match groups.get(key) {
            Some(sender) => sender.send(frame).unwrap_or(0),
            None => 0,
        }
    }

    pub async fn member_count(&self, key: &str) -> usize {
        let groups = self.groups.read().await;
        groups.get(key).map_or(0, |sender| sender.receiver_count())
    }

    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: i64) -> ChatFrame {
        ChatFrame::Text {
            message: format!("m{id}"),
            username: "aria".into(),
            message_id: id,
        }
    }

    #[test]
    fn group_key_prefixes_room_name() {
        assert_eq!(group_key("chat_5_1000000"), "chat_chat_5_1000000");
        assert_eq!(group_key("lobby"), "chat_lobby");
    }

    #[tokio::test]
    async fn publish_reaches_every_member_in_order() {
        let groups = BroadcastGroups::new(8);
        let mut first = groups.join("chat_lobby").await;
        let mut second = groups.join("chat_lobby").await;

        assert_eq!(groups.publish("chat_lobby", frame(1)).await, 2);
        assert_eq!(groups.publish("chat_lobby", frame(2)).await, 2);

        for receiver in [&mut first, &mut second] {
            assert_eq!(receiver.recv().await.unwrap(), frame(1));
            assert_eq!(receiver.recv().await.unwrap(), frame(2));
        }
    }

    #[tokio::test]
    async fn groups_are_isolated_and_removed_when_empty() {
        let groups = BroadcastGroups::new(8);
        let lobby = groups.join("chat_lobby").await;
        let studio = groups.join("chat_studio").await;

        assert_eq!(groups.publish("chat_nowhere", frame(1)).await, 0);
        assert_eq!(groups.group_count().await, 2);

        groups.leave("chat_lobby", lobby).await;
        assert_eq!(groups.member_count("chat_lobby").await, 0);
        assert_eq!(groups.group_count().await, 1);
        assert_eq!(groups.publish("chat_lobby", frame(2)).await, 0);

        assert_eq!(groups.member_count("chat_studio").await, 1);
        groups.leave("chat_studio", studio).await;
        assert_eq!(groups.group_count().await, 0);
    }
}
