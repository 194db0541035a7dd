use std::collections::VecDeque;
use studychat_core::{Message, StoreError, Timestamp};

/// Ordered transcript entries, oldest first.
///
/// Timestamped entries never go backwards. Entries without a timestamp
/// (echoes, replies, synthetic notices) are exempt from the check and keep
/// their position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStore {
    messages: VecDeque<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self { messages: VecDeque::with_capacity(64) }
    }

    /// Add to the end
    pub fn append(&mut self, message: Message) -> Result<(), StoreError> {
        if let Some(incoming) = &message.timestamp
            && let Some(newest) = self.newest_timestamp()
            && incoming < newest
        {
            return Err(StoreError::OutOfOrder { incoming: incoming.to_string(), newest: newest.to_string() });
        }

        self.messages.push_back(message);
        Ok(())
    }

    /// Add an ordered batch in front of the oldest entry
    pub fn prepend(&mut self, batch: Vec<Message>) -> Result<(), StoreError> {
        check_sorted(&batch)?;

        if let Some(batch_newest) = batch.iter().rev().find_map(|m| m.timestamp.as_ref())
            && let Some(oldest) = self.oldest_timestamp()
            && batch_newest > oldest
        {
            return Err(StoreError::UnorderedBatch(format!(
                "batch ends at {} after oldest loaded entry {}",
                batch_newest, oldest
            )));
        }

        for message in batch.into_iter().rev() {
            self.messages.push_front(message);
        }
        Ok(())
    }

    /// Discard everything and load `messages` (full reload)
    pub fn replace_all(&mut self, messages: Vec<Message>) -> Result<(), StoreError> {
        check_sorted(&messages)?;
        self.messages = messages.into();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Entries for rendering, oldest first
    pub fn messages(&self) -> Vec<&Message> {
        self.messages.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn first(&self) -> Option<&Message> {
        self.messages.front()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Message> {
        self.messages.get_mut(index)
    }

    pub fn oldest_timestamp(&self) -> Option<&Timestamp> {
        self.messages.iter().find_map(|m| m.timestamp.as_ref())
    }

    pub fn newest_timestamp(&self) -> Option<&Timestamp> {
        self.messages.iter().rev().find_map(|m| m.timestamp.as_ref())
    }
}

fn check_sorted(batch: &[Message]) -> Result<(), StoreError> {
    let mut previous: Option<&Timestamp> = None;
    for timestamp in batch.iter().filter_map(|m| m.timestamp.as_ref()) {
        if let Some(prev) = previous
            && timestamp < prev
        {
            return Err(StoreError::UnorderedBatch(format!("{} follows {}", timestamp, prev)));
        }
        previous = Some(timestamp);
    }
    Ok(())
}
