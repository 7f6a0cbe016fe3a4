//! Messages exchanged between users.

use crate::constants::MAX_MESSAGE_SIZE;
use crate::core::error::StoreError;
use crate::core::users;
use crate::models::message::Message;
use crate::models::store_file::StoreFile;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Hidden from the recipient; the sender still has it.
    HiddenForRecipient,
    /// Removed for both parties.
    Deleted,
}

pub fn send(
    store: &mut StoreFile,
    from_id: u64,
    to_id: u64,
    text: &str,
    now: DateTime<Utc>,
) -> Result<Message, StoreError> {
    if text.trim().is_empty() {
        return Err(StoreError::EmptyMessage);
    }
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(StoreError::MessageTooLarge {
            size: text.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    if users::find_by_id(store, to_id).is_none() {
        return Err(StoreError::UnknownRecipient(to_id));
    }
    let message = Message {
        id: store.store.allocate_message_id(),
        text: text.to_string(),
        from_id,
        to_id,
        is_visible: true,
        created_at: now,
    };
    store.messages.push(message.clone());
    Ok(message)
}

pub fn outbox(store: &StoreFile, user_id: u64) -> Vec<&Message> {
    let mut out: Vec<&Message> = store.messages.iter().filter(|m| m.from_id == user_id).collect();
    out.sort_by_key(|m| m.id);
    out
}

pub fn inbox(store: &StoreFile, user_id: u64) -> Vec<&Message> {
    let mut out: Vec<&Message> = store
        .messages
        .iter()
        .filter(|m| m.to_id == user_id && m.is_visible)
        .collect();
    out.sort_by_key(|m| m.id);
    out
}

pub fn delete(
    store: &mut StoreFile,
    user_id: u64,
    message_id: u64,
) -> Result<DeleteOutcome, StoreError> {
    let idx = store
        .messages
        .iter()
        .position(|m| m.id == message_id)
        .ok_or(StoreError::MessageNotFound(message_id))?;
    let message = &mut store.messages[idx];

    if message.to_id == user_id && message.is_visible {
        message.is_visible = false;
        return Ok(DeleteOutcome::HiddenForRecipient);
    }
    if message.from_id == user_id {
        store.messages.remove(idx);
        return Ok(DeleteOutcome::Deleted);
    }
    Err(StoreError::NotParticipant(message_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_users() -> StoreFile {
        let mut store = StoreFile::default();
        users::create_user(&mut store, "alice", None, "Alamakota1", Utc::now()).unwrap();
        users::create_user(&mut store, "bob", None, "Bobspass1", Utc::now()).unwrap();
        users::create_user(&mut store, "eve", None, "Evespass1", Utc::now()).unwrap();
        store
    }

    #[test]
    fn test_send_and_list() {
        let mut store = two_users();
        let m = send(&mut store, 1, 2, "hello", Utc::now()).unwrap();
        assert_eq!(m.id, 1);
        assert_eq!(outbox(&store, 1).len(), 1);
        assert_eq!(inbox(&store, 2)[0].text, "hello");
        assert!(inbox(&store, 1).is_empty());
    }

    #[test]
    fn test_send_validation() {
        let mut store = two_users();
        assert_eq!(
            send(&mut store, 1, 42, "hi", Utc::now()).unwrap_err(),
            StoreError::UnknownRecipient(42)
        );
        assert_eq!(
            send(&mut store, 1, 2, "   ", Utc::now()).unwrap_err(),
            StoreError::EmptyMessage
        );
        let big = "x".repeat(MAX_MESSAGE_SIZE + 1);
        assert!(matches!(
            send(&mut store, 1, 2, &big, Utc::now()),
            Err(StoreError::MessageTooLarge { .. })
        ));
        assert!(store.messages.is_empty());
    }

    #[test]
    fn test_recipient_delete_hides_only_for_recipient() {
        let mut store = two_users();
        let m = send(&mut store, 1, 2, "hello", Utc::now()).unwrap();
        assert_eq!(delete(&mut store, 2, m.id).unwrap(), DeleteOutcome::HiddenForRecipient);
        assert!(inbox(&store, 2).is_empty());
        assert_eq!(outbox(&store, 1).len(), 1);
        // a second delete by the recipient is not theirs to make
        assert_eq!(
            delete(&mut store, 2, m.id).unwrap_err(),
            StoreError::NotParticipant(m.id)
        );
        assert_eq!(store.messages.len(), 1);
        assert!(!store.messages[0].is_visible);
    }

    #[test]
    fn test_sender_delete_removes_for_both() {
        let mut store = two_users();
        let m = send(&mut store, 1, 2, "hello", Utc::now()).unwrap();
        assert_eq!(delete(&mut store, 1, m.id).unwrap(), DeleteOutcome::Deleted);
        assert!(store.messages.is_empty());
    }

    #[test]
    fn test_outsider_cannot_delete() {
        let mut store = two_users();
        let m = send(&mut store, 1, 2, "hello", Utc::now()).unwrap();
        assert_eq!(
            delete(&mut store, 3, m.id).unwrap_err(),
            StoreError::NotParticipant(m.id)
        );
        assert_eq!(
            delete(&mut store, 3, 99).unwrap_err(),
            StoreError::MessageNotFound(99)
        );
    }

    #[test]
    fn test_deleting_sender_drops_their_messages() {
        let mut store = two_users();
        send(&mut store, 1, 2, "from alice", Utc::now()).unwrap();
        send(&mut store, 2, 1, "from bob", Utc::now()).unwrap();
        users::delete_user(&mut store, "alice", "Alamakota1").unwrap();
        assert_eq!(store.messages.len(), 1);
        assert_eq!(store.messages[0].text, "from bob");
    }
}
