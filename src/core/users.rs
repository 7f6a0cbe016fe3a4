//! User account operations over an in-memory [`StoreFile`].
//!
//! Every path that sets a password runs the store's [`PasswordPolicy`]
//! before deriving a credential record.
//!
//! [`PasswordPolicy`]: crate::models::policy::PasswordPolicy

use crate::core::error::StoreError;
use crate::models::store_file::StoreFile;
use crate::models::user::UserRecord;
use chrono::{DateTime, Utc};

/// Usernames are restricted to `[a-zA-Z0-9._-]`.
pub fn validate_username(name: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| StoreError::InvalidUsername {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(invalid("only [a-zA-Z0-9._-] allowed"));
    }
    Ok(())
}

pub fn find_by_username<'a>(store: &'a StoreFile, username: &str) -> Option<&'a UserRecord> {
    store.users.iter().find(|u| u.username == username)
}

pub fn find_by_id(store: &StoreFile, id: u64) -> Option<&UserRecord> {
    store.users.iter().find(|u| u.id == id)
}

pub fn create_user(
    store: &mut StoreFile,
    username: &str,
    email: Option<String>,
    password: &str,
    now: DateTime<Utc>,
) -> Result<UserRecord, StoreError> {
    validate_username(username)?;
    if find_by_username(store, username).is_some() {
        return Err(StoreError::UsernameTaken(username.to_string()));
    }
    store.policy.check(password)?;

    let id = store.store.allocate_user_id();
    let user = UserRecord::new(id, username, email, password, now);
    store.users.push(user.clone());
    store.users.sort_by_key(|u| u.id);
    Ok(user)
}

fn authenticated_index(
    store: &StoreFile,
    username: &str,
    password: &str,
) -> Result<usize, StoreError> {
    let idx = store
        .users
        .iter()
        .position(|u| u.username == username)
        .ok_or_else(|| StoreError::UnknownUser(username.to_string()))?;
    if !store.users[idx].check_password(password) {
        return Err(StoreError::InvalidPassword(username.to_string()));
    }
    Ok(idx)
}

pub fn authenticate<'a>(
    store: &'a StoreFile,
    username: &str,
    password: &str,
) -> Result<&'a UserRecord, StoreError> {
    let idx = authenticated_index(store, username, password)?;
    Ok(&store.users[idx])
}

pub fn change_password(
    store: &mut StoreFile,
    username: &str,
    current: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let idx = authenticated_index(store, username, current)?;
    store.policy.check(new_password)?;
    store.users[idx].set_password(new_password, now);
    Ok(())
}

/// Remove the user and every message they sent. Messages they received stay
/// with their senders.
pub fn delete_user(
    store: &mut StoreFile,
    username: &str,
    password: &str,
) -> Result<UserRecord, StoreError> {
    let idx = authenticated_index(store, username, password)?;
    let user = store.users.remove(idx);
    store.messages.retain(|m| m.from_id != user.id);
    Ok(user)
}

pub fn list_users(store: &StoreFile) -> Vec<&UserRecord> {
    let mut users: Vec<&UserRecord> = store.users.iter().collect();
    users.sort_by_key(|u| u.id);
    users
}
