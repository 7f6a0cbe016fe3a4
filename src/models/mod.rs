//! Data structures.

pub mod credential;
pub mod message;
pub mod policy;
pub mod store_file;
pub mod user;
