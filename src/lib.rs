//! Salted-hash password credentials with a small file-backed user store.
//!
//! The credential codec (`core::codec`) and password policy
//! (`models::policy`) are storage-agnostic; everything else is glue that
//! persists users and messages and drives them from the command line.
//!
//! ## Modules
//! - `cli` — Command-line handlers
//! - `core` — Codec, store transactions, user/message operations, audit log
//! - `models` — Data structures

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
