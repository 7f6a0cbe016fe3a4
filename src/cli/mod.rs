//! CLI routing and command dispatch.

use crate::constants;
use crate::core::audit_log::{self, AuditEvent};
use crate::core::paths::StorePaths;
use crate::models::policy::PasswordPolicy;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Password;
use std::io::BufRead;
use std::path::PathBuf;
use zeroize::Zeroizing;

pub mod audit;
pub mod hash;
pub mod init;
pub mod message;
pub mod user;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub paths: StorePaths,
    pub non_interactive: bool,
    pub policy: PasswordPolicy,
    pub policy_load_warning: Option<String>,
}

impl CliContext {
    /// Append an audit entry. Failures are reported but never abort the command.
    pub fn audit(&self, event: AuditEvent<'_>) {
        if let Err(e) = audit_log::record(&self.paths, event) {
            eprintln!("warning: audit log failed: {}", e);
        }
    }

    /// Audit the outcome of an operation and hand the result back.
    pub fn audited<T>(&self, event: AuditEvent<'_>, result: Result<T>) -> Result<T> {
        let event = match &result {
            Ok(_) => event.outcome(true, None),
            Err(e) => event.outcome(false, Some(e.to_string())),
        };
        self.audit(event);
        result
    }

    /// Read a password from the prompt, or one line of stdin when
    /// non-interactive.
    pub fn read_password(&self, prompt: &str) -> Result<Zeroizing<String>> {
        let password = if self.non_interactive {
            read_stdin_line()?
        } else {
            Zeroizing::new(
                Password::new()
                    .with_prompt(prompt)
                    .allow_empty_password(true)
                    .interact()
                    .context("read password from prompt")?,
            )
        };
        check_size(&password)?;
        Ok(password)
    }

    /// Like [`read_password`](Self::read_password) but asks twice when interactive.
    pub fn read_new_password(&self, prompt: &str) -> Result<Zeroizing<String>> {
        if self.non_interactive {
            return self.read_password(prompt);
        }
        let password = Zeroizing::new(
            Password::new()
                .with_prompt(prompt)
                .with_confirmation("Repeat password", "passwords do not match")
                .interact()
                .context("read new password from prompt")?,
        );
        check_size(&password)?;
        Ok(password)
    }
}

fn read_stdin_line() -> Result<Zeroizing<String>> {
    let mut buf = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut buf)
        .context("read password from stdin")?;
    Ok(Zeroizing::new(buf.trim_end_matches(['\r', '\n']).to_string()))
}

fn check_size(password: &str) -> Result<()> {
    if password.len() > constants::MAX_PASSWORD_SIZE {
        bail!(
            "password exceeds maximum size ({} bytes, max {} bytes)",
            password.len(),
            constants::MAX_PASSWORD_SIZE
        );
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "user-vault", version, about = "Salted-hash user accounts and messages")]
pub struct Cli {
    /// Store root directory (default: $USER_VAULT_ROOT, nearest users.toml, or /var/lib/user-vault)
    #[arg(long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Read passwords from stdin, one per line, instead of prompting
    #[arg(long, global = true, env = "USER_VAULT_NON_INTERACTIVE")]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let paths = StorePaths::resolve(self.root);

        // Policy lives in users.toml; fall back to defaults if it can't be read.
        let (policy, policy_load_warning) = match crate::core::store::load(&paths.store_toml) {
            Ok(store) => (store.policy, None),
            Err(e) => (
                PasswordPolicy::default(),
                Some(format!("cannot read policy from users.toml: {:#}", e)),
            ),
        };

        let ctx = CliContext {
            paths,
            non_interactive: self.non_interactive,
            policy,
            policy_load_warning,
        };

        match self.command {
            Commands::Init(args) => init::run(&ctx, args),
            Commands::User { command } => user::run(&ctx, command),
            Commands::Message { command } => message::run(&ctx, command),
            Commands::Hash { command } => hash::run(&ctx, command),
            Commands::Audit { command } => audit::run(&ctx, command),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the store directory and users.toml
    Init(init::InitArgs),
    /// Create, authenticate, modify, and list users
    User {
        #[command(subcommand)]
        command: user::UserCommand,
    },
    /// Send, list, and delete messages
    Message {
        #[command(subcommand)]
        command: message::MessageCommand,
    },
    /// Credential codec utilities (no store access)
    Hash {
        #[command(subcommand)]
        command: hash::HashCommand,
    },
    /// View or verify the audit trail
    Audit {
        #[command(subcommand)]
        command: audit::AuditCommand,
    },
}
