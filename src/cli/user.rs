use crate::cli::CliContext;
use crate::core::audit_log::AuditEvent;
use crate::core::{store, users};
use anyhow::{bail, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};
use serde::Serialize;

pub(crate) fn parse_username(s: &str) -> Result<String, String> {
    users::validate_username(s)
        .map(|_| s.to_string())
        .map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a new user
    Create(CreateArgs),
    /// Check a user's password
    Login(UsernameArgs),
    /// Change a user's password
    Passwd(UsernameArgs),
    /// Delete a user and the messages they sent
    Delete(UsernameArgs),
    /// List all users
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Username ([a-zA-Z0-9._-])
    #[arg(value_parser = parse_username)]
    pub username: String,

    /// Email stored with the account
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Args, Debug)]
pub struct UsernameArgs {
    #[arg(value_parser = parse_username)]
    pub username: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format: table|json
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Serialize)]
struct ListItem<'a> {
    id: u64,
    username: &'a str,
    email: Option<&'a str>,
    created_at: Option<String>,
    password_changed_at: Option<String>,
}

pub fn run(ctx: &CliContext, cmd: UserCommand) -> Result<()> {
    match cmd {
        UserCommand::Create(args) => run_create(ctx, args),
        UserCommand::Login(args) => run_login(ctx, args),
        UserCommand::Passwd(args) => run_passwd(ctx, args),
        UserCommand::Delete(args) => run_delete(ctx, args),
        UserCommand::List(args) => run_list(ctx, args),
    }
}

fn run_create(ctx: &CliContext, args: CreateArgs) -> Result<()> {
    // Fail fast before prompting if the name is already in use.
    let taken = store::with_snapshot(&ctx.paths, |s| {
        Ok(users::find_by_username(s, &args.username).is_some())
    })?;
    if taken {
        bail!("username '{}' is already taken", args.username);
    }

    let password = ctx.read_new_password(&format!("Password for {}", args.username))?;
    let result = store::with_transaction(&ctx.paths, |s| {
        let user =
            users::create_user(s, &args.username, args.email.clone(), &password, Utc::now())?;
        Ok(user.id)
    });
    let id = ctx.audited(AuditEvent::new("user.create", &args.username), result)?;
    println!("user '{}' created (id {})", args.username, id);
    Ok(())
}

fn run_login(ctx: &CliContext, args: UsernameArgs) -> Result<()> {
    let password = ctx.read_password(&format!("Password for {}", args.username))?;
    let result = store::with_snapshot(&ctx.paths, |s| {
        users::authenticate(s, &args.username, &password)?;
        Ok(())
    });
    ctx.audited(AuditEvent::new("user.login", &args.username), result)?;
    println!("login ok");
    Ok(())
}

fn run_passwd(ctx: &CliContext, args: UsernameArgs) -> Result<()> {
    let current = ctx.read_password(&format!("Current password for {}", args.username))?;
    let new_password = ctx.read_new_password("New password")?;
    let result = store::with_transaction(&ctx.paths, |s| {
        users::change_password(s, &args.username, &current, &new_password, Utc::now())?;
        Ok(())
    });
    ctx.audited(AuditEvent::new("user.passwd", &args.username), result)?;
    println!("password changed");
    Ok(())
}

fn run_delete(ctx: &CliContext, args: UsernameArgs) -> Result<()> {
    let password = ctx.read_password(&format!("Password for {}", args.username))?;
    let result = store::with_transaction(&ctx.paths, |s| {
        let removed = users::delete_user(s, &args.username, &password)?;
        Ok(removed.id)
    });
    let id = ctx.audited(AuditEvent::new("user.delete", &args.username), result)?;
    println!("user '{}' deleted (id {})", args.username, id);
    Ok(())
}

fn run_list(ctx: &CliContext, args: ListArgs) -> Result<()> {
    if let Some(w) = &ctx.policy_load_warning {
        eprintln!("warning: {}", w);
    }
    store::with_snapshot(&ctx.paths, |s| {
        let all = users::list_users(s);
        match args.format.as_str() {
            "json" => {
                let items: Vec<ListItem> = all
                    .iter()
                    .map(|u| ListItem {
                        id: u.id,
                        username: &u.username,
                        email: u.email.as_deref(),
                        created_at: u.created_at.map(|t| t.to_rfc3339()),
                        password_changed_at: u.password_changed_at.map(|t| t.to_rfc3339()),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&items)?);
            }
            "table" => {
                if all.is_empty() {
                    println!("No users found.");
                    return Ok(());
                }
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec![
                    Cell::new("ID").add_attribute(Attribute::Bold),
                    Cell::new("Username").add_attribute(Attribute::Bold),
                    Cell::new("Email").add_attribute(Attribute::Bold),
                    Cell::new("Created").add_attribute(Attribute::Bold),
                ]);
                for u in &all {
                    table.add_row(vec![
                        u.id.to_string(),
                        u.username.clone(),
                        u.email.clone().unwrap_or_else(|| "-".into()),
                        format_time(u.created_at),
                    ]);
                }
                println!("{}", table);
            }
            other => bail!("unknown format '{}' (expected table|json)", other),
        }
        Ok(())
    })
}

pub(crate) fn format_time(t: Option<DateTime<Utc>>) -> String {
    match t {
        Some(t) => {
            let local: DateTime<Local> = t.into();
            local.format("%Y-%m-%d %H:%M:%S").to_string()
        }
        None => "-".to_string(),
    }
}
