use crate::cli::user::{format_time, parse_username};
use crate::cli::CliContext;
use crate::core::audit_log::AuditEvent;
use crate::core::messages::{self, DeleteOutcome};
use crate::core::{store, users};
use crate::models::message::Message;
use crate::models::store_file::StoreFile;
use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};

#[derive(Subcommand, Debug)]
pub enum MessageCommand {
    /// Send a message to another user
    Send(SendArgs),
    /// Show sent and received messages
    List(ListArgs),
    /// Delete a message you sent or received
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Sender username
    #[arg(value_parser = parse_username)]
    pub username: String,

    /// Recipient user id
    #[arg(long, value_name = "ID")]
    pub to: u64,

    /// Message text
    pub text: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(value_parser = parse_username)]
    pub username: String,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[arg(value_parser = parse_username)]
    pub username: String,

    /// Message id
    pub id: u64,
}

pub fn run(ctx: &CliContext, cmd: MessageCommand) -> Result<()> {
    match cmd {
        MessageCommand::Send(args) => run_send(ctx, args),
        MessageCommand::List(args) => run_list(ctx, args),
        MessageCommand::Delete(args) => run_delete(ctx, args),
    }
}

/// Authenticate `username` against `store`, auditing failures as logins.
fn login(ctx: &CliContext, store: &StoreFile, username: &str, password: &str) -> Result<u64> {
    match users::authenticate(store, username, password) {
        Ok(user) => Ok(user.id),
        Err(e) => {
            ctx.audit(AuditEvent::new("user.login", username).outcome(false, Some(e.to_string())));
            Err(e.into())
        }
    }
}

fn run_send(ctx: &CliContext, args: SendArgs) -> Result<()> {
    let password = ctx.read_password(&format!("Password for {}", args.username))?;
    let result = store::with_transaction(&ctx.paths, |s| {
        let from_id = login(ctx, s, &args.username, &password)?;
        let message = messages::send(s, from_id, args.to, &args.text, Utc::now())?;
        Ok(message.id)
    });
    let event =
        AuditEvent::new("message.send", &args.username).detail(format!("to user {}", args.to));
    let id = ctx.audited(event, result)?;
    println!("message {} sent to user {}", id, args.to);
    Ok(())
}

fn run_list(ctx: &CliContext, args: ListArgs) -> Result<()> {
    let password = ctx.read_password(&format!("Password for {}", args.username))?;
    store::with_snapshot(&ctx.paths, |s| {
        let user_id = login(ctx, s, &args.username, &password)?;

        println!("Sent messages");
        print_messages(&messages::outbox(s, user_id), "To", |m| m.to_id);
        println!();
        println!("Received messages");
        print_messages(&messages::inbox(s, user_id), "From", |m| m.from_id);
        Ok(())
    })
}

fn print_messages(list: &[&Message], peer_label: &str, peer: impl Fn(&Message) -> u64) {
    if list.is_empty() {
        println!("  (none)");
        return;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new(peer_label).add_attribute(Attribute::Bold),
        Cell::new("Time").add_attribute(Attribute::Bold),
        Cell::new("Message").add_attribute(Attribute::Bold),
    ]);
    for m in list {
        table.add_row(vec![
            m.id.to_string(),
            peer(*m).to_string(),
            format_time(Some(m.created_at)),
            m.text.clone(),
        ]);
    }
    println!("{}", table);
}

fn run_delete(ctx: &CliContext, args: DeleteArgs) -> Result<()> {
    let password = ctx.read_password(&format!("Password for {}", args.username))?;
    let result = store::with_transaction(&ctx.paths, |s| {
        let user_id = login(ctx, s, &args.username, &password)?;
        Ok(messages::delete(s, user_id, args.id)?)
    });
    let event = AuditEvent::new("message.delete", &args.username)
        .detail(format!("message {}", args.id));
    let outcome = ctx.audited(event, result)?;
    match outcome {
        DeleteOutcome::HiddenForRecipient => {
            println!("message {} deleted (sender keeps a copy)", args.id)
        }
        DeleteOutcome::Deleted => println!("message {} deleted", args.id),
    }
    Ok(())
}
