//! Reading and checking the account audit trail.

use crate::cli::user::format_time;
use crate::cli::CliContext;
use crate::core::audit_log::{self, AuditEntry, AuditFilter};
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, Table};

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Show recorded account actions, newest last
    Log(AuditLogArgs),
    /// Check every entry hash and link; fails on any broken or unreadable line
    Verify,
}

#[derive(Args, Debug)]
pub struct AuditLogArgs {
    /// Show at most this many of the most recent matching entries
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    /// Only this action, or a group such as `user` or `message`
    #[arg(long)]
    pub action: Option<String>,

    /// Only entries about this username
    #[arg(long, value_name = "USERNAME")]
    pub subject: Option<String>,

    /// Only failed actions (e.g. rejected logins)
    #[arg(long)]
    pub failed: bool,
}

impl AuditLogArgs {
    fn filter(&self) -> AuditFilter {
        AuditFilter {
            action: self.action.clone(),
            subject: self.subject.clone(),
            failed_only: self.failed,
        }
    }
}

pub fn run(ctx: &CliContext, cmd: AuditCommand) -> Result<()> {
    match cmd {
        AuditCommand::Log(args) => show_log(ctx, &args),
        AuditCommand::Verify => verify(ctx),
    }
}

fn show_log(ctx: &CliContext, args: &AuditLogArgs) -> Result<()> {
    let entries = audit_log::read_log(&ctx.paths, &args.filter(), Some(args.limit))?;
    if entries.is_empty() {
        println!("no matching audit entries in {}", ctx.paths.audit_log.display());
        return Ok(());
    }
    println!("{}", entry_table(&entries));
    Ok(())
}

fn entry_table(entries: &[AuditEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(
        ["When", "Action", "User", "Detail", "Outcome", "By"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
    );
    for entry in entries {
        let outcome = match &entry.result {
            Some(r) if r.success => Cell::new("ok").fg(Color::Green),
            Some(r) => Cell::new(format!("failed: {}", r.error.as_deref().unwrap_or("unknown")))
                .fg(Color::Red),
            None => Cell::new(""),
        };
        table.add_row(vec![
            Cell::new(format_time(Some(entry.timestamp))),
            Cell::new(&entry.action),
            Cell::new(&entry.subject),
            Cell::new(entry.detail.as_deref().unwrap_or("")),
            outcome,
            Cell::new(&entry.actor),
        ]);
    }
    table
}

fn verify(ctx: &CliContext) -> Result<()> {
    let (total, errors) = audit_log::verify_chain(&ctx.paths)?;
    for err in &errors {
        eprintln!("{}", err);
    }
    if !errors.is_empty() {
        bail!(
            "audit log {} is damaged: {} of {} lines failed verification",
            ctx.paths.audit_log.display(),
            errors.len(),
            total
        );
    }
    println!("audit log intact: {} entries", total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::core::audit_log::{record_as, AuditEvent};
    use crate::core::paths::StorePaths;
    use crate::models::policy::PasswordPolicy;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn test_ctx() -> (TempDir, CliContext) {
        let dir = TempDir::new().unwrap();
        let ctx = CliContext {
            paths: StorePaths::from_root(dir.path().to_path_buf()),
            non_interactive: true,
            policy: PasswordPolicy::default(),
            policy_load_warning: None,
        };
        (dir, ctx)
    }

    #[test]
    fn test_log_flags_build_filter() {
        let cli = Cli::try_parse_from([
            "user-vault", "audit", "log", "--action", "user", "--subject", "alice", "--failed",
        ])
        .unwrap();
        let crate::cli::Commands::Audit {
            command: AuditCommand::Log(args),
        } = cli.command
        else {
            panic!("expected audit log");
        };
        let filter = args.filter();
        assert_eq!(filter.action.as_deref(), Some("user"));
        assert_eq!(filter.subject.as_deref(), Some("alice"));
        assert!(filter.failed_only);
        assert_eq!(args.limit, 50);
    }

    #[test]
    fn test_table_shows_detail_and_failure() {
        let (_dir, ctx) = test_ctx();
        record_as(
            &ctx.paths,
            AuditEvent::new("message.delete", "bob").detail("message 3"),
            "tester",
        )
        .unwrap();
        record_as(
            &ctx.paths,
            AuditEvent::new("user.login", "bob").outcome(false, Some("invalid password".into())),
            "tester",
        )
        .unwrap();
        let entries = audit_log::read_log(&ctx.paths, &AuditFilter::default(), None).unwrap();
        let rendered = entry_table(&entries).to_string();
        assert!(rendered.contains("message 3"));
        assert!(rendered.contains("failed: invalid password"));
    }

    #[test]
    fn test_verify_fails_on_unreadable_line() {
        let (_dir, ctx) = test_ctx();
        record_as(&ctx.paths, AuditEvent::new("user.create", "bob"), "tester").unwrap();
        assert!(verify(&ctx).is_ok());

        let mut content = fs::read_to_string(&ctx.paths.audit_log).unwrap();
        content.push_str("{\"action\":\"user.delete\" garbage\n");
        fs::write(&ctx.paths.audit_log, content).unwrap();

        let err = verify(&ctx).unwrap_err();
        assert!(err.to_string().contains("1 of 2 lines failed"));
    }
}
