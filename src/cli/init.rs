use crate::cli::CliContext;
use crate::core::audit_log::AuditEvent;
use crate::core::store::{self, StoreTransaction};
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Minimum password length to record in the policy (only for a new store)
    #[arg(long, value_name = "N")]
    pub min_length: Option<usize>,
}

pub fn run(ctx: &CliContext, args: InitArgs) -> Result<()> {
    let paths = &ctx.paths;
    let existed = paths.is_initialized();
    store::ensure_root(paths)?;

    let mut tx = StoreTransaction::begin(paths)?;
    if !existed {
        if let Some(n) = args.min_length {
            tx.store_mut().policy.min_length = n;
        }
    }
    let policy = tx.store().policy.clone();
    let users = tx.store().users.len();
    tx.commit()?;

    ctx.audit(AuditEvent::new("init", &paths.root.display().to_string()).outcome(true, None));

    if existed {
        println!("store already initialized at {} ({} users)", paths.root.display(), users);
    } else {
        println!("store initialized at {}", paths.root.display());
    }
    println!(
        "password policy: min length {}, alphabet {}",
        policy.min_length, policy.alphabet
    );
    Ok(())
}
