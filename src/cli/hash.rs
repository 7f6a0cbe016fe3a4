//! Direct access to the credential codec and password policy.

use crate::cli::CliContext;
use crate::core::codec;
use crate::models::credential::CredentialRecord;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum HashCommand {
    /// Print freshly generated salts
    Salt(SaltArgs),
    /// Derive a credential record from a password
    Derive(DeriveArgs),
    /// Check a password against a credential record
    Verify(VerifyArgs),
    /// Check a password against the store's password policy
    CheckPolicy,
}

#[derive(Args, Debug)]
pub struct SaltArgs {
    /// Number of salts to print
    #[arg(long, default_value_t = 1)]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct DeriveArgs {
    /// Salt to use (padded with 'a' or truncated to 16 characters)
    #[arg(long)]
    pub salt: Option<String>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Stored credential record
    pub record: String,
}

pub fn run(ctx: &CliContext, cmd: HashCommand) -> Result<()> {
    match cmd {
        HashCommand::Salt(args) => {
            for _ in 0..args.count {
                println!("{}", codec::generate_salt());
            }
            Ok(())
        }
        HashCommand::Derive(args) => {
            let password = ctx.read_new_password("Password")?;
            println!("{}", derive_record(&password, args.salt.as_deref()));
            Ok(())
        }
        HashCommand::Verify(args) => {
            let record = CredentialRecord::from_stored(args.record);
            if !record.is_well_formed() {
                eprintln!("warning: record is not a well-formed 80-character credential");
            }
            let password = ctx.read_password("Password")?;
            verify_record(&record, &password)?;
            println!("match");
            Ok(())
        }
        HashCommand::CheckPolicy => {
            if let Some(w) = &ctx.policy_load_warning {
                eprintln!("warning: {}", w);
            }
            let password = ctx.read_password("Password")?;
            match ctx.policy.check(&password) {
                Ok(()) => {
                    println!("password accepted");
                    Ok(())
                }
                Err(violation) => bail!("{}", violation),
            }
        }
    }
}

fn derive_record(password: &str, salt: Option<&str>) -> CredentialRecord {
    match salt {
        Some(salt) => CredentialRecord::derive_with_salt(password, salt),
        None => CredentialRecord::derive(password),
    }
}

fn verify_record(record: &CredentialRecord, password: &str) -> Result<()> {
    if !record.verify(password) {
        bail!("password does not match record");
    }
    Ok(())
}
