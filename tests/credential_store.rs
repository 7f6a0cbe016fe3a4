use chrono::Utc;
use tempfile::TempDir;
use user_vault::cli::CliContext;
use user_vault::core::audit_log::{self, AuditEvent, AuditFilter};
use user_vault::core::codec;
use user_vault::core::error::StoreError;
use user_vault::core::paths::StorePaths;
use user_vault::core::{messages, store, users};
use user_vault::models::policy::{PasswordPolicy, PolicyViolation};

fn init_store() -> (TempDir, StorePaths) {
    let dir = TempDir::new().unwrap();
    let paths = StorePaths::from_root(dir.path().join("vault"));
    store::ensure_root(&paths).unwrap();
    (dir, paths)
}

#[test]
fn record_written_by_store_verifies_with_codec() {
    let (_dir, paths) = init_store();
    store::with_transaction(&paths, |s| {
        users::create_user(s, "alice", None, "alamakota1", Utc::now())?;
        Ok(())
    })
    .unwrap();

    let raw = std::fs::read_to_string(&paths.store_toml).unwrap();
    let loaded = store::load(&paths.store_toml).unwrap();
    let record = loaded.users[0].hashed_password.as_str();
    assert_eq!(record.len(), 80);
    assert!(raw.contains(record));
    assert!(codec::check_password("alamakota1", record));
    assert!(!codec::check_password("wrongpass", record));
}

#[test]
fn policy_rejection_leaves_store_untouched() {
    let (_dir, paths) = init_store();
    let err = store::with_transaction(&paths, |s| {
        users::create_user(s, "bob", None, "abcdefg!", Utc::now())?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(
        err.downcast_ref::<StoreError>(),
        Some(&StoreError::Policy(PolicyViolation::InvalidCharacter {
            ch: '!',
            position: 7
        }))
    );
    assert!(!paths.store_toml.exists());
}

#[test]
fn password_change_survives_reload() {
    let (_dir, paths) = init_store();
    store::with_transaction(&paths, |s| {
        users::create_user(s, "alice", None, "Abcdef12", Utc::now())?;
        Ok(())
    })
    .unwrap();
    store::with_transaction(&paths, |s| {
        users::change_password(s, "alice", "Abcdef12", "Zyxwvu98", Utc::now())?;
        Ok(())
    })
    .unwrap();

    store::with_snapshot(&paths, |s| {
        assert!(users::authenticate(s, "alice", "Zyxwvu98").is_ok());
        assert_eq!(
            users::authenticate(s, "alice", "Abcdef12").unwrap_err(),
            StoreError::InvalidPassword("alice".into())
        );
        Ok(())
    })
    .unwrap();
}

#[test]
fn messages_flow_between_users() {
    let (_dir, paths) = init_store();
    store::with_transaction(&paths, |s| {
        users::create_user(s, "alice", None, "Alamakota1", Utc::now())?;
        users::create_user(s, "bob", None, "Bobspass1", Utc::now())?;
        messages::send(s, 1, 2, "hi bob", Utc::now())?;
        Ok(())
    })
    .unwrap();

    let loaded = store::load(&paths.store_toml).unwrap();
    assert_eq!(messages::inbox(&loaded, 2)[0].text, "hi bob");
    assert_eq!(loaded.store.next_message_id, 2);
}

#[test]
fn audit_trail_records_outcomes_without_secrets() {
    let (_dir, paths) = init_store();
    let ctx = CliContext {
        paths: paths.clone(),
        non_interactive: true,
        policy: PasswordPolicy::default(),
        policy_load_warning: None,
    };

    let created = store::with_transaction(&paths, |s| {
        let user = users::create_user(s, "alice", None, "alamakota1", Utc::now())?;
        Ok(user.hashed_password.as_str().to_string())
    });
    let record = ctx
        .audited(AuditEvent::new("user.create", "alice"), created)
        .unwrap();

    let login = store::with_snapshot(&paths, |s| {
        users::authenticate(s, "alice", "alamakota2")?;
        Ok(())
    });
    assert!(ctx
        .audited(AuditEvent::new("user.login", "alice"), login)
        .is_err());

    let log = std::fs::read_to_string(&paths.audit_log).unwrap();
    assert!(log.contains("invalid password for user alice"));
    assert!(!log.contains("alamakota1"));
    assert!(!log.contains("alamakota2"));
    assert!(!log.contains(&record));

    let failed = AuditFilter {
        failed_only: true,
        ..Default::default()
    };
    let entries = audit_log::read_log(&paths, &failed, None).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "user.login");

    let (total, errors) = audit_log::verify_chain(&paths).unwrap();
    assert_eq!(total, 2);
    assert!(errors.is_empty(), "errors: {:?}", errors);
}
