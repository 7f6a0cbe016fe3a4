//! Append-only, hash-chained audit trail for account operations.
//!
//! Each line is a JSON [`AuditEntry`]. `entry_hash` is the SHA-256 of the
//! entry's canonical JSON (sorted keys, `entry_hash` omitted) and
//! `prev_hash` links to the previous line. Entries carry usernames and
//! outcomes only, never passwords or credential records.

use crate::constants;
use crate::core::paths::StorePaths;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub actor: String,
    /// Username (or other identifier) the action applies to.
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AuditResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_hash: Option<String>,
}

fn detect_actor() -> String {
    if let Ok(user) = std::env::var("SUDO_USER") {
        if !user.is_empty() {
            return format!("{}(sudo)", user);
        }
    }
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

/// What happened, to whom, and how it ended.
pub struct AuditEvent<'a> {
    pub action: &'a str,
    pub subject: &'a str,
    pub detail: Option<String>,
    pub result: Option<AuditResult>,
}

impl<'a> AuditEvent<'a> {
    pub fn new(action: &'a str, subject: &'a str) -> Self {
        Self {
            action,
            subject,
            detail: None,
            result: None,
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn outcome(mut self, success: bool, error: Option<String>) -> Self {
        self.result = Some(AuditResult { success, error });
        self
    }
}

/// Append an event with the actor taken from the environment.
pub fn record(paths: &StorePaths, event: AuditEvent<'_>) -> Result<()> {
    record_as(paths, event, &detect_actor())
}

pub fn record_as(paths: &StorePaths, event: AuditEvent<'_>, actor: &str) -> Result<()> {
    let lock = open_lock(&paths.audit_lock)?;
    lock.lock_exclusive()
        .with_context(|| format!("acquire lock {}", paths.audit_lock.display()))?;

    let mut entry = AuditEntry {
        timestamp: Utc::now(),
        action: event.action.to_string(),
        actor: actor.to_string(),
        subject: event.subject.to_string(),
        detail: event.detail,
        result: event.result,
        prev_hash: last_entry_hash(&paths.audit_log)?,
        entry_hash: None,
    };
    entry.entry_hash = Some(compute_entry_hash(&entry)?);

    let line = serde_json::to_string(&entry).context("serialize audit entry")?;
    append_line(&paths.audit_log, &line)
}

fn open_lock(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("open lock file {}", path.display()))
}

fn compute_entry_hash(entry: &AuditEntry) -> Result<String> {
    let mut value = serde_json::to_value(entry).context("serialize for hash")?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("entry_hash");
    }
    let canonical =
        serde_json::to_string(&canonicalize(value)).context("serialize canonical json")?;
    Ok(format!("{:064x}", Sha256::digest(canonical.as_bytes())))
}

/// Recursively sort object keys so hashing is independent of field order.
fn canonicalize(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<(String, Value)> = map.into_iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit log {}", path.display()))?;
    writeln!(file, "{}", line).context("write audit entry")?;

    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(constants::AUDIT_LOG_MODE);
        fs::set_permissions(path, perm).context("set audit log permissions")?;
    }
    Ok(())
}

/// Hash that the next entry's `prev_hash` must carry to follow `line`.
///
/// Unparseable lines are linked by the SHA-256 of their trimmed text.
fn link_hash(line: &str) -> String {
    serde_json::from_str::<AuditEntry>(line)
        .ok()
        .and_then(|e| e.entry_hash)
        .unwrap_or_else(|| format!("{:064x}", Sha256::digest(line.as_bytes())))
}

fn last_entry_hash(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(last_line(path)?.map(|line| link_hash(&line)))
}

/// Last non-blank line of the file, read backwards from the end.
fn last_line(path: &Path) -> Result<Option<String>> {
    const CHUNK: u64 = 4096;

    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut end = file
        .metadata()
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    let mut tail: Vec<u8> = Vec::new();

    while end > 0 {
        let start = end.saturating_sub(CHUNK);
        file.seek(SeekFrom::Start(start))
            .with_context(|| format!("seek {}", path.display()))?;
        let mut chunk = vec![0u8; (end - start) as usize];
        file.read_exact(&mut chunk)
            .with_context(|| format!("read {}", path.display()))?;
        chunk.extend_from_slice(&tail);
        tail = chunk;
        end = start;

        let Some(content_end) = tail.iter().rposition(|b| !b.is_ascii_whitespace()) else {
            continue;
        };
        if let Some(newline) = tail[..content_end].iter().rposition(|b| *b == b'\n') {
            let line = String::from_utf8_lossy(&tail[newline + 1..=content_end]);
            return Ok(Some(line.trim().to_string()));
        }
    }

    let text = String::from_utf8_lossy(&tail);
    let line = text.trim();
    Ok((!line.is_empty()).then(|| line.to_string()))
}

/// A non-blank line of the audit log.
enum LogLine {
    Entry(AuditEntry),
    Malformed { raw: String, error: String },
}

fn read_lines(path: &Path) -> Result<Vec<LogLine>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).with_context(|| format!("open audit log {}", path.display()))?;
    let mut out = Vec::new();
    for bytes in BufReader::new(file).split(b'\n') {
        let bytes = bytes.context("read audit log line")?;
        let text = String::from_utf8_lossy(&bytes);
        let raw = text.trim();
        if raw.is_empty() {
            continue;
        }
        out.push(match serde_json::from_str::<AuditEntry>(raw) {
            Ok(entry) => LogLine::Entry(entry),
            Err(e) => LogLine::Malformed {
                raw: raw.to_string(),
                error: e.to_string(),
            },
        });
    }
    Ok(out)
}

/// Narrows `read_log` output. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action: Option<String>,
    pub subject: Option<String>,
    pub failed_only: bool,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(action) = &self.action {
            // "user" matches "user.create", "user.login", ...
            let prefix = format!("{}.", action);
            if entry.action != *action && !entry.action.starts_with(&prefix) {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if entry.subject != *subject {
                return false;
            }
        }
        if self.failed_only && !matches!(&entry.result, Some(r) if !r.success) {
            return false;
        }
        true
    }
}

/// Read audit entries matching `filter`, keeping the last `limit` if given.
pub fn read_log(
    paths: &StorePaths,
    filter: &AuditFilter,
    limit: Option<usize>,
) -> Result<Vec<AuditEntry>> {
    let mut malformed = 0usize;
    let mut entries: Vec<AuditEntry> = read_lines(&paths.audit_log)?
        .into_iter()
        .filter_map(|line| match line {
            LogLine::Entry(entry) => Some(entry),
            LogLine::Malformed { .. } => {
                malformed += 1;
                None
            }
        })
        .filter(|entry| filter.matches(entry))
        .collect();

    if malformed > 0 {
        eprintln!(
            "warning: {} malformed audit entries skipped (run `audit verify`)",
            malformed
        );
    }

    if let Some(limit) = limit {
        if entries.len() > limit {
            entries = entries.split_off(entries.len() - limit);
        }
    }
    Ok(entries)
}

/// Recompute every entry hash and link. Returns (total lines, errors).
///
/// Lines that are not valid entries are errors in their own right and still
/// take part in the chain, so the entry after them is checked as well.
pub fn verify_chain(paths: &StorePaths) -> Result<(usize, Vec<String>)> {
    let lines = read_lines(&paths.audit_log)?;
    let mut errors = Vec::new();
    let mut prev: Option<String> = None;

    for (i, line) in lines.iter().enumerate() {
        let n = i + 1;
        match line {
            LogLine::Malformed { raw, error } => {
                errors.push(format!("entry {}: unparseable ({})", n, error));
                prev = Some(link_hash(raw));
            }
            LogLine::Entry(entry) => {
                if i > 0 && entry.prev_hash != prev {
                    errors.push(format!(
                        "entry {}: prev_hash mismatch (expected {:?}, got {:?})",
                        n, prev, entry.prev_hash
                    ));
                }
                match &entry.entry_hash {
                    Some(stored) => match compute_entry_hash(entry) {
                        Ok(computed) if &computed == stored => {}
                        Ok(_) => {
                            errors.push(format!("entry {}: entry_hash mismatch (tampered?)", n))
                        }
                        Err(e) => errors.push(format!("entry {}: cannot compute hash: {}", n, e)),
                    },
                    None => errors.push(format!("entry {}: missing entry_hash", n)),
                }
                prev = entry.entry_hash.clone();
            }
        }
    }

    Ok((lines.len(), errors))
}
