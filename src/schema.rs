//! Database schema management for `stardb`.
//!
//! The star schema is defined by the hand-written scripts under `sql/`, one
//! per dialect, embedded at compile time. [`bootstrap`] replays a script one
//! statement at a time inside the current session. Scripts are split on
//! `;` once comment lines are gone, so no statement or literal may contain
//! one.

use crate::{Dialect, Result, Session};

// ---

pub const MYSQL_SCHEMA: &str = include_str!("../sql/schema.mysql.sql");
pub const SQLITE_SCHEMA: &str = include_str!("../sql/schema.sqlite.sql");

/// Embedded schema script for `dialect`.
pub fn script(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::MySql => MYSQL_SCHEMA,
        Dialect::Sqlite => SQLITE_SCHEMA,
    }
}

/// Split a script into executable statements.
///
/// `--` comment lines are dropped before splitting on `;`, then empty chunks
/// and transaction control statements are skipped; the session already
/// wraps the run in a transaction.
pub fn split_statements(script: &str) -> Vec<String> {
    // ---
    let code = script
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    code.split(';')
        .map(|chunk| chunk.trim().to_string())
        .filter(|stmt| !stmt.is_empty() && !is_transaction_control(stmt))
        .collect()
}

fn is_transaction_control(stmt: &str) -> bool {
    let keyword = stmt.split_whitespace().next().unwrap_or_default();
    ["START", "BEGIN", "COMMIT", "ROLLBACK", "END"]
        .iter()
        .any(|k| keyword.eq_ignore_ascii_case(k))
}

/// Replay `script` against the session, returning how many statements ran.
///
/// Intended for a fresh database; errors from any statement abort the replay
/// and are propagated.
pub async fn bootstrap(session: &mut Session, script: &str) -> Result<usize> {
    // ---
    let statements = split_statements(script);
    for (i, stmt) in statements.iter().enumerate() {
        tracing::debug!("bootstrap statement {}/{}", i + 1, statements.len());
        session.execute(stmt, &[]).await?;
    }

    tracing::info!("Applied {} schema statements", statements.len());
    Ok(statements.len())
}
