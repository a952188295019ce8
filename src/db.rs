//! SQLite connections shared by the repositories.
//!
//! The pool itself comes from `pushkind-common`. Connections are checked out
//! through [`get_connection`], which applies the per-connection pragmas the
//! importer relies on.

use std::time::Duration;

use diesel::connection::SimpleConnection;
use pushkind_common::db::{DbConnection, DbPool};
use pushkind_common::repository::errors::RepositoryResult;

/// How long a writer waits for the SQLite write lock held by another run.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Take a connection from `pool` with foreign keys enforced, WAL journaling
/// and a busy timeout, so concurrent runs wait on the write lock instead of
/// failing with `SQLITE_BUSY`.
pub fn get_connection(pool: &DbPool) -> RepositoryResult<DbConnection> {
    let mut conn = pool.get()?;
    conn.batch_execute(&format!(
        "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;",
        BUSY_TIMEOUT.as_millis()
    ))?;
    Ok(conn)
}
