// sqlx::Error -> AppError mapping

use loner_core::error::AppError;

/// Describe an sqlx error with its SQLite result code when there is one
fn describe(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            Some(code) => match code.as_ref() {
                "2067" | "1555" => format!("Unique constraint violation: {}", db_err.message()),
                "5" => format!("Database locked (SQLITE_BUSY): {}", db_err.message()),
                "13" => format!("Database full: {}", db_err.message()),
                other => format!("Database error [{}]: {}", other, db_err.message()),
            },
            None => format!("Database error: {}", db_err.message()),
        },
        sqlx::Error::RowNotFound => "Row not found".to_string(),
        sqlx::Error::ColumnNotFound(col) => format!("Column not found: {}", col),
        sqlx::Error::PoolTimedOut => "Connection pool timed out".to_string(),
        // Connection, pool, protocol errors
        other => other.to_string(),
    }
}

/// Queue storage failures
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    AppError::Database(describe(&err))
}

/// Lock store failures are always reported as an unavailable store
pub(crate) fn map_lock_error(err: sqlx::Error) -> AppError {
    AppError::StoreUnavailable(describe(&err))
}
