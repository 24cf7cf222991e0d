use std::fmt::Display;
use std::thread;
use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{error, info, warn};
use thiserror::Error;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type Connection = PgConnection;
pub type Pool = r2d2::Pool<ConnectionManager<Connection>>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to connect to database: {0}")]
    Pool(#[from] r2d2::PoolError),
    #[error("failed to run migrations: {0}")]
    Migration(String),
}

/// How often startup tries to reach the database before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

/// Runs `connect` until it succeeds or `policy.attempts` is used up, sleeping
/// `policy.delay` between attempts. Returns the last error on exhaustion.
pub fn connect_with_retry<T, E, F>(policy: RetryPolicy, mut connect: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        info!("Connecting to database (attempt {}/{})", attempt, attempts);
        match connect() {
            Ok(value) => {
                info!("Connected to database");
                return Ok(value);
            }
            Err(e) if attempt < attempts => {
                warn!(
                    "Database connection attempt {} failed: {}; retrying in {} ms",
                    attempt,
                    e,
                    policy.delay.as_millis()
                );
                thread::sleep(policy.delay);
                attempt += 1;
            }
            Err(e) => {
                error!("Giving up on database after {} attempts: {}", attempts, e);
                return Err(e);
            }
        }
    }
}

/// Builds the connection pool and brings the schema up to date.
///
/// `timeout` bounds how long a caller waits for a pooled connection. Blocks
/// the calling thread between retries, so call it at startup only.
pub fn init_db_pool(
    url: &str,
    max_size: u32,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<Pool, DbError> {
    info!("Configuring database...");
    let pool = connect_with_retry(retry, || {
        r2d2::Pool::builder()
            .max_size(max_size)
            .connection_timeout(timeout)
            .build(ConnectionManager::<Connection>::new(url))
    })?;

    let mut conn = pool.get()?;
    run_migration(&mut conn)?;
    Ok(pool)
}

pub fn run_migration(conn: &mut Connection) -> Result<(), DbError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DbError::Migration(e.to_string()))?;
    info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_retry_succeeds_after_failures() {
        let calls = Cell::new(0);
        let result = connect_with_retry(quick(5), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err("connection refused")
            } else {
                Ok("pool")
            }
        });
        assert_eq!(result, Ok("pool"));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retry_gives_up_with_last_error() {
        let calls = Cell::new(0);
        let result: Result<(), String> = connect_with_retry(quick(4), || {
            calls.set(calls.get() + 1);
            Err(format!("refused #{}", calls.get()))
        });
        assert_eq!(result, Err("refused #4".to_string()));
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let calls = Cell::new(0);
        let result: Result<(), &str> = connect_with_retry(quick(0), || {
            calls.set(calls.get() + 1);
            Err("down")
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }
}
