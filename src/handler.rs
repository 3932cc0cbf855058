use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use log::{debug, error, warn};

use crate::errors::DbError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const STATEMENT_EXCERPT_LEN: usize = 100;

/// Bounded exponential backoff applied to transient database errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: crate::DEFAULT_QUERY_RETRIES,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    /// Delay before the retry following `attempt` (zero based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

fn excerpt(statement: &str) -> String {
    if statement.chars().count() <= STATEMENT_EXCERPT_LEN {
        statement.to_string()
    } else {
        let mut s: String = statement.chars().take(STATEMENT_EXCERPT_LEN).collect();
        s.push_str("...");
        s
    }
}

pub trait WithDB {
    fn dbpool(&self) -> &Arc<DbPool>;

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Run one unit of database work on the blocking pool, retrying
    /// transient connection errors according to `retry_policy`.
    ///
    /// `statement` is a short description of the work and only shows up in logs.
    fn query<T, F>(&self, statement: &str, f: F) -> impl Future<Output = Result<T, DbError>> + Send
    where
        T: Send + 'static,
        F: Fn(&mut SqliteConnection) -> QueryResult<T> + Send + Sync + 'static,
    {
        run_with_retry(
            self.dbpool().clone(),
            self.retry_policy(),
            excerpt(statement),
            f,
        )
    }

    /// Same as `query` with `f` wrapped in a transaction.
    fn run_txn<T, F>(&self, statement: &str, f: F) -> impl Future<Output = Result<T, DbError>> + Send
    where
        T: Send + 'static,
        F: Fn(&mut SqliteConnection) -> QueryResult<T> + Send + Sync + 'static,
    {
        self.query(statement, move |conn| conn.transaction(|conn| f(conn)))
    }
}

async fn run_with_retry<T, F>(
    pool: Arc<DbPool>,
    policy: RetryPolicy,
    statement: String,
    f: F,
) -> Result<T, DbError>
where
    T: Send + 'static,
    F: Fn(&mut SqliteConnection) -> QueryResult<T> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let mut attempt = 0;
    loop {
        let pool = pool.clone();
        let work = f.clone();
        let result = tokio_rayon::spawn(move || -> Result<T, DbError> {
            let mut conn = pool.get()?;
            Ok(work(&mut conn)?)
        })
        .await;

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.retries => {
                let delay = policy.backoff(attempt);
                attempt += 1;
                warn!(
                    "transient database error in `{}` (retry {}/{} in {:?}): {}",
                    statement, attempt, policy.retries, delay, e
                );
                tokio::time::sleep(delay).await;
            }
            Err(DbError::Query(diesel::result::Error::NotFound)) => {
                debug!("no rows for `{}`", statement);
                return Err(DbError::Query(diesel::result::Error::NotFound));
            }
            Err(e) => {
                error!("database error in `{}`: {}", statement, e);
                return Err(e);
            }
        }
    }
}

pub struct CmsDB {
    dbpool: Arc<DbPool>,
    retry_policy: RetryPolicy,
}

impl CmsDB {
    pub fn new(dbpool: Arc<DbPool>) -> Self {
        Self {
            dbpool,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

impl WithDB for CmsDB {
    fn dbpool(&self) -> &Arc<DbPool> {
        &self.dbpool
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }
}
