use std::{future::Future, sync::Arc, time::Duration};

use sqlx::{
    Database, Error, IntoArguments, PgPool, Postgres,
    postgres::{PgPoolOptions, PgRow},
};
use tokio::{
    runtime::{Handle, Runtime},
    task::block_in_place,
};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_CONNECTIONS: u32 = 100;

/// Synchronous facade over the sqlx pool.
///
/// Collections stay uniform across backends by exposing blocking
/// calls; when invoked from inside the runtime the work is moved onto
/// a blocking-capable thread first.
#[derive(Debug, Clone)]
pub struct SynClient {
    pool: PgPool,

    runtime: Arc<Runtime>,
}

impl SynClient {
    pub fn connect(
        db_url: &str,
        runtime: Arc<Runtime>,
    ) -> Self {
        let pool = {
            let connect = PgPoolOptions::new().acquire_timeout(ACQUIRE_TIMEOUT).max_connections(MAX_CONNECTIONS).connect(db_url);
            block_on(&runtime, connect)
        };

        #[allow(clippy::expect_fun_call)]
        Self {
            pool: pool.expect(&format!("failed to connect to DB {}", db_url)),
            runtime,
        }
    }

    pub fn query_one<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> Result<PgRow, Error>
    where
        A: IntoArguments<'q, Postgres> + 'q,
    {
        block_on(&self.runtime, async {
            let mut conn = self.pool.acquire().await?;
            sqlx::query_with(sql, params).fetch_one(&mut *conn).await
        })
    }

    pub fn query<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> Result<Vec<PgRow>, Error>
    where
        A: IntoArguments<'q, Postgres> + 'q,
    {
        block_on(&self.runtime, async {
            let mut conn = self.pool.acquire().await?;
            sqlx::query_with(sql, params).fetch_all(&mut *conn).await
        })
    }

    pub fn execute<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> Result<<Postgres as Database>::QueryResult, Error>
    where
        A: IntoArguments<'q, Postgres> + 'q,
    {
        block_on(&self.runtime, async {
            let mut conn = self.pool.acquire().await?;
            sqlx::query_with(sql, params).execute(&mut *conn).await
        })
    }

    /// Runs the statements in one transaction.
    pub fn batch_execute(
        &self,
        sqls: &[String],
    ) -> Result<(), Error> {
        block_on(&self.runtime, async {
            let mut tx = self.pool.begin().await?;
            for sql in sqls {
                sqlx::query(sql).execute(&mut *tx).await?;
            }
            tx.commit().await
        })
    }
}

/// Drives a future to completion from sync code, whether or not the
/// caller is already on the runtime.
fn block_on<F, T>(
    runtime: &Runtime,
    future: F,
) -> T
where
    F: Future<Output = T>,
{
    if Handle::try_current().is_ok() {
        block_in_place(|| runtime.block_on(future))
    } else {
        runtime.block_on(future)
    }
}
