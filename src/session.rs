//! Connection management for one reporting run.
//!
//! A [`Session`] owns a single database connection with an open transaction.
//! It is acquired once at the start of a run with [`Session::open`] (or
//! [`Session::connect`] for an explicit URL) and must be released with
//! [`Session::close`], which commits everything written during the run and
//! then closes the connection. [`Session::close_with`] does the same at the
//! end of a run that may have failed, and is what the binary uses.
//!
//! Statements go through the `sqlx` `Any` driver, so the same SQL runs on
//! MySQL and SQLite; see [`Dialect`] for where the two differ.

use sqlx::{
    any::{AnyArguments, AnyPoolOptions, AnyRow},
    query::Query,
    Any, AnyPool, Row, Transaction,
};

use crate::{Config, Dialect, Error, Result};

// ---

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(i64),
    Real(f64),
    Text(String),
    Null,
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<Option<i64>> for Param {
    fn from(v: Option<i64>) -> Self {
        v.map_or(Param::Null, Param::Int)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_owned())
    }
}

/// One open connection plus its run-wide transaction.
pub struct Session {
    pool: AnyPool,
    tx: Transaction<'static, Any>,
    dialect: Dialect,
    verbose: bool,
}

impl Session {
    /// Connect to the database described by `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        Self::connect(config.database_url(), config.verbose).await
    }

    /// Connect to `url` (`mysql://...` or `sqlite:...`) and begin the run's
    /// transaction.
    pub async fn connect(url: &str, verbose: bool) -> Result<Self> {
        // ---
        let dialect = Dialect::from_url(url)?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new().max_connections(1).connect(url).await?;
        let tx = pool.begin().await?;

        tracing::debug!(?dialect, "session opened");

        Ok(Self {
            pool,
            tx,
            dialect,
            verbose,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Run a query expected to return at most one row.
    pub async fn fetch_optional(&mut self, sql: &str, params: &[Param]) -> Result<Option<AnyRow>> {
        self.log_statement(sql, params);
        let row = bind_all(sqlx::query(sql), params)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    pub async fn fetch_all(&mut self, sql: &str, params: &[Param]) -> Result<Vec<AnyRow>> {
        self.log_statement(sql, params);
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    /// Execute a statement, returning the number of affected rows.
    pub async fn execute(&mut self, sql: &str, params: &[Param]) -> Result<u64> {
        self.log_statement(sql, params);
        let result = bind_all(sqlx::query(sql), params)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Execute an `INSERT` into `table` and return the auto-increment id it
    /// generated.
    ///
    /// SQLite hands the id back through `RETURNING`; the `Any` driver does not
    /// forward its last rowid. MySQL reports it as the last insert id.
    pub async fn insert_returning_id(
        &mut self,
        table: &str,
        sql: &str,
        params: &[Param],
    ) -> Result<i64> {
        // ---
        let id = match self.dialect.returning_id_clause() {
            Some(clause) => {
                let sql = format!("{}{clause}", sql.trim_end());
                self.log_statement(&sql, params);
                bind_all(sqlx::query(&sql), params)
                    .fetch_optional(&mut *self.tx)
                    .await?
                    .map(|row| row.try_get::<i64, _>(0))
                    .transpose()?
            }
            None => {
                self.log_statement(sql, params);
                bind_all(sqlx::query(sql), params)
                    .execute(&mut *self.tx)
                    .await?
                    .last_insert_id()
            }
        };
        generated_id(id, table)
    }

    /// Commit the run's writes and close the connection.
    pub async fn close(self) -> Result<()> {
        // ---
        let Session { pool, tx, .. } = self;
        let committed = tx.commit().await;
        pool.close().await;
        committed?;

        tracing::debug!("session committed and closed");
        Ok(())
    }

    /// Close the session after a run, whatever its `outcome`.
    ///
    /// Writes made before a failure are committed too. The run's own error
    /// wins over a failure to close, which is only logged in that case.
    pub async fn close_with<T, E>(
        self,
        outcome: std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<Error>,
    {
        // ---
        match (outcome, self.close().await) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(closed)) => Err(closed.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(closed)) => {
                tracing::error!("Failed to close session after a failed run: {}", closed);
                Err(e)
            }
        }
    }

    fn log_statement(&self, sql: &str, params: &[Param]) {
        if self.verbose {
            tracing::info!(?params, "{}", sql.trim());
        } else {
            tracing::trace!(?params, "{}", sql.trim());
        }
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &[Param],
) -> Query<'q, Any, AnyArguments<'q>> {
    // ---
    for param in params {
        query = match param {
            Param::Int(v) => query.bind(*v),
            Param::Real(v) => query.bind(*v),
            Param::Text(v) => query.bind(v.clone()),
            Param::Null => query.bind(None::<i64>),
        };
    }
    query
}

/// MySQL reports `0` when the statement generated no id; drivers without
/// the concept report nothing at all.
fn generated_id(last_insert_id: Option<i64>, table: &str) -> Result<i64> {
    match last_insert_id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(Error::MissingIdentifier {
            table: table.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_generated_id() {
        // ---
        assert_eq!(generated_id(Some(7), "dimension_jira").unwrap(), 7);

        for missing in [None, Some(0)] {
            let err = generated_id(missing, "dimension_jira").unwrap_err();
            assert!(
                matches!(err, Error::MissingIdentifier { ref table } if table == "dimension_jira")
            );
        }
    }

    #[test]
    fn test_param_conversions() {
        // ---
        assert_eq!(Param::from(Some(3)), Param::Int(3));
        assert_eq!(Param::from(None::<i64>), Param::Null);
        assert_eq!(Param::from("2024-03-10"), Param::Text("2024-03-10".into()));
    }

    #[tokio::test]
    async fn test_statements_share_the_run_transaction() {
        // ---
        let mut session = Session::connect("sqlite::memory:", true).await.unwrap();
        assert_eq!(session.dialect(), Dialect::Sqlite);

        session
            .execute(
                "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, v REAL, note TEXT)",
                &[],
            )
            .await
            .unwrap();

        let first = session
            .insert_returning_id(
                "t",
                "INSERT INTO t (v, note) VALUES (?, ?)",
                &[Param::Real(1.5), Param::Null],
            )
            .await
            .unwrap();
        let second = session
            .insert_returning_id(
                "t",
                "INSERT INTO t (v, note) VALUES (?, ?)",
                &[Param::Real(2.5), "x".into()],
            )
            .await
            .unwrap();
        assert_eq!((first, second), (1, 2));

        let row = session
            .fetch_optional("SELECT v FROM t WHERE id = ?", &[Param::Int(second)])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.try_get::<f64, _>(0).unwrap(), 2.5);

        let rows = session.fetch_all("SELECT id FROM t", &[]).await.unwrap();
        assert_eq!(rows.len(), 2);

        let updated = session
            .execute("UPDATE t SET v = ? WHERE id = ?", &[Param::Real(0.0), Param::Int(first)])
            .await
            .unwrap();
        assert_eq!(updated, 1);

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_with_passes_outcome_through() {
        // ---
        let session = Session::connect("sqlite::memory:", false).await.unwrap();
        assert_eq!(session.close_with(Ok::<_, Error>(3)).await.unwrap(), 3);

        let session = Session::connect("sqlite::memory:", false).await.unwrap();
        let err = session
            .close_with(Err::<(), _>(Error::UnknownDimension("sleep".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownDimension(ref n) if n == "sleep"));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_backend() {
        // ---
        let err = Session::connect("postgres://localhost/metrics", false)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnsupportedDatabase(_)));
    }
}
