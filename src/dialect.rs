//! SQL dialects supported by the loader.

use crate::{Error, Result};

/// SQL flavour of the connected backend, picked from the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self> {
        // ---
        match url.split_once(':').map(|(scheme, _)| scheme) {
            Some("mysql" | "mariadb") => Ok(Dialect::MySql),
            Some("sqlite") => Ok(Dialect::Sqlite),
            _ => Err(Error::UnsupportedDatabase(url.to_owned())),
        }
    }

    /// Insert today's fact row or, if it exists, set only `column` on it.
    ///
    /// Parameters: date, id, and on MySQL the id a second time for the
    /// update branch.
    pub fn fact_upsert_sql(self, column: &str) -> String {
        match self {
            Dialect::MySql => format!(
                "INSERT INTO fact_table (date, {column}) VALUES (?, ?) \
                 ON DUPLICATE KEY UPDATE {column} = ?"
            ),
            Dialect::Sqlite => format!(
                "INSERT INTO fact_table (date, {column}) VALUES (?, ?) \
                 ON CONFLICT (date) DO UPDATE SET {column} = excluded.{column}"
            ),
        }
    }

    /// Clause appended to an `INSERT` so it yields the generated id as a row.
    ///
    /// `None` means the id comes from the driver's last insert id instead.
    pub fn returning_id_clause(self) -> Option<&'static str> {
        match self {
            Dialect::MySql => None,
            Dialect::Sqlite => Some(" RETURNING id"),
        }
    }

    /// Whether [`Dialect::fact_upsert_sql`] binds the id twice.
    pub fn fact_upsert_repeats_id(self) -> bool {
        matches!(self, Dialect::MySql)
    }
}
