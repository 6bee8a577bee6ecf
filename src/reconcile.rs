//! Fact table access: reading a date's foreign keys and pointing a single
//! column at a new dimension row.
//!
//! The write is an "insert or update one column" keyed by date. Columns of
//! the other dimensions are never part of the statement, so a report for one
//! dimension cannot null out another.

use chrono::NaiveDate;
use sqlx::Row;

use crate::{registry::DimensionSpec, FactRow, Param, Registry, Result, Session};

// ---

/// Foreign key held by `date`'s fact row for `dimension`.
///
/// `None` both when no fact row exists yet and when the column is null.
pub async fn current_key(
    session: &mut Session,
    date: NaiveDate,
    dimension: &DimensionSpec,
) -> Result<Option<i64>> {
    // ---
    let sql = format!(
        "SELECT {} FROM fact_table WHERE date = ?",
        dimension.fact_column
    );
    let row = session
        .fetch_optional(&sql, &[date_param(date)])
        .await?;

    match row {
        Some(row) => Ok(row.try_get::<Option<i64>, _>(0)?),
        None => Ok(None),
    }
}

/// Set `date`'s fact column for `dimension` to `id`, creating the fact row
/// (other columns null) when the date has none yet.
pub async fn point_fact_at(
    session: &mut Session,
    date: NaiveDate,
    dimension: &DimensionSpec,
    id: i64,
) -> Result<()> {
    // ---
    let dialect = session.dialect();
    let sql = dialect.fact_upsert_sql(&dimension.fact_column);

    let mut params = vec![date_param(date), Param::Int(id)];
    if dialect.fact_upsert_repeats_id() {
        params.push(Param::Int(id));
    }

    session.execute(&sql, &params).await?;
    tracing::debug!(%date, column = %dimension.fact_column, id, "fact row reconciled");
    Ok(())
}

/// Read `date`'s fact row with one key per registered dimension.
pub async fn fact_row(
    session: &mut Session,
    registry: &Registry,
    date: NaiveDate,
) -> Result<Option<FactRow>> {
    // ---
    let columns: Vec<&str> = registry.iter().map(|d| d.fact_column.as_str()).collect();
    let sql = format!(
        "SELECT {} FROM fact_table WHERE date = ?",
        columns.join(", ")
    );

    let Some(row) = session.fetch_optional(&sql, &[date_param(date)]).await? else {
        return Ok(None);
    };

    let keys = registry
        .iter()
        .enumerate()
        .map(|(i, dim)| Ok((dim.name.clone(), row.try_get::<Option<i64>, _>(i)?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(FactRow { date, keys }))
}

/// Dates are stored as `YYYY-MM-DD`; MySQL coerces the text into its `DATE`
/// column.
pub(crate) fn date_param(date: NaiveDate) -> Param {
    Param::Text(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::schema;

    async fn session() -> Session {
        let mut session = Session::connect("sqlite::memory:", false).await.unwrap();
        schema::bootstrap(&mut session, schema::SQLITE_SCHEMA)
            .await
            .unwrap();
        session
    }

    async fn insert_jira(s: &mut Session, issues_done: i64) -> i64 {
        s.insert_returning_id(
            "dimension_jira",
            "INSERT INTO dimension_jira (issues_done) VALUES (?)",
            &[Param::Int(issues_done)],
        )
        .await
        .unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_date_param_format() {
        // ---
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(date_param(date), Param::Text("2024-01-05".into()));
    }

    #[tokio::test]
    async fn test_point_fact_at_creates_then_updates_one_column() {
        // ---
        let registry = Registry::standard();
        let jira = registry.get("jira").unwrap();
        let strava = registry.get("strava").unwrap();
        let mut s = session().await;

        let j1 = insert_jira(&mut s, 3).await;
        let j2 = insert_jira(&mut s, 5).await;
        let s1 = s
            .insert_returning_id(
                "dimension_strava",
                "INSERT INTO dimension_strava (distance_km) VALUES (?)",
                &[Param::Real(4.13)],
            )
            .await
            .unwrap();

        assert_eq!(current_key(&mut s, day(), jira).await.unwrap(), None);
        assert!(fact_row(&mut s, &registry, day()).await.unwrap().is_none());

        point_fact_at(&mut s, day(), jira, j1).await.unwrap();
        point_fact_at(&mut s, day(), strava, s1).await.unwrap();

        let row = fact_row(&mut s, &registry, day()).await.unwrap().unwrap();
        assert_eq!(row.key("jira"), Some(j1));
        assert_eq!(row.key("leetcode"), None);
        assert_eq!(row.key("strava"), Some(s1));

        point_fact_at(&mut s, day(), jira, j2).await.unwrap();
        assert_eq!(current_key(&mut s, day(), jira).await.unwrap(), Some(j2));
        assert_eq!(current_key(&mut s, day(), strava).await.unwrap(), Some(s1));

        let count = s.fetch_all("SELECT date FROM fact_table", &[]).await.unwrap();
        assert_eq!(count.len(), 1);

        s.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_dates_are_independent() {
        // ---
        let registry = Registry::standard();
        let jira = registry.get("jira").unwrap();
        let mut s = session().await;
        let next = day().succ_opt().unwrap();

        let j1 = insert_jira(&mut s, 1).await;
        point_fact_at(&mut s, day(), jira, j1).await.unwrap();

        assert_eq!(current_key(&mut s, next, jira).await.unwrap(), None);
        assert!(fact_row(&mut s, &registry, next).await.unwrap().is_none());

        s.close().await.unwrap();
    }
}
