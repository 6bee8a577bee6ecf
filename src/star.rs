//! [`StarSchema`]: the reporting entry point.
//!
//! One call to [`StarSchema::insert_dimension`] records one dimension's
//! measurement for "today":
//!
//! 1. read the key today's fact row holds for the dimension,
//! 2. update that dimension row in place, or insert a new one,
//! 3. if the row id changed, point today's fact column at it.
//!
//! Re-reporting a dimension on the same day therefore keeps its row id and
//! only changes the measures. Nothing is committed here; the caller's
//! [`Session::close`] does that.

use chrono::NaiveDate;

use crate::{
    reconcile, upsert, DimensionRow, FactRow, Measure, Registry, Result, Session,
};

// ---

#[derive(Debug, Clone)]
pub struct StarSchema {
    registry: Registry,
    today: NaiveDate,
}

impl StarSchema {
    /// `today` is fixed for the lifetime of the value, so a run that
    /// crosses midnight keeps writing to the date it started on.
    pub fn new(registry: Registry, today: NaiveDate) -> Self {
        Self { registry, today }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Upsert today's row of `dimension` and reconcile the fact table.
    ///
    /// `dimension` is a registered name (`jira`) or its table name
    /// (`dimension_jira`). Returns the id of the dimension row now holding
    /// `values`.
    ///
    /// # Errors
    /// - [`Error::UnknownDimension`](crate::Error::UnknownDimension) for an
    ///   unregistered name
    /// - [`Error::Validation`](crate::Error::Validation) for a wrong value
    ///   count, a missing value or a value of the wrong kind
    /// - [`Error::MissingIdentifier`](crate::Error::MissingIdentifier) when
    ///   the insert produced no id
    /// - [`Error::Database`](crate::Error::Database) from the driver
    pub async fn insert_dimension(
        &self,
        session: &mut Session,
        dimension: &str,
        values: &[Option<Measure>],
    ) -> Result<i64> {
        // ---
        let spec = self.registry.get(dimension)?;
        let values = spec.validate(values)?;

        let current = reconcile::current_key(session, self.today, spec).await?;
        let id = upsert::upsert_dimension(session, spec, current, &values).await?;

        if current != Some(id) {
            reconcile::point_fact_at(session, self.today, spec, id).await?;
        }

        tracing::info!(
            dimension = %spec.name,
            date = %self.today,
            id,
            created = current != Some(id),
            "dimension recorded"
        );
        Ok(id)
    }

    /// Fact row for `date`, if anything was reported that day.
    pub async fn fact_row(&self, session: &mut Session, date: NaiveDate) -> Result<Option<FactRow>> {
        reconcile::fact_row(session, &self.registry, date).await
    }

    pub async fn dimension_row(
        &self,
        session: &mut Session,
        dimension: &str,
        id: i64,
    ) -> Result<Option<DimensionRow>> {
        let spec = self.registry.get(dimension)?;
        upsert::dimension_row(session, spec, id).await
    }

    /// The dimension rows referenced by `date`'s fact row, in registry order.
    pub async fn rows_for(&self, session: &mut Session, date: NaiveDate) -> Result<Vec<DimensionRow>> {
        // ---
        let Some(fact) = self.fact_row(session, date).await? else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();
        for (name, id) in &fact.keys {
            if let Some(id) = id {
                if let Some(row) = self.dimension_row(session, name, *id).await? {
                    rows.push(row);
                }
            }
        }
        Ok(rows)
    }
}
