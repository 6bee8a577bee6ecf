//! Dimension table writes and reads.

use sqlx::Row;

use crate::{
    registry::{ColumnKind, DimensionSpec},
    DimensionRow, Measure, Param, Result, Session,
};

// ---

impl From<Measure> for Param {
    fn from(v: Measure) -> Self {
        match v {
            Measure::Int(v) => Param::Int(v),
            Measure::Real(v) => Param::Real(v),
        }
    }
}

/// Write `values` into `dimension`, returning the id of the row holding them.
///
/// When `current` names an existing row its measure columns are updated in
/// place; otherwise (no key yet, or a key whose row is gone) a new row is
/// inserted and its generated id returned. `values` must already be
/// validated against `dimension`.
pub async fn upsert_dimension(
    session: &mut Session,
    dimension: &DimensionSpec,
    current: Option<i64>,
    values: &[Measure],
) -> Result<i64> {
    // ---
    let mut params: Vec<Param> = values.iter().copied().map(Param::from).collect();

    if let Some(id) = current {
        if row_exists(session, dimension, id).await? {
            let assignments: Vec<String> = dimension
                .columns
                .iter()
                .map(|c| format!("{} = ?", c.name))
                .collect();
            let sql = format!(
                "UPDATE {} SET {} WHERE id = ?",
                dimension.table,
                assignments.join(", ")
            );
            params.push(Param::Int(id));
            session.execute(&sql, &params).await?;
            return Ok(id);
        }
        tracing::warn!(
            table = %dimension.table,
            id,
            "fact row points at a missing dimension row, inserting a new one"
        );
    }

    let names: Vec<&str> = dimension.columns.iter().map(|c| c.name.as_str()).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dimension.table,
        names.join(", "),
        vec!["?"; names.len()].join(", ")
    );
    session
        .insert_returning_id(&dimension.table, &sql, &params)
        .await
}

async fn row_exists(session: &mut Session, dimension: &DimensionSpec, id: i64) -> Result<bool> {
    let sql = format!("SELECT id FROM {} WHERE id = ?", dimension.table);
    Ok(session
        .fetch_optional(&sql, &[Param::Int(id)])
        .await?
        .is_some())
}

/// Read one dimension row back with its measures in column order.
pub async fn dimension_row(
    session: &mut Session,
    dimension: &DimensionSpec,
    id: i64,
) -> Result<Option<DimensionRow>> {
    // ---
    let names: Vec<&str> = dimension.columns.iter().map(|c| c.name.as_str()).collect();
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?",
        names.join(", "),
        dimension.table
    );

    let Some(row) = session.fetch_optional(&sql, &[Param::Int(id)]).await? else {
        return Ok(None);
    };

    let values = dimension
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let value = match column.kind {
                ColumnKind::Integer => Measure::Int(row.try_get::<i64, _>(i)?),
                ColumnKind::Real => Measure::Real(row.try_get::<f64, _>(i)?),
            };
            Ok((column.name.clone(), value))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(DimensionRow {
        dimension: dimension.name.clone(),
        id,
        values,
    }))
}
