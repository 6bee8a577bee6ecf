//! Dimension registry.
//!
//! Each reported dimension is described by a [`DimensionSpec`]: the dimension
//! table, the foreign-key column it owns in `fact_table`, and the ordered
//! measure columns. The upsert and reconcile code is driven entirely by these
//! entries, so adding a dimension means adding an entry (and its DDL), not a
//! new code path.

use serde::Serialize;

use crate::{Error, Measure, Result};

// ---

/// Storage kind of a measure column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Real,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Table layout of one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionSpec {
    /// Short name callers report under, e.g. `jira`.
    pub name: String,
    pub table: String,
    /// Foreign-key column in `fact_table`.
    pub fact_column: String,
    pub columns: Vec<ColumnSpec>,
}

impl DimensionSpec {
    /// Spec following the `dimension_<name>` / `id_<name>` naming convention.
    pub fn new(name: &str, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.to_owned(),
            table: format!("dimension_{name}"),
            fact_column: format!("id_{name}"),
            columns,
        }
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// Check a reported tuple against this dimension and normalize it to the
    /// column kinds.
    ///
    /// Integers are widened for real columns; a real value for an integer
    /// column, a non-finite real or any missing value is rejected.
    pub fn validate(&self, values: &[Option<Measure>]) -> Result<Vec<Measure>> {
        // ---
        if values.len() != self.arity() {
            return Err(Error::validation(
                &self.name,
                format!(
                    "expected {} value(s), got {}",
                    self.arity(),
                    values.len()
                ),
            ));
        }

        self.columns
            .iter()
            .zip(values)
            .map(|(column, value)| {
                let value = value.ok_or_else(|| {
                    Error::validation(&self.name, format!("`{}` is missing", column.name))
                })?;
                match (column.kind, value) {
                    (ColumnKind::Integer, Measure::Int(v)) => Ok(Measure::Int(v)),
                    (ColumnKind::Integer, Measure::Real(v)) => Err(Error::validation(
                        &self.name,
                        format!("`{}` must be an integer, got {v}", column.name),
                    )),
                    (ColumnKind::Real, v) if v.as_f64().is_finite() => {
                        Ok(Measure::Real(v.as_f64()))
                    }
                    (ColumnKind::Real, v) => Err(Error::validation(
                        &self.name,
                        format!("`{}` must be a finite number, got {v}", column.name),
                    )),
                }
            })
            .collect()
    }
}

/// Validated set of dimensions.
#[derive(Debug, Clone)]
pub struct Registry {
    dimensions: Vec<DimensionSpec>,
}

impl Registry {
    /// Build a registry, rejecting anything that could not be spliced into
    /// SQL safely or would make lookups ambiguous.
    pub fn new(dimensions: Vec<DimensionSpec>) -> Result<Self> {
        // ---
        if dimensions.is_empty() {
            return Err(Error::Registry("no dimensions configured".into()));
        }

        for (i, dim) in dimensions.iter().enumerate() {
            for ident in [&dim.name, &dim.table, &dim.fact_column] {
                check_identifier(ident)?;
            }
            if dim.columns.is_empty() {
                return Err(Error::Registry(format!(
                    "dimension `{}` has no measure columns",
                    dim.name
                )));
            }
            for (j, column) in dim.columns.iter().enumerate() {
                check_identifier(&column.name)?;
                if column.name == "id" {
                    return Err(Error::Registry(format!(
                        "dimension `{}` uses the reserved column name `id`",
                        dim.name
                    )));
                }
                if dim.columns[..j].iter().any(|c| c.name == column.name) {
                    return Err(Error::Registry(format!(
                        "dimension `{}` declares column `{}` twice",
                        dim.name, column.name
                    )));
                }
            }
            // `get` matches names and tables alike, so they share one namespace
            for earlier in &dimensions[..i] {
                if earlier.name == dim.name
                    || earlier.table == dim.table
                    || earlier.name == dim.table
                    || earlier.table == dim.name
                    || earlier.fact_column == dim.fact_column
                {
                    return Err(Error::Registry(format!(
                        "dimension `{}` clashes with `{}`",
                        dim.name, earlier.name
                    )));
                }
            }
        }

        Ok(Self { dimensions })
    }

    /// The jira / leetcode / strava layout of the shipped schema scripts.
    pub fn standard() -> Self {
        // ---
        use ColumnKind::{Integer, Real};

        let dimensions = vec![
            DimensionSpec::new("jira", vec![ColumnSpec::new("issues_done", Integer)]),
            DimensionSpec::new(
                "leetcode",
                vec![
                    ColumnSpec::new("python3_problems", Integer),
                    ColumnSpec::new("mysql_problems", Integer),
                    ColumnSpec::new("rank_", Integer),
                    ColumnSpec::new("streak", Integer),
                ],
            ),
            DimensionSpec::new("strava", vec![ColumnSpec::new("distance_km", Real)]),
        ];
        Self { dimensions }
    }

    /// Resolve a dimension by its short name or its table name.
    pub fn get(&self, name: &str) -> Result<&DimensionSpec> {
        self.dimensions
            .iter()
            .find(|d| d.name == name || d.table == name)
            .ok_or_else(|| Error::UnknownDimension(name.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DimensionSpec> {
        self.dimensions.iter()
    }
}

fn check_identifier(ident: &str) -> Result<()> {
    let mut chars = ident.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Registry(format!("`{ident}` is not a valid identifier")))
    }
}
