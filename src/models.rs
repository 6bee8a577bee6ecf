//! Simple data models for the star schema.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

// ---

/// A single reported measure value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Measure {
    // ---
    Int(i64),
    Real(f64),
}

impl Measure {
    /// Parse a raw command-line value.
    ///
    /// `null` (any case) maps to `None` so the caller can report it as a
    /// missing value instead of a parse failure.
    pub fn parse_arg(raw: &str) -> Result<Option<Measure>, String> {
        // ---
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("null") {
            return Ok(None);
        }
        if let Ok(v) = raw.parse::<i64>() {
            return Ok(Some(Measure::Int(v)));
        }
        raw.parse::<f64>()
            .map(|v| Some(Measure::Real(v)))
            .map_err(|_| format!("`{raw}` is not a number"))
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Measure::Int(v) => v as f64,
            Measure::Real(v) => v,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Int(v) => write!(f, "{v}"),
            Measure::Real(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Measure {
    fn from(v: i64) -> Self {
        Measure::Int(v)
    }
}

impl From<f64> for Measure {
    fn from(v: f64) -> Self {
        Measure::Real(v)
    }
}

/// One row of `fact_table`: the per-date foreign keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactRow {
    // ---
    pub date: NaiveDate,
    /// `(dimension name, foreign key)` in registry order.
    pub keys: Vec<(String, Option<i64>)>,
}

impl FactRow {
    /// Foreign key stored for `dimension`, `None` when null or unknown.
    pub fn key(&self, dimension: &str) -> Option<i64> {
        self.keys
            .iter()
            .find(|(name, _)| name == dimension)
            .and_then(|(_, id)| *id)
    }
}

/// One row of a dimension table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionRow {
    // ---
    pub dimension: String,
    pub id: i64,
    /// `(column, value)` in registry column order.
    pub values: Vec<(String, Measure)>,
}

impl DimensionRow {
    pub fn value(&self, column: &str) -> Option<Measure> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| *v)
    }

    pub fn measures(&self) -> Vec<Measure> {
        self.values.iter().map(|(_, v)| *v).collect()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn fact(keys: &[(&str, Option<i64>)]) -> FactRow {
        // ---
        FactRow {
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            keys: keys.iter().map(|(n, id)| (n.to_string(), *id)).collect(),
        }
    }

    #[test]
    fn test_parse_arg_numbers() {
        // ---
        assert_eq!(Measure::parse_arg("3"), Ok(Some(Measure::Int(3))));
        assert_eq!(Measure::parse_arg("-2"), Ok(Some(Measure::Int(-2))));
        assert_eq!(Measure::parse_arg("4.13"), Ok(Some(Measure::Real(4.13))));
        assert_eq!(Measure::parse_arg(" 95000 "), Ok(Some(Measure::Int(95000))));
    }

    #[test]
    fn test_parse_arg_null_is_missing() {
        // ---
        assert_eq!(Measure::parse_arg("null"), Ok(None));
        assert_eq!(Measure::parse_arg("NULL"), Ok(None));
    }

    #[test]
    fn test_parse_arg_rejects_text() {
        // ---
        assert!(Measure::parse_arg("five").is_err());
        assert!(Measure::parse_arg("").is_err());
    }

    #[test]
    fn test_fact_key_lookup() {
        // ---
        let row = fact(&[("jira", Some(1)), ("leetcode", None), ("strava", Some(7))]);

        assert_eq!(row.key("jira"), Some(1));
        assert_eq!(row.key("leetcode"), None);
        assert_eq!(row.key("strava"), Some(7));
        assert_eq!(row.key("sleep"), None);
    }

    #[test]
    fn test_show_output_shape() {
        // ---
        let row = DimensionRow {
            dimension: "strava".to_string(),
            id: 2,
            values: vec![("distance_km".to_string(), Measure::Real(4.13))],
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], 2);
        assert_eq!(json["values"][0][1], 4.13);
        assert_eq!(row.value("distance_km"), Some(Measure::Real(4.13)));
        assert_eq!(row.measures(), vec![Measure::Real(4.13)]);
    }
}
