//! Star schema loader for daily personal metrics.
//!
//! A single fact table keyed by calendar date references one row per
//! dimension (Jira, LeetCode, Strava). [`StarSchema::insert_dimension`]
//! upserts a dimension's measurement for today and keeps the fact row's
//! foreign key pointing at it, all inside one [`Session`].

mod dialect;
mod models;
mod star;

pub mod config;
pub mod error;
pub mod reconcile;
pub mod registry;
pub mod schema;
pub mod session;
pub mod upsert;

pub use config::Config;
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use models::{DimensionRow, FactRow, Measure};
pub use registry::Registry;
pub use session::{Param, Session};
pub use star::StarSchema;
