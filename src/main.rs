//! Application entry point for the `stardb` loader.
//!
//! This binary runs one reporting run against the metrics star schema:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening one database session for the run
//! - Executing a single command (bootstrap, report, show)
//! - Committing and closing the session, on failure as well as success
//!
//! # Environment Variables
//! - `RDS_ENDPOINT`, `RDS_USER`, `RDS_PASSWORD` (**required** unless
//!   `DATABASE_URL` is set) – database credentials
//! - `DATABASE_URL`, `RDS_PORT`, `RDS_DATABASE` (optional) – see
//!   [`stardb::config`]
//! - `STARDB_TIMEZONE` (optional) – zone that decides "today"
//! - `STARDB_VERBOSE` (optional) – log every statement
//! - `STARDB_LOG_LEVEL` (optional) – log verbosity (default: `info`, or
//!   `debug` with `--verbose`)
use std::{env, fs, io::IsTerminal, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing_subscriber::filter::EnvFilter;

use stardb::{config, schema, Measure, Registry, Session, StarSchema};

// ---

#[derive(Parser, Debug)]
#[command(name = "stardb", about = "Load daily personal metrics into the star schema")]
struct Args {
    /// Log every SQL statement and its parameters.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the star schema on an empty database.
    Bootstrap {
        /// `;`-separated DDL script (default: the embedded script for the
        /// connected database).
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,
    },

    /// Record today's values for one dimension.
    Report {
        /// Dimension name, e.g. `jira` or `dimension_jira`.
        dimension: String,

        /// Values in column order; `null` marks a missing value.
        #[arg(allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Print a day's fact row and the dimension rows it references.
    Show {
        /// Date to show (default: today).
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },

    /// List the registered dimensions.
    Dimensions,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    let registry = Registry::standard();

    // Listing the registry needs no database
    if matches!(args.command, Command::Dimensions) {
        return print_dimensions(&registry);
    }

    let mut cfg = config::load_from_env()?;
    cfg.verbose |= args.verbose;
    cfg.log_config();

    let star = StarSchema::new(registry, cfg.today());

    let target = cfg.masked_database_url();
    tracing::info!("Attempting to connect to database: {}", target);

    let mut session = Session::open(&cfg)
        .await
        .map_err(|e| anyhow!("Failed to connect to database '{}': {}", target, e))?;

    tracing::info!("Successfully connected to database");

    let outcome = run(&star, &mut session, args.command).await;
    session.close_with(outcome).await
}

async fn run(star: &StarSchema, session: &mut Session, command: Command) -> Result<()> {
    // ---
    match command {
        Command::Bootstrap { script } => {
            let script = match script {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read schema script {}", path.display()))?,
                None => schema::script(session.dialect()).to_string(),
            };
            let applied = schema::bootstrap(session, &script).await?;
            println!("applied {applied} statements");
        }

        Command::Report { dimension, values } => {
            let values = values
                .iter()
                .map(|raw| {
                    Measure::parse_arg(raw)
                        .map_err(|e| anyhow!("Invalid value for `{}`: {}", dimension, e))
                })
                .collect::<Result<Vec<_>>>()?;

            let id = star.insert_dimension(session, &dimension, &values).await?;
            println!("{dimension} recorded for {} (row {id})", star.today());
        }

        Command::Show { date } => {
            let date = date.unwrap_or(star.today());
            let fact = star.fact_row(session, date).await?;
            let dimensions = star.rows_for(session, date).await?;

            let report = serde_json::json!({
                "date": date,
                "fact": fact,
                "dimensions": dimensions,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Dimensions => print_dimensions(star.registry())?,
    }

    Ok(())
}

fn print_dimensions(registry: &Registry) -> Result<()> {
    let specs: Vec<_> = registry.iter().collect();
    println!("{}", serde_json::to_string_pretty(&specs)?);
    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Log level from `RUST_LOG` if set, otherwise see [`log_directive`]
///
/// Logs go to stderr so `show` output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    // ---
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stderr().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(log_directive(
            env::var("STARDB_LOG_LEVEL").ok().as_deref(),
            verbose,
        ))
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}

/// Filter directive for a `STARDB_LOG_LEVEL` value.
///
/// An unset or unknown level means `info`, or `debug` for a verbose run.
/// sqlx's own statement log stays at `warn`; the session logs statements
/// itself.
fn log_directive(level: Option<&str>, verbose: bool) -> String {
    // ---
    let level = match level {
        Some(l @ ("trace" | "debug" | "info" | "warn" | "error")) => l,
        _ if verbose => "debug",
        _ => "info",
    };
    format!("{level},sqlx::query=warn")
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_log_directive() {
        // ---
        assert_eq!(log_directive(None, false), "info,sqlx::query=warn");
        assert_eq!(log_directive(None, true), "debug,sqlx::query=warn");
        assert_eq!(log_directive(Some("loud"), false), "info,sqlx::query=warn");

        // An explicit level beats --verbose
        assert_eq!(log_directive(Some("warn"), true), "warn,sqlx::query=warn");
    }

    #[test]
    fn test_report_arguments() {
        // ---
        let args = Args::try_parse_from(["stardb", "-v", "report", "strava", "-1.5", "null"]).unwrap();
        assert!(args.verbose);
        match args.command {
            Command::Report { dimension, values } => {
                assert_eq!(dimension, "strava");
                assert_eq!(values, vec!["-1.5", "null"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
