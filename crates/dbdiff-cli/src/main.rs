//! dbdiff CLI - structural schema drift detection for PostgreSQL and MySQL.

mod output;

use clap::error::ErrorKind;
use clap::Parser;
use dbdiff::diff::parse_column_list;
use dbdiff::{generate_migration_sql, Comparator, Config, ConnectionConfig, DiffError};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Exit status when the schemas differ.
const EXIT_DRIFT: u8 = 2;

#[derive(Parser)]
#[command(name = "dbdiff")]
#[command(about = "Detect structural schema drift between two databases")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source database connection URL
    #[arg(long)]
    source: Option<String>,

    /// Source database driver (postgres or mysql)
    #[arg(long)]
    source_driver: Option<String>,

    /// Target database connection URL
    #[arg(long)]
    target: Option<String>,

    /// Target database driver (postgres or mysql)
    #[arg(long)]
    target_driver: Option<String>,

    /// PostgreSQL schema to compare on both sides [default: public]
    #[arg(long)]
    schema: Option<String>,

    /// PostgreSQL TLS mode: disable, require, verify-ca, verify-full
    #[arg(long)]
    ssl_mode: Option<String>,

    /// Output the diff as JSON
    #[arg(long)]
    json: bool,

    /// Print an advisory SQL migration script instead of the report
    #[arg(long)]
    migration: bool,

    /// Extract tables concurrently (faster for large databases)
    #[arg(long)]
    parallel: bool,

    /// Connection pool size per side
    #[arg(long)]
    max_connections: Option<usize>,

    /// Comma-separated list of table names to ignore
    #[arg(long, value_delimiter = ',')]
    ignore_tables: Vec<String>,

    /// Regex pattern for table names to ignore
    #[arg(long)]
    ignore_table_pattern: Option<String>,

    /// Comma-separated list of table.column entries to ignore
    #[arg(long, value_delimiter = ',')]
    ignore_columns: Vec<String>,

    /// Ignore all index differences
    #[arg(long)]
    ignore_indexes: bool,

    /// Ignore all foreign key differences
    #[arg(long)]
    ignore_foreign_keys: bool,

    /// Ignore all check constraint differences
    #[arg(long)]
    ignore_checks: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let outcome = run(cli).await;
    if let Err(e) = &outcome {
        eprintln!("{}", e.format_detailed());
    }
    ExitCode::from(exit_status(&outcome))
}

/// Map the outcome of a run to the process exit status.
fn exit_status(outcome: &Result<bool, DiffError>) -> u8 {
    match outcome {
        Ok(false) => 0,
        Ok(true) => EXIT_DRIFT,
        Err(e) => e.exit_code(),
    }
}

/// Returns whether drift was found.
async fn run(cli: Cli) -> Result<bool, DiffError> {
    setup_logging(&cli.verbosity, &cli.log_format);

    let config = build_config(&cli)?;

    let cancel_token = setup_signal_handler();

    let comparator = tokio::select! {
        _ = cancel_token.cancelled() => return Err(DiffError::Cancelled),
        comparator = Comparator::new(config) => comparator?,
    };
    let result = comparator.run(cancel_token).await?;

    if cli.migration {
        let hint = comparator.source_dialect();
        print!("{}", generate_migration_sql(&result.diff, hint.name()));
    } else if cli.json {
        print!("{}", output::render_json(&result.diff)?);
    } else {
        print!("{}", output::render_text(&result.diff));
    }

    Ok(result.has_drift())
}

/// Load the optional config file, then apply command-line overrides.
fn build_config(cli: &Cli) -> Result<Config, DiffError> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => config_from_flags(cli)?,
    };

    if let Some(url) = &cli.source {
        config.source.url = url.clone();
    }
    if let Some(driver) = &cli.source_driver {
        config.source.driver = driver.clone();
    }
    if let Some(url) = &cli.target {
        config.target.url = url.clone();
    }
    if let Some(driver) = &cli.target_driver {
        config.target.driver = driver.clone();
    }
    if let Some(schema) = &cli.schema {
        config.source.schema = schema.clone();
        config.target.schema = schema.clone();
    }
    if let Some(mode) = &cli.ssl_mode {
        config.source.ssl_mode = mode.clone();
        config.target.ssl_mode = mode.clone();
    }

    if cli.parallel {
        config.extraction.parallel = true;
    }
    if let Some(n) = cli.max_connections {
        config.extraction.max_connections = Some(n);
    }

    let filter = &mut config.filter;
    filter.ignore_tables.extend(
        cli.ignore_tables
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(String::from),
    );
    if let Some(pattern) = &cli.ignore_table_pattern {
        filter.ignore_table_pattern = Some(pattern.clone());
    }
    for (table, columns) in parse_column_list(cli.ignore_columns.iter().map(String::as_str))? {
        filter.ignore_columns.entry(table).or_default().extend(columns);
    }
    filter.ignore_indexes |= cli.ignore_indexes;
    filter.ignore_foreign_keys |= cli.ignore_foreign_keys;
    filter.ignore_checks |= cli.ignore_checks;

    config.validate()?;
    Ok(config)
}

fn config_from_flags(cli: &Cli) -> Result<Config, DiffError> {
    let missing: Vec<&str> = [
        ("--source", cli.source.is_none()),
        ("--source-driver", cli.source_driver.is_none()),
        ("--target", cli.target.is_none()),
        ("--target-driver", cli.target_driver.is_none()),
    ]
    .into_iter()
    .filter_map(|(flag, absent)| absent.then_some(flag))
    .collect();

    if !missing.is_empty() {
        return Err(DiffError::Config(format!(
            "Missing required flags: {} (or pass --config <path>)",
            missing.join(", ")
        )));
    }

    Ok(Config {
        source: ConnectionConfig::new(
            cli.source_driver.clone().unwrap_or_default(),
            cli.source.clone().unwrap_or_default(),
        ),
        target: ConnectionConfig::new(
            cli.target_driver.clone().unwrap_or_default(),
            cli.target.clone().unwrap_or_default(),
        ),
        filter: Default::default(),
        extraction: Default::default(),
    })
}

/// Logs go to stderr so stdout carries only the report.
fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel the returned token on SIGINT or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            match signal(kind) {
                Ok(mut stream) => {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Cancelling comparison...", name);
                    token.cancel();
                }
                Err(e) => tracing::warn!("Failed to install {} handler: {}", name, e),
            }
        });
    }

    cancel_token
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Cancelling comparison...");
            token.cancel();
        }
    });

    cancel_token
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dbdiff").chain(args.iter().copied())).unwrap()
    }

    const CONNECTION_ARGS: [&str; 8] = [
        "--source",
        "postgres://app:pw@db1/app",
        "--source-driver",
        "postgres",
        "--target",
        "mysql://app:pw@db2/app",
        "--target-driver",
        "mysql",
    ];

    #[test]
    fn test_config_from_flags() {
        let mut args = CONNECTION_ARGS.to_vec();
        args.extend([
            "--ignore-tables",
            "a, b ,",
            "--ignore-columns",
            "users.updated_at,users.created_at",
            "--parallel",
            "--schema",
            "app",
        ]);
        let config = build_config(&parse(&args)).unwrap();

        assert_eq!(config.source.schema, "app");
        assert_eq!(config.target.driver, "mysql");
        assert!(config.extraction.parallel);
        assert_eq!(config.filter.ignore_tables, vec!["a", "b"]);
        assert_eq!(config.filter.ignore_columns["users"].len(), 2);
    }

    #[test]
    fn test_missing_flags_are_named() {
        let err = build_config(&parse(&["--source", "postgres://db/app"])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("--source-driver"), "{}", msg);
        assert!(msg.contains("--target"), "{}", msg);
        assert!(!msg.contains("--source,"), "{}", msg);
    }

    #[test]
    fn test_exit_status_mapping() {
        assert_eq!(exit_status(&Ok(false)), 0);
        assert_eq!(exit_status(&Ok(true)), 2);
        assert_eq!(exit_status(&Err(DiffError::Cancelled)), 1);
        assert_eq!(
            exit_status(&Err(DiffError::Config("bad".to_string()))),
            1
        );
    }

    #[test]
    fn test_bad_column_entry_rejected() {
        let mut args = CONNECTION_ARGS.to_vec();
        args.extend(["--ignore-columns", "no_dot"]);
        assert!(build_config(&parse(&args)).is_err());
    }
}
