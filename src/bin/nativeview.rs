//! Nativeview CLI
//!
//! Validate, serialize and describe data with JSON schema declarations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use nativeview::{determine_metadata, load_declaration, load_json, Data, LoadError, Unit};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nativeview")]
#[command(about = "Validate and serialize data with declarative schemas")]
#[command(version)]
struct Cli {
    /// Log verbosity (overrides RUST_LOG); logs go to stderr
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a payload against a declaration
    Validate {
        /// Payload file to validate
        payload: PathBuf,

        /// Declaration file
        #[arg(long)]
        schema: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Serialize plain JSON data through a declaration
    Serialize {
        /// Data file to serialize
        object: PathBuf,

        /// Declaration file
        #[arg(long)]
        schema: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the metadata tree of a declaration
    Metadata {
        /// Declaration file
        schema: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn init_logging(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let result = match cli.command {
        Commands::Validate {
            payload,
            schema,
            json,
        } => run_validate(&schema, &payload, json),
        Commands::Serialize {
            object,
            schema,
            pretty,
        } => run_serialize(&schema, &object, pretty),
        Commands::Metadata { schema, pretty } => run_metadata(&schema, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn load_unit(schema: &Path, json_output: bool) -> Result<Unit, u8> {
    load_declaration(schema).map_err(|e| {
        report_load_error(json_output, "loading schema", &e);
        e.exit_code() as u8
    })
}

fn run_validate(schema: &Path, payload: &Path, json_output: bool) -> Result<(), u8> {
    let unit = load_unit(schema, json_output)?;
    let payload = load_json(payload).map_err(|e| {
        report_load_error(json_output, "loading payload", &e);
        e.exit_code() as u8
    })?;

    let mut unit = unit.with_data(payload);
    if unit.is_valid() {
        let data = unit.validated_data().map_or(Value::Null, Data::to_json);
        if json_output {
            println!("{}", serde_json::json!({ "valid": true, "data": data }));
        } else {
            println!("{}", data);
        }
        Ok(())
    } else {
        let errors = unit.errors().map_or(Value::Null, |e| e.to_json());
        debug!(%errors, "payload rejected");
        if json_output {
            println!("{}", serde_json::json!({ "valid": false, "errors": errors }));
        } else {
            eprintln!("Validation failed:");
            eprintln!("{}", pretty(&errors));
        }
        Err(1)
    }
}

fn run_serialize(schema: &Path, object: &Path, pretty_output: bool) -> Result<(), u8> {
    let unit = load_unit(schema, false)?;
    let object = load_json(object).map_err(|e| {
        report_load_error(false, "loading object", &e);
        e.exit_code() as u8
    })?;

    let serialized = unit.serialize_value(&Data::from_json(&object)).map_err(|e| {
        eprintln!("Error: {}", e);
        1
    })?;
    print_json(&serialized, pretty_output);
    Ok(())
}

fn run_metadata(schema: &Path, pretty_output: bool) -> Result<(), u8> {
    let unit = load_unit(schema, false)?;
    print_json(&determine_metadata(&unit), pretty_output);
    Ok(())
}

fn print_json(value: &Value, pretty_output: bool) {
    if pretty_output {
        println!("{}", pretty(value));
    } else {
        println!("{}", value);
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn report_load_error(json_output: bool, context: &str, error: &LoadError) {
    let issues = match error {
        LoadError::InvalidDeclaration { issues } => issues.as_slice(),
        _ => &[],
    };
    if json_output {
        let output = serde_json::json!({
            "valid": false,
            "error": format!("{}: {}", context, error),
            "issues": issues,
        });
        println!("{}", output);
    } else {
        eprintln!("Error {}: {}", context, error);
        for issue in issues {
            eprintln!("  {}", issue);
        }
    }
}
