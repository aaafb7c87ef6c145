mod logging;

use clap::{Parser, Subcommand, ValueEnum};
use field_visibility::{
    FormSpec, FormStore, ValidationReport, VisibilityMap, build_render_payload, render_json_ui,
    render_text, resolve_visibility, validate,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Conditional field visibility CLI",
    long_about = "Resolves which fields of a form are shown for a snapshot of form values"
)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Print the visibility of every field.
    Resolve {
        /// Path to the FormSpec JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Form values JSON, or a state tree `{"form": {"<name>": {"values": ...}}}`.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
        /// Form to read from a state tree (defaults to the form id).
        #[arg(long, value_name = "NAME")]
        form: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Render the visible fields.
    Render {
        /// Path to the FormSpec JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Form values JSON, or a state tree.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
        /// Form to read from a state tree (defaults to the form id).
        #[arg(long, value_name = "NAME")]
        form: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Check a FormSpec for configuration errors and ambiguities.
    Check {
        /// Path to the FormSpec JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
    },
    /// Print the JSON Schema of the FormSpec format.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    match cli.command {
        Command::Resolve {
            spec,
            values,
            form,
            format,
        } => run_resolve(&spec, &values, form, format),
        Command::Render {
            spec,
            values,
            form,
            format,
        } => run_render(&spec, &values, form, format),
        Command::Check { spec } => run_check(&spec),
        Command::Schema => run_schema(),
    }
}

fn load_spec(path: &Path) -> CliResult<FormSpec> {
    let spec_json = fs::read_to_string(path)?;
    let spec: FormSpec = serde_json::from_str(&spec_json)?;
    debug!(form = %spec.id, fields = spec.fields.len(), "loaded form spec");
    Ok(spec)
}

/// Loads values as a store. Plain value objects become a store holding only
/// `form_name`.
fn load_store(path: &Path, form_name: &str) -> CliResult<FormStore> {
    let values_json = fs::read_to_string(path)?;
    let values: Value = serde_json::from_str(&values_json)?;
    match FormStore::from_state(&values) {
        Some(store) => {
            if !store.contains(form_name) {
                info!(form = form_name, "state tree has no values for form");
            }
            Ok(store)
        }
        None => Ok(FormStore::single(form_name, values)),
    }
}

fn run_resolve(
    spec_path: &Path,
    values_path: &Path,
    form: Option<String>,
    format: OutputFormat,
) -> CliResult<()> {
    let spec = load_spec(spec_path)?;
    let form_name = form.unwrap_or_else(|| spec.id.clone());
    let store = load_store(values_path, &form_name)?;
    let visibility = resolve_visibility(&spec, &store.snapshot(&form_name));
    println!("{}", describe_visibility(&visibility, format)?);
    Ok(())
}

fn describe_visibility(visibility: &VisibilityMap, format: OutputFormat) -> CliResult<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(visibility)?,
        OutputFormat::Text => visibility
            .iter()
            .map(|(id, visible)| format!("{}: {}", id, if *visible { "shown" } else { "hidden" }))
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

fn run_render(
    spec_path: &Path,
    values_path: &Path,
    form: Option<String>,
    format: OutputFormat,
) -> CliResult<()> {
    let spec = load_spec(spec_path)?;
    let form_name = form.unwrap_or_else(|| spec.id.clone());
    let store = load_store(values_path, &form_name)?;
    let payload = build_render_payload(&spec, &store.snapshot(&form_name))?;
    match format {
        OutputFormat::Text => println!("{}", render_text(&payload)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&render_json_ui(&payload))?),
    }
    Ok(())
}

fn run_check(spec_path: &Path) -> CliResult<()> {
    let spec = load_spec(spec_path)?;
    let report = validate(&spec);
    println!(
        "Check result: {}",
        if report.valid { "valid" } else { "invalid" }
    );
    describe_report(&report);

    if report.valid {
        Ok(())
    } else {
        Err("form spec has configuration errors".into())
    }
}

fn describe_report(report: &ValidationReport) {
    if !report.errors.is_empty() {
        println!("Errors:");
        for error in &report.errors {
            println!(
                "  {} - {} ({})",
                error.field_id.as_deref().unwrap_or("<form>"),
                error.message,
                error.code
            );
        }
    }
    if !report.warnings.is_empty() {
        println!("Warnings:");
        for warning in &report.warnings {
            println!(
                "  {} - {} ({})",
                warning.field_id.as_deref().unwrap_or("<form>"),
                warning.message,
                warning.code
            );
        }
    }
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(FormSpec);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
