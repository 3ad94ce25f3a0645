//! Tabflow CLI Entry Point
//!
//! Loads a tabular workflow definition and prints the result.
//!
//! # Usage
//!
//! ```bash
//! # Print the typed workflow as YAML
//! tabflow deploy.csv
//!
//! # Print the raw nested document as JSON
//! tabflow deploy.csv --document --format json
//!
//! # Substitute variables before parsing
//! tabflow deploy.csv --var env=prod --vars vars.yaml
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::process::ExitCode;

use log::{error, info};

use tabflow::resource::{FileFetcher, Resource};
use tabflow::workflow::{InMemoryRegistry, LoaderOptions, WorkflowLoader};
use tabflow::{APP_NAME, VERSION};

/// Output encoding for the loaded workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Yaml,
    Json,
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    workflow_path: Option<String>,
    variables: HashMap<String, String>,
    variables_file: Option<String>,
    delimiter: u8,
    format: OutputFormat,
    document: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workflow_path: None,
            variables: HashMap::new(),
            variables_file: None,
            delimiter: tabflow::resource::DEFAULT_DELIMITER,
            format: OutputFormat::Yaml,
            document: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .target(env_logger::Target::Stderr)
        .init();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: tabflow [OPTIONS] <WORKFLOW_FILE>");
    println!();
    println!("Arguments:");
    println!("  <WORKFLOW_FILE>     Path to the tabular workflow file");
    println!();
    println!("Options:");
    println!("  --var NAME=VALUE    Define a $variable (repeatable)");
    println!("  --vars FILE         Read variables from a YAML or JSON file");
    println!("  --delimiter CHAR    Cell delimiter (default: ,)");
    println!("  --format FORMAT     Output format: yaml or json (default: yaml)");
    println!("  --document          Print the raw nested document instead of the workflow");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  tabflow deploy.csv");
    println!("  tabflow deploy.csv --document --format json");
    println!("  tabflow deploy.csv --var env=prod --vars vars.yaml");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--document" => {
                config.document = true;
            }
            "--var" => {
                i += 1;
                let pair = args.get(i).ok_or("--var requires a NAME=VALUE argument")?;
                let (name, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("Invalid variable definition: {}", pair))?;
                config
                    .variables
                    .insert(name.trim().to_string(), value.to_string());
            }
            "--vars" => {
                i += 1;
                let path = args.get(i).ok_or("--vars requires a file argument")?;
                config.variables_file = Some(path.clone());
            }
            "--delimiter" => {
                i += 1;
                let value = args.get(i).ok_or("--delimiter requires a character argument")?;
                config.delimiter = match value.as_bytes() {
                    [byte] => *byte,
                    _ if value == "\\t" => b'\t',
                    _ => return Err(format!("Invalid delimiter: {}", value)),
                };
            }
            "--format" => {
                i += 1;
                let value = args.get(i).ok_or("--format requires yaml or json")?;
                config.format = match value.as_str() {
                    "yaml" => OutputFormat::Yaml,
                    "json" => OutputFormat::Json,
                    other => return Err(format!("Unknown format: {}", other)),
                };
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.workflow_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.workflow_path = Some(arg.clone());
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Reads string variables from a YAML (or JSON) mapping.
fn read_variables(path: &str) -> Result<HashMap<String, String>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read variables file '{}': {}", path, e))?;
    let raw: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&content)
        .map_err(|e| format!("Failed to parse variables file '{}': {}", path, e))?;

    raw.into_iter()
        .map(|(name, value)| -> Result<(String, String), Box<dyn std::error::Error>> {
            let text = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return Err(format!("Variable '{}' must be a scalar", name).into()),
            };
            Ok((name, text))
        })
        .collect()
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);

    let workflow_path = config
        .workflow_path
        .ok_or("Missing workflow file argument")?;

    let mut variables = HashMap::new();
    if let Some(path) = &config.variables_file {
        variables = read_variables(path)?;
        info!("Loaded {} variables from {}", variables.len(), path);
    }
    // Command-line definitions win over the variables file
    variables.extend(config.variables);

    let options = LoaderOptions::default()
        .with_delimiter(config.delimiter)
        .with_variables(variables);
    let loader = WorkflowLoader::new(&FileFetcher).with_options(options);
    let resource = Resource::from_path(&workflow_path)?;
    let mut registry = InMemoryRegistry::new();

    let document = loader.load_document(&resource, &mut registry).map_err(|e| {
        error!("Failed to load workflow: {}", e);
        format!("Could not load workflow from '{}': {}", workflow_path, e)
    })?;
    if !registry.is_empty() {
        info!("Imported workflows: {}", registry.names().join(", "));
    }

    let output = if config.document {
        match config.format {
            OutputFormat::Yaml => serde_yaml::to_string(&document)?,
            OutputFormat::Json => serde_json::to_string_pretty(&document)?,
        }
    } else {
        let workflow = tabflow::Workflow::from_document(document)?;
        info!(
            "Workflow '{}' loaded: {} tasks, services: {}",
            workflow.name,
            workflow.tasks.len(),
            workflow.services().join(", ")
        );
        match config.format {
            OutputFormat::Yaml => serde_yaml::to_string(&workflow)?,
            OutputFormat::Json => serde_json::to_string_pretty(&workflow)?,
        }
    };
    println!("{}", output.trim_end());

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
