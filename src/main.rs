//! Stepflow CLI Entry Point
//!
//! Command-line inspector for persisted workflow drafts. Flattens a draft
//! the way an editing session would, then prints the assigned runtime ids,
//! each step's predecessors, and the topology, or the host request JSON.
//!
//! # Usage
//!
//! ```bash
//! # Summarize a draft
//! stepflow draft.json
//!
//! # Emit the host request JSON instead of the summary
//! stepflow draft.json --json
//!
//! # Flatten with a non-default level seed
//! stepflow draft.json --level 1
//! ```

use std::env;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use stepflow::session::host::{HostRequest, WorkflowSteps};
use stepflow::topology::deps::{parse_dependencies, DependencyMap};
use stepflow::topology::draft::load_draft;
use stepflow::topology::flatten::{flatten_workflow, FlattenedWorkflow};
use stepflow::{APP_NAME, VERSION};

/// Default level seed for id codes (what an editing session uses).
const DEFAULT_LEVEL: u64 = 0;

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    draft_path: String,
    as_json: bool,
    level: u64,
    iface_id: u64,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            draft_path: String::new(),
            as_json: false,
            level: DEFAULT_LEVEL,
            iface_id: 0,
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
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Workflow Step Topology Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: stepflow [OPTIONS] <DRAFT_FILE>");
    println!();
    println!("Arguments:");
    println!("  <DRAFT_FILE>    Path to a workflow draft JSON file");
    println!();
    println!("Options:");
    println!("  --json          Emit the host request JSON instead of the summary");
    println!("  --level N       Level seed for id codes (default: {})", DEFAULT_LEVEL);
    println!("  --iface-id N    Editor surface id tagged onto --json output (default: 0)");
    println!("  --verbose       Enable debug logging");
    println!("  --help          Show this help message");
    println!("  --version       Show version information");
    println!();
    println!("Examples:");
    println!("  stepflow draft.json");
    println!("  stepflow draft.json --json --iface-id 3");
    println!("  stepflow draft.json --level 1 --verbose");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
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
            "--json" => {
                config.as_json = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--level" => {
                i += 1;
                if i >= args.len() {
                    return Err("--level requires a number argument".to_string());
                }
                config.level = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid level value: {}", args[i]))?;
            }
            "--iface-id" => {
                i += 1;
                if i >= args.len() {
                    return Err("--iface-id requires a number argument".to_string());
                }
                config.iface_id = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid iface-id value: {}", args[i]))?;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                // Positional argument
                match positional_index {
                    0 => config.draft_path = arg.clone(),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    if config.draft_path.is_empty() {
        return Err("Missing required <DRAFT_FILE> argument".to_string());
    }

    Ok(config)
}

/// Prints the step table, the topology, and a one-line summary.
fn print_summary(flattened: &FlattenedWorkflow, dependencies: &DependencyMap) {
    let topology = &flattened.topology;

    println!("{}", "Steps:".bold());
    println!("  {:<8} {:<20} {}", "ID", "PRECEDED BY", "PAYLOAD");

    for id in topology.step_ids() {
        let predecessors = dependencies
            .get(&id)
            .filter(|preds| !preds.is_empty())
            .map(|preds| {
                preds
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|| "(start)".to_string());

        let payload = match flattened.steps_data.payload(id) {
            Ok(value) => truncate(&value.to_string(), 48),
            Err(_) => "(no payload)".to_string(),
        };

        println!(
            "  {} {:<20} {}",
            format!("{:<8}", id).cyan(),
            predecessors,
            payload
        );
    }

    println!();
    println!("{} {}", "Topology:".bold(), topology);

    if !topology.is_well_formed() {
        println!(
            "{}",
            "Note: draft structure violates grouping invariants".yellow()
        );
    }

    println!();
    println!(
        "{} steps, {} payload entries",
        topology.step_count(),
        flattened.steps_data.len()
    );
}

/// Truncates a string to a maximum length, cutting on a char boundary.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    // Print banner (suppressed in JSON mode to keep stdout parseable)
    if !config.as_json {
        print_banner();
    }

    // Load draft
    info!("Inspecting draft: {}", config.draft_path);
    let draft = load_draft(&config.draft_path).map_err(|e| {
        error!("Failed to load draft: {}", e);
        format!("Could not load draft from '{}': {}", config.draft_path, e)
    })?;

    // Flatten the way a session would, then derive dependencies
    let flattened = flatten_workflow(&draft.steps, &draft.steps_data, config.level)?;
    let dependencies = parse_dependencies(&flattened.topology);

    if config.as_json {
        let request = HostRequest::workflow(
            config.iface_id,
            WorkflowSteps {
                steps: flattened.topology,
                steps_data: flattened.steps_data,
            },
        );
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    print_summary(&flattened, &dependencies);

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
